use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the per-project metadata directory.
pub const METADATA_DIR: &str = ".hll";

/// Resolve the data directory (projects index, initial prompt, server
/// script and log): explicit path, then `HLL_PATH`, then the platform data
/// directory, then `~/.hll`.
pub fn resolve_data_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("HLL_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("hll"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".hll"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME or platform data directory found".to_string(),
    ))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

pub fn projects_file(data_dir: &Path) -> PathBuf {
    data_dir.join("projects.json")
}

pub fn initial_prompt_file(data_dir: &Path) -> PathBuf {
    data_dir.join("initial_prompt.txt")
}

pub fn server_log_file(data_dir: &Path) -> PathBuf {
    data_dir.join("server.log")
}

pub fn default_server_script(data_dir: &Path) -> PathBuf {
    data_dir.join("server.py")
}

pub fn metadata_dir(proot: &Path) -> PathBuf {
    proot.join(METADATA_DIR)
}

pub fn instance_file(meta: &Path) -> PathBuf {
    meta.join("instance.json")
}

pub fn dependency_graph_file(meta: &Path) -> PathBuf {
    meta.join("dependency_graph.json")
}

/// `ctx<N>.json`: the anonymous context saved for stack depth `N`.
pub fn anonymous_context_file(meta: &Path, depth: usize) -> PathBuf {
    meta.join(format!("ctx{}.json", depth))
}

/// `ctx<name>-<module>.json`: a named context, scoped by module.
pub fn named_context_file(meta: &Path, name: &str, module: &str) -> PathBuf {
    meta.join(format!("ctx{}-{}.json", name, module))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve_data_dir(Some("/tmp/elsewhere")).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn context_file_names() {
        let meta = PathBuf::from("/p/.hll");
        assert_eq!(
            anonymous_context_file(&meta, 3),
            PathBuf::from("/p/.hll/ctx3.json")
        );
        assert_eq!(
            named_context_file(&meta, "scratch", "root"),
            PathBuf::from("/p/.hll/ctxscratch-root.json")
        );
    }
}
