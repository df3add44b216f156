use crate::{Error, Result};
use hll_engine::Rex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Write a JSON file via a sibling temp file and rename, so a crash mid-
/// write never leaves a half-written artifact at the final path.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Remove anonymous context files whose stack depth exceeds the live
/// stack. Run only after frames have actually popped.
pub fn prune_stale_contexts(meta: &Path, keep_depth: usize) -> Result<()> {
    let file_pattern =
        Rex::new(r"ctx[0-9]+\.json").map_err(|e| Error::Config(e.to_string()))?;
    let mut digits = Rex::new("[0-9]+").map_err(|e| Error::Config(e.to_string()))?;

    for entry in std::fs::read_dir(meta)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !file_pattern.is_match(&name) {
            continue;
        }
        if digits.first(&name)
            && let Ok(depth) = name[digits.pos..digits.pos + digits.len].parse::<usize>()
            && depth > keep_depth
        {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("instance.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();

        let loaded: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(loaded, [4]);
        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["instance.json"]);
    }

    #[test]
    fn prune_removes_only_deeper_anonymous_contexts() {
        let temp = TempDir::new().unwrap();
        for name in [
            "ctx1.json",
            "ctx2.json",
            "ctx3.json",
            "ctx12.json",
            "ctxscratch-root.json",
            "instance.json",
        ] {
            std::fs::write(temp.path().join(name), "[]").unwrap();
        }

        prune_stale_contexts(temp.path(), 2).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["ctx1.json", "ctx2.json", "ctxscratch-root.json", "instance.json"]
        );
    }
}
