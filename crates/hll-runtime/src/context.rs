use crate::paths;
use hll_types::{Context, ContextTurn};
use std::path::Path;

/// The context a frame starts from when no saved one applies: the
/// operator's standing instructions (if any) plus the module banner, and
/// the agent's acknowledgement.
pub fn default_context(data_dir: &Path, module: &str) -> Context {
    let prompt =
        std::fs::read_to_string(paths::initial_prompt_file(data_dir)).unwrap_or_default();
    vec![
        ContextTurn::user(format!(
            "{}\nYou are currently residing in a module named `{}`.",
            prompt, module
        )),
        ContextTurn::model("Understood."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hll_types::Role;
    use tempfile::TempDir;

    #[test]
    fn default_context_names_the_module_and_acknowledges() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("initial_prompt.txt"), "Be terse.").unwrap();

        let ctx = default_context(temp.path(), "root");
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx[0].role, Role::User);
        let text = ctx[0].text().unwrap();
        assert!(text.starts_with("Be terse."));
        assert!(text.contains("a module named `root`"));
        assert_eq!(ctx[1].text(), Some("Understood."));
    }

    #[test]
    fn missing_prompt_file_is_empty_prompt() {
        let temp = TempDir::new().unwrap();
        let ctx = default_context(temp.path(), "m");
        assert!(ctx[0].text().unwrap().starts_with("\nYou are currently"));
    }
}
