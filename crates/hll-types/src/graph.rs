use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The module dependency graph, owned on disk by the command server.
///
/// The interpreter treats it as data: it reads `children` when fanning out
/// a `recurse`, and replaces the whole graph whenever the server returns an
/// updated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub modules: Vec<String>,
    pub files: BTreeMap<String, Vec<String>>,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub children: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// The graph a freshly created project starts with: a `global` module
    /// holding the files found under the project root, and an empty `root`
    /// module.
    pub fn initial(global_files: Vec<String>) -> Self {
        let mut files = BTreeMap::new();
        files.insert("global".to_string(), global_files);
        files.insert("root".to_string(), Vec::new());

        let mut empty = BTreeMap::new();
        empty.insert("global".to_string(), Vec::new());
        empty.insert("root".to_string(), Vec::new());

        Self {
            modules: vec!["global".to_string(), "root".to_string()],
            files,
            dependencies: empty.clone(),
            children: empty,
        }
    }

    pub fn children_of(&self, module: &str) -> &[String] {
        self.children.get(module).map(Vec::as_slice).unwrap_or(&[])
    }
}
