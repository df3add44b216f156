use hll_runtime::{Workspace, paths, persist};
use hll_types::DependencyGraph;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A disposable data directory and project root for runtime and CLI tests.
pub struct TestWorld {
    pub data_dir: TempDir,
    pub root: TempDir,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().expect("temp data dir"),
            root: TempDir::new().expect("temp project root"),
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::open(self.data_dir.path().to_path_buf()).expect("open workspace")
    }

    /// Write `.hll` dialogue files into a directory under the root and
    /// return it, ready to be passed as a parse path or `-I` include.
    pub fn write_dialogue_dir(&self, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.path().join("dialogues");
        std::fs::create_dir_all(&dir).expect("create dialogue dir");
        for (name, code) in files {
            std::fs::write(dir.join(format!("{}.hll", name)), code).expect("write dialogue");
        }
        dir
    }

    /// Lay out a project metadata directory by hand (dialogues plus
    /// dependency graph), bypassing `create`. Returns the project root.
    pub fn init_project(
        &self,
        pname: &str,
        files: &[(&str, &str)],
        graph: &DependencyGraph,
    ) -> PathBuf {
        let proot = self.root.path().join("hll").join(pname);
        let meta = paths::metadata_dir(&proot);
        std::fs::create_dir_all(&meta).expect("create project meta");
        for (name, code) in files {
            std::fs::write(meta.join(format!("{}.hll", name)), code).expect("write dialogue");
        }
        persist::write_json_atomic(&paths::dependency_graph_file(&meta), graph)
            .expect("write dependency graph");
        proot
    }

    pub fn meta_dir(&self, proot: &Path) -> PathBuf {
        paths::metadata_dir(proot)
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
