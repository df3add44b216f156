use crate::config::Config;
use crate::console::Console;
use crate::interpreter::{Interpreter, RuntimeIo};
use crate::server::{self, CommandChannel, ServerClient};
use crate::{Error, Result, paths, persist};
use hll_engine::CommandSet;
use hll_types::{DependencyGraph, Frame, Program};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The on-disk `projects.json` index: project name -> project root.
#[derive(Debug, Default)]
pub struct ProjectsIndex {
    projects: BTreeMap<String, String>,
}

impl ProjectsIndex {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = paths::projects_file(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(Self {
            projects: persist::read_json(&path)?,
        })
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        persist::write_json_atomic(&paths::projects_file(data_dir), &self.projects)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.projects.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: &str, root: &Path) {
        self.projects
            .insert(name.to_string(), root.display().to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.projects.remove(name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.projects.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// One row of the `query` listing.
#[derive(Debug, Clone)]
pub struct ProjectStatus {
    pub name: String,
    pub root: String,
    pub active: bool,
}

/// Entry point for the project operations the CLI exposes.
pub struct Workspace {
    data_dir: PathBuf,
    config: Config,
}

impl Workspace {
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let config = Config::load(&data_dir)?;
        Ok(Self { data_dir, config })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect to the command server, spawning it when absent.
    pub fn connect_server(&self) -> Result<ServerClient> {
        ServerClient::connect(&self.config.server, &self.data_dir)
    }

    /// Validate the dialogue sources, lay out the project directory under
    /// `<root>/hll/<name>/`, seed its dependency graph, and record it in
    /// the index.
    pub fn create(
        &self,
        pname: &str,
        root: &Path,
        includes: &[PathBuf],
        chan: &mut dyn CommandChannel,
    ) -> Result<()> {
        let mut index = ProjectsIndex::load(&self.data_dir)?;
        if index.get(pname).is_some() {
            return Err(Error::Project(format!(
                "Project with name '{}' already exists",
                pname
            )));
        }

        let commands = server::fetch_commands(chan)?;
        hll_engine::parse_paths(includes, &commands)?;

        let proot = root.join("hll").join(pname);
        let meta = paths::metadata_dir(&proot);
        std::fs::create_dir_all(&meta)?;

        let mut global_files = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.path().is_file() {
                global_files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        global_files.sort();
        let graph = DependencyGraph::initial(global_files);
        persist::write_json_atomic(&paths::dependency_graph_file(&meta), &graph)?;

        // The dialogue sources become the project's parse root; the files
        // under the project root join the `global` module.
        for dir in includes {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == "hll") {
                    std::fs::copy(&path, meta.join(entry.file_name()))?;
                }
            }
        }
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                std::fs::copy(&path, proot.join(format!("{}.global", name)))?;
            }
        }

        index.insert(pname, &proot);
        index.save(&self.data_dir)
    }

    /// Start a fresh instance of a project at a public label.
    pub fn run(
        &self,
        pname: &str,
        agent: &str,
        label: Option<&str>,
        io: &mut RuntimeIo<'_>,
    ) -> Result<()> {
        let (proot, meta, program, commands) = self.load_project(pname, io.server)?;

        if paths::instance_file(&meta).exists() {
            return Err(Error::Project(format!(
                "'{}' already has an active instance",
                pname
            )));
        }

        let Some(aid) = program.agents.query(agent) else {
            return Err(Error::Project(format!("Invalid agent name '{}'", agent)));
        };
        let dial = program.dialogue(aid);

        let lid = match label {
            Some(label) => {
                let Some(lid) = dial.labels.query(label) else {
                    return Err(Error::Project(format!(
                        "Agent '{}' has no label '{}'",
                        agent, label
                    )));
                };
                if !dial.entrypoints.contains(&lid) {
                    return Err(Error::Project(format!(
                        "Agent '{}' label '{}' is not public",
                        agent, label
                    )));
                }
                lid
            }
            // A single public label is unambiguous and may be omitted.
            None => {
                let mut entrypoints = dial.entrypoints.iter();
                match (entrypoints.next(), entrypoints.next()) {
                    (Some(&lid), None) => lid,
                    (None, _) => {
                        return Err(Error::Project(format!(
                            "Agent '{}' has no public labels",
                            agent
                        )));
                    }
                    _ => {
                        return Err(Error::Project(
                            "Starting label argument is missing".to_string(),
                        ));
                    }
                }
            }
        };

        let frames = vec![Frame::new(aid, "root", dial.jump(lid))];
        let dgraph: DependencyGraph = persist::read_json(&paths::dependency_graph_file(&meta))?;

        self.dispatch(&program, &commands, frames, dgraph, &proot, io)
    }

    /// Continue a project from its persisted instance.
    pub fn resume(&self, pname: &str, io: &mut RuntimeIo<'_>) -> Result<()> {
        let (proot, meta, program, commands) = self.load_project(pname, io.server)?;

        let instance_path = paths::instance_file(&meta);
        let frames: Vec<Frame> = persist::read_json(&instance_path).map_err(|_| {
            Error::Project(format!("'{}' does not have an active instance", pname))
        })?;

        if frames.is_empty() {
            // The previous run was killed between its final save and the
            // instance removal; nothing is left to execute.
            std::fs::remove_file(&instance_path)?;
            return Ok(());
        }

        let dgraph: DependencyGraph = persist::read_json(&paths::dependency_graph_file(&meta))?;
        self.dispatch(&program, &commands, frames, dgraph, &proot, io)
    }

    /// List every project and whether it has a live instance.
    pub fn query(&self) -> Result<Vec<ProjectStatus>> {
        let index = ProjectsIndex::load(&self.data_dir)?;
        Ok(index
            .iter()
            .map(|(name, root)| ProjectStatus {
                name: name.to_string(),
                root: root.to_string(),
                active: paths::instance_file(&paths::metadata_dir(Path::new(root))).exists(),
            })
            .collect())
    }

    /// Remove a project after interactive confirmation. Returns false when
    /// the operator aborted.
    pub fn delete(&self, pname: &str, console: &mut dyn Console) -> Result<bool> {
        let mut index = ProjectsIndex::load(&self.data_dir)?;
        let Some(root) = index.get(pname).map(str::to_string) else {
            return Err(Error::Project(format!(
                "Project with name '{}' does not exist",
                pname
            )));
        };

        let confirmation = console.read_line("Are you sure? Type \"I am sure\" to proceed: ")?;
        if confirmation != "I am sure" {
            console.print("Aborted.\n");
            return Ok(false);
        }

        if Path::new(&root).is_dir() {
            std::fs::remove_dir_all(&root)?;
        } else {
            console.print(&format!("Directory does not exist or is not valid: {}\n", root));
        }

        index.remove(pname);
        index.save(&self.data_dir)?;
        Ok(true)
    }

    fn load_project(
        &self,
        pname: &str,
        chan: &mut dyn CommandChannel,
    ) -> Result<(PathBuf, PathBuf, Program, CommandSet)> {
        let index = ProjectsIndex::load(&self.data_dir)?;
        let Some(root) = index.get(pname) else {
            return Err(Error::Project(format!(
                "Project with name '{}' does not exist",
                pname
            )));
        };
        let proot = PathBuf::from(root);
        let meta = paths::metadata_dir(&proot);

        let commands = server::fetch_commands(chan)?;
        let program = hll_engine::parse_paths(std::slice::from_ref(&meta), &commands)?;
        Ok((proot, meta, program, commands))
    }

    fn dispatch(
        &self,
        program: &Program,
        commands: &CommandSet,
        frames: Vec<Frame>,
        dgraph: DependencyGraph,
        proot: &Path,
        io: &mut RuntimeIo<'_>,
    ) -> Result<()> {
        let mut interpreter = Interpreter::new(
            program,
            commands,
            frames,
            dgraph,
            proot,
            &self.data_dir,
            io,
        )?;
        interpreter.run()?;

        let instance_path = paths::instance_file(&paths::metadata_dir(proot));
        if instance_path.exists() {
            std::fs::remove_file(&instance_path)?;
        }
        Ok(())
    }
}
