use crate::agent::{self, TurnMode};
use crate::console::Console;
use crate::provider::ModelProvider;
use crate::server::CommandChannel;
use crate::{Error, Result, context, paths, persist, signal};
use hll_engine::CommandSet;
use hll_types::{
    ActionData, Context, ContextTurn, DependencyGraph, Frame, Instruction, Program, Role,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The external collaborators a running program talks to.
pub struct RuntimeIo<'a> {
    pub provider: &'a mut dyn ModelProvider,
    pub server: &'a mut dyn CommandChannel,
    pub console: &'a mut dyn Console,
}

/// What a control transfer does to the context once the new frames are on
/// the stack.
enum Transfer {
    None,
    /// `call`: the callee continues with the caller's live context.
    Inherit,
    /// `invoke`/`recurse`: the callee starts from its own (usually fresh)
    /// context.
    Fresh,
}

/// Steps a parsed program, owning the frame stack, the live context, and
/// the dependency graph, and persisting all of it after every observable
/// step so a kill at any point resumes losslessly.
pub struct Interpreter<'a, 'io> {
    proot: PathBuf,
    data_dir: PathBuf,
    program: &'a Program,
    commands: &'a CommandSet,
    io: &'a mut RuntimeIo<'io>,
    stack: Vec<Frame>,
    dgraph: DependencyGraph,
    ctx: Context,
    aid: usize,
    cur_inst: usize,
    cur_module: String,
    // Deferred work applied inside the next guarded save.
    pending_frames: Vec<Frame>,
    pending_ctx_name: Option<String>,
}

impl<'a, 'io> Interpreter<'a, 'io> {
    pub fn new(
        program: &'a Program,
        commands: &'a CommandSet,
        frames: Vec<Frame>,
        dgraph: DependencyGraph,
        proot: &Path,
        data_dir: &Path,
        io: &'a mut RuntimeIo<'io>,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::Project(
                "Cannot start an interpreter on an empty instance".to_string(),
            ));
        }
        let mut interp = Self {
            proot: proot.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
            program,
            commands,
            io,
            stack: frames,
            dgraph,
            ctx: Vec::new(),
            aid: 0,
            cur_inst: 0,
            cur_module: String::new(),
            pending_frames: Vec::new(),
            pending_ctx_name: None,
        };
        interp.load_frame_state();
        interp.load_context(None);
        Ok(interp)
    }

    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// Execute one instruction. Returns false once the stack has emptied.
    pub fn step(&mut self) -> Result<bool> {
        let old_depth = self.stack.len();

        // Pop finished frames until an active one is on top.
        while self.cur_inst >= self.dialogue_len() {
            self.stack.pop();
            if self.stack.is_empty() {
                self.save(true)?;
                return Ok(false);
            }
            let inherits = self.stack.last().map(|f| f.called).unwrap_or(false);
            self.load_frame_state();
            if !inherits {
                // The frame transferred with invoke/recurse, so its own
                // context comes back; a caller takes over the callee's.
                self.load_context(None);
            }
        }
        if old_depth != self.stack.len() {
            self.save(true)?;
        }

        self.pending_frames.clear();
        self.pending_ctx_name = None;

        let mut should_save = false;
        let mut transfer = Transfer::None;
        let inst = self.program.dialogue(self.aid).instructions[self.cur_inst].clone();

        match inst {
            Instruction::Label { .. } => {}

            Instruction::Goto { lid } => {
                // -1 balances the increment below.
                self.cur_inst = self.program.dialogue(self.aid).jump(lid) - 1;
            }

            Instruction::LoadCtx { cid } => {
                let name = self.context_name(cid);
                self.load_context(Some(&name));
            }

            Instruction::StoreCtx { cid } => {
                self.pending_ctx_name = Some(self.context_name(cid));
                should_save = true;
            }

            Instruction::Info { text } => {
                self.io.console.print(&text);
            }

            Instruction::Autoprompt { text } => {
                self.ctx.push(ContextTurn::user(text));
                should_save = true;
            }

            Instruction::Call { aid, lid } => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.called = true;
                }
                let start = self.program.dialogue(aid).jump(lid);
                self.pending_frames
                    .push(Frame::new(aid, self.cur_module.clone(), start));
                should_save = true;
                transfer = Transfer::Inherit;
            }

            Instruction::Invoke { aid, lid } => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.called = false;
                }
                let start = self.program.dialogue(aid).jump(lid);
                self.pending_frames
                    .push(Frame::new(aid, self.cur_module.clone(), start));
                should_save = true;
                transfer = Transfer::Fresh;
            }

            Instruction::Recurse { aid, lid } => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.called = false;
                }
                let start = self.program.dialogue(aid).jump(lid);
                // Push child frames in reverse so the first child in the
                // graph runs first off the stack.
                for child in self.dgraph.children_of(&self.cur_module).iter().rev() {
                    self.pending_frames.push(Frame::new(aid, child.clone(), start));
                }
                should_save = true;
                transfer = Transfer::Fresh;
            }

            Instruction::AwaitReply => {
                self.request_agent(TurnMode::Reply, &[])?;
                should_save = true;
            }

            Instruction::AwaitAction { actions } => {
                self.request_agent(TurnMode::Action, &actions)?;
                should_save = true;
            }

            Instruction::AwaitBranch { lid_yes, lid_no } => {
                let answer =
                    self.request_agent(TurnMode::Branch, &[ActionData::new("answer")])?;
                let target = if answer { lid_yes } else { lid_no };
                self.cur_inst = self.program.dialogue(self.aid).jump(target) - 1;
                should_save = true;
            }

            Instruction::UserAction { actions } => {
                agent::issue_user_action(
                    self.io.server,
                    &mut self.ctx,
                    &actions,
                    &self.cur_module,
                    &mut self.dgraph,
                )?;
                should_save = true;
            }

            Instruction::UserBranch { lid_yes, lid_no } => {
                let answer = loop {
                    let line = self.io.console.read_line("(Y/n) ")?;
                    match line.chars().next() {
                        Some('Y') | Some('y') => break true,
                        Some('N') | Some('n') => break false,
                        _ => {}
                    }
                };
                let target = if answer { lid_yes } else { lid_no };
                self.cur_inst = self.program.dialogue(self.aid).jump(target) - 1;
                should_save = true;
            }

            Instruction::GetReply => {
                let mut text = self.latest_reply()?;
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                self.io.console.print(&text);
            }

            Instruction::Pause => {
                self.io.console.read_line("[ enter anything to resume ]")?;
            }

            Instruction::Prompt => {
                let line = self.io.console.read_line(">>> ")?;
                self.ctx.push(ContextTurn::user(line));
                should_save = true;
            }
        }

        self.cur_inst += 1;

        if should_save {
            if let Some(frame) = self.stack.last_mut() {
                frame.instruction = self.cur_inst;
            }
            self.save(false)?;
        }

        match transfer {
            Transfer::None => {}
            Transfer::Inherit => self.load_frame_state(),
            Transfer::Fresh => {
                self.load_frame_state();
                self.load_context(None);
            }
        }

        Ok(true)
    }

    /// Guarded save of the whole machine. Write order is load-bearing: the
    /// on-disk state stays a valid prefix of the live one between any two
    /// writes, and interrupts are deferred for the duration.
    fn save(&mut self, prune: bool) -> Result<()> {
        let _guard = signal::SaveGuard::begin();
        let meta = paths::metadata_dir(&self.proot);

        if prune {
            persist::prune_stale_contexts(&meta, self.stack.len())?;
        }

        let old_depth = self.stack.len();
        self.stack.append(&mut self.pending_frames);

        if let Some(name) = self.pending_ctx_name.take()
            && !self.stack.is_empty()
        {
            let path = paths::named_context_file(&meta, &name, &self.cur_module);
            persist::write_json_atomic(&path, &self.ctx)?;
        }

        persist::write_json_atomic(&paths::instance_file(&meta), &self.stack)?;
        persist::write_json_atomic(&paths::dependency_graph_file(&meta), &self.dgraph)?;

        if !self.stack.is_empty() {
            let path = paths::anonymous_context_file(&meta, old_depth);
            persist::write_json_atomic(&path, &self.ctx)?;
        }

        Ok(())
    }

    fn request_agent(&mut self, mode: TurnMode, actions: &[ActionData]) -> Result<bool> {
        agent::request_agent(
            self.io.provider,
            self.io.server,
            self.io.console,
            self.commands,
            &mut self.ctx,
            &mut self.dgraph,
            &self.cur_module,
            mode,
            actions,
        )
    }

    fn dialogue_len(&self) -> usize {
        self.program.dialogue(self.aid).instructions.len()
    }

    fn context_name(&self, cid: usize) -> String {
        self.program.contexts.name_of(cid).unwrap_or("").to_string()
    }

    fn load_frame_state(&mut self) {
        if let Some(frame) = self.stack.last() {
            self.aid = frame.agent;
            self.cur_inst = frame.instruction;
            self.cur_module = frame.module.clone();
        }
    }

    /// Load a saved context, falling back to the generated default when
    /// the file is missing or unreadable.
    fn load_context(&mut self, name: Option<&str>) {
        let meta = paths::metadata_dir(&self.proot);
        let path = match name {
            Some(name) => paths::named_context_file(&meta, name, &self.cur_module),
            None => paths::anonymous_context_file(&meta, self.stack.len()),
        };
        self.ctx = persist::read_json(&path)
            .unwrap_or_else(|_| context::default_context(&self.data_dir, &self.cur_module));
    }

    /// Render the most recent model turn for the operator.
    fn latest_reply(&self) -> Result<String> {
        for turn in self.ctx.iter().rev() {
            if turn.role != Role::Model {
                continue;
            }
            if turn.parts.len() > 1 {
                return Ok(serde_json::to_string_pretty(&turn.parts)?);
            }
            if let Some(part) = turn.parts.first() {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    return Ok(text.to_string());
                }
                if part.get("functionCall").is_some() {
                    return Ok(serde_json::to_string_pretty(part)?);
                }
            }
            break;
        }
        Ok("'getreply' failed; no agent reply found in context".to_string())
    }
}
