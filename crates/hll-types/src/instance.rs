use serde::{Deserialize, Serialize};

/// One element of the persisted call stack.
///
/// `called` records whether this frame transferred control with `call`
/// (as opposed to `invoke`/`recurse`); on return it decides whether the
/// frame adopts the callee's context or reloads its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub agent: usize,
    pub module: String,
    pub instruction: usize,
    pub called: bool,
}

impl Frame {
    pub fn new(agent: usize, module: impl Into<String>, instruction: usize) -> Self {
        Self {
            agent,
            module: module.into(),
            instruction,
            called: false,
        }
    }
}
