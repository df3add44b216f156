use serde_json::{Map, Value};

/// One action named in an `action` list, with any pre-bound arguments
/// parsed from source.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionData {
    pub name: String,
    pub args: Map<String, Value>,
}

impl ActionData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }
}

/// A single executable instruction of a dialogue.
///
/// Label and context operands are ids into the owning dialogue's label
/// registry and the program-wide context registry; `aid` operands are ids
/// into the program-wide agent registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Jump target; public labels are entrypoints.
    Label { lid: usize, public: bool },
    Goto { lid: usize },

    /// Load/store the current conversation context under a module-scoped name.
    LoadCtx { cid: usize },
    StoreCtx { cid: usize },

    /// Print a text block to the operator.
    Info { text: String },
    /// Push a text block into the conversation as a user turn.
    Autoprompt { text: String },

    /// Transfer control to `lid` in agent `aid`; the caller adopts the
    /// callee's context when the callee returns.
    Call { aid: usize, lid: usize },
    /// Transfer with a fresh context; the caller's context is restored on
    /// return.
    Invoke { aid: usize, lid: usize },
    /// Fan out one invocation per child of the current module.
    Recurse { aid: usize, lid: usize },

    /// Request a free-form agent reply.
    AwaitReply,
    /// Require the agent to call one of the listed actions.
    AwaitAction { actions: Vec<ActionData> },
    /// Force a YES/NO tool call and branch on it.
    AwaitBranch { lid_yes: usize, lid_no: usize },

    /// Actions issued locally by the operator side, not asked of the agent.
    UserAction { actions: Vec<ActionData> },
    /// Interactive YES/NO prompt to the operator.
    UserBranch { lid_yes: usize, lid_no: usize },

    /// Print the latest agent reply.
    GetReply,
    /// Wait for the operator to press enter.
    Pause,
    /// Read one operator line into the conversation as a user turn.
    Prompt,
}
