use crate::{Instruction, SymbolTable, Token};
use std::collections::{BTreeMap, BTreeSet};

/// One parsed dialogue file: its tokens, instructions, label registry,
/// entrypoints, and jump table, plus the raw source kept for reporting.
#[derive(Debug, Clone, Default)]
pub struct Dialogue {
    pub tokens: Vec<Token>,
    pub instructions: Vec<Instruction>,
    pub labels: SymbolTable,
    /// Public label ids; the only legal targets of inter-agent transfers.
    pub entrypoints: BTreeSet<usize>,
    /// Maps a label id to the index of the instruction just after its
    /// `Label` instruction.
    pub jumptable: BTreeMap<usize, usize>,
    pub source: String,
}

impl Dialogue {
    /// Instruction index a jump to `lid` lands on. Label ids come out of
    /// this dialogue's own registry, so the entry is always present.
    pub fn jump(&self, lid: usize) -> usize {
        self.jumptable[&lid]
    }
}

/// A whole program: one dialogue per agent, plus the program-wide agent
/// and context registries. Populated during parse, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub agents: SymbolTable,
    pub contexts: SymbolTable,
    pub dialogues: BTreeMap<usize, Dialogue>,
}

impl Program {
    pub fn dialogue(&self, aid: usize) -> &Dialogue {
        &self.dialogues[&aid]
    }
}
