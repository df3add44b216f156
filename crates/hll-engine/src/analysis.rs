use crate::error::AnalysisFault;
use crate::{Error, Result};
use hll_types::{Dialogue, Instruction};
use std::collections::BTreeSet;

// Turn discipline, proven over every reachable control path from every
// public label:
//  1. no two agent turns without an intervening user turn;
//  2. the first turn after a public label is a user turn;
//  3. the last turn before termination is an agent turn;
//  4. getreply only runs while the last turn was an agent turn.
//
// prompt/autoprompt are user turns; every await variant plus the operator
// action/branch forms are agent turns; everything else produces no turn.

const NONE_YET: i8 = -1;
const AGENT: i8 = 0;
const USER: i8 = 1;

fn turn_of(inst: &Instruction) -> i8 {
    match inst {
        Instruction::Prompt | Instruction::Autoprompt { .. } => USER,
        Instruction::AwaitReply
        | Instruction::AwaitAction { .. }
        | Instruction::AwaitBranch { .. }
        | Instruction::UserAction { .. }
        | Instruction::UserBranch { .. } => AGENT,
        _ => NONE_YET,
    }
}

/// Check the four turn invariants for one dialogue.
pub fn analyze(dial: &Dialogue, agent: &str) -> Result<()> {
    let mut visited = BTreeSet::new();
    for &lid in &dial.entrypoints {
        traverse(dial, agent, &mut visited, NONE_YET, lid)?;
    }
    Ok(())
}

fn fault(dial: &Dialogue, agent: &str, lid: usize, fault: AnalysisFault) -> Error {
    Error::Analysis {
        agent: agent.to_string(),
        label: dial.labels.name_of(lid).unwrap_or("").to_string(),
        fault,
    }
}

fn traverse(
    dial: &Dialogue,
    agent: &str,
    visited: &mut BTreeSet<(i8, usize)>,
    mut turn: i8,
    lid: usize,
) -> Result<()> {
    if !visited.insert((turn, lid)) {
        return Ok(());
    }

    let mut idx = dial.jump(lid);
    let mut stop = None;

    while idx < dial.instructions.len() {
        let inst = &dial.instructions[idx];

        if matches!(inst, Instruction::GetReply) && turn != AGENT {
            return Err(fault(dial, agent, lid, AnalysisFault::GetReplyOutsideAgentTurn));
        }

        let next = turn_of(inst);
        if turn == NONE_YET {
            if next == AGENT {
                return Err(fault(dial, agent, lid, AnalysisFault::BeginsOnAgentTurn));
            }
            turn = next;
        } else {
            if turn == AGENT && next == AGENT {
                return Err(fault(dial, agent, lid, AnalysisFault::AdjacentAgentTurns));
            }
            if next != NONE_YET {
                turn = next;
            }
        }

        match inst {
            Instruction::Label { lid, .. } | Instruction::Goto { lid } => {
                stop = Some((*lid, None));
            }
            Instruction::UserBranch { lid_yes, lid_no }
            | Instruction::AwaitBranch { lid_yes, lid_no } => {
                stop = Some((*lid_yes, Some(*lid_no)));
            }
            _ => {}
        }
        if stop.is_some() {
            break;
        }
        idx += 1;
    }

    let Some((next_lid, other)) = stop else {
        // Ran off the end of the instruction vector.
        if turn == USER {
            return Err(fault(dial, agent, lid, AnalysisFault::EndsOnUserTurn));
        }
        return Ok(());
    };

    traverse(dial, agent, visited, turn, next_lid)?;
    if let Some(no_lid) = other {
        traverse(dial, agent, visited, turn, no_lid)?;
    }
    Ok(())
}
