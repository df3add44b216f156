use hll_engine::{CommandSet, parse_sources};
use hll_types::Program;

fn parse_one(code: &str) -> hll_engine::Result<Program> {
    parse_sources(
        vec![("main".to_string(), code.to_string())],
        &CommandSet::default(),
    )
}

#[test]
fn two_adjacent_agent_turns_are_rejected() {
    let err = parse_one("*label s\nautoprompt\n    x\nawait reply\nawait reply\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: Two adjacent agent turns at label 's'"
    );
}

#[test]
fn control_flow_may_not_begin_on_an_agent_turn() {
    let err = parse_one("*label s\nawait reply\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: Control flow begins on agent turn at label 's'"
    );
}

#[test]
fn control_flow_may_not_end_on_a_user_turn() {
    let err = parse_one("*label s\nautoprompt\n    x\nawait reply\nprompt\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: Control flow ends on user turn at label 's'"
    );
}

#[test]
fn getreply_requires_a_preceding_agent_turn() {
    let err = parse_one("*label s\ngetreply\nautoprompt\n    x\nawait reply\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: \
         Attempt to use getreply outside of agent turn at label 's'"
    );

    let after_user =
        parse_one("*label s\nautoprompt\n    x\ngetreply\nawait reply\n").unwrap_err();
    assert!(after_user.to_string().contains("getreply outside of agent turn"));
}

#[test]
fn getreply_after_an_agent_turn_is_accepted() {
    assert!(parse_one("*label s\nautoprompt\n    x\nawait reply\ngetreply\n").is_ok());
}

#[test]
fn the_error_names_the_label_of_the_failing_scan() {
    let src = "\
*label good
autoprompt
    x
await reply
goto bad
label bad
autoprompt
    y
prompt
";
    let err = parse_one(src).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: Control flow ends on user turn at label 'bad'"
    );
}

#[test]
fn every_branch_arm_is_checked() {
    // The no-arm of the agent branch ends on a user turn.
    let src = "\
*label s
autoprompt
    q
await branch yes, no
label yes
autoprompt
    ok
await reply
label no
autoprompt
    oops
prompt
";
    let err = parse_one(src).unwrap_err();
    assert!(err.to_string().contains("at label 'no'"), "{}", err);
}

#[test]
fn operator_branches_count_as_agent_turns() {
    let err = parse_one(
        "*label s\nautoprompt\n    x\nawait reply\nbranch a, b\nlabel a\nlabel b\n",
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Static analysis on `main` failed: Two adjacent agent turns at label 's'"
    );
}

#[test]
fn cyclic_control_flow_terminates_and_is_accepted() {
    let src = "\
*label s
autoprompt
    ask
await branch again, done
label again
autoprompt
    looping
await branch again, done
label done
autoprompt
    bye
await reply
";
    assert!(parse_one(src).is_ok());
}

#[test]
fn analysis_runs_per_entrypoint() {
    // Entering at `second` reaches the bad tail directly.
    let src = "\
*label first
autoprompt
    a
await reply
*label second
autoprompt
    b
prompt
";
    let err = parse_one(src).unwrap_err();
    assert!(err.to_string().contains("Control flow ends on user turn"));
}
