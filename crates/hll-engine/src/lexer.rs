use crate::rex::Rex;
use crate::{Error, Result};
use hll_types::{Token, TokenClass, TokenKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;

// The lexer is not a greedy tokeniser: after emitting a token it computes
// the set of allowed successors from that token's class and tries their
// patterns in declaration order at the current position. The first match
// wins and consumes its span. Epsilon is a legal successor that consumes
// nothing; Eof must match the whole remaining input.

const PATTERN_TABLE: &[(TokenKind, &str)] = &[
    (TokenKind::GetReply, "getreply"),
    (TokenKind::Pause, "pause"),
    (TokenKind::Prompt, "prompt"),
    (TokenKind::Label, "label"),
    (TokenKind::PublicLabel, r"\*label"),
    (TokenKind::Goto, "goto"),
    (TokenKind::LoadCtx, "loadctx"),
    (TokenKind::StoreCtx, "storectx"),
    (TokenKind::Autoprompt, "autoprompt"),
    (TokenKind::Info, "info"),
    (TokenKind::Call, "call"),
    (TokenKind::Invoke, "invoke"),
    (TokenKind::Recurse, "recurse"),
    (TokenKind::Await, "await"),
    (TokenKind::Reply, r"[ \t]+reply"),
    (TokenKind::Action, r"[ \t]+action"),
    (TokenKind::Branch, r"[ \t]+branch"),
    (TokenKind::UserAction, "action"),
    (TokenKind::UserBranch, "branch"),
    (
        TokenKind::Identifier,
        r"[ \t]+[A-Za-z_][A-Za-z0-9_]*(?:[ \t]|\n|#[^\n]*\n)",
    ),
    (TokenKind::FirstIdentifier, r"[ \t]+[A-Za-z_][A-Za-z0-9_]*[ \t]*,"),
    (
        TokenKind::SecondIdentifier,
        r"[ \t]*[A-Za-z_][A-Za-z0-9_]*(?:[ \t]|\n|#[^\n]*\n)",
    ),
    (TokenKind::TextBlockLine, r"[^\n]*\n"),
    (TokenKind::TextBlockIndent, r"[ \t]"),
    (TokenKind::TextBlockComment, r"[ \t]*#[^\n]*\n"),
    (TokenKind::TextBlockNewline, r"[ \t]*\n"),
    (TokenKind::ActionSpace, r"[ \t]+"),
    (TokenKind::ActionIdentifier, r"[A-Za-z_][A-Za-z0-9_]*[ \t]*,"),
    (TokenKind::ActionIdentifierWithArgs, r"[A-Za-z_][A-Za-z0-9_]*[ \t]*:"),
    (
        TokenKind::FinalActionIdentifier,
        r"[A-Za-z_][A-Za-z0-9_]*(?:[ \t]|\n|#[^\n]*\n)",
    ),
    (TokenKind::ActionArgNewline, r"[ \t]*(?:#[^\n]*)?\n[ \t]+"),
    (TokenKind::ActionArgName, r"[A-Za-z_][A-Za-z0-9_]*[ \t]*="),
    (
        TokenKind::ActionArgContent,
        r#"[ \t]*(?:"(?:[^"\\\n]|\\[^\n])*"|[^,#\n])*"#,
    ),
    (TokenKind::ActionComma, r"[ \t]*,"),
    (TokenKind::Comment, r"[ \t]*#[^\n]*\n"),
    (TokenKind::Newline, r"[ \t]*\n"),
    (TokenKind::Eof, r"[ \t\n]*"),
];

static PATTERNS: Lazy<HashMap<TokenKind, Rex>> = Lazy::new(|| {
    PATTERN_TABLE
        .iter()
        .map(|(kind, pat)| (*kind, Rex::new(pat).expect("static lexer pattern")))
        .collect()
});

/// Everything a statement may begin with. Tried in this order.
const STATEMENT: &[TokenKind] = &[
    TokenKind::GetReply,
    TokenKind::Pause,
    TokenKind::Prompt,
    TokenKind::Label,
    TokenKind::PublicLabel,
    TokenKind::Goto,
    TokenKind::LoadCtx,
    TokenKind::StoreCtx,
    TokenKind::Autoprompt,
    TokenKind::Info,
    TokenKind::Call,
    TokenKind::Invoke,
    TokenKind::Recurse,
    TokenKind::Await,
    TokenKind::UserAction,
    TokenKind::UserBranch,
    TokenKind::Comment,
    TokenKind::Newline,
    TokenKind::Eof,
];

const ACTION_LIST: &[TokenKind] = &[
    TokenKind::ActionSpace,
    TokenKind::ActionIdentifier,
    TokenKind::ActionIdentifierWithArgs,
    TokenKind::FinalActionIdentifier,
];

fn successors(cur: TokenKind) -> &'static [TokenKind] {
    use TokenKind::*;
    match cur.class() {
        TokenClass::SimpleCommand => STATEMENT,
        TokenClass::ReferenceIdentifier => &[Identifier],
        TokenClass::ReferenceTextBlock => &[TextBlockComment, TextBlockNewline],
        TokenClass::ControlFlow => &[FirstIdentifier],
        TokenClass::Other(kind) => match kind {
            Await => &[Reply, Action, Branch],
            Branch | UserBranch => &[FirstIdentifier],
            Action | UserAction => &[ActionSpace],
            ActionSpace => &[
                ActionIdentifier,
                ActionIdentifierWithArgs,
                FinalActionIdentifier,
                Epsilon,
            ],
            ActionIdentifier | ActionComma => ACTION_LIST,
            ActionIdentifierWithArgs => &[ActionArgNewline],
            ActionArgNewline => &[ActionArgName],
            ActionArgName => &[ActionArgContent],
            ActionArgContent => &[ActionComma, ActionArgNewline, Epsilon],
            FirstIdentifier => &[SecondIdentifier],
            Identifier | SecondIdentifier => &[Epsilon],
            TextBlockComment | TextBlockNewline => {
                &[TextBlockIndent, TextBlockNewline, Epsilon]
            }
            TextBlockIndent => &[TextBlockLine, Eof],
            TextBlockLine => &[TextBlockIndent, TextBlockNewline, Eof, Epsilon],
            _ => STATEMENT,
        },
    }
}

/// Matched-and-consumed kinds that never reach the emitted stream.
fn is_ignored(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Comment
            | Newline
            | Epsilon
            | TextBlockIndent
            | TextBlockComment
            | TextBlockNewline
            | ActionSpace
            | ActionArgNewline
            | ActionComma
    )
}

/// Tokenise one dialogue source. `file` is only used in the error message.
pub fn lex(file: &str, source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut offset = 0usize;
    let mut line = 1usize;
    let mut cur = TokenKind::Epsilon;

    while cur != TokenKind::Eof {
        let rest = &source[offset..];
        let mut matched = None;

        for &succ in successors(cur) {
            let len = match succ {
                TokenKind::Eof => {
                    if PATTERNS[&TokenKind::Eof].is_match(rest) {
                        rest.len()
                    } else {
                        continue;
                    }
                }
                TokenKind::Epsilon => 0,
                _ => match PATTERNS[&succ].match_prefix(rest) {
                    Some(len) => len,
                    None => continue,
                },
            };
            matched = Some((succ, len));
            break;
        }

        let Some((kind, len)) = matched else {
            return Err(Error::Lex {
                file: file.to_string(),
                line,
            });
        };

        cur = kind;
        if kind != TokenKind::Eof && !is_ignored(kind) {
            tokens.push(Token {
                kind,
                offset,
                len,
                line,
            });
        }
        line += source[offset..offset + len].bytes().filter(|&b| b == b'\n').count();
        offset += len;
    }

    Ok(tokens)
}
