/// Kind of a lexed token.
///
/// Kinds fall into a small number of classes ([`TokenClass`]); the class of
/// the most recently emitted token is what drives the lexer's
/// allowed-successor tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Simple commands
    GetReply,
    Pause,
    Prompt,

    // Commands taking an identifier operand
    Label,
    PublicLabel,
    Goto,
    LoadCtx,
    StoreCtx,

    // Commands taking an indented text block
    Autoprompt,
    Info,

    // Inter-agent control transfers
    Call,
    Invoke,
    Recurse,

    // `await` and its turn modes
    Await,
    Reply,
    Action,
    Branch,

    // Statement-level operator forms of action/branch
    UserAction,
    UserBranch,

    // Identifier operands
    Identifier,
    FirstIdentifier,
    SecondIdentifier,

    // Text block fragments
    TextBlockLine,
    TextBlockIndent,
    TextBlockComment,
    TextBlockNewline,

    // Action-list fragments
    ActionSpace,
    ActionIdentifier,
    ActionIdentifierWithArgs,
    FinalActionIdentifier,
    ActionArgNewline,
    ActionArgName,
    ActionArgContent,
    ActionComma,

    // Structure
    Comment,
    Newline,
    Eof,
    Epsilon,
}

/// Equivalence class of a token kind, used only to pick the lexer's
/// successor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    SimpleCommand,
    ReferenceIdentifier,
    ReferenceTextBlock,
    ControlFlow,
    Other(TokenKind),
}

impl TokenKind {
    pub fn class(self) -> TokenClass {
        use TokenKind::*;
        match self {
            GetReply | Pause | Prompt => TokenClass::SimpleCommand,
            Label | PublicLabel | Goto | LoadCtx | StoreCtx => TokenClass::ReferenceIdentifier,
            Autoprompt | Info => TokenClass::ReferenceTextBlock,
            Call | Invoke | Recurse => TokenClass::ControlFlow,
            other => TokenClass::Other(other),
        }
    }
}

/// One lexed token: a kind plus the byte span it covers in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
    pub line: usize,
}

impl Token {
    /// The slice of source text this token covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset..self.offset + self.len]
    }
}
