use crate::rex::Rex;
use crate::validate::{self, CommandSet};
use crate::{Error, Result, analysis, lexer};
use hll_types::{ActionData, Dialogue, Instruction, Program, SymbolTable, Token, TokenKind};
use serde_json::Map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const IDENT_PATTERN: &str = "[A-Za-z_][A-Za-z0-9_]*";

/// Parse every `.hll` file found directly under the given directories into
/// one program, validating action arguments against `commands` and running
/// the turn analyser on each dialogue.
pub fn parse_paths(paths: &[PathBuf], commands: &CommandSet) -> Result<Program> {
    let mut sources = Vec::new();

    for dir in paths {
        if !dir.is_dir() {
            return Err(Error::NotADirectory {
                path: dir.display().to_string(),
            });
        }
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::Io {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "hll") {
                sources.push((dialogue_name(&path), path));
            }
        }
    }

    // Registration order decides agent ids; keep it independent of
    // directory iteration order so persisted instances stay valid.
    sources.sort();

    let mut loaded = Vec::with_capacity(sources.len());
    for (name, path) in sources {
        let code = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        loaded.push((name, code));
    }

    parse_sources(loaded, commands)
}

/// Parse already-loaded `(agent name, source)` pairs into a program.
pub fn parse_sources(sources: Vec<(String, String)>, commands: &CommandSet) -> Result<Program> {
    let mut ident = Rex::new(IDENT_PATTERN).expect("static identifier pattern");
    let mut program = Program::default();

    // Pass 1: lex each file and discover symbol definitions. Label names
    // are per-dialogue; context and agent names are program-wide.
    for (name, code) in sources {
        let Some(aid) = program.agents.register(&name) else {
            return Err(Error::DuplicateDialogue { name });
        };

        let mut dial = Dialogue {
            source: ensure_trailing_newline(code),
            ..Dialogue::default()
        };
        dial.tokens = lexer::lex(&name, &dial.source)?;
        discover_symbols(&name, &mut dial, &mut program.contexts, &mut ident)?;
        program.dialogues.insert(aid, dial);
    }

    // Pass 2: emit instructions, resolving operands against the registries
    // populated above.
    let mut emitted = Vec::new();
    for (&aid, dial) in &program.dialogues {
        let name = program.agents.name_of(aid).unwrap_or("").to_string();
        let mut emitter = Emitter {
            file: &name,
            source: &dial.source,
            tokens: &dial.tokens,
            labels: &dial.labels,
            program: &program,
            commands,
            ident: &mut ident,
            instructions: Vec::new(),
            jumptable: BTreeMap::new(),
        };
        emitter.emit()?;
        emitted.push((aid, emitter.instructions, emitter.jumptable));
    }
    for (aid, instructions, jumptable) in emitted {
        if let Some(dial) = program.dialogues.get_mut(&aid) {
            dial.instructions = instructions;
            dial.jumptable = jumptable;
        }
    }

    for (&aid, dial) in &program.dialogues {
        analysis::analyze(dial, program.agents.name_of(aid).unwrap_or(""))?;
    }

    Ok(program)
}

fn dialogue_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ensure_trailing_newline(mut code: String) -> String {
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code
}

/// Extract the identifier embedded in a token's span (skipping the
/// surrounding whitespace and terminator the lexer folded in).
fn ident_name(source: &str, tok: &Token, ident: &mut Rex) -> String {
    let text = tok.text(source);
    if ident.first(text) {
        text[ident.pos..ident.pos + ident.len].to_string()
    } else {
        String::new()
    }
}

fn discover_symbols(
    file: &str,
    dial: &mut Dialogue,
    contexts: &mut SymbolTable,
    ident: &mut Rex,
) -> Result<()> {
    #[derive(PartialEq)]
    enum Expecting {
        Nothing,
        Label,
        PublicLabel,
        Context,
    }

    let mut expecting = Expecting::Nothing;
    for tok in &dial.tokens {
        match expecting {
            Expecting::Context => {
                let name = ident_name(&dial.source, tok, ident);
                if contexts.register(&name).is_none() {
                    return Err(Error::DuplicateContext {
                        file: file.to_string(),
                        name,
                        line: tok.line,
                    });
                }
            }
            Expecting::Label | Expecting::PublicLabel => {
                let name = ident_name(&dial.source, tok, ident);
                let Some(lid) = dial.labels.register(&name) else {
                    return Err(Error::DuplicateLabel {
                        file: file.to_string(),
                        name,
                        line: tok.line,
                    });
                };
                if expecting == Expecting::PublicLabel {
                    dial.entrypoints.insert(lid);
                }
            }
            Expecting::Nothing => {}
        }
        expecting = match tok.kind {
            TokenKind::Label => Expecting::Label,
            TokenKind::PublicLabel => Expecting::PublicLabel,
            TokenKind::StoreCtx => Expecting::Context,
            _ => Expecting::Nothing,
        };
    }
    Ok(())
}

struct Emitter<'a> {
    file: &'a str,
    source: &'a str,
    tokens: &'a [Token],
    labels: &'a SymbolTable,
    program: &'a Program,
    commands: &'a CommandSet,
    ident: &'a mut Rex,
    instructions: Vec<Instruction>,
    jumptable: BTreeMap<usize, usize>,
}

impl Emitter<'_> {
    fn emit(&mut self) -> Result<()> {
        let mut i = 0;
        while i < self.tokens.len() {
            let head = self.tokens[i];
            i += 1;
            match head.kind {
                TokenKind::Label | TokenKind::PublicLabel => {
                    let lid = self.label_operand(&mut i)?;
                    self.instructions.push(Instruction::Label {
                        lid,
                        public: head.kind == TokenKind::PublicLabel,
                    });
                    self.jumptable.insert(lid, self.instructions.len());
                }
                TokenKind::Goto => {
                    let lid = self.label_operand(&mut i)?;
                    self.instructions.push(Instruction::Goto { lid });
                }
                TokenKind::LoadCtx | TokenKind::StoreCtx => {
                    let cid = self.context_operand(&mut i)?;
                    self.instructions.push(match head.kind {
                        TokenKind::LoadCtx => Instruction::LoadCtx { cid },
                        _ => Instruction::StoreCtx { cid },
                    });
                }
                TokenKind::Info | TokenKind::Autoprompt => {
                    let text = self.text_block(&mut i, head.line)?;
                    self.instructions.push(match head.kind {
                        TokenKind::Info => Instruction::Info { text },
                        _ => Instruction::Autoprompt { text },
                    });
                }
                TokenKind::Call | TokenKind::Invoke | TokenKind::Recurse => {
                    let (aid, lid) = self.transfer_operands(&mut i)?;
                    self.instructions.push(match head.kind {
                        TokenKind::Call => Instruction::Call { aid, lid },
                        TokenKind::Invoke => Instruction::Invoke { aid, lid },
                        _ => Instruction::Recurse { aid, lid },
                    });
                }
                TokenKind::Await => {
                    let mode = self.tokens[i];
                    i += 1;
                    match mode.kind {
                        TokenKind::Reply => self.instructions.push(Instruction::AwaitReply),
                        TokenKind::Action => {
                            let actions = self.action_list(&mut i, false)?;
                            self.instructions.push(Instruction::AwaitAction { actions });
                        }
                        _ => {
                            let (lid_yes, lid_no) = self.branch_operands(&mut i)?;
                            self.instructions
                                .push(Instruction::AwaitBranch { lid_yes, lid_no });
                        }
                    }
                }
                TokenKind::UserAction => {
                    let actions = self.action_list(&mut i, true)?;
                    self.instructions.push(Instruction::UserAction { actions });
                }
                TokenKind::UserBranch => {
                    let (lid_yes, lid_no) = self.branch_operands(&mut i)?;
                    self.instructions
                        .push(Instruction::UserBranch { lid_yes, lid_no });
                }
                TokenKind::GetReply => self.instructions.push(Instruction::GetReply),
                TokenKind::Pause => self.instructions.push(Instruction::Pause),
                TokenKind::Prompt => self.instructions.push(Instruction::Prompt),
                _ => {}
            }
        }
        Ok(())
    }

    fn operand(&mut self, i: &mut usize) -> (String, usize) {
        let tok = self.tokens[*i];
        *i += 1;
        (ident_name(self.source, &tok, self.ident), tok.line)
    }

    fn label_operand(&mut self, i: &mut usize) -> Result<usize> {
        let (name, line) = self.operand(i);
        self.labels.query(&name).ok_or_else(|| Error::InvalidTarget {
            file: self.file.to_string(),
            kind: "label",
            name,
            line,
        })
    }

    fn context_operand(&mut self, i: &mut usize) -> Result<usize> {
        let (name, line) = self.operand(i);
        self.program
            .contexts
            .query(&name)
            .ok_or_else(|| Error::InvalidTarget {
                file: self.file.to_string(),
                kind: "context",
                name,
                line,
            })
    }

    /// Resolve the `agent, label` pair of a call/invoke/recurse. The label
    /// lives in the target agent's registry and must be public there.
    fn transfer_operands(&mut self, i: &mut usize) -> Result<(usize, usize)> {
        let (agent_name, line) = self.operand(i);
        let (label_name, label_line) = self.operand(i);

        let Some(aid) = self.program.agents.query(&agent_name) else {
            return Err(Error::InvalidTarget {
                file: self.file.to_string(),
                kind: "agent",
                name: agent_name,
                line,
            });
        };
        let target = self.program.dialogue(aid);
        let Some(lid) = target.labels.query(&label_name) else {
            return Err(Error::InvalidTarget {
                file: self.file.to_string(),
                kind: "agent label",
                name: label_name,
                line: label_line,
            });
        };
        if !target.entrypoints.contains(&lid) {
            return Err(Error::PrivateEntry {
                file: self.file.to_string(),
                name: label_name,
                line: label_line,
            });
        }
        Ok((aid, lid))
    }

    fn branch_operands(&mut self, i: &mut usize) -> Result<(usize, usize)> {
        let yes = self.label_operand(i)?;
        let no = self.label_operand(i)?;
        Ok((yes, no))
    }

    /// Collect the block lines following an `info`/`autoprompt`, stripping
    /// the first line's indentation from every line.
    fn text_block(&mut self, i: &mut usize, stmt_line: usize) -> Result<String> {
        let mut lines = Vec::new();
        while let Some(tok) = self.tokens.get(*i) {
            if tok.kind != TokenKind::TextBlockLine {
                break;
            }
            lines.push(tok.text(self.source));
            *i += 1;
        }

        let indent = lines
            .first()
            .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
            .unwrap_or(0);

        let mut text = String::new();
        for line in lines {
            let strip = line
                .char_indices()
                .take_while(|&(pos, ch)| pos < indent && (ch == ' ' || ch == '\t'))
                .count();
            text.push_str(&line[strip..]);
        }

        if text.chars().all(char::is_whitespace) {
            return Err(Error::EmptyTextBlock {
                file: self.file.to_string(),
                line: stmt_line,
            });
        }
        Ok(text)
    }

    /// Collect the action tokens of one `action` list, parsing pre-bound
    /// argument JSON and validating each action against the command schema.
    fn action_list(&mut self, i: &mut usize, is_user: bool) -> Result<Vec<ActionData>> {
        let mut actions: Vec<ActionData> = Vec::new();

        while let Some(&tok) = self.tokens.get(*i) {
            match tok.kind {
                TokenKind::ActionIdentifier | TokenKind::FinalActionIdentifier => {
                    *i += 1;
                    let name = ident_name(self.source, &tok, self.ident);
                    let data = ActionData::new(name);
                    self.finish_action(&mut actions, data, tok.line, is_user)?;
                }
                TokenKind::ActionIdentifierWithArgs => {
                    *i += 1;
                    let name = ident_name(self.source, &tok, self.ident);
                    let mut data = ActionData::new(name);
                    self.argument_run(i, &mut data.args)?;
                    self.finish_action(&mut actions, data, tok.line, is_user)?;
                }
                _ => break,
            }
        }

        Ok(actions)
    }

    fn argument_run(
        &mut self,
        i: &mut usize,
        args: &mut Map<String, serde_json::Value>,
    ) -> Result<()> {
        while let Some(&name_tok) = self.tokens.get(*i) {
            if name_tok.kind != TokenKind::ActionArgName {
                break;
            }
            let Some(&content_tok) = self.tokens.get(*i + 1) else {
                break;
            };
            *i += 2;

            let key = ident_name(self.source, &name_tok, self.ident);
            let raw = content_tok.text(self.source).trim();
            let value = serde_json::from_str(raw).map_err(|_| Error::InvalidArgJson {
                file: self.file.to_string(),
                arg: key.clone(),
                line: content_tok.line,
            })?;
            args.insert(key, value);
        }
        Ok(())
    }

    /// Apply the duplicate rule and the schema validation, then keep the
    /// action. Agent actions may leave declared arguments unbound; operator
    /// actions must satisfy every declared property.
    fn finish_action(
        &mut self,
        actions: &mut Vec<ActionData>,
        data: ActionData,
        line: usize,
        is_user: bool,
    ) -> Result<()> {
        if !is_user && actions.iter().any(|a| a.name == data.name) {
            return Err(Error::DuplicateAction {
                file: self.file.to_string(),
                name: data.name,
                line,
            });
        }

        let Some(declaration) = self.commands.declaration(&data.name) else {
            return Err(Error::InvalidAction {
                file: self.file.to_string(),
                action: data.name,
                line,
                reason: "Command does not exist".to_string(),
            });
        };

        let result = validate::validate_arguments(&data.args, declaration)?;
        for (arg, status) in result {
            let ok = match status.valid {
                Some(true) => true,
                Some(false) => !is_user && !status.exists,
                None => false,
            };
            if !ok {
                return Err(Error::invalid_argument(self.file, &data.name, line, &arg));
            }
        }

        actions.push(data);
        Ok(())
    }
}
