//! Command-line tokenizing and pipeline parsing.
//!
//! A line is split into quote-aware words and operator tokens, with
//! `$VAR` references expanded from the shell environment (single quotes
//! suppress expansion, double quotes keep it). The parser then groups
//! words into pipeline stages around `|`, attaches `>`/`>>`/`<`
//! redirections to the stage they appear in, and accepts one trailing
//! `&` for background launch.

use ck_protocol::{StageSink, StageSpec};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use crate::errors::{KernelError, KernelResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Pipe,
    RedirectOut { append: bool },
    RedirectIn,
    Background,
}

/// A parsed command line, ready for the pipeline orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub stages: Vec<StageSpec>,
    pub background: bool,
}

fn syntax_error(what: impl std::fmt::Display) -> KernelError {
    KernelError::invalid_argument(format!("syntax error: {what}"))
}

fn expand_var(chars: &mut Peekable<Chars<'_>>, env: &HashMap<String, String>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if name.is_empty() {
        // a lone `$` stays literal
        "$".to_string()
    } else {
        env.get(&name).cloned().unwrap_or_default()
    }
}

fn tokenize(line: &str, env: &HashMap<String, String>) -> KernelResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    let mut word = String::new();
    // distinguishes an empty quoted word ("") from no word at all
    let mut in_word = false;

    macro_rules! flush {
        () => {
            if std::mem::take(&mut in_word) {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
        };
    }

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => flush!(),
            '|' => {
                flush!();
                tokens.push(Token::Pipe);
            }
            '<' => {
                flush!();
                tokens.push(Token::RedirectIn);
            }
            '>' => {
                flush!();
                let append = chars.peek() == Some(&'>');
                if append {
                    chars.next();
                }
                tokens.push(Token::RedirectOut { append });
            }
            '&' => {
                flush!();
                tokens.push(Token::Background);
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => word.push(inner),
                        None => return Err(syntax_error("unterminated quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('$') => word.push_str(&expand_var(&mut chars, env)),
                        Some(inner) => word.push(inner),
                        None => return Err(syntax_error("unterminated quote")),
                    }
                }
            }
            '$' => {
                in_word = true;
                word.push_str(&expand_var(&mut chars, env));
            }
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    flush!();
    Ok(tokens)
}

/// Parses one command line into pipeline stages.
///
/// # Errors
///
/// `InvalidArgument` on unterminated quotes, an empty stage around `|`,
/// a redirection with no target, or tokens after a trailing `&`.
pub fn parse_line(line: &str, env: &HashMap<String, String>) -> KernelResult<ParsedLine> {
    let mut tokens = tokenize(line, env)?.into_iter().peekable();
    let mut stages: Vec<StageSpec> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut sink = StageSink::Terminal;
    let mut stdin_file: Option<String> = None;
    let mut background = false;

    macro_rules! close_stage {
        ($context:expr) => {{
            if words.is_empty() {
                return Err(syntax_error(format!(
                    "near unexpected token `{}'",
                    $context
                )));
            }
            let mut drained = words.drain(..);
            let name = drained.next().unwrap_or_default();
            let mut stage = StageSpec::new(name, drained.collect());
            stage.sink = std::mem::replace(&mut sink, StageSink::Terminal);
            stage.stdin_file = stdin_file.take();
            stages.push(stage);
        }};
    }

    while let Some(token) = tokens.next() {
        if background {
            return Err(syntax_error("tokens after `&'"));
        }
        match token {
            Token::Word(word) => words.push(word),
            Token::Pipe => close_stage!("|"),
            Token::RedirectOut { append } => match tokens.next() {
                Some(Token::Word(file)) => sink = StageSink::Redirect { file, append },
                _ => return Err(syntax_error("expected redirection target")),
            },
            Token::RedirectIn => match tokens.next() {
                Some(Token::Word(file)) => stdin_file = Some(file),
                _ => return Err(syntax_error("expected redirection target")),
            },
            Token::Background => background = true,
        }
    }

    if !words.is_empty() {
        close_stage!("&");
    } else if !stages.is_empty() || background {
        // `a |` with nothing after, or a bare `&`
        return Err(syntax_error(if background {
            "near unexpected token `&'"
        } else {
            "near unexpected token `|'"
        }));
    }

    Ok(ParsedLine { stages, background })
}
