//! Command parsing
//!
//! Turns one input line into a [`Command`]. Arguments are split with shell
//! quoting rules, so `info "%i: %o\n"` passes the template as a single
//! argument.

use std::io;
use thiserror::Error;
use trace_reader::ReaderError;

/// Errors reported for a single command; the session carries on after them
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("can't split arguments: {0}")]
    Tokenize(#[from] shell_words::ParseError),

    #[error("Command {0} not found")]
    NotFound(String),

    #[error("{command} takes {expected} args, got {got}")]
    Arity {
        command: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("can't serialize counts: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// Start offset and length for listing commands
///
/// Missing values fall back to the current IP and the configured count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<u64>,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Step,
    Continue,
    Finish,
    Counts { json: bool },
    Breakpoints,
    Break(u64),
    Delete(u64),
    Jump(u64),
    Reset,
    Disassemble(Window),
    Raw(Window),
    Hex(Window),
    Info(Option<String>),
    Prompt(String),
    Help,
    Quit,
}

/// Name, aliases and usage of every command, for `help`
pub const COMMANDS: &[(&str, &str)] = &[
    ("s, step", "step one instruction"),
    ("c, continue", "run to the next breakpoint or the end of the trace"),
    ("f, finish", "run to the next RET"),
    ("b, break <ip>", "set a breakpoint"),
    ("d, delete <ip>", "clear a breakpoint"),
    ("bps", "list breakpoints"),
    ("j, jump <ip>", "move the instruction pointer"),
    ("reset", "back to offset 0, clearing breakpoints and counts"),
    ("counts [json]", "show per-opcode hit counts"),
    ("dis [[ip] count]", "disassemble instructions"),
    ("raw [[ip] count]", "dump raw bytes in decimal"),
    ("hex [[ip] count]", "dump raw bytes in hexadecimal"),
    ("info [template]", "show or set the info template"),
    ("prompt <template>", "set the prompt template"),
    ("help", "show this list"),
    ("q, quit", "leave the reader"),
];

impl Command {
    /// Parse a line; `Ok(None)` for a line with no command in it
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let words = shell_words::split(line)?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match name.as_str() {
            "s" | "step" => no_args("step", args, Command::Step)?,
            "c" | "continue" => no_args("continue", args, Command::Continue)?,
            "f" | "finish" => no_args("finish", args, Command::Finish)?,
            "bps" => no_args("bps", args, Command::Breakpoints)?,
            "reset" => no_args("reset", args, Command::Reset)?,
            "help" => no_args("help", args, Command::Help)?,
            "q" | "quit" => no_args("quit", args, Command::Quit)?,
            "counts" => match args {
                [] => Command::Counts { json: false },
                [format] if format == "json" => Command::Counts { json: true },
                [other] => {
                    return Err(CommandError::InvalidArgument {
                        what: "format",
                        value: other.clone(),
                    })
                }
                _ => return Err(arity("counts", "0 or 1", args)),
            },
            "b" | "break" => Command::Break(offset_arg("break", args)?),
            "d" | "delete" => Command::Delete(offset_arg("delete", args)?),
            "j" | "jump" => Command::Jump(offset_arg("jump", args)?),
            "dis" => Command::Disassemble(window("disassemble", args)?),
            "raw" => Command::Raw(window("raw", args)?),
            "hex" => Command::Hex(window("hex", args)?),
            "info" => match args {
                [] => Command::Info(None),
                [template] => Command::Info(Some(template.clone())),
                _ => return Err(arity("info", "0 or 1", args)),
            },
            "prompt" => match args {
                [template] => Command::Prompt(template.clone()),
                _ => return Err(arity("prompt", "1", args)),
            },
            other => return Err(CommandError::NotFound(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn no_args(command: &'static str, args: &[String], parsed: Command) -> Result<Command, CommandError> {
    if args.is_empty() {
        Ok(parsed)
    } else {
        Err(arity(command, "no", args))
    }
}

fn offset_arg(command: &'static str, args: &[String]) -> Result<u64, CommandError> {
    match args {
        [ip] => number("ip", ip),
        _ => Err(arity(command, "1", args)),
    }
}

fn window(command: &'static str, args: &[String]) -> Result<Window, CommandError> {
    match args {
        [] => Ok(Window::default()),
        [count] => Ok(Window {
            start: None,
            count: Some(number("count", count)?),
        }),
        [ip, count] => Ok(Window {
            start: Some(number("ip", ip)?),
            count: Some(number("count", count)?),
        }),
        _ => Err(arity(command, "0, 1, or 2", args)),
    }
}

fn number(what: &'static str, value: &str) -> Result<u64, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        what,
        value: value.to_string(),
    })
}

fn arity(command: &'static str, expected: &'static str, args: &[String]) -> CommandError {
    CommandError::Arity {
        command,
        expected,
        got: args.len(),
    }
}
