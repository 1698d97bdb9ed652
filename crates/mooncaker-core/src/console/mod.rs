//! Operator console: a fixed command table shared by the HTTP admin API and the chat bot.
//!
//! Lines are split on whitespace; the first token selects the command (case-insensitive),
//! the rest are positional arguments checked against the command's arity before dispatch.
use std::{fs, path::PathBuf, sync::Arc};

use mooncaker_model::{ApiKey, ModelError};
use thiserror::Error;
use tracing::{debug, info};

use crate::key::{KeyError, KeySink};

/// Default number of log lines returned by `get-log`.
pub const DEFAULT_LOG_LINES: usize = 200;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("wrong number of arguments, usage: {usage}")]
    Arity { command: &'static str, usage: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid key: {0}")]
    InvalidKey(#[from] ModelError),

    #[error("key update failed: {0}")]
    Key(#[from] KeyError),

    #[error("log file is not configured")]
    LogUnavailable,

    #[error("failed to read log: {0}")]
    Io(String),
}

type Handler = fn(&Console, &[&str]) -> Result<String, CommandError>;

/// Entry of the dispatch table.
pub struct CommandSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub usage: &'static str,
    pub about: &'static str,
    handler: Handler,
}

impl CommandSpec {
    fn accepts(&self, n: usize) -> bool {
        (self.min_args..=self.max_args).contains(&n)
    }
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "set-api-key",
        min_args: 1,
        max_args: 1,
        usage: "set-api-key <key>",
        about: "replace the crawler api key",
        handler: cmd_set_api_key,
    },
    CommandSpec {
        name: "get-log",
        min_args: 0,
        max_args: 1,
        usage: "get-log [lines]",
        about: "show the last lines of the server log",
        handler: cmd_get_log,
    },
    CommandSpec {
        name: "status",
        min_args: 0,
        max_args: 0,
        usage: "status",
        about: "show whether an api key is present",
        handler: cmd_status,
    },
    CommandSpec {
        name: "help",
        min_args: 0,
        max_args: 0,
        usage: "help",
        about: "list available commands",
        handler: cmd_help,
    },
];

/// Command executor bound to a key sink and an optional log file.
#[derive(Clone)]
pub struct Console {
    sink: Arc<dyn KeySink>,
    log_file: Option<PathBuf>,
}

impl Console {
    pub fn new(sink: Arc<dyn KeySink>) -> Self {
        Self {
            sink,
            log_file: None,
        }
    }

    /// Enable `get-log` against the given file.
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Same console, different key sink.
    pub fn with_sink(&self, sink: Arc<dyn KeySink>) -> Self {
        Self {
            sink,
            log_file: self.log_file.clone(),
        }
    }

    pub fn commands() -> &'static [CommandSpec] {
        COMMANDS
    }

    pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
        COMMANDS.iter().find(|c| c.name == name)
    }

    /// Parse and run one command line.
    pub fn execute(&self, line: &str) -> Result<String, CommandError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(CommandError::Empty)?.to_lowercase();
        let args: Vec<&str> = tokens.collect();

        let spec = Self::lookup(&name).ok_or_else(|| CommandError::Unknown(name.clone()))?;
        if !spec.accepts(args.len()) {
            return Err(CommandError::Arity {
                command: spec.name,
                usage: spec.usage,
            });
        }

        debug!(command = spec.name, args = args.len(), "console command");
        (spec.handler)(self, &args)
    }

    pub fn help(&self) -> String {
        let mut out = String::from("Currently available commands are:");
        for c in COMMANDS {
            out.push_str(&format!("\n  {:<20} {}", c.usage, c.about));
        }
        out
    }
}

fn cmd_set_api_key(console: &Console, args: &[&str]) -> Result<String, CommandError> {
    let key = ApiKey::new(args[0])?;
    info!(key = %key, "new api key received from console");
    console.sink.set_key(key)?;
    Ok("New API key set correctly".to_string())
}

fn cmd_get_log(console: &Console, args: &[&str]) -> Result<String, CommandError> {
    let lines = match args.first() {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{raw}' is not a line count")))?,
        None => DEFAULT_LOG_LINES,
    };
    let path = console.log_file.as_ref().ok_or(CommandError::LogUnavailable)?;
    let content = fs::read_to_string(path).map_err(|e| CommandError::Io(e.to_string()))?;
    Ok(tail(&content, lines))
}

fn cmd_status(console: &Console, _args: &[&str]) -> Result<String, CommandError> {
    Ok(match console.sink.peek() {
        Some(key) => format!("api key present: {key}"),
        None => "no api key set; the crawler may be waiting for one".to_string(),
    })
}

fn cmd_help(console: &Console, _args: &[&str]) -> Result<String, CommandError> {
    Ok(console.help())
}

fn tail(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
