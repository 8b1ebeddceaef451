//! Command registry and argument-count dispatch.
//!
//! # Responsibilities
//! - Map command names to a handler, an arity and a usage hint
//! - Resolve the first argument to a command and check the rest against
//!   its arity before anything runs
//! - Render the usage listing, sorted by command name

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Expected number of arguments after the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    /// Decode the signed form: `n >= 0` is exact, `n < 0` is a minimum of `-n`.
    pub fn from_signed(n: i32) -> Self {
        if n < 0 {
            Arity::AtLeast(n.unsigned_abs() as usize)
        } else {
            Arity::Exact(n as usize)
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Reasons an invocation is rejected before any handler runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("No command given")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Incorrect arguments for {command}: expected {expected}, got {got}")]
    WrongArity {
        command: String,
        expected: Arity,
        got: usize,
    },
}

/// A registered command.
#[derive(Debug, Clone)]
pub struct CommandSpec<H> {
    pub arity: Arity,
    pub handler: H,
    pub usage: &'static str,
}

/// A validated invocation, ready to run.
#[derive(Debug)]
pub struct Invocation<'r, 'a, H> {
    pub name: &'static str,
    pub handler: &'r H,
    pub args: &'a [String],
}

/// Name → command table.
#[derive(Debug, Clone)]
pub struct Registry<H> {
    commands: BTreeMap<&'static str, CommandSpec<H>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, replacing any previous one with the same name.
    pub fn register(
        mut self,
        name: &'static str,
        arity: Arity,
        handler: H,
        usage: &'static str,
    ) -> Self {
        self.commands.insert(
            name,
            CommandSpec {
                arity,
                handler,
                usage,
            },
        );
        self
    }

    /// Resolve `args[0]` and check the remaining count against its arity.
    pub fn dispatch<'r, 'a>(
        &'r self,
        args: &'a [String],
    ) -> Result<Invocation<'r, 'a, H>, UsageError> {
        let (name, rest) = args.split_first().ok_or(UsageError::MissingCommand)?;
        let (&name, spec) = self
            .commands
            .get_key_value(name.as_str())
            .ok_or_else(|| UsageError::UnknownCommand(name.clone()))?;

        if !spec.arity.accepts(rest.len()) {
            return Err(UsageError::WrongArity {
                command: name.to_string(),
                expected: spec.arity,
                got: rest.len(),
            });
        }

        tracing::debug!(command = name, args = rest.len(), "Dispatching");
        Ok(Invocation {
            name,
            handler: &spec.handler,
            args: rest,
        })
    }

    /// Usage text listing every command with its argument hint.
    pub fn usage(&self, program: &str) -> String {
        let mut out = format!("Usage of {} [-flags] cmd cmdargs\n\nCommands:\n", program);
        for (name, spec) in &self.commands {
            out.push_str(&format!("  {} {}\n", name, spec.usage));
        }
        out
    }
}
