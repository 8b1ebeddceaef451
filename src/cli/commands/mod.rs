//! Command handlers.
//!
//! # Data Flow
//! ```text
//! registry() resolves argv[0] → CommandKind (arity already checked)
//!     → execute()
//!         - conf.rs:   getconf, setconf (ConfigTransport)
//!         - ls.rs:     directory listing (StoreClient)
//!         - rm.rs:     deletes, optionally recursive
//!         - upload.rs: file and directory uploads
//! ```

pub mod conf;
pub mod ls;
pub mod rm;
pub mod upload;

use std::io::Write;

use thiserror::Error;

use crate::cli::context::Context;
use crate::cli::registry::{Arity, Registry, UsageError};
use crate::client::StoreError;
use crate::cluster::ParamError;
use crate::transport::TransportError;

/// The closed set of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Upload,
    Ls,
    Rm,
    GetConf,
    SetConf,
}

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("{0}")]
    Options(#[from] clap::Error),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Error scanning local files: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Error writing output: {0}")]
    Output(#[from] std::io::Error),

    #[error("{failed} of {total} {operation} failed")]
    Incomplete {
        operation: &'static str,
        failed: usize,
        total: usize,
    },
}

/// The command table of this client.
pub fn registry() -> Registry<CommandKind> {
    Registry::new()
        .register(
            "upload",
            Arity::from_signed(-2),
            CommandKind::Upload,
            "[opts] /src/dir http://cbfs:8484/path/",
        )
        .register("ls", Arity::from_signed(1), CommandKind::Ls, "http://cbfs:8484/some/path")
        .register(
            "rm",
            Arity::from_signed(-1),
            CommandKind::Rm,
            "[-r] [-v] http://cbfs:8484/some/path",
        )
        .register("getconf", Arity::from_signed(0), CommandKind::GetConf, "")
        .register("setconf", Arity::from_signed(2), CommandKind::SetConf, "prop value")
}

/// Run a validated command, writing its output to `out`.
pub async fn execute<W: Write>(
    kind: CommandKind,
    ctx: &Context,
    args: &[String],
    out: &mut W,
) -> Result<(), CommandError> {
    match kind {
        CommandKind::Upload => upload::run(ctx, args, out).await,
        CommandKind::Ls => ls::run(ctx, args, out).await,
        CommandKind::Rm => rm::run(ctx, args, out).await,
        CommandKind::GetConf => conf::getconf(ctx, out).await,
        CommandKind::SetConf => conf::setconf(ctx, args).await,
    }
}

/// Guard for handlers that destructure their arguments.
fn wrong_arity(command: &str, expected: Arity, args: &[String]) -> CommandError {
    CommandError::Usage(UsageError::WrongArity {
        command: command.to_string(),
        expected,
        got: args.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_registry_arities() {
        let reg = registry();
        let cases = vec![
            (vec!["getconf"], true),
            (vec!["getconf", "extra"], false),
            (vec!["setconf", "gcfreq"], false),
            (vec!["setconf", "gcfreq", "10m"], true),
            (vec!["setconf", "gcfreq", "10m", "x"], false),
            (vec!["ls"], false),
            (vec!["ls", "http://x/"], true),
            (vec!["rm"], false),
            (vec!["rm", "-r", "-v", "http://x/y"], true),
            (vec!["upload", "/src"], false),
            (vec!["upload", "-v", "/src", "http://x/"], true),
        ];
        for (args, ok) in cases {
            assert_eq!(reg.dispatch(&argv(&args)).is_ok(), ok, "{:?}", args);
        }
    }

    #[test]
    fn test_registry_resolves_kinds() {
        let reg = registry();
        let args = argv(&["setconf", "hash", "sha256"]);
        let inv = reg.dispatch(&args).unwrap();
        assert_eq!(*inv.handler, CommandKind::SetConf);

        let usage = reg.usage("cbfsclient");
        let commands: Vec<_> = usage
            .lines()
            .skip_while(|l| *l != "Commands:")
            .skip(1)
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(commands, vec!["getconf", "ls", "rm", "setconf", "upload"]);
    }
}
