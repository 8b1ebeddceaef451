//! Command-line surface.
//!
//! # Data Flow
//! ```text
//! argv
//!     → args.rs (global flags via clap, settings merge)
//!     → registry.rs (command lookup + arity check)
//!     → context.rs (HTTP client, transport selection)
//!     → commands/ (handler runs, output to stdout)
//! ```
//!
//! # Design Decisions
//! - Usage errors are detected before any connection is made
//! - Handlers receive their dependencies through `Context`, never globals
//! - Only `main` turns an error into an exit status

pub mod args;
pub mod commands;
pub mod context;
pub mod registry;

pub use args::Cli;
pub use commands::{execute, registry, CommandError, CommandKind};
pub use context::Context;
pub use registry::{Arity, Registry, UsageError};
