//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured `tracing` events everywhere; no `println!` diagnostics
//! - Diagnostics go to stderr so stdout carries only command output

pub mod logging;
