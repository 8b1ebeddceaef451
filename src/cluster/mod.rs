//! Cluster configuration document.
//!
//! # Data Flow
//! ```text
//! ClusterConfig::default()
//!     → transport retrieve (overwrites the local copy)
//!     → params.rs set_parameter (setconf only, at most once)
//!     → transport store / document.rs dump
//! ```
//!
//! # Design Decisions
//! - The parameter table is a closed enum; lookups are exhaustive matches
//! - Values are parsed before assignment, so a failed set never mutates
//! - Durations are nanoseconds on the wire and human-readable on the CLI

pub mod document;
pub mod duration;
pub mod params;

pub use document::ClusterConfig;
pub use params::{Param, ParamError};
