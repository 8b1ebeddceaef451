//! Command-line client for a cbfs cluster.
//!
//! Inspects and changes the cluster-wide configuration document, either
//! directly in the backing store or over HTTP, and uploads, lists and
//! removes files through the cluster's HTTP interface.

pub mod cli;
pub mod client;
pub mod cluster;
pub mod config;
pub mod kv;
pub mod observability;
pub mod transport;

pub use cli::{Cli, Context};
pub use cluster::{ClusterConfig, Param, ParamError};
pub use config::ClientSettings;
pub use transport::{ConfigTransport, DirectStore, HttpStore, TransportError};
