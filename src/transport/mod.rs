//! Fetching and persisting the cluster configuration document.
//!
//! # Data Flow
//! ```text
//! getconf / setconf
//!     → ConfigTransport::retrieve
//!         - direct.rs: backing store GET of /@globalConfig
//!         - http.rs:   GET <base>/.cbfs/config/
//!     → (setconf) ClusterConfig::set_parameter
//!     → ConfigTransport::store
//!         - direct.rs: backing store SET of /@globalConfig
//!         - http.rs:   PUT <base>/.cbfs/config/, expects 204
//! ```
//!
//! # Design Decisions
//! - One strategy is chosen at startup and handed to handlers explicitly
//! - "Not found" is its own error variant so callers can fall back to defaults
//! - Store is an unconditional overwrite. Two concurrent read-modify-write
//!   cycles can lose one update; there is no version check.

pub mod direct;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::ClusterConfig;
use crate::kv::KvError;

pub use direct::DirectStore;
pub use http::HttpStore;

/// Errors from retrieving or storing the configuration.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No configuration has been stored yet.
    #[error("configuration not found")]
    NotFound,

    /// Connection-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("HTTP error: {status}: {body}")]
    Status { status: String, body: String },

    /// The document could not be encoded or decoded.
    #[error("Error parsing config: {0}")]
    Codec(#[from] serde_json::Error),

    /// Backing store failure.
    #[error("Backing store error: {0}")]
    Kv(#[from] KvError),

    /// The cluster base URL cannot be used.
    #[error("Invalid cluster URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A strategy for reaching the remote configuration document.
#[async_trait]
pub trait ConfigTransport: Send + Sync {
    /// Human-readable description of where the document lives.
    fn location(&self) -> String;

    /// Fetch the current document.
    async fn retrieve(&self) -> Result<ClusterConfig, TransportError>;

    /// Persist `config`, replacing whatever is stored.
    async fn store(&self, config: &ClusterConfig) -> Result<(), TransportError>;
}

/// Retrieve the document, substituting the defaults when none exists yet.
pub async fn retrieve_or_default(
    transport: &dyn ConfigTransport,
) -> Result<ClusterConfig, TransportError> {
    match transport.retrieve().await {
        Ok(config) => Ok(config),
        Err(TransportError::NotFound) => {
            tracing::warn!(
                location = %transport.location(),
                "No stored configuration, using defaults"
            );
            Ok(ClusterConfig::default())
        }
        Err(e) => Err(e),
    }
}
