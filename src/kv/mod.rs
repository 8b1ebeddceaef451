//! Key/value backing store access.
//!
//! # Data Flow
//! ```text
//! DirectStore (transport/direct.rs)
//!     → KvBackend::get / KvBackend::set
//!         - memcached.rs (binary protocol to a couchbase or memcached node)
//!         - memory.rs (process-local map)
//!
//! http(s) endpoint
//!     → vbmap.rs: GET /pools/default/buckets/<bucket>
//!     → data node owning the key's vbucket
//! ```
//!
//! # Design Decisions
//! - A missing key is `Ok(None)`, never an error
//! - Backends own their connection; callers share them through `Arc`
//! - A connection that failed mid-exchange is never reused

pub mod memcached;
pub mod memory;
pub mod vbmap;

use async_trait::async_trait;
use thiserror::Error;

pub use memcached::MemcachedBackend;
pub use memory::MemoryBackend;

/// Errors from a backing store.
#[derive(Debug, Error)]
pub enum KvError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connect or round trip exceeded its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
    },

    /// Malformed frame from the server.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server answered with a non-success status.
    #[error("Server returned status 0x{status:04x} ({message}) for {operation}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The node does not own the key's vbucket.
    #[error(
        "vbucket {vbucket} is served by another node; \
         use the cluster's http:// admin URL so the vbucket map is consulted"
    )]
    WrongNode { vbucket: u16 },

    /// An earlier request on this connection failed part way through.
    #[error("Connection to backing store is no longer usable after an earlier failure")]
    Closed,

    /// The cluster's vbucket map could not be fetched or used.
    #[error("Cluster map error: {0}")]
    ClusterMap(String),

    /// Admin REST request failed.
    #[error("Cluster map request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// SASL authentication was refused.
    #[error("Authentication failed for user {0}")]
    Auth(String),

    /// The endpoint URL cannot be used.
    #[error("Invalid backing store endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },
}

/// Minimal key/value operations needed to hold the configuration document.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Fetch a value. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Unconditionally write a value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;
}
