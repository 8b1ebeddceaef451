//! Client settings schema.
//!
//! Every global flag has a field here. All fields have defaults so a
//! settings file only needs the values it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for one client invocation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Concurrent transfers for `upload` and `rm -r`.
    pub workers: usize,

    /// Backing store endpoint. Empty means HTTP-only mode.
    pub couchbase: String,

    /// Backing store bucket.
    pub bucket: String,

    /// Old revisions to keep on upload (-1 keeps all).
    pub revs: i32,

    /// Cluster base URL used by `getconf`/`setconf` in HTTP mode.
    pub url: String,

    /// Number of vbuckets in the couchbase bucket.
    pub vbuckets: u16,

    /// Timeout configuration.
    pub timeouts: TimeoutSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            couchbase: String::new(),
            bucket: "default".to_string(),
            revs: 0,
            url: "http://localhost:8484/".to_string(),
            vbuckets: 1024,
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl ClientSettings {
    /// Whether the configuration transport should bypass HTTP.
    pub fn uses_direct_store(&self) -> bool {
        !self.couchbase.is_empty()
    }
}

/// Network timeouts, applied to both HTTP and the backing store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Per-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

impl TimeoutSettings {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}
