//! The cluster configuration document.

use std::io::{self, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::duration::nanos;
use crate::cluster::params::Param;

/// Cluster-wide operational parameters.
///
/// This is a local copy of a singleton remote resource. It lives for one
/// `getconf`/`setconf` invocation: default-constructed, overwritten by
/// whatever a transport retrieves, mutated at most once, then printed or
/// stored back.
///
/// Members missing from a retrieved document keep their default value and
/// unknown members are ignored, so clients and clusters of different
/// versions can exchange documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Interval between garbage-collection sweeps.
    #[serde(rename = "gcfreq", with = "nanos")]
    pub gc_freq: Duration,

    /// Maximum items reclaimed per sweep.
    #[serde(rename = "gclimit")]
    pub gc_limit: i64,

    /// Content-hash algorithm identifier.
    pub hash: String,

    /// Node heartbeat interval.
    #[serde(rename = "hbfreq", with = "nanos")]
    pub heartbeat_freq: Duration,

    /// Lower replication bound.
    #[serde(rename = "minrepl")]
    pub min_replicas: i64,

    /// Upper replication bound.
    #[serde(rename = "maxrepl")]
    pub max_replicas: i64,

    /// Nodes cleaned per maintenance pass.
    #[serde(rename = "cleanCount")]
    pub node_clean_count: i64,

    /// Interval between reconciliation passes.
    #[serde(rename = "reconcileFreq", with = "nanos")]
    pub reconcile_freq: Duration,

    /// Interval between node-staleness checks.
    #[serde(rename = "nodeCheckFreq", with = "nanos")]
    pub stale_node_check_freq: Duration,

    /// Age after which a silent node is considered stale.
    #[serde(rename = "staleLimit", with = "nanos")]
    pub stale_node_limit: Duration,

    /// Interval between under-replication audits.
    #[serde(rename = "underReplicaCheckFreq", with = "nanos")]
    pub under_replica_check_freq: Duration,

    /// Interval between over-replication audits.
    #[serde(rename = "overReplicaCheckFreq", with = "nanos")]
    pub over_replica_check_freq: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            gc_freq: Duration::from_secs(5 * 60),
            gc_limit: 5000,
            hash: "sha1".to_string(),
            heartbeat_freq: Duration::from_secs(5),
            min_replicas: 3,
            max_replicas: 5,
            node_clean_count: 1000,
            reconcile_freq: Duration::from_secs(24 * 60 * 60),
            stale_node_check_freq: Duration::from_secs(60),
            stale_node_limit: Duration::from_secs(10 * 60),
            under_replica_check_freq: Duration::from_secs(5 * 60),
            over_replica_check_freq: Duration::from_secs(10 * 60),
        }
    }
}

impl ClusterConfig {
    /// Decode a document from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Encode the document to its JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Write every parameter as `key: value`, one per line, sorted by key.
    pub fn dump<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        for param in Param::sorted() {
            writeln!(sink, "{}: {}", param.key(), self.display_value(param))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let conf = ClusterConfig::default();
        assert_eq!(conf.gc_freq, Duration::from_secs(300));
        assert_eq!(conf.gc_limit, 5000);
        assert_eq!(conf.hash, "sha1");
        assert_eq!(conf.min_replicas, 3);
        assert_eq!(conf.max_replicas, 5);
        assert_eq!(conf.reconcile_freq, Duration::from_secs(86_400));
    }

    #[test]
    fn test_json_round_trip() {
        let mut conf = ClusterConfig::default();
        conf.gc_freq = Duration::from_millis(1234);
        conf.hash = "sha256".into();
        conf.max_replicas = 7;

        let decoded = ClusterConfig::from_json(&conf.to_json().unwrap()).unwrap();
        assert_eq!(decoded, conf);
    }

    #[test]
    fn test_durations_are_nanoseconds_on_the_wire() {
        let value: serde_json::Value =
            serde_json::from_slice(&ClusterConfig::default().to_json().unwrap()).unwrap();
        assert_eq!(value["hbfreq"], 5_000_000_000i64);
        assert_eq!(value["gclimit"], 5000);
        assert_eq!(value["hash"], "sha1");
        assert_eq!(value.as_object().unwrap().len(), 12);
    }

    #[test]
    fn test_unknown_members_ignored() {
        let body = br#"{"gclimit": 10, "gcEnabled": true, "future": {"x": [1, 2]}}"#;
        let conf = ClusterConfig::from_json(body).unwrap();
        assert_eq!(conf.gc_limit, 10);
        assert_eq!(
            conf,
            ClusterConfig { gc_limit: 10, ..ClusterConfig::default() }
        );
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(ClusterConfig::from_json(br#"{"gcfreq": -1}"#).is_err());
    }

    #[test]
    fn test_dump_is_sorted_and_complete() {
        let mut out = Vec::new();
        ClusterConfig::default().dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 12);
        assert!(text.contains("gcfreq: 5m\n"));
        assert!(text.contains("hash: sha1\n"));
        assert!(text.contains("cleanCount: 1000\n"));
    }
}
