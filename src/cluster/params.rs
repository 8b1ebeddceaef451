//! Named parameters of the cluster configuration and validated mutation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cluster::document::ClusterConfig;
use crate::cluster::duration;

/// Errors from [`ClusterConfig::set_parameter`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// The key is not a known parameter.
    #[error("Unhandled property: {key} (try running getconf)")]
    Unknown { key: String },

    /// The value does not parse as the parameter's type.
    #[error("Bad value {value:?} for {key}: {reason}")]
    BadValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Every settable parameter of [`ClusterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    GcFreq,
    GcLimit,
    Hash,
    HeartbeatFreq,
    MinReplicas,
    MaxReplicas,
    NodeCleanCount,
    ReconcileFreq,
    StaleNodeCheckFreq,
    StaleNodeLimit,
    UnderReplicaCheckFreq,
    OverReplicaCheckFreq,
}

impl Param {
    pub const ALL: [Param; 12] = [
        Param::GcFreq,
        Param::GcLimit,
        Param::Hash,
        Param::HeartbeatFreq,
        Param::MinReplicas,
        Param::MaxReplicas,
        Param::NodeCleanCount,
        Param::ReconcileFreq,
        Param::StaleNodeCheckFreq,
        Param::StaleNodeLimit,
        Param::UnderReplicaCheckFreq,
        Param::OverReplicaCheckFreq,
    ];

    /// The key used by `setconf` and on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Param::GcFreq => "gcfreq",
            Param::GcLimit => "gclimit",
            Param::Hash => "hash",
            Param::HeartbeatFreq => "hbfreq",
            Param::MinReplicas => "minrepl",
            Param::MaxReplicas => "maxrepl",
            Param::NodeCleanCount => "cleanCount",
            Param::ReconcileFreq => "reconcileFreq",
            Param::StaleNodeCheckFreq => "nodeCheckFreq",
            Param::StaleNodeLimit => "staleLimit",
            Param::UnderReplicaCheckFreq => "underReplicaCheckFreq",
            Param::OverReplicaCheckFreq => "overReplicaCheckFreq",
        }
    }

    /// All parameters ordered by key.
    pub fn sorted() -> Vec<Param> {
        let mut params = Param::ALL.to_vec();
        params.sort_by_key(|p| p.key());
        params
    }

    fn parse_duration(self, value: &str) -> Result<Duration, ParamError> {
        duration::parse(value).map_err(|e| self.bad_value(value, e))
    }

    fn parse_int(self, value: &str) -> Result<i64, ParamError> {
        value.parse::<i64>().map_err(|e| self.bad_value(value, e))
    }

    fn bad_value(self, value: &str, reason: impl fmt::Display) -> ParamError {
        ParamError::BadValue {
            key: self.key(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Param {
    type Err = ParamError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .into_iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| ParamError::Unknown { key: key.to_string() })
    }
}

impl ClusterConfig {
    /// Set one parameter from its string form.
    ///
    /// The value is fully parsed before the field is written, so on error
    /// the document is left untouched.
    pub fn set_parameter(&mut self, key: &str, value: &str) -> Result<Param, ParamError> {
        let param: Param = key.parse()?;
        self.set(param, value)?;
        Ok(param)
    }

    /// Set an already-resolved parameter from its string form.
    pub fn set(&mut self, param: Param, value: &str) -> Result<(), ParamError> {
        match param {
            Param::GcFreq => self.gc_freq = param.parse_duration(value)?,
            Param::GcLimit => self.gc_limit = param.parse_int(value)?,
            Param::Hash => self.hash = value.to_string(),
            Param::HeartbeatFreq => self.heartbeat_freq = param.parse_duration(value)?,
            Param::MinReplicas => self.min_replicas = param.parse_int(value)?,
            Param::MaxReplicas => self.max_replicas = param.parse_int(value)?,
            Param::NodeCleanCount => self.node_clean_count = param.parse_int(value)?,
            Param::ReconcileFreq => self.reconcile_freq = param.parse_duration(value)?,
            Param::StaleNodeCheckFreq => self.stale_node_check_freq = param.parse_duration(value)?,
            Param::StaleNodeLimit => self.stale_node_limit = param.parse_duration(value)?,
            Param::UnderReplicaCheckFreq => {
                self.under_replica_check_freq = param.parse_duration(value)?
            }
            Param::OverReplicaCheckFreq => {
                self.over_replica_check_freq = param.parse_duration(value)?
            }
        }
        Ok(())
    }

    /// Current value of a parameter, formatted the way `setconf` accepts it.
    pub fn display_value(&self, param: Param) -> String {
        match param {
            Param::GcFreq => duration::format(self.gc_freq),
            Param::GcLimit => self.gc_limit.to_string(),
            Param::Hash => self.hash.clone(),
            Param::HeartbeatFreq => duration::format(self.heartbeat_freq),
            Param::MinReplicas => self.min_replicas.to_string(),
            Param::MaxReplicas => self.max_replicas.to_string(),
            Param::NodeCleanCount => self.node_clean_count.to_string(),
            Param::ReconcileFreq => duration::format(self.reconcile_freq),
            Param::StaleNodeCheckFreq => duration::format(self.stale_node_check_freq),
            Param::StaleNodeLimit => duration::format(self.stale_node_limit),
            Param::UnderReplicaCheckFreq => duration::format(self.under_replica_check_freq),
            Param::OverReplicaCheckFreq => duration::format(self.over_replica_check_freq),
        }
    }
}
