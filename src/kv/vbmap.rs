//! Couchbase vbucket map lookup.
//!
//! A couchbase bucket is split into vbuckets, each owned by one data node.
//! The admin REST API publishes the assignment under
//! `/pools/default/buckets/<bucket>`:
//!
//! ```text
//! "vBucketServerMap": {
//!     "hashAlgorithm": "CRC",
//!     "serverList": ["10.0.0.1:11210", "10.0.0.2:11210"],
//!     "vBucketMap": [[0, 1], [1, 0], ...]   // [active, replica...] per vbucket
//! }
//! ```

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::kv::memcached::{vbucket_for, COUCHBASE_DATA_PORT};
use crate::kv::KvError;

#[derive(Debug, Deserialize)]
struct BucketInfo {
    #[serde(rename = "vBucketServerMap")]
    server_map: VBucketServerMap,
}

/// The `vBucketServerMap` section of a bucket description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VBucketServerMap {
    #[serde(default)]
    pub hash_algorithm: String,
    pub server_list: Vec<String>,
    pub v_bucket_map: Vec<Vec<i32>>,
}

impl VBucketServerMap {
    /// Fetch the map of `bucket` from the cluster admin URL.
    pub async fn fetch(
        http: &Client,
        admin: &Url,
        bucket: &str,
        credentials: Option<&(String, String)>,
    ) -> Result<Self, KvError> {
        let mut url = admin.clone();
        url.set_query(None);
        url.set_path("/pools/default/buckets/");
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(bucket);
        }

        let mut req = http.get(url.clone());
        if let Some((user, password)) = credentials {
            req = req.basic_auth(user, Some(password));
        }
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(KvError::ClusterMap(format!("{} returned {}", url, status)));
        }

        let body = res.bytes().await?;
        let info: BucketInfo = serde_json::from_slice(&body)
            .map_err(|e| KvError::ClusterMap(format!("bad bucket description: {}", e)))?;
        tracing::debug!(
            url = %url,
            servers = info.server_map.server_list.len(),
            vbuckets = info.server_map.v_bucket_map.len(),
            "Fetched vbucket map"
        );
        Ok(info.server_map)
    }

    pub fn num_vbuckets(&self) -> Result<u16, KvError> {
        match u16::try_from(self.v_bucket_map.len()) {
            Ok(0) | Err(_) => Err(KvError::ClusterMap(format!(
                "unusable vbucket count {}",
                self.v_bucket_map.len()
            ))),
            Ok(n) => Ok(n),
        }
    }

    /// Host and data port of the node holding the active copy of `key`.
    pub fn master_for(&self, key: &str) -> Result<(String, u16), KvError> {
        if !self.hash_algorithm.is_empty() && !self.hash_algorithm.eq_ignore_ascii_case("crc") {
            return Err(KvError::ClusterMap(format!(
                "unsupported hash algorithm {:?}",
                self.hash_algorithm
            )));
        }

        let vbucket = vbucket_for(key, self.num_vbuckets()?);
        let master = self
            .v_bucket_map
            .get(vbucket as usize)
            .and_then(|chain| chain.first())
            .copied()
            .unwrap_or(-1);
        let server = usize::try_from(master)
            .ok()
            .and_then(|i| self.server_list.get(i))
            .ok_or_else(|| {
                KvError::ClusterMap(format!("vbucket {} has no active node", vbucket))
            })?;

        split_host_port(server)
    }
}

fn split_host_port(server: &str) -> Result<(String, u16), KvError> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| KvError::ClusterMap(format!("bad server address {:?}", server)))?;
            Ok((host.to_string(), port))
        }
        None => Ok((server.to_string(), COUCHBASE_DATA_PORT)),
    }
}
