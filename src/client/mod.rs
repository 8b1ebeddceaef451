//! Client for the cluster's HTTP file interface.
//!
//! # Responsibilities
//! - Build the shared `reqwest` client with the configured timeouts
//! - List directories through `/.cbfs/list/`
//! - Upload and delete individual files
//!
//! File URLs are used as given; listing URLs are derived from them by
//! moving the path under `/.cbfs/list/`.

pub mod listing;

use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

pub use listing::{DirInfo, FileMeta, ListResult};

/// Header asking the cluster to keep a number of old revisions.
pub const KEEP_REVS_HEADER: &str = "X-CBFS-KeepRevs";

/// Depth used for recursive listings.
pub const RECURSIVE_DEPTH: u32 = 4096;

/// Errors from file operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url}: not found")]
    NotFound { url: String },

    #[error("{url}: HTTP error: {status}: {body}")]
    Status {
        url: String,
        status: String,
        body: String,
    },

    #[error("Error parsing listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Build the HTTP client shared by the file commands and the HTTP transport.
pub fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .user_agent(concat!("cbfsclient/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Parse a user-supplied file URL.
pub fn parse_url(input: &str) -> Result<Url, StoreError> {
    let url = Url::parse(input).map_err(|e| StoreError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(StoreError::InvalidUrl {
            url: input.to_string(),
            reason: "expected http://host:port/path".to_string(),
        });
    }
    Ok(url)
}

/// The listing URL for the path named by `target`.
pub fn list_url(target: &Url, depth: Option<u32>) -> Url {
    let mut url = target.clone();
    let path = target.path().trim_start_matches('/').to_string();
    url.set_path(&format!("/.cbfs/list/{}", path));
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("includeMeta", "true");
        if let Some(depth) = depth {
            query.append_pair("depth", &depth.to_string());
        }
    }
    url
}

/// The URL of `relative` (slash-separated) below the directory `base`.
pub fn child_url(base: &Url, relative: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(relative.split('/').filter(|s| !s.is_empty()));
    }
    url
}

/// Handle on the cluster's file API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: Client,
    /// Old revisions to keep on upload; 0 sends no header, -1 keeps all.
    keep_revs: i32,
}

impl StoreClient {
    pub fn new(http: Client, keep_revs: i32) -> Self {
        Self { http, keep_revs }
    }

    /// List the directory at `target`.
    pub async fn list(&self, target: &Url, depth: Option<u32>) -> Result<ListResult, StoreError> {
        let url = list_url(target, depth);
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ListResult::empty(target.path()));
        }
        let body = res.bytes().await?;
        if !status.is_success() {
            return Err(status_error(&url, status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Delete one file.
    pub async fn delete(&self, target: &Url) -> Result<(), StoreError> {
        let res = self.http.delete(target.clone()).send().await?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                url: target.to_string(),
            });
        }
        if !status.is_success() {
            let body = res.bytes().await.unwrap_or_default();
            return Err(status_error(target, status, &body));
        }
        Ok(())
    }

    /// Upload a local file to `target`.
    pub async fn put_file(&self, path: &Path, target: &Url) -> Result<u64, StoreError> {
        let data = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let len = data.len() as u64;

        let mut req = self
            .http
            .put(target.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data);
        if self.keep_revs != 0 {
            req = req.header(KEEP_REVS_HEADER, self.keep_revs.to_string());
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.bytes().await.unwrap_or_default();
            return Err(status_error(target, status, &body));
        }
        Ok(len)
    }
}

fn status_error(url: &Url, status: StatusCode, body: &[u8]) -> StoreError {
    StoreError::Status {
        url: url.to_string(),
        status: status.to_string(),
        body: String::from_utf8_lossy(body).trim().to_string(),
    }
}
