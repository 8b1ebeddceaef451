//! Configuration reached through the cluster's HTTP interface.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::cluster::ClusterConfig;
use crate::transport::{ConfigTransport, TransportError};

/// Path of the configuration resource on every cluster node.
pub const CONFIG_PATH: &str = "/.cbfs/config/";

/// Build the configuration resource URL from a cluster base URL.
///
/// Scheme, host and port are kept; the path is replaced.
pub fn config_url(base: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(base).map_err(|e| TransportError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidUrl {
            url: base.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }
    url.set_path(CONFIG_PATH);
    Ok(url)
}

/// Transport using `GET`/`PUT` on [`CONFIG_PATH`].
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    url: Url,
}

impl HttpStore {
    pub fn new(client: Client, base: &str) -> Result<Self, TransportError> {
        Ok(Self {
            client,
            url: config_url(base)?,
        })
    }
}

#[async_trait]
impl ConfigTransport for HttpStore {
    fn location(&self) -> String {
        self.url.to_string()
    }

    async fn retrieve(&self) -> Result<ClusterConfig, TransportError> {
        let res = self.client.get(self.url.clone()).send().await?;
        let status = res.status();
        let body = res.bytes().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.to_string(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        Ok(ClusterConfig::from_json(&body)?)
    }

    async fn store(&self, config: &ClusterConfig) -> Result<(), TransportError> {
        let data = config.to_json()?;
        let res = self
            .client
            .put(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(data)
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::NO_CONTENT {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(url = %self.url, status = %status, "Config update rejected");
            return Err(TransportError::Status {
                status: status.to_string(),
                body: body.trim().to_string(),
            });
        }

        tracing::debug!(url = %self.url, "Stored configuration");
        Ok(())
    }
}
