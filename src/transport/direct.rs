//! Configuration stored directly in the backing key/value store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cluster::ClusterConfig;
use crate::kv::KvBackend;
use crate::transport::{ConfigTransport, TransportError};

/// Key holding the serialized configuration document.
pub const CONFIG_KEY: &str = "/@globalConfig";

/// Transport reading and writing [`CONFIG_KEY`] in a backing store.
#[derive(Clone)]
pub struct DirectStore {
    backend: Arc<dyn KvBackend>,
    label: String,
}

impl DirectStore {
    pub fn new(backend: Arc<dyn KvBackend>, label: impl Into<String>) -> Self {
        Self {
            backend,
            label: label.into(),
        }
    }
}

#[async_trait]
impl ConfigTransport for DirectStore {
    fn location(&self) -> String {
        format!("{} key {}", self.label, CONFIG_KEY)
    }

    async fn retrieve(&self) -> Result<ClusterConfig, TransportError> {
        let bytes = self
            .backend
            .get(CONFIG_KEY)
            .await?
            .ok_or(TransportError::NotFound)?;
        Ok(ClusterConfig::from_json(&bytes)?)
    }

    async fn store(&self, config: &ClusterConfig) -> Result<(), TransportError> {
        let bytes = config.to_json()?;
        self.backend.set(CONFIG_KEY, &bytes).await?;
        tracing::debug!(location = %self.location(), bytes = bytes.len(), "Stored configuration");
        Ok(())
    }
}
