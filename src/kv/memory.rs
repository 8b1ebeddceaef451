//! Process-local backing store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::kv::{KvBackend, KvError};

/// In-memory key/value store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.inner.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.inner.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
