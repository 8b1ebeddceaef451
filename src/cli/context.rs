//! Everything a command handler needs, built once at startup.

use std::sync::Arc;

use crate::client::{build_http_client, StoreClient};
use crate::config::ClientSettings;
use crate::kv::memcached::{ConnectOptions, Endpoint};
use crate::kv::vbmap::VBucketServerMap;
use crate::kv::MemcachedBackend;
use crate::transport::direct::CONFIG_KEY;
use crate::transport::{ConfigTransport, DirectStore, HttpStore, TransportError};

/// Execution context passed explicitly to every handler.
pub struct Context {
    pub settings: ClientSettings,
    pub transport: Box<dyn ConfigTransport>,
    pub store: StoreClient,
}

impl Context {
    pub fn new(
        settings: ClientSettings,
        transport: Box<dyn ConfigTransport>,
        store: StoreClient,
    ) -> Self {
        Self {
            settings,
            transport,
            store,
        }
    }

    /// Build the HTTP client and pick the configuration transport: direct
    /// backing-store access when an endpoint is configured, HTTP otherwise.
    ///
    /// For an `http(s)` backing-store URL the bucket's vbucket map decides
    /// which data node holds the configuration key.
    pub async fn connect(settings: ClientSettings) -> Result<Self, TransportError> {
        let http = build_http_client(settings.timeouts.connect(), settings.timeouts.request())?;
        let store = StoreClient::new(http.clone(), settings.revs);

        let transport: Box<dyn ConfigTransport> = if settings.uses_direct_store() {
            let mut endpoint = Endpoint::parse(&settings.couchbase, &settings.bucket)?;
            let mut vbuckets = settings.vbuckets;
            if let Some(admin) = &endpoint.admin {
                let map = VBucketServerMap::fetch(
                    &http,
                    admin,
                    &settings.bucket,
                    endpoint.credentials.as_ref(),
                )
                .await?;
                vbuckets = map.num_vbuckets()?;
                let (host, port) = map.master_for(CONFIG_KEY)?;
                endpoint.host = host;
                endpoint.port = port;
            }

            let backend = MemcachedBackend::connect(
                &endpoint,
                ConnectOptions {
                    connect_timeout: settings.timeouts.connect(),
                    request_timeout: settings.timeouts.request(),
                    vbuckets,
                },
            )
            .await?;
            let label = format!("{}:{}", endpoint.host, endpoint.port);
            Box::new(DirectStore::new(Arc::new(backend), label))
        } else {
            Box::new(HttpStore::new(http, &settings.url)?)
        };

        tracing::debug!(
            config_location = %transport.location(),
            workers = settings.workers,
            "Client ready"
        );

        Ok(Self::new(settings, transport, store))
    }
}
