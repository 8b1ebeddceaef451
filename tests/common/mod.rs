//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cbfsclient::cli::{execute, CommandError, CommandKind};
use cbfsclient::client::{build_http_client, StoreClient};
use cbfsclient::cluster::ClusterConfig;
use cbfsclient::kv::MemoryBackend;
use cbfsclient::{ClientSettings, Context, DirectStore, HttpStore};

/// State of the in-process mock cluster.
#[derive(Clone, Default)]
pub struct MockCluster {
    /// Last configuration body accepted by PUT.
    pub config: Arc<Mutex<Option<Vec<u8>>>>,
    /// Content types seen on config PUTs.
    pub config_content_types: Arc<Mutex<Vec<String>>>,
    /// Fixed (status, body) for config GETs.
    pub get_override: Arc<Mutex<Option<(u16, String)>>>,
    /// Fixed (status, body) for config PUTs.
    pub put_override: Arc<Mutex<Option<(u16, String)>>>,
    /// Stored files by path without leading slash.
    pub files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    /// Value of the keep-revs header per uploaded path.
    pub keep_revs: Arc<Mutex<HashMap<String, Option<String>>>>,
}

impl MockCluster {
    pub fn stored_config(&self) -> Option<ClusterConfig> {
        self.config
            .lock()
            .unwrap()
            .as_ref()
            .map(|body| ClusterConfig::from_json(body).unwrap())
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.files.lock().unwrap().insert(path.to_string(), content.to_vec());
    }
}

fn fixed(status: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    (status, body).into_response()
}

async fn get_config(State(mock): State<MockCluster>) -> Response {
    if let Some((status, body)) = mock.get_override.lock().unwrap().clone() {
        return fixed(status, body);
    }
    let body = mock
        .config
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| ClusterConfig::default().to_json().unwrap());
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn put_config(State(mock): State<MockCluster>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.config_content_types.lock().unwrap().push(content_type);

    if let Some((status, body)) = mock.put_override.lock().unwrap().clone() {
        return fixed(status, body);
    }
    *mock.config.lock().unwrap() = Some(body.to_vec());
    StatusCode::NO_CONTENT.into_response()
}

fn listing(mock: &MockCluster, prefix: &str, params: &HashMap<String, String>) -> Response {
    let prefix = prefix.trim_matches('/');
    let depth: usize = params.get("depth").and_then(|d| d.parse().ok()).unwrap_or(1);
    let files = mock.files.lock().unwrap();

    let mut dirs: BTreeMap<String, u64> = BTreeMap::new();
    let mut entries = serde_json::Map::new();
    for (path, content) in files.iter() {
        let rel = if prefix.is_empty() {
            path.as_str()
        } else {
            match path.strip_prefix(&format!("{}/", prefix)) {
                Some(rel) => rel,
                None => continue,
            }
        };
        match rel.split_once('/') {
            Some((dir, _)) if depth <= 1 => *dirs.entry(dir.to_string()).or_default() += 1,
            _ => {
                entries.insert(rel.to_string(), json!({"oid": "x", "length": content.len()}));
            }
        }
    }

    if entries.is_empty() && dirs.is_empty() && !prefix.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let dirs: serde_json::Map<_, _> = dirs
        .into_iter()
        .map(|(name, n)| (name, json!({"descendants": n})))
        .collect();
    let body = json!({"path": format!("/{}", prefix), "dirs": dirs, "files": entries});
    axum::Json(body).into_response()
}

async fn list_root(
    State(mock): State<MockCluster>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    listing(&mock, "", &params)
}

async fn list_path(
    State(mock): State<MockCluster>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    listing(&mock, &path, &params)
}

async fn put_file(
    State(mock): State<MockCluster>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let revs = headers
        .get("X-CBFS-KeepRevs")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.keep_revs.lock().unwrap().insert(path.clone(), revs);
    mock.files.lock().unwrap().insert(path, body.to_vec());
    StatusCode::CREATED
}

async fn delete_file(State(mock): State<MockCluster>, Path(path): Path<String>) -> StatusCode {
    match mock.files.lock().unwrap().remove(&path) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Start a mock cluster node. Returns its base URL.
pub async fn start_mock_cluster() -> (String, MockCluster) {
    let mock = MockCluster::default();
    let app = Router::new()
        .route("/.cbfs/config/", get(get_config).put(put_config))
        .route("/.cbfs/list/", get(list_root))
        .route("/.cbfs/list/{*path}", get(list_path))
        .route("/{*path}", axum::routing::put(put_file).delete(delete_file))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}/", addr), mock)
}

/// Settings suitable for tests against local servers.
pub fn test_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    settings.timeouts.connect_secs = 2;
    settings.timeouts.request_secs = 5;
    settings
}

/// Context using the HTTP transport against `base`.
pub fn http_context(base: &str, settings: ClientSettings) -> Context {
    let http = build_http_client(settings.timeouts.connect(), settings.timeouts.request()).unwrap();
    let transport = HttpStore::new(http.clone(), base).unwrap();
    let store = StoreClient::new(http, settings.revs);
    Context::new(settings, Box::new(transport), store)
}

/// Context using the direct transport over an in-memory backing store.
pub fn direct_context(kv: &MemoryBackend) -> Context {
    let settings = test_settings();
    let http = build_http_client(settings.timeouts.connect(), settings.timeouts.request()).unwrap();
    let transport = DirectStore::new(Arc::new(kv.clone()), "memory");
    let store = StoreClient::new(http, settings.revs);
    Context::new(settings, Box::new(transport), store)
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Run one command and return what it printed.
pub async fn run(ctx: &Context, kind: CommandKind, argv: &[&str]) -> Result<String, CommandError> {
    let mut out = Vec::new();
    execute(kind, ctx, &args(argv), &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

/// Storage of the fake memcached server.
pub type FakeKv = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

pub const USER: &str = "admin";
pub const PASSWORD: &str = "secret";

/// How the fake memcached server answers key operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeMode {
    /// Store and serve keys.
    Normal,
    /// Reply NOT_MY_VBUCKET to every GET and SET.
    ForeignVbuckets,
    /// Never reply to GET.
    Silent,
}

/// Start a fake server speaking the memcached binary protocol.
///
/// Understands GET, SET, SASL_AUTH (PLAIN, admin/secret) and SELECT_BUCKET
/// (only `bucket` is accepted).
pub async fn start_fake_memcached(bucket: &'static str) -> (SocketAddr, FakeKv) {
    start_fake_memcached_with(bucket, FakeMode::Normal).await
}

pub async fn start_fake_memcached_with(
    bucket: &'static str,
    mode: FakeMode,
) -> (SocketAddr, FakeKv) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let kv: FakeKv = Arc::default();
    let shared = kv.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let kv = shared.clone();
            tokio::spawn(async move {
                loop {
                    let mut head = [0u8; 24];
                    if socket.read_exact(&mut head).await.is_err() {
                        break;
                    }
                    let opcode = head[1];
                    let key_len = u16::from_be_bytes([head[2], head[3]]) as usize;
                    let extras_len = head[4] as usize;
                    let body_len =
                        u32::from_be_bytes([head[8], head[9], head[10], head[11]]) as usize;
                    let opaque = [head[12], head[13], head[14], head[15]];

                    let mut body = vec![0u8; body_len];
                    if socket.read_exact(&mut body).await.is_err() {
                        break;
                    }
                    let key = body[extras_len..extras_len + key_len].to_vec();
                    let value = body[extras_len + key_len..].to_vec();

                    if opcode == 0x00 && mode == FakeMode::Silent {
                        continue;
                    }
                    let (status, extras, payload): (u16, Vec<u8>, Vec<u8>) = match opcode {
                        0x00 | 0x01 if mode == FakeMode::ForeignVbuckets => {
                            (0x0007, vec![], b"Not my vbucket".to_vec())
                        }
                        0x00 => match kv.lock().unwrap().get(&key) {
                            Some(v) => (0x0000, vec![0; 4], v.clone()),
                            None => (0x0001, vec![], b"Not found".to_vec()),
                        },
                        0x01 => {
                            kv.lock().unwrap().insert(key, value);
                            (0x0000, vec![], vec![])
                        }
                        0x21 => {
                            let token = format!("\0{}\0{}", USER, PASSWORD);
                            if key == b"PLAIN" && value == token.as_bytes() {
                                (0x0000, vec![], b"Authenticated".to_vec())
                            } else {
                                (0x0020, vec![], b"Auth failure".to_vec())
                            }
                        }
                        0x89 if key == bucket.as_bytes() => (0x0000, vec![], vec![]),
                        0x89 => (0x0001, vec![], vec![]),
                        _ => (0x0081, vec![], vec![]),
                    };

                    let mut frame = vec![0x81, opcode, 0, 0, extras.len() as u8, 0];
                    frame.extend_from_slice(&status.to_be_bytes());
                    frame.extend_from_slice(&((extras.len() + payload.len()) as u32).to_be_bytes());
                    frame.extend_from_slice(&opaque);
                    frame.extend_from_slice(&[0u8; 8]);
                    frame.extend_from_slice(&extras);
                    frame.extend_from_slice(&payload);
                    if socket.write_all(&frame).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, kv)
}

/// Authorization headers seen by the mock admin API.
pub type SeenAuth = Arc<Mutex<Vec<Option<String>>>>;

/// Start a mock cluster admin API describing `bucket` with the given
/// server list, every vbucket owned by `owner`.
pub async fn start_mock_admin(
    bucket: &'static str,
    servers: Vec<String>,
    owner: i32,
) -> (String, SeenAuth) {
    let seen: SeenAuth = Arc::default();
    let state = (servers, owner, seen.clone());

    let app = Router::new()
        .route(
            "/pools/default/buckets/{name}",
            get(
                move |State((servers, owner, seen)): State<(Vec<String>, i32, SeenAuth)>,
                      Path(name): Path<String>,
                      headers: HeaderMap| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push(auth);
                    if name != bucket {
                        return StatusCode::NOT_FOUND.into_response();
                    }
                    axum::Json(json!({
                        "name": name,
                        "vBucketServerMap": {
                            "hashAlgorithm": "CRC",
                            "numReplicas": 0,
                            "serverList": servers,
                            "vBucketMap": vec![vec![owner]; 64],
                        }
                    }))
                    .into_response()
                },
            ),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}:{}@{}/", USER, PASSWORD, addr), seen)
}
