//! Memcached binary protocol backend.
//!
//! Talks to a single couchbase data node (port 11210) or a plain memcached
//! server (port 11211) over one TCP connection. Which data node to use for
//! an `http(s)` cluster URL is decided by [`crate::kv::vbmap`].
//!
//! # Frame Format
//!
//! ```text
//! Request / response header (24 bytes, big endian):
//!  0| Magic         | Opcode        | Key length                    |
//!  4| Extras length | Data type     | vbucket id / Status           |
//!  8| Total body length                                             |
//! 12| Opaque                                                        |
//! 16| CAS (8 bytes)                                                 |
//!
//! Body = Extras + Key + Value
//! ```
//!
//! Requests carry the vbucket id in bytes 6..8; responses carry the status
//! there instead.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

use crate::kv::{KvBackend, KvError};

/// Binary protocol header size.
pub const HEADER_SIZE: usize = 24;

const REQUEST_MAGIC: u8 = 0x80;
const RESPONSE_MAGIC: u8 = 0x81;

/// Largest couchbase value (20 MiB) plus room for extras and key.
pub const MAX_BODY_LENGTH: u32 = 20 * 1024 * 1024 + 64 * 1024;

pub(crate) const COUCHBASE_DATA_PORT: u16 = 11210;
const MEMCACHED_PORT: u16 = 11211;

/// Opcodes this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Set = 0x01,
    SaslAuth = 0x21,
    SelectBucket = 0x89,
}

impl Opcode {
    fn name(self) -> &'static str {
        match self {
            Opcode::Get => "GET",
            Opcode::Set => "SET",
            Opcode::SaslAuth => "SASL_AUTH",
            Opcode::SelectBucket => "SELECT_BUCKET",
        }
    }
}

/// Response status codes.
pub mod status {
    pub const SUCCESS: u16 = 0x0000;
    pub const KEY_ENOENT: u16 = 0x0001;
    pub const NOT_MY_VBUCKET: u16 = 0x0007;
    pub const AUTH_ERROR: u16 = 0x0020;
    pub const ACCESS_DENIED: u16 = 0x0024;
}

fn status_message(code: u16) -> &'static str {
    match code {
        status::SUCCESS => "success",
        status::KEY_ENOENT => "key not found",
        0x0002 => "key exists",
        0x0003 => "value too large",
        0x0004 => "invalid arguments",
        0x0005 => "item not stored",
        status::NOT_MY_VBUCKET => "vbucket belongs to another server",
        status::AUTH_ERROR => "authentication error",
        status::ACCESS_DENIED => "no access",
        0x0081 => "unknown command",
        0x0082 => "out of memory",
        0x0086 => "temporary failure",
        _ => "unknown status",
    }
}

/// An outgoing request frame.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub opcode: Opcode,
    pub vbucket: u16,
    pub opaque: u32,
    pub extras: &'a [u8],
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl Request<'_> {
    pub fn encode(&self) -> Vec<u8> {
        let body_len = self.extras.len() + self.key.len() + self.value.len();
        let mut buf = Vec::with_capacity(HEADER_SIZE + body_len);
        buf.push(REQUEST_MAGIC);
        buf.push(self.opcode as u8);
        buf.extend_from_slice(&(self.key.len() as u16).to_be_bytes());
        buf.push(self.extras.len() as u8);
        buf.push(0); // data type
        buf.extend_from_slice(&self.vbucket.to_be_bytes());
        buf.extend_from_slice(&(body_len as u32).to_be_bytes());
        buf.extend_from_slice(&self.opaque.to_be_bytes());
        buf.extend_from_slice(&0u64.to_be_bytes()); // cas
        buf.extend_from_slice(self.extras);
        buf.extend_from_slice(self.key);
        buf.extend_from_slice(self.value);
        buf
    }
}

/// A parsed response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub opcode: u8,
    pub key_length: u16,
    pub extras_length: u8,
    pub status: u16,
    pub total_body_length: u32,
    pub opaque: u32,
    pub cas: u64,
}

impl ResponseHeader {
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self, KvError> {
        if buf[0] != RESPONSE_MAGIC {
            return Err(KvError::Protocol(format!(
                "bad response magic 0x{:02x}",
                buf[0]
            )));
        }
        let header = Self {
            opcode: buf[1],
            key_length: u16::from_be_bytes([buf[2], buf[3]]),
            extras_length: buf[4],
            status: u16::from_be_bytes([buf[6], buf[7]]),
            total_body_length: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            opaque: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            cas: u64::from_be_bytes([
                buf[16], buf[17], buf[18], buf[19], buf[20], buf[21], buf[22], buf[23],
            ]),
        };
        if (header.extras_length as u32 + header.key_length as u32) > header.total_body_length {
            return Err(KvError::Protocol("extras and key exceed body length".to_string()));
        }
        if header.total_body_length > MAX_BODY_LENGTH {
            return Err(KvError::Protocol(format!(
                "response body of {} bytes exceeds the {} byte limit",
                header.total_body_length, MAX_BODY_LENGTH
            )));
        }
        Ok(header)
    }
}

/// A full response frame.
#[derive(Debug, Clone)]
pub struct Response {
    pub header: ResponseHeader,
    pub body: Vec<u8>,
}

impl Response {
    pub fn value(&self) -> &[u8] {
        let start = self.header.extras_length as usize + self.header.key_length as usize;
        &self.body[start..]
    }
}

/// CRC32 (IEEE) as used by couchbase to map keys onto vbuckets.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// The vbucket owning `key` in a bucket with `num_vbuckets` partitions.
pub fn vbucket_for(key: &str, num_vbuckets: u16) -> u16 {
    let hash = (crc32(key.as_bytes()) >> 16) & 0x7fff;
    (hash % num_vbuckets.max(1) as u32) as u16
}

/// Where and how to reach the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Bucket to select after connecting; `None` for plain memcached.
    pub bucket: Option<String>,
    /// SASL PLAIN credentials, percent-decoded.
    pub credentials: Option<(String, String)>,
    /// Cluster admin URL (without credentials) for `http(s)` endpoints.
    /// The data node is looked up from its vbucket map.
    pub admin: Option<Url>,
}

impl Endpoint {
    /// Parse a `couchbase://`, `memcached://` or `http(s)://` endpoint URL.
    ///
    /// An `http` URL names the cluster admin port. Until the vbucket map has
    /// been consulted, the data port on the same host is assumed.
    pub fn parse(endpoint: &str, bucket: &str) -> Result<Self, KvError> {
        let invalid = |reason: String| KvError::Endpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        let bucket_name = Some(bucket.to_string());
        let (port, bucket) = match url.scheme() {
            "couchbase" => (url.port().unwrap_or(COUCHBASE_DATA_PORT), bucket_name),
            "http" | "https" => (COUCHBASE_DATA_PORT, bucket_name),
            "memcached" => (url.port().unwrap_or(MEMCACHED_PORT), None),
            other => return Err(invalid(format!("unsupported scheme {:?}", other))),
        };

        let decode = |part: &str| {
            percent_decode_str(part)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|e| invalid(format!("credentials are not UTF-8: {}", e)))
        };
        let credentials = if url.username().is_empty() {
            None
        } else {
            Some((
                decode(url.username())?,
                decode(url.password().unwrap_or_default())?,
            ))
        };

        let admin = match url.scheme() {
            "http" | "https" => {
                let mut admin = url.clone();
                // Only fails for cannot-be-a-base URLs, ruled out by the host check.
                let _ = admin.set_username("");
                let _ = admin.set_password(None);
                Some(admin)
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            bucket,
            credentials,
            admin,
        })
    }
}

/// Connection parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Number of vbuckets in a couchbase bucket.
    pub vbuckets: u16,
}

/// Backing store reached over the memcached binary protocol.
#[derive(Debug)]
pub struct MemcachedBackend {
    conn: Mutex<TcpStream>,
    /// `None` when talking to plain memcached (vbucket id always 0).
    vbuckets: Option<u16>,
    request_timeout: Duration,
    next_opaque: AtomicU32,
    /// Set once an exchange fails part way; the stream may hold a stale reply.
    broken: AtomicBool,
}

impl MemcachedBackend {
    /// Connect, authenticate and select the bucket.
    pub async fn connect(endpoint: &Endpoint, options: ConnectOptions) -> Result<Self, KvError> {
        let addr = format!("{}:{}", endpoint.host, endpoint.port);
        let stream = timeout(options.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| KvError::Timeout {
                operation: "connect",
                after: options.connect_timeout,
            })??;
        stream.set_nodelay(true)?;

        let backend = Self {
            conn: Mutex::new(stream),
            vbuckets: endpoint.bucket.as_ref().map(|_| options.vbuckets),
            request_timeout: options.request_timeout,
            next_opaque: AtomicU32::new(1),
            broken: AtomicBool::new(false),
        };

        if let Some((user, password)) = &endpoint.credentials {
            backend.authenticate(user, password).await?;
        }
        if let Some(bucket) = &endpoint.bucket {
            backend.select_bucket(bucket).await?;
        }

        tracing::debug!(
            address = %addr,
            bucket = ?endpoint.bucket,
            "Connected to backing store"
        );
        Ok(backend)
    }

    async fn authenticate(&self, user: &str, password: &str) -> Result<(), KvError> {
        let token = format!("\0{}\0{}", user, password);
        let res = self
            .round_trip(Opcode::SaslAuth, 0, &[], b"PLAIN", token.as_bytes())
            .await?;
        match res.header.status {
            status::SUCCESS => Ok(()),
            status::AUTH_ERROR => Err(KvError::Auth(user.to_string())),
            code => Err(status_error(Opcode::SaslAuth, code)),
        }
    }

    async fn select_bucket(&self, bucket: &str) -> Result<(), KvError> {
        let res = self
            .round_trip(Opcode::SelectBucket, 0, &[], bucket.as_bytes(), &[])
            .await?;
        match res.header.status {
            status::SUCCESS => Ok(()),
            code => Err(status_error(Opcode::SelectBucket, code)),
        }
    }

    fn vbucket(&self, key: &str) -> u16 {
        self.vbuckets.map(|n| vbucket_for(key, n)).unwrap_or(0)
    }

    async fn round_trip(
        &self,
        opcode: Opcode,
        vbucket: u16,
        extras: &[u8],
        key: &[u8],
        value: &[u8],
    ) -> Result<Response, KvError> {
        if self.broken.load(Ordering::Acquire) {
            return Err(KvError::Closed);
        }
        let opaque = self.next_opaque.fetch_add(1, Ordering::Relaxed);
        let frame = Request {
            opcode,
            vbucket,
            opaque,
            extras,
            key,
            value,
        }
        .encode();

        let exchange = async {
            let mut conn = self.conn.lock().await;
            conn.write_all(&frame).await?;

            let mut head = [0u8; HEADER_SIZE];
            conn.read_exact(&mut head).await?;
            let header = ResponseHeader::parse(&head)?;

            let mut body = vec![0u8; header.total_body_length as usize];
            conn.read_exact(&mut body).await?;
            Ok::<_, KvError>(Response { header, body })
        };

        let res = match timeout(self.request_timeout, exchange).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => return Err(self.mark_broken(e)),
            Err(_) => {
                return Err(self.mark_broken(KvError::Timeout {
                    operation: opcode.name(),
                    after: self.request_timeout,
                }))
            }
        };

        if res.header.opaque != opaque || res.header.opcode != opcode as u8 {
            return Err(self.mark_broken(KvError::Protocol(format!(
                "response 0x{:02x}/{} does not match request 0x{:02x}/{}",
                res.header.opcode, res.header.opaque, opcode as u8, opaque
            ))));
        }
        Ok(res)
    }

    fn mark_broken(&self, err: KvError) -> KvError {
        self.broken.store(true, Ordering::Release);
        tracing::debug!(error = %err, "Backing store connection marked unusable");
        err
    }
}

fn status_error(opcode: Opcode, code: u16) -> KvError {
    KvError::Status {
        operation: opcode.name(),
        status: code,
        message: status_message(code).to_string(),
    }
}

#[async_trait]
impl KvBackend for MemcachedBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let vbucket = self.vbucket(key);
        let res = self
            .round_trip(Opcode::Get, vbucket, &[], key.as_bytes(), &[])
            .await?;
        match res.header.status {
            status::SUCCESS => Ok(Some(res.value().to_vec())),
            status::KEY_ENOENT => Ok(None),
            status::NOT_MY_VBUCKET => Err(KvError::WrongNode { vbucket }),
            code => Err(status_error(Opcode::Get, code)),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        // flags (4 bytes) + expiration (4 bytes), both zero
        let extras = [0u8; 8];
        let vbucket = self.vbucket(key);
        let res = self
            .round_trip(Opcode::Set, vbucket, &extras, key.as_bytes(), value)
            .await?;
        match res.header.status {
            status::SUCCESS => Ok(()),
            status::NOT_MY_VBUCKET => Err(KvError::WrongNode { vbucket }),
            code => Err(status_error(Opcode::Set, code)),
        }
    }
}
