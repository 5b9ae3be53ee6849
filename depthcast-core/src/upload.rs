//! Streaming upload of one encoded frame to the collector.
//!
//! Each upload is a single HTTP `PUT` whose body is streamed straight
//! out of a [`MemReader`]. The declared `Content-Length` equals the
//! bitmap's file size. There is no retry: whatever happens is folded
//! into an [`UploadResult`] and handed back to the caller.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Url};
use tokio_util::io::ReaderStream;

use crate::error::DepthcastError;
use crate::memfile::MemReader;

/// Failure reason reported when the collector refuses the connection.
pub const COULD_NOT_CONNECT: &str = "could not connect";

/// MIME type of the uploaded body.
pub const BITMAP_CONTENT_TYPE: &str = "image/bmp";

// ── UploadTarget ─────────────────────────────────────────────────

/// Where encoded frames are sent.
///
/// Set once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Host name, IP literal, or a full `http(s)://` URL.
    pub host: String,
    pub port: u16,
    /// Request path used when `host` is a bare host.
    pub path: String,
}

impl UploadTarget {
    pub const DEFAULT_HOST: &'static str = "localhost";
    pub const DEFAULT_PORT: u16 = 5000;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: "/".into(),
        }
    }

    /// Override the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Build the request URL.
    ///
    /// A bare host becomes `http://host:port/path`. A host that already
    /// carries a scheme keeps its scheme and path; only the port is
    /// replaced.
    pub fn url(&self) -> Result<Url, DepthcastError> {
        let invalid = |e: &dyn fmt::Display| {
            DepthcastError::InvalidTarget(format!("{}: {e}", self.host))
        };

        if self.host.contains("://") {
            let mut url = Url::parse(&self.host).map_err(|e| invalid(&e))?;
            url.set_port(Some(self.port))
                .map_err(|_| invalid(&"URL cannot carry a port"))?;
            return Ok(url);
        }

        if self.host.is_empty() {
            return Err(invalid(&"empty host"));
        }

        // Bare IPv6 literals need brackets inside a URL.
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        Url::parse(&format!("http://{host}:{}{path}", self.port)).map_err(|e| invalid(&e))
    }
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HOST, Self::DEFAULT_PORT)
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── UploadResult ─────────────────────────────────────────────────

/// Outcome of one upload attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub success: bool,
    /// Body bytes divided by wall time.
    pub bytes_per_second: f64,
    /// Wall time of the whole request, connect included.
    pub elapsed_seconds: f64,
    pub failure_reason: Option<String>,
    /// Body size that was offered.
    pub bytes: u64,
}

impl UploadResult {
    pub fn succeeded(bytes: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_second = if secs > 0.0 { bytes as f64 / secs } else { 0.0 };
        Self {
            success: true,
            bytes_per_second,
            elapsed_seconds: secs,
            failure_reason: None,
            bytes,
        }
    }

    pub fn failed(bytes: u64, elapsed: Duration, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            bytes_per_second: 0.0,
            elapsed_seconds: elapsed.as_secs_f64(),
            failure_reason: Some(reason.into()),
            bytes,
        }
    }

    /// Whether the failure was a refused or unreachable connection.
    pub fn is_connect_failure(&self) -> bool {
        self.failure_reason.as_deref() == Some(COULD_NOT_CONNECT)
    }
}

// ── Upload trait ─────────────────────────────────────────────────

/// One-shot transfer of an encoded frame.
///
/// Implementations never return an error: every outcome, including a
/// refused connection, is described by the returned [`UploadResult`].
#[async_trait]
pub trait Upload: Send + Sync {
    /// Stream `size` bytes from `body` to the target and wait for the
    /// collector's answer. `body` is consumed and dropped on return.
    async fn upload(&self, body: MemReader, size: u64) -> UploadResult;

    /// The destination this uploader sends to.
    fn target(&self) -> &UploadTarget;
}

// ── HttpUploader ─────────────────────────────────────────────────

/// [`Upload`] over HTTP `PUT` with a streamed body.
pub struct HttpUploader {
    client: Client,
    target: UploadTarget,
    url: Url,
}

impl HttpUploader {
    /// Build an uploader for `target`.
    ///
    /// Uses the HTTP client's default timeouts; none are added here.
    pub fn new(target: UploadTarget) -> Result<Self, DepthcastError> {
        let url = target.url()?;
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| DepthcastError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            target,
            url,
        })
    }

    /// The resolved request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Upload for HttpUploader {
    async fn upload(&self, body: MemReader, size: u64) -> UploadResult {
        let started = Instant::now();

        let response = self
            .client
            .put(self.url.clone())
            .header(CONTENT_LENGTH, size)
            .header(CONTENT_TYPE, BITMAP_CONTENT_TYPE)
            .body(Body::wrap_stream(ReaderStream::new(body)))
            .send()
            .await;

        let elapsed = started.elapsed();
        match response {
            Ok(resp) if resp.status().is_success() => UploadResult::succeeded(size, elapsed),
            Ok(resp) => UploadResult::failed(
                size,
                elapsed,
                format!("collector responded {}", resp.status()),
            ),
            Err(e) if e.is_connect() => UploadResult::failed(size, elapsed, COULD_NOT_CONNECT),
            Err(e) => UploadResult::failed(size, elapsed, e.to_string()),
        }
    }

    fn target(&self) -> &UploadTarget {
        &self.target
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::MemFile;
    use std::io::Write;

    #[test]
    fn default_target_is_localhost_5000() {
        let t = UploadTarget::default();
        assert_eq!(t.host, "localhost");
        assert_eq!(t.port, 5000);
        assert_eq!(t.url().unwrap().as_str(), "http://localhost:5000/");
    }

    #[test]
    fn bare_host_gets_path() {
        let t = UploadTarget::new("10.0.0.7", 8080).with_path("frames");
        assert_eq!(t.url().unwrap().as_str(), "http://10.0.0.7:8080/frames");
    }

    #[test]
    fn ipv6_literal_is_bracketed() {
        let t = UploadTarget::new("::1", 5000);
        assert_eq!(t.url().unwrap().as_str(), "http://[::1]:5000/");
    }

    #[test]
    fn full_url_keeps_path_and_takes_port() {
        let t = UploadTarget::new("https://collector.example/ingest", 9443);
        assert_eq!(
            t.url().unwrap().as_str(),
            "https://collector.example:9443/ingest"
        );
    }

    #[test]
    fn empty_host_is_rejected() {
        let t = UploadTarget::new("", 5000);
        assert!(matches!(t.url(), Err(DepthcastError::InvalidTarget(_))));
    }

    #[test]
    fn result_throughput() {
        let r = UploadResult::succeeded(1000, Duration::from_millis(500));
        assert!(r.success);
        assert!((r.bytes_per_second - 2000.0).abs() < 1e-6);
        assert!((r.elapsed_seconds - 0.5).abs() < 1e-9);
    }

    #[test]
    fn connect_failure_is_recognised() {
        let r = UploadResult::failed(62, Duration::ZERO, COULD_NOT_CONNECT);
        assert!(!r.success);
        assert!(r.is_connect_failure());
    }

    #[tokio::test]
    async fn refused_connection_reports_could_not_connect() {
        // Bind then drop so the port is (almost certainly) closed.
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let uploader = HttpUploader::new(UploadTarget::new("127.0.0.1", port)).unwrap();

        let mut file = MemFile::default();
        file.write_all(b"BM").unwrap();
        let result = uploader.upload(file.into_reader(), 2).await;

        assert!(!result.success);
        assert_eq!(result.failure_reason.as_deref(), Some(COULD_NOT_CONNECT));
    }
}
