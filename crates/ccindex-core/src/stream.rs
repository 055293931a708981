//! HTTP range-GET streaming with a read timeout.
//!
//! Uses async reqwest internally with `tokio::time::timeout` for stall
//! detection, but presents a sync `Read` interface so callers (the range
//! fetcher's worker pool) don't need to be async themselves.

use std::io::{self, BufReader, Read};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::task::Context;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, ReadBuf};

/// Read timeout for stall detection (10 seconds with no data = stall).
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for stream operations.
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code.
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error.
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => !matches!(status, Some(400) | Some(403) | Some(410)),
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<StreamError> for crate::error::PipelineError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Http { status, message } => crate::error::PipelineError::RangeFetchFailure {
                url: String::new(),
                detail: match status {
                    Some(s) => format!("HTTP {s}: {message}"),
                    None => message,
                },
            },
            StreamError::Io(io_err) => crate::error::PipelineError::Io(io_err),
        }
    }
}

/// Process-wide HTTP tuning, settable by the CLI's config layer and read by
/// [`retry::retry_with_backoff`](crate::retry::retry_with_backoff) and the
/// range fetcher.
#[derive(Debug, Clone, Copy)]
pub struct HttpConfig {
    pub max_retries: u32,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            max_retries: 5,
            connect_timeout_secs: CONNECT_TIMEOUT.as_secs(),
            read_timeout_secs: READ_TIMEOUT.as_secs(),
        }
    }
}

static HTTP_CONFIG: LazyLock<Mutex<HttpConfig>> = LazyLock::new(|| Mutex::new(HttpConfig::default()));

/// Read the current process-wide HTTP configuration.
pub fn http_config() -> HttpConfig {
    *HTTP_CONFIG.lock().expect("http config lock poisoned")
}

/// Replace the process-wide HTTP configuration, e.g. from `--retries`/`--timeout` CLI flags.
pub fn set_http_config(config: HttpConfig) {
    *HTTP_CONFIG.lock().expect("http config lock poisoned") = config;
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

/// Get the shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Buffer size for the range-response reader (256KB).
const RANGE_BUF_SIZE: usize = 256 * 1024;

/// Buffered reader over an HTTP range-response body with byte counting.
pub type RangeReader = BufReader<CountingReader<TimeoutReader>>;

/// Shared byte counter for progress tracking.
pub type ByteCounter = Arc<AtomicU64>;

/// The outcome of issuing a range GET: whether the server honored it with a
/// 206 and an exact-length body.
pub struct RangeResponse {
    pub status: u16,
    pub reader: RangeReader,
    pub counter: ByteCounter,
}

/// Issue `GET <url>` with `Range: bytes=offset-(offset+length-1)`.
///
/// Per the wire protocol, only status 206 is a success; any other status is
/// returned (not raised) so the caller can classify it as a terminal
/// non-retryable failure per the range-fetch error policy. No cookies, no
/// credentials, no query parameters are added.
pub fn open_range_reader(url: &str, offset: u64, length: u64) -> Result<RangeResponse, StreamError> {
    let url = url.to_string();
    let range_value = format!("bytes={offset}-{}", offset + length.saturating_sub(1));

    let (reader, status) = SHARED_RUNTIME.handle().block_on(async {
        let response = SHARED_CLIENT
            .get(&url)
            .header(reqwest::header::RANGE, range_value)
            .send()
            .await
            .map_err(|e| StreamError::from_reqwest(&e))?;

        let status = response.status().as_u16();

        let stream = response.bytes_stream();
        let async_reader =
            tokio_util::io::StreamReader::new(stream.map(|result| result.map_err(io::Error::other)));

        Ok::<_, StreamError>((TimeoutReader::new(Box::pin(async_reader)), status))
    })?;

    let counter = Arc::new(AtomicU64::new(0));
    let counting_reader = CountingReader {
        inner: reader,
        count: counter.clone(),
    };
    let buf = BufReader::with_capacity(RANGE_BUF_SIZE, counting_reader);

    Ok(RangeResponse {
        status,
        reader: buf,
        counter,
    })
}

/// Read a range response fully into memory, verifying the byte count
/// matches `length` exactly. Range responses for WARC records are bounded
/// (single records, not whole files), so buffering in memory is acceptable.
pub fn fetch_range_bytes(url: &str, offset: u64, length: u64) -> Result<Vec<u8>, StreamError> {
    let RangeResponse {
        status,
        mut reader,
        ..
    } = open_range_reader(url, offset, length)?;

    if status != 206 {
        return Err(StreamError::Http {
            status: Some(status),
            message: format!("expected 206 Partial Content, got {status}"),
        });
    }

    let mut buf = Vec::with_capacity(length as usize);
    reader.read_to_end(&mut buf)?;

    if buf.len() as u64 != length {
        return Err(StreamError::Http {
            status: Some(status),
            message: format!("expected {length} bytes, got {}", buf.len()),
        });
    }

    Ok(buf)
}

/// Reader wrapper that tracks bytes read.
pub struct CountingReader<R> {
    inner: R,
    count: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Async-to-sync bridge with read timeout.
///
/// Wraps an async reader and provides a sync `Read` interface. Each read has
/// a timeout; if no data arrives within [`READ_TIMEOUT`], returns
/// `TimedOut` (which triggers a retry upstream).
pub struct TimeoutReader {
    inner: Pin<Box<dyn AsyncRead + Send + Sync>>,
}

impl TimeoutReader {
    fn new(inner: Pin<Box<dyn AsyncRead + Send + Sync>>) -> Self {
        Self { inner }
    }
}

impl Read for TimeoutReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SHARED_RUNTIME.handle().block_on(async {
            let read_future = async {
                let mut read_buf = ReadBuf::new(buf);
                std::future::poll_fn(|cx: &mut Context<'_>| {
                    Pin::as_mut(&mut self.inner).poll_read(cx, &mut read_buf)
                })
                .await?;
                Ok::<_, io::Error>(read_buf.filled().len())
            };

            match tokio::time::timeout(READ_TIMEOUT, read_future).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "read timeout (10s with no data)",
                )),
            }
        })
    }
}
