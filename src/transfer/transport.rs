//! Byte sources for transfers.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::TransferError;

/// Read buffer size for copying.
const CHUNK_SIZE: usize = 16 * 1024;

/// Request timeout for HTTP transfers.
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Fetches the content behind a URL.
///
/// Implementations stream into `sink` and report `(received, total)` through
/// `progress`, with `total` 0 when the size is unknown.
pub trait Transport: Send + Sync {
    /// Copies the resource into `sink`, returning the number of bytes.
    fn fetch(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: &dyn Fn(u64, u64),
    ) -> Result<u64, TransferError>;
}

/// HTTP(S) through reqwest; `file://` URLs and plain paths from disk.
pub struct DefaultTransport {
    client: reqwest::blocking::Client,
}

impl DefaultTransport {
    /// Creates a transport with the crate's user agent and timeout.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("supertux-addons/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client }
    }

    fn fetch_http(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: &dyn Fn(u64, u64),
    ) -> Result<u64, TransferError> {
        let request_error = |e: reqwest::Error| TransferError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length().unwrap_or(0);
        copy_with_progress(response, sink, total, progress).map_err(|e| TransferError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn fetch_file(
        path: &Path,
        sink: &mut dyn Write,
        progress: &dyn Fn(u64, u64),
    ) -> Result<u64, TransferError> {
        let file = File::open(path).map_err(|e| TransferError::Request {
            url: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(copy_with_progress(file, sink, total, progress)?)
    }
}

impl Default for DefaultTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DefaultTransport {
    fn fetch(
        &self,
        url: &str,
        sink: &mut dyn Write,
        progress: &dyn Fn(u64, u64),
    ) -> Result<u64, TransferError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            debug!("[TRANSFER] GET {}", url);
            self.fetch_http(url, sink, progress)
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            debug!("[TRANSFER] Copying local file {}", path);
            Self::fetch_file(Path::new(path), sink, progress)
        }
    }
}

/// Streams `reader` into `sink`, reporting progress after each chunk.
fn copy_with_progress<R: Read>(
    mut reader: R,
    sink: &mut dyn Write,
    total: u64,
    progress: &dyn Fn(u64, u64),
) -> std::io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut received = 0u64;
    progress(0, total);
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
        received += n as u64;
        progress(received, total);
    }
    sink.flush()?;
    Ok(received)
}
