//! Asynchronous file transfers.
//!
//! Downloads run on a background worker; their completion is delivered on
//! the caller's thread when it polls [`Downloader::update`].
//!
//! # Architecture
//!
//! - **status**: `TransferStatus` handles and the `TransferStatusList` aggregate
//! - **transport**: the `Transport` seam (HTTP through reqwest, local files)
//! - **downloader**: request queue, worker thread, blocking helpers
//!
//! # Usage
//!
//! ```ignore
//! use supertux_addons::transfer::Downloader;
//!
//! let mut downloader = Downloader::new();
//! let status = downloader.request_download(url, &dest)?;
//! status.then(|success| println!("done: {}", success));
//! loop {
//!     downloader.update();
//!     // ... rest of the frame
//! }
//! ```

mod downloader;
mod status;
mod transport;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use downloader::Downloader;
pub use status::{
    TransferId, TransferState, TransferStatus, TransferStatusList, TransferStatusListPtr,
    TransferStatusPtr,
};
pub use transport::{DefaultTransport, Transport};

/// Transfer error types.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The request could not be sent or the response could not be read.
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The destination could not be written.
    #[error("Could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// The response body is not valid UTF-8.
    #[error("Response from {0} is not valid UTF-8")]
    InvalidText(String),

    /// The worker thread is gone.
    #[error("Downloader has shut down")]
    Disconnected,

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
