//! Download queue with a background worker.
//!
//! Transfers are executed one after another on a dedicated thread so the
//! owner never blocks. Results come back over a channel and are applied by
//! `update()` on the owner's thread.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::status::{TransferId, TransferStatus, TransferStatusPtr};
use super::transport::{DefaultTransport, Transport};
use super::TransferError;

/// Queued transfer handed to the worker.
struct Job {
    status: TransferStatusPtr,
    url: String,
    destination: PathBuf,
}

type Completion = (TransferId, Result<(), TransferError>);

/// Transfer queue and worker thread.
pub struct Downloader {
    /// Sender for jobs to the worker thread.
    request_tx: Sender<Job>,
    /// Receiver for results from the worker thread.
    result_rx: Receiver<Completion>,
    /// Used directly by the blocking helpers.
    transport: Arc<dyn Transport>,
    /// Transfers that have not been reported finished yet.
    transfers: HashMap<TransferId, TransferStatusPtr>,
    next_id: TransferId,
    _thread_handle: JoinHandle<()>,
}

impl Downloader {
    /// Creates a downloader using [`DefaultTransport`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(Arc::new(DefaultTransport::new()))
    }

    /// Creates a downloader over a custom transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<Completion>();
        let worker_transport = Arc::clone(&transport);

        let thread_handle = thread::spawn(move || {
            debug!("[TRANSFER] Worker thread started");
            Self::run_transfer_loop(request_rx, result_tx, worker_transport.as_ref());
            debug!("[TRANSFER] Worker thread exiting");
        });

        Self {
            request_tx,
            result_rx,
            transport,
            transfers: HashMap::new(),
            next_id: 1,
            _thread_handle: thread_handle,
        }
    }

    /// Runs queued jobs until the downloader is dropped.
    fn run_transfer_loop(
        request_rx: Receiver<Job>,
        result_tx: Sender<Completion>,
        transport: &dyn Transport,
    ) {
        while let Ok(job) = request_rx.recv() {
            let id = job.status.id();
            info!(
                "[TRANSFER] #{} {} -> {}",
                id,
                job.url,
                job.destination.display()
            );

            let status = Arc::clone(&job.status);
            let result = fetch_to_file(transport, &job.url, &job.destination, &|now, total| {
                status.set_progress(now, total);
            });

            if let Err(ref e) = result {
                warn!("[TRANSFER] #{} failed: {}", id, e);
            }

            if result_tx.send((id, result)).is_err() {
                debug!("[TRANSFER] Result channel closed, exiting");
                break;
            }
        }
    }

    /// Queues a download of `url` into `destination`.
    ///
    /// Returns immediately; completion is reported by [`Downloader::update`].
    pub fn request_download(
        &mut self,
        url: &str,
        destination: &Path,
    ) -> Result<TransferStatusPtr, TransferError> {
        let id = self.next_id;
        self.next_id += 1;

        let status = TransferStatus::new(id, url);
        let job = Job {
            status: Arc::clone(&status),
            url: url.to_string(),
            destination: destination.to_path_buf(),
        };
        self.request_tx
            .send(job)
            .map_err(|_| TransferError::Disconnected)?;

        debug!("[TRANSFER] Queued #{} {}", id, url);
        self.transfers.insert(id, Arc::clone(&status));
        Ok(status)
    }

    /// Collects transfers the worker has finished since the last poll.
    ///
    /// Statuses are returned unfinished; the caller applies its own
    /// bookkeeping and then calls `finish` so callbacks observe it.
    pub(crate) fn poll_finished(&mut self) -> Vec<(TransferStatusPtr, Result<(), TransferError>)> {
        let mut finished = Vec::new();
        loop {
            match self.result_rx.try_recv() {
                Ok((id, result)) => {
                    if let Some(status) = self.transfers.remove(&id) {
                        finished.push((status, result));
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    warn!("[TRANSFER] Worker thread disconnected");
                    let pending: Vec<_> = self.transfers.drain().map(|(_, s)| s).collect();
                    finished.extend(
                        pending
                            .into_iter()
                            .map(|s| (s, Err(TransferError::Disconnected))),
                    );
                    break;
                }
            }
        }
        finished
    }

    /// Delivers finished transfers and runs their callbacks.
    pub fn update(&mut self) {
        for (status, result) in self.poll_finished() {
            status.finish(&result);
        }
    }

    /// Returns true if the transfer is still queued or running.
    #[must_use]
    pub fn is_active(&self, id: TransferId) -> bool {
        self.transfers.contains_key(&id)
    }

    /// Number of transfers not yet reported finished.
    #[must_use]
    pub fn active_transfers(&self) -> usize {
        self.transfers.len()
    }

    /// Downloads `url` into `destination` on the calling thread.
    pub fn download(&self, url: &str, destination: &Path) -> Result<(), TransferError> {
        info!("[TRANSFER] {} -> {}", url, destination.display());
        fetch_to_file(self.transport.as_ref(), url, destination, &|_, _| {})
    }

    /// Downloads `url` into memory on the calling thread.
    pub fn download_to_string(&self, url: &str) -> Result<String, TransferError> {
        info!("[TRANSFER] Fetching {}", url);
        let mut buf = Vec::new();
        self.transport.fetch(url, &mut buf, &|_, _| {})?;
        String::from_utf8(buf).map_err(|_| TransferError::InvalidText(url.to_string()))
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Streams a URL into a file, removing the file again on failure.
fn fetch_to_file(
    transport: &dyn Transport,
    url: &str,
    destination: &Path,
    progress: &dyn Fn(u64, u64),
) -> Result<(), TransferError> {
    let file = File::create(destination).map_err(|source| TransferError::Write {
        path: destination.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let result = transport
        .fetch(url, &mut writer, progress)
        .and_then(|_| {
            writer.flush().map_err(|source| TransferError::Write {
                path: destination.to_path_buf(),
                source,
            })
        });
    drop(writer);

    if result.is_err() {
        if let Err(e) = fs::remove_file(destination) {
            warn!(
                "[TRANSFER] Could not remove partial file {}: {}",
                destination.display(),
                e
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Writes some bytes and then fails.
    struct BrokenTransport;

    impl Transport for BrokenTransport {
        fn fetch(
            &self,
            url: &str,
            sink: &mut dyn Write,
            _progress: &dyn Fn(u64, u64),
        ) -> Result<u64, TransferError> {
            sink.write_all(b"partial")?;
            Err(TransferError::Request {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            })
        }
    }

    fn wait_until_idle(downloader: &mut Downloader) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while downloader.active_transfers() > 0 && Instant::now() < deadline {
            downloader.update();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_request_download_local_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.txt");
        let dest = dir.path().join("dest.txt");
        fs::write(&source, "payload").unwrap();

        let mut downloader = Downloader::new();
        let status = downloader
            .request_download(source.to_str().unwrap(), &dest)
            .unwrap();
        assert!(downloader.is_active(status.id()));

        let result = Arc::new(Mutex::new(None));
        let r = Arc::clone(&result);
        status.then(move |ok| *r.lock().unwrap() = Some(ok));

        wait_until_idle(&mut downloader);

        assert_eq!(*result.lock().unwrap(), Some(true));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "payload");
        assert_eq!(status.progress(), (7, 7));
        assert!(!downloader.is_active(status.id()));
    }

    #[test]
    fn test_failed_download_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("dest.zip");

        let mut downloader = Downloader::with_transport(Arc::new(BrokenTransport));
        let status = downloader.request_download("http://example.org/a.zip", &dest).unwrap();
        wait_until_idle(&mut downloader);

        assert!(status.is_finished());
        assert!(!status.succeeded());
        assert!(status.error().unwrap().contains("connection reset"));
        assert!(!dest.exists());

        assert!(downloader.download("http://example.org/a.zip", &dest).is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_transfer_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let mut downloader = Downloader::new();
        let a = downloader
            .request_download("/missing/a", &dir.path().join("a"))
            .unwrap();
        let b = downloader
            .request_download("/missing/b", &dir.path().join("b"))
            .unwrap();
        assert_ne!(a.id(), b.id());
        wait_until_idle(&mut downloader);
        assert!(!a.succeeded());
        assert!(!b.succeeded());
    }

    #[test]
    fn test_blocking_helpers() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("catalog.nfo");
        fs::write(&source, "[supertux-addons]\n").unwrap();

        let downloader = Downloader::new();
        let text = downloader
            .download_to_string(&format!("file://{}", source.display()))
            .unwrap();
        assert_eq!(text, "[supertux-addons]\n");

        let dest = dir.path().join("copy.nfo");
        downloader.download(source.to_str().unwrap(), &dest).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "[supertux-addons]\n");
    }
}
