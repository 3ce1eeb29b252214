//! Transfer handles and completion callbacks.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Identifier of one transfer, unique per downloader.
pub type TransferId = u64;

/// Shared handle to one transfer.
pub type TransferStatusPtr = Arc<TransferStatus>;

/// Shared handle to an aggregate of transfers.
pub type TransferStatusListPtr = Arc<TransferStatusList>;

type Callback = Box<dyn FnOnce(bool) + Send>;

/// Lifecycle of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Queued or in progress.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
}

struct StatusState {
    state: TransferState,
    dlnow: u64,
    dltotal: u64,
    error: Option<String>,
    callbacks: Vec<Callback>,
}

/// Progress and completion of one transfer.
///
/// The worker thread only reports progress. Completion is applied by the
/// owner of the downloader on its own thread, which is also where every
/// `then` callback runs.
pub struct TransferStatus {
    id: TransferId,
    url: String,
    state: Mutex<StatusState>,
}

impl TransferStatus {
    pub(crate) fn new(id: TransferId, url: &str) -> TransferStatusPtr {
        Arc::new(Self {
            id,
            url: url.to_string(),
            state: Mutex::new(StatusState {
                state: TransferState::Running,
                dlnow: 0,
                dltotal: 0,
                error: None,
                callbacks: Vec::new(),
            }),
        })
    }

    #[must_use]
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Source URL of the transfer.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
            .lock()
            .map(|s| s.state)
            .unwrap_or(TransferState::Failed)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() != TransferState::Running
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state() == TransferState::Succeeded
    }

    /// Error message of a failed transfer.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.error.clone())
    }

    /// Bytes received so far and expected total (0 when unknown).
    #[must_use]
    pub fn progress(&self) -> (u64, u64) {
        self.state
            .lock()
            .map(|s| (s.dlnow, s.dltotal))
            .unwrap_or((0, 0))
    }

    pub(crate) fn set_progress(&self, dlnow: u64, dltotal: u64) {
        if let Ok(mut s) = self.state.lock() {
            s.dlnow = dlnow;
            s.dltotal = dltotal;
        }
    }

    /// Registers a completion callback receiving the success flag.
    ///
    /// Runs immediately if the transfer has already finished.
    pub fn then<F>(&self, callback: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let finished = match self.state.lock() {
            Ok(mut s) if s.state == TransferState::Running => {
                s.callbacks.push(Box::new(callback));
                return;
            }
            Ok(s) => s.state == TransferState::Succeeded,
            Err(_) => return,
        };
        callback(finished);
    }

    /// Marks the transfer finished and runs the registered callbacks.
    ///
    /// Finishing twice is ignored.
    pub(crate) fn finish<E: fmt::Display>(&self, result: &Result<(), E>) {
        let callbacks = match self.state.lock() {
            Ok(mut s) if s.state == TransferState::Running => {
                match result {
                    Ok(()) => s.state = TransferState::Succeeded,
                    Err(e) => {
                        s.state = TransferState::Failed;
                        s.error = Some(e.to_string());
                    }
                }
                std::mem::take(&mut s.callbacks)
            }
            _ => return,
        };

        let success = result.is_ok();
        for callback in callbacks {
            callback(success);
        }
    }
}

impl fmt::Debug for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferStatus")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("state", &self.state())
            .finish()
    }
}

struct ListState {
    transfers: Vec<TransferStatusPtr>,
    finished: usize,
    successful: usize,
    errors: Vec<String>,
    callbacks: Vec<Callback>,
}

impl ListState {
    fn is_finished(&self) -> bool {
        self.finished == self.transfers.len()
    }

    fn succeeded(&self) -> bool {
        self.successful == self.transfers.len()
    }
}

/// Several transfers observed as one.
///
/// Callbacks fire once every member has finished, with success meaning
/// every member succeeded. A list with no members counts as finished and
/// successful.
pub struct TransferStatusList {
    state: Mutex<ListState>,
}

impl TransferStatusList {
    #[must_use]
    pub fn new() -> TransferStatusListPtr {
        Arc::new(Self {
            state: Mutex::new(ListState {
                transfers: Vec::new(),
                finished: 0,
                successful: 0,
                errors: Vec::new(),
                callbacks: Vec::new(),
            }),
        })
    }

    /// Adds a transfer to the aggregate.
    pub fn push(self: &Arc<Self>, status: TransferStatusPtr) {
        if let Ok(mut s) = self.state.lock() {
            s.transfers.push(Arc::clone(&status));
        } else {
            return;
        }

        let list = Arc::downgrade(self);
        let member = Arc::downgrade(&status);
        status.then(move |success| {
            if let Some(list) = list.upgrade() {
                let error = member.upgrade().and_then(|m| m.error());
                list.member_finished(success, error);
            }
        });
    }

    /// Adds every member of another aggregate.
    pub fn extend(self: &Arc<Self>, other: &TransferStatusList) {
        for status in other.transfers() {
            self.push(status);
        }
    }

    fn member_finished(&self, success: bool, error: Option<String>) {
        let (callbacks, all_succeeded) = match self.state.lock() {
            Ok(mut s) => {
                s.finished += 1;
                if success {
                    s.successful += 1;
                } else if let Some(error) = error {
                    s.errors.push(error);
                }
                if !s.is_finished() {
                    return;
                }
                let all_succeeded = s.succeeded();
                (std::mem::take(&mut s.callbacks), all_succeeded)
            }
            Err(_) => return,
        };

        for callback in callbacks {
            callback(all_succeeded);
        }
    }

    /// Registers a callback for when every member has finished.
    ///
    /// Runs immediately if that is already the case.
    pub fn then<F>(&self, callback: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let success = match self.state.lock() {
            Ok(mut s) if !s.is_finished() => {
                s.callbacks.push(Box::new(callback));
                return;
            }
            Ok(s) => s.succeeded(),
            Err(_) => return,
        };
        callback(success);
    }

    /// Member transfers, in insertion order.
    #[must_use]
    pub fn transfers(&self) -> Vec<TransferStatusPtr> {
        self.state
            .lock()
            .map(|s| s.transfers.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.transfers.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.lock().map(|s| s.is_finished()).unwrap_or(true)
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.is_finished() && s.succeeded())
            .unwrap_or(false)
    }

    /// Error messages of the failed members, joined.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        let errors = self.state.lock().ok()?.errors.clone();
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        }
    }

    /// Summed progress of every member.
    #[must_use]
    pub fn progress(&self) -> (u64, u64) {
        self.transfers()
            .iter()
            .map(|t| t.progress())
            .fold((0, 0), |(now, total), (n, t)| (now + n, total + t))
    }
}

impl fmt::Debug for TransferStatusList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferStatusList")
            .field("len", &self.len())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn success() -> Result<(), TransferError> {
        Ok(())
    }

    fn failure() -> Result<(), TransferError> {
        Err(TransferError::Request {
            url: "http://example.org/x".to_string(),
            reason: "boom".to_string(),
        })
    }

    #[test]
    fn test_then_runs_on_finish() {
        let status = TransferStatus::new(1, "http://example.org/x");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        status.then(move |ok| sink.lock().unwrap().push(ok));
        assert!(seen.lock().unwrap().is_empty());

        status.finish(&success());
        assert_eq!(*seen.lock().unwrap(), vec![true]);
        assert!(status.succeeded());

        // Late registration fires immediately.
        let sink = Arc::clone(&seen);
        status.then(move |ok| sink.lock().unwrap().push(ok));
        assert_eq!(*seen.lock().unwrap(), vec![true, true]);
    }

    #[test]
    fn test_finish_twice_is_ignored() {
        let status = TransferStatus::new(1, "x");
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        status.then(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        status.finish(&failure());
        status.finish(&success());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(status.state(), TransferState::Failed);
        assert!(status.error().unwrap().contains("boom"));
    }

    #[test]
    fn test_progress() {
        let status = TransferStatus::new(3, "x");
        status.set_progress(10, 40);
        assert_eq!(status.progress(), (10, 40));
    }

    #[test]
    fn test_empty_list_succeeds_immediately() {
        let list = TransferStatusList::new();
        assert!(list.is_finished());
        assert!(list.succeeded());

        let fired = Arc::new(Mutex::new(None));
        let f = Arc::clone(&fired);
        list.then(move |ok| *f.lock().unwrap() = Some(ok));
        assert_eq!(*fired.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_list_waits_for_all_members() {
        let a = TransferStatus::new(1, "a");
        let b = TransferStatus::new(2, "b");
        let list = TransferStatusList::new();
        list.push(Arc::clone(&a));
        list.push(Arc::clone(&b));

        let fired = Arc::new(Mutex::new(None));
        let f = Arc::clone(&fired);
        list.then(move |ok| *f.lock().unwrap() = Some(ok));

        a.finish(&success());
        assert_eq!(*fired.lock().unwrap(), None);
        assert!(!list.is_finished());

        b.finish(&failure());
        assert_eq!(*fired.lock().unwrap(), Some(false));
        assert!(list.is_finished());
        assert!(!list.succeeded());
        assert!(list.error().unwrap().contains("boom"));
    }

    #[test]
    fn test_list_extend() {
        let inner = TransferStatusList::new();
        let a = TransferStatus::new(1, "a");
        inner.push(Arc::clone(&a));

        let outer = TransferStatusList::new();
        outer.push(TransferStatus::new(2, "b"));
        outer.extend(&inner);
        assert_eq!(outer.len(), 2);

        a.finish(&success());
        assert!(inner.succeeded());
        assert!(!outer.is_finished());
    }
}
