//! Document locks
//!
//! Readers take a shared lock on a document before querying index content
//! derived from it; a writer takes the exclusive lock for the whole mutation,
//! including the index flush. Nobody can therefore observe a document whose
//! structure and index state disagree.
//!
//! Guards own an `Arc` to the lock entry so they can be held across calls
//! without borrowing the manager. Entries are created on first use and live as
//! long as the manager.

use dashmap::DashMap;
use nodex_core::{DocumentId, Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

#[derive(Debug, Default)]
struct DocumentLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl DocumentLock {
    fn acquire(&self, exclusive: bool, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        loop {
            let free = if exclusive {
                !state.writer && state.readers == 0
            } else {
                !state.writer
            };
            if free {
                if exclusive {
                    state.writer = true;
                } else {
                    state.readers += 1;
                }
                return true;
            }
            if self.released.wait_until(&mut state, deadline).timed_out() {
                return false;
            }
        }
    }

    fn release(&self, exclusive: bool) {
        let mut state = self.state.lock();
        if exclusive {
            state.writer = false;
        } else {
            state.readers = state.readers.saturating_sub(1);
        }
        drop(state);
        self.released.notify_all();
    }
}

/// Shared lock on a document, released on drop
#[derive(Debug)]
pub struct DocumentReadGuard {
    lock: Arc<DocumentLock>,
    doc: DocumentId,
}

impl DocumentReadGuard {
    /// Locked document
    pub fn document(&self) -> DocumentId {
        self.doc
    }
}

impl Drop for DocumentReadGuard {
    fn drop(&mut self) {
        self.lock.release(false);
    }
}

/// Exclusive lock on a document, released on drop
#[derive(Debug)]
pub struct DocumentWriteGuard {
    lock: Arc<DocumentLock>,
    doc: DocumentId,
}

impl DocumentWriteGuard {
    /// Locked document
    pub fn document(&self) -> DocumentId {
        self.doc
    }
}

impl Drop for DocumentWriteGuard {
    fn drop(&mut self) {
        self.lock.release(true);
    }
}

/// Per-document shared/exclusive locks
pub struct DocumentLockManager {
    locks: DashMap<DocumentId, Arc<DocumentLock>>,
    timeout: Duration,
}

impl DocumentLockManager {
    /// Create a manager whose acquisitions give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        DocumentLockManager {
            locks: DashMap::new(),
            timeout,
        }
    }

    fn entry(&self, doc: DocumentId) -> Arc<DocumentLock> {
        Arc::clone(self.locks.entry(doc).or_default().value())
    }

    /// Acquire a shared lock
    ///
    /// # Errors
    /// `Error::LockTimeout` if a writer holds the document past the timeout.
    pub fn read(&self, doc: DocumentId) -> Result<DocumentReadGuard> {
        let lock = self.entry(doc);
        if !lock.acquire(false, Instant::now() + self.timeout) {
            return Err(Error::LockTimeout(doc.to_string()));
        }
        trace!(target: "nodex::lock", doc = %doc, "Read lock acquired");
        Ok(DocumentReadGuard { lock, doc })
    }

    /// Acquire the exclusive lock
    ///
    /// # Errors
    /// `Error::LockTimeout` if readers or another writer hold the document
    /// past the timeout.
    pub fn write(&self, doc: DocumentId) -> Result<DocumentWriteGuard> {
        let lock = self.entry(doc);
        if !lock.acquire(true, Instant::now() + self.timeout) {
            return Err(Error::LockTimeout(doc.to_string()));
        }
        trace!(target: "nodex::lock", doc = %doc, "Write lock acquired");
        Ok(DocumentWriteGuard { lock, doc })
    }

    /// Drop the lock entry of a removed document
    pub fn forget(&self, doc: DocumentId) {
        self.locks.remove(&doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn manager() -> DocumentLockManager {
        DocumentLockManager::new(Duration::from_millis(50))
    }

    #[test]
    fn test_readers_share() {
        let locks = manager();
        let a = locks.read(DocumentId(1)).unwrap();
        let b = locks.read(DocumentId(1)).unwrap();
        assert_eq!(a.document(), b.document());
    }

    #[test]
    fn test_writer_excludes_readers() {
        let locks = manager();
        let _w = locks.write(DocumentId(1)).unwrap();
        assert!(matches!(
            locks.read(DocumentId(1)),
            Err(Error::LockTimeout(_))
        ));
        // other documents are unaffected
        assert!(locks.read(DocumentId(2)).is_ok());
    }

    #[test]
    fn test_reader_excludes_writer() {
        let locks = manager();
        let r = locks.read(DocumentId(1)).unwrap();
        assert!(locks.write(DocumentId(1)).is_err());
        drop(r);
        assert!(locks.write(DocumentId(1)).is_ok());
    }

    #[test]
    fn test_waiting_writer_wakes_on_release() {
        let locks = Arc::new(DocumentLockManager::new(Duration::from_secs(5)));
        let guard = locks.read(DocumentId(1)).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handle = {
            let locks = Arc::clone(&locks);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                locks.write(DocumentId(1)).map(|g| g.document())
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert_eq!(handle.join().unwrap().unwrap(), DocumentId(1));
    }
}
