//! Open instances by data directory
//!
//! A data directory holds the files of every loaded index engine, so at most
//! one `Database` may serve it. Entries are weak: once the last handle to an
//! instance is dropped its entry is dead and the next open loads the engines
//! again.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use super::Database;

/// Instances keyed by canonical data directory
#[derive(Default)]
pub(crate) struct Instances {
    by_dir: HashMap<PathBuf, Weak<Database>>,
}

impl Instances {
    /// Live instance serving `dir`; a dead entry is dropped
    pub(crate) fn live(&mut self, dir: &Path) -> Option<Arc<Database>> {
        let db = self.by_dir.get(dir).and_then(Weak::upgrade);
        if db.is_none() {
            self.by_dir.remove(dir);
        }
        db
    }

    pub(crate) fn insert(&mut self, dir: PathBuf, db: &Arc<Database>) {
        self.by_dir.insert(dir, Arc::downgrade(db));
    }

    /// Drop the entry for `dir` if it still points at `db`. A newer
    /// instance registered for the same directory is left alone.
    pub(crate) fn release(&mut self, dir: &Path, db: &Database) -> bool {
        let owned = self
            .by_dir
            .get(dir)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), db));
        if owned {
            self.by_dir.remove(dir);
        }
        owned
    }
}

/// Process-wide registry; held for the whole of an open
pub(crate) static OPEN_DATABASES: Lazy<Mutex<Instances>> =
    Lazy::new(|| Mutex::new(Instances::default()));

/// Whether a live instance serves the canonical data directory `dir`
pub fn is_open(dir: &Path) -> bool {
    // release the guard before the handle; a last handle shuts down on drop
    let live = OPEN_DATABASES.lock().live(dir);
    live.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::testing::recording_factory;
    use tempfile::TempDir;

    #[test]
    fn test_shutdown_leaves_registry() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path(), &recording_factory()).unwrap();
        assert!(is_open(db.data_dir()));
        db.shutdown().unwrap();
        assert!(!is_open(db.data_dir()));
    }

    #[test]
    fn test_dropped_instance_is_dead() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path(), &recording_factory()).unwrap();
        let data_dir = db.data_dir().to_path_buf();
        drop(db);
        assert!(!is_open(&data_dir));
    }

    #[test]
    fn test_release_ignores_newer_instance() {
        let dir = TempDir::new().unwrap();
        let old = Database::open(dir.path(), &recording_factory()).unwrap();
        old.shutdown().unwrap();
        let new = Database::open(dir.path(), &recording_factory()).unwrap();

        assert!(!OPEN_DATABASES.lock().release(new.data_dir(), &old));
        assert!(is_open(new.data_dir()));
        new.shutdown().unwrap();
    }
}
