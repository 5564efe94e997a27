//! Full-text engine
//!
//! Owns the inverted store shared by every session's worker. The store lives
//! in memory and is written to `<data>/fulltext/postings.bin` with `bincode`
//! on `sync` and `close`, and read back on `open`.

use crate::postings::{InvertedIndex, PostingsSnapshot};
use crate::worker::FullTextWorker;
use nodex_core::{Error, Result, SessionId};
use nodex_engine::indexing::{Index, IndexKind, WorkerHandle, WorkerRegistry};
use nodex_engine::IndexModuleConfig;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Directory below the data directory holding the engine's files
pub const DIR_NAME: &str = "fulltext";

/// Postings file name
pub const POSTINGS_FILE: &str = "postings.bin";

/// The full-text engine of one database
pub struct FullTextIndex {
    name: String,
    dir: PathBuf,
    store: Arc<InvertedIndex>,
    workers: WorkerRegistry<FullTextWorker>,
    opened: AtomicBool,
}

impl FullTextIndex {
    /// Engine storing its files below `data_dir`
    pub fn new(name: impl Into<String>, data_dir: &Path) -> Self {
        FullTextIndex {
            name: name.into(),
            dir: data_dir.join(DIR_NAME),
            store: Arc::new(InvertedIndex::new()),
            workers: WorkerRegistry::new(),
            opened: AtomicBool::new(false),
        }
    }

    /// Constructor registered with an `IndexFactory`
    pub fn build(module: &IndexModuleConfig, data_dir: &Path) -> Result<Arc<dyn Index>> {
        Ok(Arc::new(Self::new(module.name(), data_dir)))
    }

    /// Path of the postings file
    pub fn postings_path(&self) -> PathBuf {
        self.dir.join(POSTINGS_FILE)
    }

    /// The shared inverted store
    pub fn store(&self) -> &Arc<InvertedIndex> {
        &self.store
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::engine(format!("index '{}' is not open", self.name)));
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::engine(format!("cannot create {}: {}", self.dir.display(), e)))?;
        let path = self.postings_path();
        let tmp = path.with_extension("bin.tmp");
        {
            let file = fs::File::create(&tmp)?;
            bincode::serialize_into(BufWriter::new(file), &self.store.snapshot())?;
        }
        fs::rename(&tmp, &path)?;
        debug!(target: "nodex::fulltext", path = ?path, version = self.store.version(), "Postings written");
        Ok(())
    }
}

impl Index for FullTextIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::FullText
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::engine(format!("cannot create {}: {}", self.dir.display(), e)))?;
        let path = self.postings_path();
        if path.exists() {
            let file = fs::File::open(&path)?;
            let snapshot: PostingsSnapshot = bincode::deserialize_from(BufReader::new(file))
                .map_err(|e| Error::engine(format!("corrupt postings file {}: {}", path.display(), e)))?;
            self.store.restore(snapshot);
        }
        self.opened.store(true, Ordering::SeqCst);
        info!(target: "nodex::fulltext", dir = ?self.dir, terms = self.store.terms().len(), "Full-text index opened");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.opened.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.write()?;
        self.workers.clear();
        info!(target: "nodex::fulltext", dir = ?self.dir, "Full-text index closed");
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.ensure_open()?;
        self.write()
    }

    fn remove(&self) -> Result<()> {
        self.opened.store(false, Ordering::SeqCst);
        self.workers.clear();
        self.store.clear();
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .map_err(|e| Error::engine(format!("cannot remove {}: {}", self.dir.display(), e)))?;
        }
        info!(target: "nodex::fulltext", dir = ?self.dir, "Full-text index removed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn worker(&self, session: SessionId) -> WorkerHandle {
        self.workers
            .get_or_create(session, || FullTextWorker::new(Arc::clone(&self.store)))
    }

    fn release(&self, session: SessionId) {
        self.workers.release(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::NodeText;
    use nodex_core::{DocumentId, NodeId, QName};
    use tempfile::TempDir;

    fn add(index: &FullTextIndex, text: &str) {
        index.store().add(
            DocumentId(1),
            "/db/a.xml",
            NodeText {
                node_id: NodeId::root(),
                qname: QName::local("p"),
                field: None,
                terms: crate::tokenizer::tokenize(text),
                boost: 1.0,
            },
        );
    }

    #[test]
    fn test_postings_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let index = FullTextIndex::new("fulltext", dir.path());
        index.open().unwrap();
        add(&index, "persistent words");
        index.close().unwrap();
        assert!(index.postings_path().exists());

        let reopened = FullTextIndex::new("fulltext", dir.path());
        reopened.open().unwrap();
        assert_eq!(reopened.store().terms(), vec!["persistent", "words"]);
    }

    #[test]
    fn test_sync_requires_open() {
        let dir = TempDir::new().unwrap();
        let index = FullTextIndex::new("fulltext", dir.path());
        assert!(matches!(index.sync(), Err(Error::Engine(_))));
        index.open().unwrap();
        index.sync().unwrap();
    }

    #[test]
    fn test_corrupt_postings_fail_open() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(DIR_NAME)).unwrap();
        fs::write(dir.path().join(DIR_NAME).join(POSTINGS_FILE), [0xff; 3]).unwrap();
        let index = FullTextIndex::new("fulltext", dir.path());
        assert!(matches!(index.open(), Err(Error::Engine(_))));
        assert!(!index.is_open());
    }

    #[test]
    fn test_remove_deletes_files() {
        let dir = TempDir::new().unwrap();
        let index = FullTextIndex::new("fulltext", dir.path());
        index.open().unwrap();
        add(&index, "gone");
        index.sync().unwrap();
        index.remove().unwrap();
        assert!(!dir.path().join(DIR_NAME).exists());
        assert!(index.store().terms().is_empty());
    }

    #[test]
    fn test_one_worker_per_session() {
        let dir = TempDir::new().unwrap();
        let index = FullTextIndex::new("fulltext", dir.path());
        let a = index.worker(SessionId(1));
        let b = index.worker(SessionId(1));
        assert!(Arc::ptr_eq(&a, &b));
        index.release(SessionId(1));
        let c = index.worker(SessionId(1));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
