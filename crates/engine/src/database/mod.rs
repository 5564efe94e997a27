//! Database instance
//!
//! A `Database` owns everything shared by the sessions of one data directory:
//! the loaded index engines, the transaction manager, the document locks and
//! the collections. Work happens through [`Session`]s, each of which owns its
//! own index workers.

pub mod config;
pub mod registry;
pub mod session;

pub use config::{DatabaseConfig, IndexModuleConfig, CONFIG_FILE_NAME};
pub use registry::is_open;
pub use session::Session;

use crate::indexing::{IndexFactory, IndexManager, IndexSpec};
use crate::storage::{Collection, Resource};
use registry::OPEN_DATABASES;
use nodex_concurrency::{DocumentLockManager, TransactionManager};
use nodex_core::{DocumentId, Error, Result, SessionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// One database instance
pub struct Database {
    data_dir: PathBuf,
    config: DatabaseConfig,
    indexes: IndexManager,
    transactions: TransactionManager,
    locks: DocumentLockManager,
    collections: RwLock<BTreeMap<String, Collection>>,
    next_document_id: AtomicU64,
    next_session_id: AtomicU64,
    shut_down: AtomicBool,
}

impl Database {
    /// Open the database in `path`, creating the directory and a default
    /// `nodex.toml` if needed.
    ///
    /// Opening a path that is already open returns the existing instance.
    ///
    /// # Errors
    /// `Error::Config` for an unreadable configuration; whatever the first
    /// failing engine returns otherwise.
    pub fn open<P: AsRef<Path>>(path: P, factory: &IndexFactory) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        DatabaseConfig::write_default_if_missing(&config_path)?;
        let config = DatabaseConfig::from_file(&config_path)?;

        Self::open_with_config(data_dir, config, factory)
    }

    /// Open the database in `path` with an explicit configuration; the
    /// config file is neither read nor written.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: DatabaseConfig,
        factory: &IndexFactory,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        // Create directory first so we can canonicalize the path
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let canonical_path = data_dir.canonicalize()?;

        // Hold the registry lock for the whole open so only one thread builds
        // an instance for a given path.
        let mut registry = OPEN_DATABASES.lock();
        if let Some(db) = registry.live(&canonical_path) {
            info!(target: "nodex::db", path = ?canonical_path, "Returning existing database instance");
            return Ok(db);
        }

        let indexes = IndexManager::open(&config, factory, &canonical_path)?;
        let db = Arc::new(Database {
            locks: DocumentLockManager::new(config.lock_timeout()),
            data_dir: canonical_path.clone(),
            config,
            indexes,
            transactions: TransactionManager::new(),
            collections: RwLock::new(BTreeMap::new()),
            next_document_id: AtomicU64::new(1),
            next_session_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        });
        registry.insert(canonical_path.clone(), &db);

        info!(
            target: "nodex::db",
            path = ?canonical_path,
            indexes = db.indexes.indexes().len(),
            "Database opened"
        );
        Ok(db)
    }

    /// Start a session with its own index workers
    pub fn session(self: &Arc<Self>) -> Session {
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        Session::new(Arc::clone(self), id)
    }

    /// Canonical data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Configuration the instance was opened with
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Loaded engines
    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    /// Transaction manager
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Document locks
    pub fn locks(&self) -> &DocumentLockManager {
        &self.locks
    }

    pub(crate) fn collections(&self) -> &RwLock<BTreeMap<String, Collection>> {
        &self.collections
    }

    pub(crate) fn allocate_document_id(&self) -> DocumentId {
        DocumentId(self.next_document_id.fetch_add(1, Ordering::Relaxed))
    }

    /// URIs of every collection
    pub fn collection_uris(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Index configuration in effect for a collection: its own, or the
    /// nearest configured ancestor's
    pub fn spec_for(&self, collection: &str) -> Option<Arc<IndexSpec>> {
        let collections = self.collections.read();
        let mut uri = collection;
        loop {
            if let Some(spec) = collections.get(uri).and_then(Collection::spec) {
                return Some(Arc::clone(spec));
            }
            match uri.rfind('/') {
                Some(0) if uri.len() > 1 => uri = "/",
                Some(pos) if pos > 0 => uri = &uri[..pos],
                _ => return None,
            }
        }
    }

    /// Resource stored under `uri`
    pub fn resource(&self, uri: &str) -> Option<Resource> {
        let (collection, name) = split_uri(uri).ok()?;
        self.collections
            .read()
            .get(collection)
            .and_then(|c| c.get(name))
            .cloned()
    }

    /// Persist every engine
    pub fn sync(&self) -> Result<()> {
        self.indexes.sync_all()
    }

    /// Persist and close every engine and leave the registry. Calling it
    /// again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.indexes.sync_all().and(self.indexes.close_all());
        OPEN_DATABASES.lock().release(&self.data_dir, self);
        info!(target: "nodex::db", path = ?self.data_dir, "Database shut down");
        result
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::invalid_operation(format!(
                "database at '{}' is shut down",
                self.data_dir.display()
            )));
        }
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.shut_down.load(Ordering::SeqCst) {
            if let Err(e) = self.shutdown() {
                warn!(target: "nodex::db", error = %e, "Shutdown on drop failed");
            }
        }
    }
}

/// Split an absolute resource URI into collection URI and file name
pub(crate) fn split_uri(uri: &str) -> Result<(&str, &str)> {
    match uri.rfind('/') {
        Some(pos) if uri.starts_with('/') && pos + 1 < uri.len() => {
            let collection = if pos == 0 { "/" } else { &uri[..pos] };
            Ok((collection, &uri[pos + 1..]))
        }
        _ => Err(Error::invalid_operation(format!(
            "'{}' is not an absolute resource URI",
            uri
        ))),
    }
}

/// Join a collection URI and a file name
pub(crate) fn join_uri(collection: &str, name: &str) -> String {
    format!("{}/{}", collection.trim_end_matches('/'), name)
}
