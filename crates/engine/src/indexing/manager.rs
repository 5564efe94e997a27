//! Index manager
//!
//! Holds the engines of one database instance, in configuration order, and
//! drives their lifecycle: open at startup, sync, close at shutdown, release
//! of a closing session's workers.

use crate::database::config::DatabaseConfig;
use crate::indexing::controller::IndexController;
use crate::indexing::index::{Index, IndexFactory};
use crate::indexing::IndexKind;
use nodex_core::{Result, SessionId};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Loaded engines of a database instance
pub struct IndexManager {
    indexes: Vec<Arc<dyn Index>>,
}

impl IndexManager {
    /// Manager over already constructed engines
    pub fn new(indexes: Vec<Arc<dyn Index>>) -> Self {
        IndexManager { indexes }
    }

    /// Build and open every engine listed in `config`.
    ///
    /// # Errors
    /// Fails on the first engine that cannot be built or opened; engines
    /// opened before it are closed again.
    pub fn open(config: &DatabaseConfig, factory: &IndexFactory, data_dir: &Path) -> Result<Self> {
        let mut indexes: Vec<Arc<dyn Index>> = Vec::with_capacity(config.indexes.len());
        for module in &config.indexes {
            let opened = factory
                .build(module, data_dir)
                .and_then(|index| index.open().map(|_| index));
            match opened {
                Ok(index) => {
                    info!(target: "nodex::index", kind = %module.kind, name = index.name(), "Index opened");
                    indexes.push(index);
                }
                Err(e) => {
                    error!(target: "nodex::index", kind = %module.kind, error = %e, "Failed to open index");
                    for index in &indexes {
                        let _ = index.close();
                    }
                    return Err(e);
                }
            }
        }
        Ok(IndexManager { indexes })
    }

    /// Engines in configuration order
    pub fn indexes(&self) -> &[Arc<dyn Index>] {
        &self.indexes
    }

    /// Engine of a kind, if loaded
    pub fn index(&self, kind: IndexKind) -> Option<&Arc<dyn Index>> {
        self.indexes.iter().find(|i| i.kind() == kind)
    }

    /// Controller over the session's workers
    pub fn controller(&self, session: SessionId) -> IndexController {
        IndexController::new(self, session)
    }

    /// Drop the session's workers in every engine
    pub fn release_session(&self, session: SessionId) {
        for index in &self.indexes {
            index.release(session);
        }
    }

    /// Persist every engine.
    ///
    /// # Errors
    /// Returns the first failure after trying every engine.
    pub fn sync_all(&self) -> Result<()> {
        self.each(|index| index.sync())
    }

    /// Close every engine.
    ///
    /// # Errors
    /// Returns the first failure after trying every engine.
    pub fn close_all(&self) -> Result<()> {
        self.each(|index| index.close())
    }

    /// Close every engine and delete its data.
    ///
    /// # Errors
    /// Returns the first failure after trying every engine.
    pub fn remove_all(&self) -> Result<()> {
        self.each(|index| index.remove())
    }

    fn each(&self, op: impl Fn(&dyn Index) -> Result<()>) -> Result<()> {
        let mut first_error = None;
        for index in &self.indexes {
            if let Err(e) = op(index.as_ref()) {
                error!(target: "nodex::index", kind = %index.kind(), error = %e, "Index operation failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::config::IndexModuleConfig;
    use crate::indexing::testing::{recording_factory, RecordingIndex};
    use nodex_core::Error;
    use tempfile::TempDir;

    #[test]
    fn test_open_builds_configured_engines_in_order() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&DatabaseConfig::default(), &recording_factory(), dir.path()).unwrap();
        let kinds: Vec<_> = manager.indexes().iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec![IndexKind::FullText, IndexKind::Rdf]);
        assert!(manager.index(IndexKind::Rdf).unwrap().is_open());
    }

    #[test]
    fn test_unregistered_kind_fails_open() {
        let dir = TempDir::new().unwrap();
        let mut factory = IndexFactory::new();
        factory.register(IndexKind::FullText, RecordingIndex::build);
        let result = IndexManager::open(&DatabaseConfig::default(), &factory, dir.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_failed_open_is_engine_error() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            lock_timeout_ms: 10,
            indexes: vec![
                IndexModuleConfig::new(IndexKind::FullText),
                IndexModuleConfig::new(IndexKind::Rdf).with_option("fail_open", "true"),
            ],
        };
        let result = IndexManager::open(&config, &recording_factory(), dir.path());
        assert!(matches!(result, Err(Error::Engine(_))));
    }

    #[test]
    fn test_release_and_close() {
        let dir = TempDir::new().unwrap();
        let manager = IndexManager::open(&DatabaseConfig::default(), &recording_factory(), dir.path()).unwrap();
        let _controller = manager.controller(SessionId(4));
        manager.release_session(SessionId(4));
        manager.sync_all().unwrap();
        manager.close_all().unwrap();
        assert!(manager.indexes().iter().all(|i| !i.is_open()));
    }
}
