//! Index engines
//!
//! An [`Index`] owns one engine's persistent resources and hands out
//! per-session workers. Engines are built at startup from the `[[index]]`
//! entries of `nodex.toml` through an [`IndexFactory`] that maps each
//! [`IndexKind`] to a constructor.

use crate::database::config::IndexModuleConfig;
use crate::indexing::worker::IndexWorker;
use crate::indexing::IndexKind;
use nodex_core::{Error, Result, SessionId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a session's worker
pub type WorkerHandle = Arc<Mutex<dyn IndexWorker>>;

/// One index engine of a database instance
pub trait Index: Send + Sync {
    /// Engine kind
    fn kind(&self) -> IndexKind;

    /// Display name
    fn name(&self) -> &str;

    /// Open or create the engine's data under its directory
    ///
    /// # Errors
    /// `Error::Engine` when the data cannot be opened.
    fn open(&self) -> Result<()>;

    /// Persist and release the engine's resources
    fn close(&self) -> Result<()>;

    /// Persist pending changes
    fn sync(&self) -> Result<()>;

    /// Close the engine and delete its data
    fn remove(&self) -> Result<()>;

    /// Whether `open` succeeded and `close` has not been called
    fn is_open(&self) -> bool;

    /// The session's worker, created on first request
    fn worker(&self, session: SessionId) -> WorkerHandle;

    /// Drop the session's worker
    fn release(&self, session: SessionId);

    /// Consistency check through the session's worker
    fn check_index(&self, session: SessionId) -> bool {
        self.worker(session).lock().check_index()
    }
}

/// Builds an engine from its module configuration and data directory
pub type IndexConstructor = fn(&IndexModuleConfig, &Path) -> Result<Arc<dyn Index>>;

/// Startup registration table: which constructor serves which kind
#[derive(Default, Clone)]
pub struct IndexFactory {
    constructors: BTreeMap<IndexKind, IndexConstructor>,
}

impl IndexFactory {
    /// Table with no engines
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for a kind, replacing any earlier one
    pub fn register(&mut self, kind: IndexKind, constructor: IndexConstructor) -> &mut Self {
        self.constructors.insert(kind, constructor);
        self
    }

    /// Whether a kind can be built
    pub fn supports(&self, kind: IndexKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Build an engine; `data_dir` is the database's data directory
    ///
    /// # Errors
    /// `Error::Config` if no constructor is registered for the kind; whatever
    /// the constructor returns otherwise.
    pub fn build(&self, module: &IndexModuleConfig, data_dir: &Path) -> Result<Arc<dyn Index>> {
        let constructor = self.constructors.get(&module.kind).ok_or_else(|| {
            Error::config(format!("no index engine registered for '{}'", module.kind))
        })?;
        constructor(module, data_dir)
    }
}
