//! Triple-store engine
//!
//! Owns the dataset shared by every session's worker. The dataset lives in
//! memory and is written as JSON to `<data>/tdb/dataset.json` on `sync` and
//! `close`, and read back on `open`.

use crate::graph::{DatasetSnapshot, TripleStore};
use crate::worker::RdfWorker;
use nodex_core::{Error, Result, SessionId};
use nodex_engine::indexing::{Index, IndexKind, WorkerHandle, WorkerRegistry};
use nodex_engine::IndexModuleConfig;
use std::fmt;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Directory below the data directory holding the engine's files
pub const DIR_NAME: &str = "tdb";

/// Dataset file name
pub const DATASET_FILE: &str = "dataset.json";

/// Module option selecting the file access mode
pub const FILE_MODE_OPTION: &str = "file_mode";

/// Module option enabling query logging
pub const LOG_EXEC_OPTION: &str = "log_exec";

/// How the dataset file is accessed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Memory-mapped access
    #[default]
    Mapped,
    /// Direct file I/O
    Direct,
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mapped" => Ok(FileMode::Mapped),
            "direct" => Ok(FileMode::Direct),
            other => Err(Error::config(format!(
                "invalid {} '{}': expected 'mapped' or 'direct'",
                FILE_MODE_OPTION, other
            ))),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMode::Mapped => write!(f, "mapped"),
            FileMode::Direct => write!(f, "direct"),
        }
    }
}

/// The triple-store engine of one database
pub struct RdfIndex {
    name: String,
    dir: PathBuf,
    file_mode: FileMode,
    log_exec: bool,
    store: Arc<TripleStore>,
    workers: WorkerRegistry<RdfWorker>,
    opened: AtomicBool,
}

impl RdfIndex {
    /// Engine storing its files below `data_dir`
    pub fn new(name: impl Into<String>, data_dir: &Path) -> Self {
        RdfIndex {
            name: name.into(),
            dir: data_dir.join(DIR_NAME),
            file_mode: FileMode::default(),
            log_exec: false,
            store: Arc::new(TripleStore::new()),
            workers: WorkerRegistry::new(),
            opened: AtomicBool::new(false),
        }
    }

    /// Constructor registered with an `IndexFactory`
    ///
    /// # Errors
    /// `Error::Config` for an unknown `file_mode`.
    pub fn build(module: &IndexModuleConfig, data_dir: &Path) -> Result<Arc<dyn Index>> {
        let file_mode = match module.option(FILE_MODE_OPTION) {
            Some(mode) => mode.parse()?,
            None => FileMode::default(),
        };
        let mut index = Self::new(module.name(), data_dir);
        index.file_mode = file_mode;
        index.log_exec = module.flag(LOG_EXEC_OPTION);
        Ok(Arc::new(index))
    }

    /// Path of the dataset file
    pub fn dataset_path(&self) -> PathBuf {
        self.dir.join(DATASET_FILE)
    }

    /// Configured file access mode
    pub fn file_mode(&self) -> FileMode {
        self.file_mode
    }

    /// Whether queries are logged
    pub fn log_exec(&self) -> bool {
        self.log_exec
    }

    /// The shared dataset
    pub fn store(&self) -> &Arc<TripleStore> {
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
        let path = self.dataset_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, self.store.to_json()?)?;
        fs::rename(&tmp, &path)?;
        debug!(target: "nodex::rdf", path = ?path, version = self.store.version(), "Dataset written");
        Ok(())
    }
}

impl Index for RdfIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Rdf
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::engine(format!("cannot create {}: {}", self.dir.display(), e)))?;
        let path = self.dataset_path();
        if path.exists() {
            let file = fs::File::open(&path)?;
            let snapshot: DatasetSnapshot = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::engine(format!("corrupt dataset file {}: {}", path.display(), e)))?;
            self.store.restore(snapshot);
        }
        self.opened.store(true, Ordering::SeqCst);
        info!(
            target: "nodex::rdf",
            dir = ?self.dir,
            file_mode = %self.file_mode,
            graphs = self.store.graph_names().len(),
            "Triple store opened"
        );
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.opened.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.write()?;
        self.workers.clear();
        info!(target: "nodex::rdf", dir = ?self.dir, "Triple store closed");
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
        info!(target: "nodex::rdf", dir = ?self.dir, "Triple store removed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    fn worker(&self, session: SessionId) -> WorkerHandle {
        self.workers.get_or_create(session, || {
            RdfWorker::new(Arc::clone(&self.store)).with_log_exec(self.log_exec)
        })
    }

    fn release(&self, session: SessionId) {
        self.workers.release(session);
    }
}
