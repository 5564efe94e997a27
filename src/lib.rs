//! nodex - pluggable secondary indexing for a native XML database
//!
//! Documents live in collections; each collection's configuration names the
//! index engines that see its documents and the rules selecting what they
//! index. Every document mutation is streamed through the configured
//! engines' workers and flushed in one of the modes `Store`, `RemoveAll`,
//! `RemoveSome` or `RemoveBinary`.
//!
//! # Quick Start
//!
//! ```ignore
//! use nodex::{open, IndexKind};
//!
//! let db = nodex::open("/tmp/nodex")?;
//! let session = db.session();
//! let txn = session.begin();
//! session.set_collection_config(&txn, "/db/rdf", "<collection><index><rdf/></index></collection>")?;
//! session.store_document(&txn, "/db/rdf", "a.xml", xml)?;
//! let rows = session.query(IndexKind::Rdf, "SELECT ?s WHERE { ?s ?p ?o }")?;
//! ```
//!
//! # Architecture
//!
//! - [`nodex_core`]: names, paths, node ids and the error type
//! - [`nodex_concurrency`]: transactions and document locks
//! - [`nodex_engine`]: the indexing framework, storage driver and sessions
//! - [`nodex_fulltext`], [`nodex_rdf`]: the shipped engines

use std::path::Path;
use std::sync::Arc;

pub use nodex_core::{DocumentId, DocumentRef, Error, NodeId, NodePath, QName, Result, SessionId};
pub use nodex_engine::indexing::{NodeSet, Occurrences, ScanHints, SolutionTable};
pub use nodex_engine::{
    Database, DatabaseConfig, Index, IndexConfig, IndexController, IndexFactory, IndexKind,
    IndexManager, IndexMatchRule, IndexModuleConfig, IndexSpec, IndexWorker, Mode, QueryResult,
    Session, StreamListener,
};
pub use nodex_fulltext::FullTextIndex;
pub use nodex_rdf::RdfIndex;

/// Factory with every shipped engine registered
pub fn default_factory() -> IndexFactory {
    let mut factory = IndexFactory::new();
    factory
        .register(IndexKind::FullText, FullTextIndex::build)
        .register(IndexKind::Rdf, RdfIndex::build);
    factory
}

/// Open a database with the shipped engines, reading `nodex.toml` from
/// `path` (a default one is written if missing)
pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Database>> {
    Database::open(path, &default_factory())
}

/// Open a database with the shipped engines and an explicit configuration
pub fn open_with_config<P: AsRef<Path>>(path: P, config: DatabaseConfig) -> Result<Arc<Database>> {
    Database::open_with_config(path, config, &default_factory())
}
