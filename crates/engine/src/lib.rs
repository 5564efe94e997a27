//! Database engine for nodex
//!
//! This crate ties the lower layers together:
//! - Database / Session: open instances, collections and document mutations
//! - indexing: the pluggable secondary-index framework every engine plugs into
//! - storage: the in-memory document store that replays node events
//! - xml: namespace-aware parsing of configuration fragments
//!
//! Engines (full-text, RDF) live in their own crates and are registered with
//! an [`IndexFactory`] before a database is opened.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod indexing;
pub mod storage;
pub mod xml;

pub use database::{Database, DatabaseConfig, IndexModuleConfig, Session, CONFIG_FILE_NAME};
pub use indexing::{
    Index, IndexConfig, IndexController, IndexFactory, IndexKind, IndexManager, IndexMatchRule,
    IndexSpec, IndexWorker, Mode, QueryResult, StreamListener,
};
pub use storage::{Collection, Document, Resource};
pub use xml::ConfigNode;
