//! Core types for nodex
//!
//! This crate defines the identity primitives used throughout the system:
//! - QName: namespace-qualified element/attribute names
//! - NodePath: ancestor chains and compiled path patterns
//! - NodeId: hierarchical node identity with storage-free parent derivation
//! - Element / Attribute / Text: node views delivered to stream listeners
//! - DocumentRef, DocumentId, SessionId: document and worker-context identity
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod node;
pub mod node_id;
pub mod node_path;
pub mod qname;
pub mod types;

pub use error::{Error, Result};
pub use node::{AttrType, Attribute, Element, Text, TextKind};
pub use node_id::NodeId;
pub use node_path::{NodePath, PathComponent};
pub use qname::{NameKind, Namespaces, QName, XML_NS};
pub use types::{DocumentId, DocumentRef, SessionId};
