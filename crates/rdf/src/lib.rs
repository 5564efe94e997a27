//! Triple-store index engine for nodex
//!
//! This crate provides:
//! - Term / Triple: RDF terms in N-Triples form
//! - Graph / TripleStore: one named graph per document, queried as a union
//! - RdfXmlSink: a streaming RDF/XML reader fed by the node stream
//! - sparql: a SELECT-over-basic-graph-pattern subset of SPARQL
//! - RdfWorker / RdfIndex: the engine plugged into the indexing framework as
//!   the `rdf` index kind
//!
//! # Usage
//!
//! ```ignore
//! let mut factory = IndexFactory::new();
//! factory.register(IndexKind::Rdf, RdfIndex::build);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod index;
pub mod rdfxml;
pub mod sparql;
pub mod term;
pub mod worker;

pub use graph::{Graph, TripleStore};
pub use index::{FileMode, RdfIndex};
pub use rdfxml::RdfXmlSink;
pub use term::{Literal, Term, Triple, RDF_NS};
pub use worker::RdfWorker;
