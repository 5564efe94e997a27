//! Indexing lifecycle tests
//!
//! End-to-end tests through a real database with the shipped engines:
//! - rdf: store, query, node removal, document and collection drops
//! - fulltext: rule-driven extraction, scoring, scans
//! - modes: the flush modes and their no-op cases
//! - config: collection configuration and `nodex.toml` handling

#[path = "../common/mod.rs"]
mod common;

mod config;
mod fulltext;
mod modes;
mod rdf;
