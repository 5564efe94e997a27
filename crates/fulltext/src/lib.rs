//! Full-text index engine for nodex
//!
//! This crate provides:
//! - Analyzer / tokenize: text analysis
//! - InvertedIndex: term → postings of (document, node, name, field, tf, boost)
//! - TextCollector: rule-driven text extraction from the node stream,
//!   honouring `ignore` and `inline` elements and attribute rules
//! - FullTextWorker / FullTextIndex: the engine plugged into the indexing
//!   framework as the `fulltext` index kind
//!
//! # Usage
//!
//! ```ignore
//! let mut factory = IndexFactory::new();
//! factory.register(IndexKind::FullText, FullTextIndex::build);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod index;
pub mod postings;
pub mod tokenizer;
pub mod worker;

pub use collector::TextCollector;
pub use index::FullTextIndex;
pub use postings::{InvertedIndex, NodeText, PostingEntry, PostingList};
pub use tokenizer::{tokenize, tokenize_unique, Analyzer};
pub use worker::FullTextWorker;
