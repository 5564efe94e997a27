//! SPARQL subset
//!
//! `SELECT` queries over a basic graph pattern, evaluated against a graph
//! and returned as a solution table. See [`parser`] for the accepted
//! grammar.

pub mod eval;
pub mod lexer;
pub mod parser;

use crate::graph::Graph;
use nodex_core::Result;
use nodex_engine::indexing::SolutionTable;

pub use parser::{parse, PatternTerm, Projection, SelectQuery, TriplePattern};

/// Parse and evaluate a query against a graph
///
/// # Errors
/// `Error::Query` when the query does not parse or is not a SELECT.
pub fn select(graph: &Graph, query: &str) -> Result<SolutionTable> {
    let parsed = parse(query)?;
    Ok(eval::evaluate(graph, &parsed))
}
