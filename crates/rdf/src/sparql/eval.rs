//! Basic graph pattern evaluation
//!
//! Patterns are joined left to right by nested loops over the graph; each
//! solution binds variables to terms. There is no planner, so the pattern
//! order of the query is the join order.

use super::parser::{PatternTerm, SelectQuery, TriplePattern};
use crate::graph::Graph;
use crate::term::Term;
use nodex_engine::indexing::SolutionTable;
use std::collections::{BTreeMap, HashSet};

/// Variable bindings of one solution
pub type Bindings = BTreeMap<String, Term>;

fn resolve<'a>(term: &'a PatternTerm, bindings: &'a Bindings) -> Option<&'a Term> {
    match term {
        PatternTerm::Term(t) => Some(t),
        PatternTerm::Var(v) => bindings.get(v),
    }
}

fn bind(bindings: &mut Bindings, term: &PatternTerm, value: &Term) -> bool {
    match term {
        PatternTerm::Term(t) => t == value,
        PatternTerm::Var(v) => match bindings.get(v) {
            Some(bound) => bound == value,
            None => {
                bindings.insert(v.clone(), value.clone());
                true
            }
        },
    }
}

fn extend(graph: &Graph, pattern: &TriplePattern, solutions: Vec<Bindings>) -> Vec<Bindings> {
    let mut out = Vec::new();
    for solution in solutions {
        let s = resolve(&pattern.subject, &solution);
        let p = resolve(&pattern.predicate, &solution);
        let o = resolve(&pattern.object, &solution);
        for triple in graph.matching(s, p, o) {
            let mut next = solution.clone();
            // a variable repeated within the pattern must bind consistently
            if bind(&mut next, &pattern.subject, &triple.subject)
                && bind(&mut next, &pattern.predicate, &triple.predicate)
                && bind(&mut next, &pattern.object, &triple.object)
            {
                out.push(next);
            }
        }
    }
    out
}

/// Every solution of the query's pattern, before projection
pub fn solutions(graph: &Graph, query: &SelectQuery) -> Vec<Bindings> {
    let mut current = vec![Bindings::new()];
    for pattern in &query.patterns {
        if current.is_empty() {
            break;
        }
        current = extend(graph, pattern, current);
    }
    current
}

/// Evaluate a SELECT query: join, project, deduplicate, slice
pub fn evaluate(graph: &Graph, query: &SelectQuery) -> SolutionTable {
    let variables = query.variables();
    let mut seen = HashSet::new();
    let rows = solutions(graph, query)
        .into_iter()
        .map(|bindings| {
            variables
                .iter()
                .filter_map(|v| bindings.get(v).map(|t| (v.clone(), t.to_string())))
                .collect::<BTreeMap<String, String>>()
        })
        .filter(|row| !query.distinct || seen.insert(row.clone()))
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    SolutionTable { variables, rows }
}
