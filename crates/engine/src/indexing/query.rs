//! Query results returned by engine query entry points

use nodex_core::NodeId;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A full-text hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// URI of the document containing the node
    pub document: String,
    /// Indexed node
    pub node_id: NodeId,
    /// Relevance score, higher is better
    pub score: f32,
}

/// SELECT solutions: a variable header plus one binding map per row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolutionTable {
    /// Projected variables, without the leading `?`
    pub variables: Vec<String>,
    /// Bound values per row; unbound variables are absent
    pub rows: Vec<BTreeMap<String, String>>,
}

impl SolutionTable {
    /// Values bound to one variable, row by row
    pub fn column(&self, variable: &str) -> Vec<Option<&str>> {
        self.rows
            .iter()
            .map(|row| row.get(variable).map(String::as_str))
            .collect()
    }

    /// Render in the SPARQL query results XML format
    pub fn to_xml(&self) -> String {
        let mut out = String::from(
            "<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n  <head>\n",
        );
        for v in &self.variables {
            let _ = writeln!(out, "    <variable name=\"{}\"/>", escape(v));
        }
        out.push_str("  </head>\n  <results>\n");
        for row in &self.rows {
            out.push_str("    <result>\n");
            for v in &self.variables {
                if let Some(value) = row.get(v) {
                    let _ = writeln!(
                        out,
                        "      <binding name=\"{}\">{}</binding>",
                        escape(v),
                        render_term(value)
                    );
                }
            }
            out.push_str("    </result>\n");
        }
        out.push_str("  </results>\n</sparql>\n");
        out
    }
}

fn render_term(value: &str) -> String {
    if let Some(label) = value.strip_prefix("_:") {
        format!("<bnode>{}</bnode>", escape(label))
    } else if let Some(iri) = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
        format!("<uri>{}</uri>", escape(iri))
    } else {
        let lexical = value
            .strip_prefix('"')
            .and_then(|v| v.rsplit_once('"').map(|(l, _)| l))
            .unwrap_or(value);
        format!("<literal>{}</literal>", escape(lexical))
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Result of an engine query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Ranked nodes
    Hits(Vec<QueryHit>),
    /// Variable bindings
    Solutions(SolutionTable),
}

impl QueryResult {
    /// Number of hits or rows
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Hits(h) => h.len(),
            QueryResult::Solutions(s) => s.rows.len(),
        }
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hits, if this is a full-text result
    pub fn hits(&self) -> Option<&[QueryHit]> {
        match self {
            QueryResult::Hits(h) => Some(h),
            QueryResult::Solutions(_) => None,
        }
    }

    /// Solutions, if this is a SELECT result
    pub fn solutions(&self) -> Option<&SolutionTable> {
        match self {
            QueryResult::Solutions(s) => Some(s),
            QueryResult::Hits(_) => None,
        }
    }
}
