//! SELECT query parser
//!
//! Recursive descent over the token stream. Supports a prologue of `BASE`
//! and `PREFIX` declarations and
//! `SELECT [DISTINCT|REDUCED] (vars|*) [WHERE] { triples } [LIMIT n] [OFFSET n]`
//! where the group holds a basic graph pattern with the usual `;` and `,`
//! abbreviations. Other query forms are rejected.

use super::lexer::{line_col, tokenize, Token, TokenKind};
use crate::term::{rdf_type, resolve_iri, Term};
use nodex_core::{Error, Result};
use std::collections::BTreeMap;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Position in a triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    /// Variable, without the sigil. Blank nodes in patterns become
    /// variables named `_:label`.
    Var(String),
    /// Fixed term
    Term(Term),
}

impl PatternTerm {
    /// Variable name, if this is one
    pub fn var(&self) -> Option<&str> {
        match self {
            PatternTerm::Var(v) => Some(v),
            PatternTerm::Term(_) => None,
        }
    }
}

/// One triple pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    /// Subject position
    pub subject: PatternTerm,
    /// Predicate position
    pub predicate: PatternTerm,
    /// Object position
    pub object: PatternTerm,
}

/// What a SELECT projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`: every named variable of the pattern
    All,
    /// Listed variables, in order
    Vars(Vec<String>),
}

/// A parsed SELECT query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Duplicate rows removed
    pub distinct: bool,
    /// Projection
    pub projection: Projection,
    /// Basic graph pattern
    pub patterns: Vec<TriplePattern>,
    /// Maximum number of rows
    pub limit: Option<usize>,
    /// Rows skipped before the first returned one
    pub offset: usize,
}

impl SelectQuery {
    /// Named variables of the pattern in order of first appearance
    pub fn pattern_variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = Vec::new();
        for pattern in &self.patterns {
            for term in [&pattern.subject, &pattern.predicate, &pattern.object] {
                if let Some(v) = term.var() {
                    if !v.starts_with("_:") && !vars.iter().any(|known| known == v) {
                        vars.push(v.to_string());
                    }
                }
            }
        }
        vars
    }

    /// Projected variables
    pub fn variables(&self) -> Vec<String> {
        match &self.projection {
            Projection::All => self.pattern_variables(),
            Projection::Vars(vars) => vars.clone(),
        }
    }
}

/// Parse a SELECT query
///
/// # Errors
/// `Error::Query` for lexical and syntax errors, undeclared prefixes and
/// query forms other than SELECT.
pub fn parse(query: &str) -> Result<SelectQuery> {
    let tokens = tokenize(query)?;
    Parser {
        text: query,
        tokens,
        pos: 0,
        base: String::new(),
        prefixes: BTreeMap::new(),
    }
    .query()
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    base: String,
    prefixes: BTreeMap<String, String>,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: impl std::fmt::Display) -> Error {
        let start = self.tokens.get(self.pos).map_or(self.text.len(), |t| t.start);
        let (line, col) = line_col(self.text, start);
        Error::query(format!("{} at line {}, column {}", message, line, col))
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if k == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenKind, what: &str) -> Result<()> {
        if *self.peek() == expected {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn query(mut self) -> Result<SelectQuery> {
        self.prologue()?;
        match self.peek().clone() {
            TokenKind::Keyword(k) if k == "SELECT" => {
                self.pos += 1;
                self.select()
            }
            TokenKind::Keyword(k) if matches!(k.as_str(), "ASK" | "CONSTRUCT" | "DESCRIBE") => {
                Err(Error::query(format!("SPARQL query type not supported: {}", k)))
            }
            _ => Err(self.error("expected SELECT")),
        }
    }

    fn prologue(&mut self) -> Result<()> {
        loop {
            if self.eat_keyword("BASE") {
                match self.advance() {
                    TokenKind::Iri(iri) => self.base = resolve_iri(&self.base, &iri),
                    _ => return Err(self.error("expected IRI after BASE")),
                }
            } else if self.eat_keyword("PREFIX") {
                let prefix = match self.advance() {
                    TokenKind::PrefixNs(prefix) => prefix,
                    _ => return Err(self.error("expected prefix name after PREFIX")),
                };
                match self.advance() {
                    TokenKind::Iri(iri) => {
                        let iri = resolve_iri(&self.base, &iri);
                        self.prefixes.insert(prefix, iri);
                    }
                    _ => return Err(self.error("expected IRI after prefix name")),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn select(&mut self) -> Result<SelectQuery> {
        let distinct = self.eat_keyword("DISTINCT") || self.eat_keyword("REDUCED");

        let projection = if *self.peek() == TokenKind::Star {
            self.pos += 1;
            Projection::All
        } else {
            let mut vars = Vec::new();
            while let TokenKind::Var(v) = self.peek() {
                vars.push(v.clone());
                self.pos += 1;
            }
            if vars.is_empty() {
                return Err(self.error("expected variables or '*'"));
            }
            Projection::Vars(vars)
        };

        self.eat_keyword("WHERE");
        self.expect(TokenKind::LBrace, "'{'")?;
        let patterns = self.triples_block()?;
        self.expect(TokenKind::RBrace, "'}'")?;

        let mut limit = None;
        let mut offset = 0;
        loop {
            if self.eat_keyword("LIMIT") {
                limit = Some(self.count()?);
            } else if self.eat_keyword("OFFSET") {
                offset = self.count()?;
            } else {
                break;
            }
        }
        if *self.peek() != TokenKind::Eof {
            return Err(self.error("unexpected trailing input"));
        }

        Ok(SelectQuery {
            distinct,
            projection,
            patterns,
            limit,
            offset,
        })
    }

    fn count(&mut self) -> Result<usize> {
        match self.advance() {
            TokenKind::Integer(n) => n
                .parse()
                .map_err(|_| self.error(format!("invalid count '{}'", n))),
            _ => Err(self.error("expected an integer")),
        }
    }

    fn triples_block(&mut self) -> Result<Vec<TriplePattern>> {
        let mut patterns = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RBrace => return Ok(patterns),
                TokenKind::Keyword(k) if k == "FILTER" || k == "OPTIONAL" => {
                    return Err(self.error(format!("{} is not supported", k)));
                }
                _ => {}
            }
            let subject = self.subject()?;
            self.property_list(&subject, &mut patterns)?;
            if *self.peek() == TokenKind::Dot {
                self.pos += 1;
            } else if *self.peek() != TokenKind::RBrace {
                return Err(self.error("expected '.' or '}'"));
            }
        }
    }

    fn property_list(&mut self, subject: &PatternTerm, patterns: &mut Vec<TriplePattern>) -> Result<()> {
        loop {
            let predicate = self.verb()?;
            loop {
                let object = self.object()?;
                patterns.push(TriplePattern {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object,
                });
                if *self.peek() != TokenKind::Comma {
                    break;
                }
                self.pos += 1;
            }
            if *self.peek() != TokenKind::Semicolon {
                return Ok(());
            }
            while *self.peek() == TokenKind::Semicolon {
                self.pos += 1;
            }
            if matches!(self.peek(), TokenKind::Dot | TokenKind::RBrace) {
                return Ok(());
            }
        }
    }

    fn subject(&mut self) -> Result<PatternTerm> {
        match self.peek() {
            TokenKind::Var(_) | TokenKind::BlankNode(_) | TokenKind::Iri(_) | TokenKind::PrefixedName { .. } => {
                self.node()
            }
            _ => Err(self.error("expected a subject")),
        }
    }

    fn verb(&mut self) -> Result<PatternTerm> {
        match self.peek() {
            TokenKind::A => {
                self.pos += 1;
                Ok(PatternTerm::Term(rdf_type()))
            }
            TokenKind::Var(_) | TokenKind::Iri(_) | TokenKind::PrefixedName { .. } => self.node(),
            _ => Err(self.error("expected a predicate")),
        }
    }

    fn object(&mut self) -> Result<PatternTerm> {
        match self.peek() {
            TokenKind::String(_) => self.literal().map(PatternTerm::Term),
            TokenKind::Integer(n) => {
                let n = n.clone();
                self.pos += 1;
                Ok(PatternTerm::Term(Term::typed_literal(n, None, Some(format!("{}integer", XSD)))))
            }
            TokenKind::Decimal(n) => {
                let n = n.clone();
                self.pos += 1;
                Ok(PatternTerm::Term(Term::typed_literal(n, None, Some(format!("{}decimal", XSD)))))
            }
            TokenKind::Boolean(b) => {
                let b = *b;
                self.pos += 1;
                Ok(PatternTerm::Term(Term::typed_literal(b.to_string(), None, Some(format!("{}boolean", XSD)))))
            }
            _ => self.node(),
        }
    }

    fn literal(&mut self) -> Result<Term> {
        let value = match self.advance() {
            TokenKind::String(value) => value,
            _ => return Err(self.error("expected a literal")),
        };
        match self.peek().clone() {
            TokenKind::LangTag(lang) => {
                self.pos += 1;
                Ok(Term::typed_literal(value, Some(lang), None))
            }
            TokenKind::DoubleCaret => {
                self.pos += 1;
                let datatype = match self.advance() {
                    TokenKind::Iri(iri) => resolve_iri(&self.base, &iri),
                    TokenKind::PrefixedName { prefix, local } => self.expand(&prefix, &local)?,
                    _ => return Err(self.error("expected a datatype IRI")),
                };
                Ok(Term::typed_literal(value, None, Some(datatype)))
            }
            _ => Ok(Term::literal(value)),
        }
    }

    /// Variable, blank node, IRI or prefixed name
    fn node(&mut self) -> Result<PatternTerm> {
        let term = match self.peek() {
            TokenKind::Var(v) => PatternTerm::Var(v.clone()),
            TokenKind::BlankNode(label) => PatternTerm::Var(format!("_:{}", label)),
            TokenKind::Iri(iri) => PatternTerm::Term(Term::iri(resolve_iri(&self.base, iri))),
            TokenKind::PrefixedName { prefix, local } => {
                PatternTerm::Term(Term::iri(self.expand(prefix, local)?))
            }
            _ => return Err(self.error("expected a variable or an IRI")),
        };
        self.pos += 1;
        Ok(term)
    }

    fn expand(&self, prefix: &str, local: &str) -> Result<String> {
        match self.prefixes.get(prefix) {
            Some(ns) => Ok(format!("{}{}", ns, local)),
            None => Err(Error::query(format!("Unresolved prefixed name: {}:{}", prefix, local))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::RDF_NS;

    const RDF_PREFIX: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> ";

    #[test]
    fn test_parse_simple_select() {
        let q = parse(&format!("{}SELECT $x WHERE {{$x a rdf:Property }}", RDF_PREFIX)).unwrap();
        assert!(!q.distinct);
        assert_eq!(q.projection, Projection::Vars(vec!["x".into()]));
        assert_eq!(
            q.patterns,
            vec![TriplePattern {
                subject: PatternTerm::Var("x".into()),
                predicate: PatternTerm::Term(rdf_type()),
                object: PatternTerm::Term(Term::iri(format!("{}Property", RDF_NS))),
            }]
        );
    }

    #[test]
    fn test_unknown_prefix_is_rejected() {
        let err = parse(&format!("{}SELECT $x WHERE {{$x a unknownPrefix:asd }}", RDF_PREFIX)).unwrap_err();
        assert!(matches!(&err, Error::Query(msg) if msg.contains("unknownPrefix:asd")));
    }

    #[test]
    fn test_other_query_forms_are_rejected() {
        for q in ["ASK { ?s ?p ?o }", "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }", "DESCRIBE <x>"] {
            assert!(matches!(parse(q), Err(Error::Query(msg)) if msg.contains("not supported")));
        }
    }

    #[test]
    fn test_abbreviations_expand() {
        let q = parse("PREFIX ex: <http://ex/> SELECT * { ?s ex:p 1, 2 ; ex:q \"v\"@en . _:b ex:r ?s ; }").unwrap();
        assert_eq!(q.patterns.len(), 4);
        assert_eq!(q.patterns[1].object, PatternTerm::Term(Term::typed_literal("2", None, Some(format!("{}integer", XSD)))));
        assert_eq!(q.patterns[2].object, PatternTerm::Term(Term::typed_literal("v", Some("en".into()), None)));
        assert_eq!(q.patterns[3].subject, PatternTerm::Var("_:b".into()));
        assert_eq!(q.variables(), vec!["s".to_string()]);
    }

    #[test]
    fn test_base_resolves_relative_iris() {
        let q = parse("BASE <http://ex/doc> SELECT ?s WHERE { ?s ?p <#frag> }").unwrap();
        assert_eq!(q.patterns[0].object, PatternTerm::Term(Term::iri("http://ex/doc#frag")));
    }

    #[test]
    fn test_limit_offset_and_distinct() {
        let q = parse("SELECT DISTINCT ?s WHERE { ?s ?p ?o } LIMIT 5 OFFSET 2").unwrap();
        assert!(q.distinct);
        assert_eq!(q.limit, Some(5));
        assert_eq!(q.offset, 2);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("SELECT WHERE { ?s ?p ?o }").is_err());
        assert!(parse("SELECT ?s WHERE { ?s ?p }").is_err());
        assert!(parse("SELECT ?s WHERE { ?s ?p ?o ").is_err());
        assert!(parse("SELECT ?s WHERE { ?s ?p ?o } ?x").is_err());
        assert!(parse("SELECT ?s WHERE { FILTER }").is_err());
    }
}
