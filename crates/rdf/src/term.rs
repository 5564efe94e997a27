//! RDF terms and triples
//!
//! Terms render in N-Triples form (`<iri>`, `_:label`, `"lexical"@lang`,
//! `"lexical"^^<datatype>`), which is also the form query solutions carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RDF syntax namespace
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// XML schema string datatype, the implicit type of plain literals
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// `rdf:type`
pub fn rdf_type() -> Term {
    Term::iri(format!("{}type", RDF_NS))
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form
    pub value: String,
    /// Language tag, lowercased
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Datatype IRI; `None` for plain and language-tagged literals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

/// Subject, predicate or object of a triple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    /// Absolute or document-relative IRI
    Iri(String),
    /// Blank node label, without `_:`
    Blank(String),
    /// Literal
    Literal(Literal),
}

impl Term {
    /// IRI term
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Blank node
    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    /// Plain literal
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            lang: None,
            datatype: None,
        })
    }

    /// Literal with an optional language tag and datatype. A datatype of
    /// `xsd:string` is the same as none.
    pub fn typed_literal(value: impl Into<String>, lang: Option<String>, datatype: Option<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            lang: lang.map(|l| l.to_lowercase()),
            datatype: datatype.filter(|d| d != XSD_STRING),
        })
    }

    /// Whether this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.value))?;
                if let Some(lang) = &lit.lang {
                    write!(f, "@{}", lang)?;
                } else if let Some(datatype) = &lit.datatype {
                    write!(f, "^^<{}>", datatype)?;
                }
                Ok(())
            }
        }
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Resolve an IRI reference against a base IRI. Absolute references are
/// returned unchanged; the base's fragment is dropped.
pub fn resolve_iri(base: &str, reference: &str) -> String {
    if has_scheme(reference) {
        return reference.to_string();
    }
    let base = base.split('#').next().unwrap_or_default();
    if reference.is_empty() {
        base.to_string()
    } else if reference.starts_with('#') {
        format!("{}{}", base, reference)
    } else if reference.starts_with('/') {
        match base.find("://") {
            Some(scheme_end) => {
                let authority_end = base[scheme_end + 3..]
                    .find('/')
                    .map_or(base.len(), |i| scheme_end + 3 + i);
                format!("{}{}", &base[..authority_end], reference)
            }
            None => reference.to_string(),
        }
    } else {
        match base.rfind('/') {
            Some(i) => format!("{}{}", &base[..=i], reference),
            None => reference.to_string(),
        }
    }
}

fn has_scheme(reference: &str) -> bool {
    match reference.find(':') {
        Some(i) if i > 0 => {
            let scheme = &reference[..i];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// One statement
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject, an IRI or blank node
    pub subject: Term,
    /// Predicate, an IRI
    pub predicate: Term,
    /// Object
    pub object: Term,
}

impl Triple {
    /// Assemble a triple
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Triple {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntriples_rendering() {
        assert_eq!(Term::iri("http://a/b").to_string(), "<http://a/b>");
        assert_eq!(Term::blank("n1.2").to_string(), "_:n1.2");
        assert_eq!(Term::literal("say \"hi\"").to_string(), "\"say \\\"hi\\\"\"");
        assert_eq!(
            Term::typed_literal("chat", Some("FR".into()), None).to_string(),
            "\"chat\"@fr"
        );
        assert_eq!(
            Term::typed_literal("1", None, Some("http://www.w3.org/2001/XMLSchema#int".into()))
                .to_string(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#int>"
        );
    }

    #[test]
    fn test_xsd_string_is_plain() {
        assert_eq!(
            Term::typed_literal("x", None, Some(XSD_STRING.into())),
            Term::literal("x")
        );
    }

    #[test]
    fn test_triple_display() {
        let t = Triple::new(Term::iri("s"), rdf_type(), Term::iri("o"));
        assert_eq!(
            t.to_string(),
            "<s> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <o> ."
        );
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Term::iri("x")).unwrap();
        assert_eq!(json, "{\"iri\":\"x\"}");
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Term::iri("x"));
    }
}
