//! Qualified names
//!
//! A `QName` is a namespace-qualified element or attribute name. The prefix is
//! carried for display only: equality, hashing and ordering look at the
//! namespace URI, the local name and the node kind, never the prefix.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Prefix → namespace URI mapping in scope for a configuration fragment
pub type Namespaces = HashMap<String, String>;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Whether a name denotes an element or an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NameKind {
    /// Element name
    Element,
    /// Attribute name
    Attribute,
}

/// Namespace-qualified name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QName {
    local_name: String,
    namespace: String,
    prefix: Option<String>,
    kind: NameKind,
}

impl QName {
    /// Element name in the given namespace (empty string for no namespace)
    pub fn new(local_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        QName {
            local_name: local_name.into(),
            namespace: namespace.into(),
            prefix: None,
            kind: NameKind::Element,
        }
    }

    /// Element name without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(local_name, "")
    }

    /// Attribute name in the given namespace
    pub fn attribute(local_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(local_name, namespace).with_kind(NameKind::Attribute)
    }

    /// Attach a display prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Change the node kind
    pub fn with_kind(mut self, kind: NameKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parse a lexical name (`prefix:local`, `local`, `@prefix:local`),
    /// resolving the prefix against `namespaces`.
    ///
    /// A leading `@` marks an attribute name. Unknown prefixes are a
    /// configuration error: prefixes are resolved once, at parse time.
    pub fn parse(name: &str, namespaces: &Namespaces) -> Result<Self> {
        let (kind, lexical) = match name.strip_prefix('@') {
            Some(rest) => (NameKind::Attribute, rest),
            None => (NameKind::Element, name),
        };
        let lexical = lexical.trim();
        if lexical.is_empty() {
            return Err(Error::config(format!("empty qualified name: '{}'", name)));
        }

        let (prefix, local) = match lexical.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, lexical),
        };
        if local.is_empty() || local.contains(':') || prefix.is_some_and(str::is_empty) {
            return Err(Error::config(format!("invalid qualified name: '{}'", name)));
        }

        let namespace = match prefix {
            None => String::new(),
            Some("xml") => XML_NS.to_string(),
            Some(p) => namespaces.get(p).cloned().ok_or_else(|| {
                Error::config(format!(
                    "No namespace defined for prefix: {} in index definition",
                    p
                ))
            })?,
        };

        let qname = QName::new(local, namespace).with_kind(kind);
        Ok(match prefix {
            Some(p) => qname.with_prefix(p),
            None => qname,
        })
    }

    /// Local part of the name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Namespace URI, empty when the name is in no namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Display prefix, if any
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Node kind
    pub fn kind(&self) -> NameKind {
        self.kind
    }

    /// Whether this is an attribute name
    pub fn is_attribute(&self) -> bool {
        self.kind == NameKind::Attribute
    }

    /// Namespace-aware comparison that ignores the node kind
    pub fn equals_simple(&self, other: &QName) -> bool {
        self.local_name == other.local_name && self.namespace == other.namespace
    }

    /// Lexical form, `prefix:local` or `local`
    pub fn string_value(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Namespace URI concatenated with the local name
    pub fn expanded(&self) -> String {
        format!("{}{}", self.namespace, self.local_name)
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.equals_simple(other)
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local_name.hash(state);
        self.kind.hash(state);
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.local_name.cmp(&other.local_name))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attribute() {
            write!(f, "@")?;
        }
        write!(f, "{}", self.string_value())
    }
}
