//! XML plumbing shared by the configuration parser and the document store
//!
//! - `NamespaceScope`: stack of in-scope `xmlns` declarations used to turn
//!   lexical names into `QName`s
//! - `ConfigNode`: a small element tree for collection configuration
//!   fragments, carrying the namespaces in scope at each element

use nodex_core::{Error, NameKind, Namespaces, QName, Result, XML_NS};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

// ============================================================================
// Namespace scope
// ============================================================================

/// Raw attribute as it appears in the markup: lexical name and unescaped value
pub(crate) type RawAttribute = (String, String);

/// Stack of namespace declarations, one frame per open element
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    frames: Vec<Namespaces>,
}

impl NamespaceScope {
    /// Empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an element: record its `xmlns` declarations and return the
    /// remaining attributes
    pub(crate) fn push(&mut self, start: &BytesStart<'_>) -> Result<Vec<RawAttribute>> {
        let mut frame = self.frames.last().cloned().unwrap_or_default();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Serialization(format!("malformed attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Serialization(format!("bad attribute value: {}", e)))?
                .into_owned();
            if key == "xmlns" {
                frame.insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.insert(prefix.to_string(), value);
            } else {
                attributes.push((key, value));
            }
        }
        self.frames.push(frame);
        Ok(attributes)
    }

    /// Close the innermost element
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Declarations visible in the innermost frame
    pub fn in_scope(&self) -> Namespaces {
        self.frames.last().cloned().unwrap_or_default()
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.frames
            .last()
            .and_then(|f| f.get(prefix))
            .map(String::as_str)
    }

    /// Resolve a lexical element name; unprefixed names take the default
    /// namespace
    pub fn element_name(&self, raw: &str) -> Result<QName> {
        self.resolve(raw, NameKind::Element)
    }

    /// Resolve a lexical attribute name; unprefixed names have no namespace
    pub fn attribute_name(&self, raw: &str) -> Result<QName> {
        self.resolve(raw, NameKind::Attribute)
    }

    fn resolve(&self, raw: &str, kind: NameKind) -> Result<QName> {
        let qname = match raw.split_once(':') {
            Some((prefix, local)) => {
                let ns = self.lookup(prefix).ok_or_else(|| {
                    Error::Serialization(format!("undeclared namespace prefix '{}'", prefix))
                })?;
                QName::new(local, ns).with_prefix(prefix)
            }
            None if kind == NameKind::Element => {
                QName::new(raw, self.lookup("").unwrap_or_default())
            }
            None => QName::local(raw),
        };
        Ok(qname.with_kind(kind))
    }
}

pub(crate) fn raw_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

// ============================================================================
// Configuration fragments
// ============================================================================

/// Element of a configuration fragment
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    /// Resolved element name
    pub name: QName,
    /// Attributes in document order (namespace declarations excluded)
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<ConfigNode>,
    /// Text content directly inside this element, trimmed
    pub text: String,
    /// Prefix → namespace bindings in scope at this element
    pub namespaces: Namespaces,
}

impl ConfigNode {
    /// Parse a configuration fragment into its root element.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for malformed markup or an undeclared prefix.
    pub fn parse(xml: &str) -> Result<ConfigNode> {
        let mut reader = Reader::from_str(xml);
        let mut scope = NamespaceScope::new();
        let mut stack: Vec<ConfigNode> = Vec::new();
        let mut root = None;

        let to_config = |e: Error| Error::config(format!("invalid configuration: {}", e));

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::open(&mut scope, e).map_err(to_config)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let node = Self::open(&mut scope, e).map_err(to_config)?;
                    scope.pop();
                    Self::attach(&mut stack, &mut root, node);
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;
                        top.text.push_str(text.trim());
                    }
                }
                Ok(Event::End(_)) => {
                    scope.pop();
                    if let Some(node) = stack.pop() {
                        Self::attach(&mut stack, &mut root, node);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::config(format!("invalid configuration: {}", e))),
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::config("invalid configuration: unclosed element"));
        }
        root.ok_or_else(|| Error::config("invalid configuration: no root element"))
    }

    fn open(scope: &mut NamespaceScope, start: &BytesStart<'_>) -> Result<ConfigNode> {
        let attributes = scope.push(start)?;
        Ok(ConfigNode {
            name: scope.element_name(&raw_name(start))?,
            attributes,
            children: Vec::new(),
            text: String::new(),
            namespaces: scope.in_scope(),
        })
    }

    fn attach(stack: &mut [ConfigNode], root: &mut Option<ConfigNode>, node: ConfigNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => {
                if root.is_none() {
                    *root = Some(node);
                }
            }
        }
    }

    /// Local name of the element
    pub fn local_name(&self) -> &str {
        self.name.local_name()
    }

    /// Attribute value by lexical name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// First child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// All children with the given local name
    pub fn children_named<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a ConfigNode> + 'a {
        self.children
            .iter()
            .filter(move |c| c.local_name() == local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree_and_attributes() {
        let node = ConfigNode::parse(
            r#"<index><text qname="title" boost="2.0"/><ignore qname="note"/></index>"#,
        )
        .unwrap();
        assert_eq!(node.local_name(), "index");
        assert_eq!(node.children.len(), 2);
        let text = node.child("text").unwrap();
        assert_eq!(text.attribute("qname"), Some("title"));
        assert_eq!(text.attribute("boost"), Some("2.0"));
        assert_eq!(node.children_named("ignore").count(), 1);
    }

    #[test]
    fn test_namespaces_are_inherited() {
        let node = ConfigNode::parse(
            r#"<collection xmlns="http://exist-db.org/collection-config/1.0" xmlns:tei="http://www.tei-c.org/ns/1.0">
                 <index><fulltext><text qname="tei:p"/></fulltext></index>
               </collection>"#,
        )
        .unwrap();
        assert_eq!(
            node.name.namespace(),
            "http://exist-db.org/collection-config/1.0"
        );
        let text = &node.children[0].children[0].children[0];
        assert_eq!(
            text.namespaces.get("tei").map(String::as_str),
            Some("http://www.tei-c.org/ns/1.0")
        );
        // declarations are not reported as attributes
        assert!(node.attributes.is_empty());
    }

    #[test]
    fn test_text_content_is_collected() {
        let node = ConfigNode::parse("<a> hello <b/> </a>").unwrap();
        assert_eq!(node.text, "hello");
    }

    #[test]
    fn test_malformed_markup_is_config_error() {
        assert!(matches!(
            ConfigNode::parse("<index><text></index>"),
            Err(Error::Config(_))
        ));
        assert!(matches!(ConfigNode::parse(""), Err(Error::Config(_))));
    }

    #[test]
    fn test_undeclared_prefix_is_config_error() {
        assert!(matches!(
            ConfigNode::parse("<x:index/>"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_scope_resolution() {
        let mut reader = Reader::from_str(r#"<r xmlns="urn:d" xmlns:p="urn:p" p:a="1" b="2"/>"#);
        let mut scope = NamespaceScope::new();
        if let Ok(Event::Empty(e)) = reader.read_event() {
            let attrs = scope.push(&e).unwrap();
            assert_eq!(attrs.len(), 2);
            let el = scope.element_name("r").unwrap();
            assert_eq!(el.namespace(), "urn:d");
            let a = scope.attribute_name("p:a").unwrap();
            assert_eq!(a.namespace(), "urn:p");
            assert!(a.is_attribute());
            let b = scope.attribute_name("b").unwrap();
            assert_eq!(b.namespace(), "");
            let lang = scope.attribute_name("xml:lang").unwrap();
            assert_eq!(lang.namespace(), XML_NS);
        } else {
            panic!("expected empty element");
        }
    }
}
