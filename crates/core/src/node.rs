//! Streamed node views
//!
//! These are the node values handed to stream listeners. An `Element` seen in
//! a `start_element` callback during a store may not have its attributes
//! attached yet: attributes arrive as separate events right after the start
//! event, so listeners that need them must accumulate them.

use crate::node_id::NodeId;
use crate::qname::QName;
use serde::{Deserialize, Serialize};

/// Declared type of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttrType {
    /// Plain character data
    #[default]
    Cdata,
    /// `xml:id` or DTD-declared ID
    Id,
    /// Reference to an ID
    IdRef,
}

/// Attribute node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Node identity
    pub node_id: NodeId,
    /// Attribute name (kind is always `Attribute`)
    pub qname: QName,
    /// Attribute value
    pub value: String,
    /// Declared type
    pub attr_type: AttrType,
}

impl Attribute {
    /// Create a CDATA attribute
    pub fn new(node_id: NodeId, qname: QName, value: impl Into<String>) -> Self {
        Attribute {
            node_id,
            qname,
            value: value.into(),
            attr_type: AttrType::Cdata,
        }
    }
}

/// Element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Node identity
    pub node_id: NodeId,
    /// Element name
    pub qname: QName,
    /// Attributes attached so far
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Element without attributes
    pub fn new(node_id: NodeId, qname: QName) -> Self {
        Element {
            node_id,
            qname,
            attributes: Vec::new(),
        }
    }

    /// Attribute by lexical name (`prefix:local` or `local`)
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.qname.string_value() == name)
    }

    /// Attribute by qualified name
    pub fn attribute_qname(&self, qname: &QName) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.qname.equals_simple(qname))
    }

    /// Whether an attribute with this lexical name is attached
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// Kind of character data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
    /// Text node
    Text,
    /// CDATA section
    CData,
}

/// Character data node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Node identity
    pub node_id: NodeId,
    /// Character content
    pub data: String,
    /// Text or CDATA
    pub kind: TextKind,
}

impl Text {
    /// Plain text node
    pub fn new(node_id: NodeId, data: impl Into<String>) -> Self {
        Text {
            node_id,
            data: data.into(),
            kind: TextKind::Text,
        }
    }
}
