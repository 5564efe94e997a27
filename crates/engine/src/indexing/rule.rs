//! Index match rules
//!
//! One rule is one `<text qname=".."/>` or `<text match=".."/>` element of a
//! collection configuration. A rule targets either an exact name (compared
//! against the terminal step of a node's path only) or a path pattern, and
//! carries the field name, field type, an optional attribute condition that
//! raises the boost of matching elements, and its own ignore/inline map.

use crate::xml::ConfigNode;
use nodex_core::{Element, Error, Namespaces, NodePath, QName, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

const QNAME_ATTR: &str = "qname";
const MATCH_ATTR: &str = "match";
const FIELD_ATTR: &str = "field";
const TYPE_ATTR: &str = "type";
const BOOST_ATTR: &str = "boost";
const ANALYZER_ATTR: &str = "analyzer";
const MATCH_ATTR_NAME: &str = "match-attr-name";
const MATCH_ATTR_VALUE: &str = "match-attr-value";
const MATCH_ATTR_BOOST: &str = "match-attr-boost";

pub(crate) const IGNORE_ELEMENT: &str = "ignore";
pub(crate) const INLINE_ELEMENT: &str = "inline";

/// How text inside a specially treated element is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTreatment {
    /// Text directly in the subtree is skipped
    Ignore,
    /// Text of the subtree joins the surrounding text without a token boundary
    Inline,
}

/// Analyzer and boost applied to a rule's field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldType {
    /// Identifier when declared with `<fieldType id="..">`
    pub id: Option<String>,
    /// Analyzer identifier
    pub analyzer: Option<String>,
    /// Base boost
    pub boost: Option<f32>,
}

impl FieldType {
    /// Read `id`, `analyzer` and `boost` from an element
    ///
    /// # Errors
    /// `Error::Config` when `boost` is not a finite number.
    pub fn from_node(node: &ConfigNode) -> Result<Self> {
        Ok(FieldType {
            id: non_empty(node.attribute("id")).map(str::to_string),
            analyzer: non_empty(node.attribute(ANALYZER_ATTR)).map(str::to_string),
            boost: parse_boost(node, BOOST_ATTR)?,
        })
    }
}

/// What a rule targets
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTarget {
    /// Terminal step must equal this name (prefix ignored, kind respected)
    Exact(QName),
    /// Whole ancestor chain must unify with this pattern
    Pattern(NodePath),
}

/// Boost override applied when an element carries a given attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCondition {
    /// Lexical attribute name
    pub name: String,
    /// Required value; any value when `None`
    pub value: Option<String>,
    /// Boost used when the condition holds
    pub boost: Option<f32>,
}

impl AttributeCondition {
    fn present_on(&self, element: &Element) -> bool {
        match element.attribute(&self.name) {
            Some(attr) => self.value.as_deref().map_or(true, |v| attr.value == v),
            None => false,
        }
    }
}

/// A single configured rule
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatchRule {
    target: RuleTarget,
    path: NodePath,
    field: Option<String>,
    field_type: Arc<FieldType>,
    condition: Option<AttributeCondition>,
    special: BTreeMap<QName, NodeTreatment>,
}

impl IndexMatchRule {
    /// Rule matching an exact name, with default field type
    pub fn exact(qname: QName) -> Self {
        Self::with_target(RuleTarget::Exact(qname))
    }

    /// Rule matching a compiled path pattern, with default field type
    ///
    /// # Errors
    /// `Error::Config` if the pattern has no step that consumes a component.
    pub fn pattern(path: NodePath) -> Result<Self> {
        if path.effective_len() == 0 {
            return Err(Error::config(format!("invalid match path '{}'", path)));
        }
        Ok(Self::with_target(RuleTarget::Pattern(path)))
    }

    fn with_target(target: RuleTarget) -> Self {
        let path = match &target {
            RuleTarget::Exact(q) => NodePath::from_qname(q.clone()),
            RuleTarget::Pattern(p) => p.clone(),
        };
        IndexMatchRule {
            target,
            path,
            field: None,
            field_type: Arc::new(FieldType::default()),
            condition: None,
            special: BTreeMap::new(),
        }
    }

    /// Parse a rule element.
    ///
    /// `field_types` holds the `<fieldType>` declarations seen so far; an
    /// unknown `type` reference falls back to the rule's own attributes.
    ///
    /// # Errors
    /// `Error::Config` when neither or both of `qname`/`match` are given, a
    /// prefix is undeclared, a boost is not numeric, the pattern is empty, or
    /// an `ignore`/`inline` child lacks `qname`.
    pub fn parse(
        node: &ConfigNode,
        namespaces: &Namespaces,
        field_types: &HashMap<String, Arc<FieldType>>,
    ) -> Result<Self> {
        let mut rule = match (
            non_empty(node.attribute(QNAME_ATTR)),
            non_empty(node.attribute(MATCH_ATTR)),
        ) {
            (Some(name), None) => Self::exact(QName::parse(name, namespaces)?),
            (None, Some(pattern)) => Self::pattern(NodePath::parse(namespaces, pattern)?)?,
            (Some(_), Some(_)) => {
                return Err(Error::config(format!(
                    "<{}> must have either '{}' or '{}', not both",
                    node.local_name(),
                    QNAME_ATTR,
                    MATCH_ATTR
                )))
            }
            (None, None) => {
                return Err(Error::config(format!(
                    "<{}> needs an attribute '{}' or '{}'",
                    node.local_name(),
                    QNAME_ATTR,
                    MATCH_ATTR
                )))
            }
        };

        if let Some(name) = non_empty(node.attribute(MATCH_ATTR_NAME)) {
            rule.condition = Some(AttributeCondition {
                name: name.to_string(),
                value: node.attribute(MATCH_ATTR_VALUE).map(str::to_string),
                boost: parse_boost(node, MATCH_ATTR_BOOST)?,
            });
        } else {
            // still validated so a typo is reported even without a name
            parse_boost(node, MATCH_ATTR_BOOST)?;
        }

        rule.field = non_empty(node.attribute(FIELD_ATTR)).map(str::to_string);

        let declared = non_empty(node.attribute(TYPE_ATTR)).and_then(|id| {
            let found = field_types.get(id).cloned();
            if found.is_none() {
                warn!(target: "nodex::index", field_type = id, "Unknown field type, using rule attributes");
            }
            found
        });
        rule.field_type = match declared {
            Some(ft) => ft,
            None => Arc::new(FieldType::from_node(node)?),
        };

        rule.special = parse_special_nodes(node, namespaces)?;
        Ok(rule)
    }

    /// What the rule targets
    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// Whether this is an exact-name rule
    pub fn is_exact(&self) -> bool {
        matches!(self.target, RuleTarget::Exact(_))
    }

    /// Rule as a path (a single step for exact-name rules)
    pub fn node_path(&self) -> &NodePath {
        &self.path
    }

    /// Terminal name of the rule, if it has one
    pub fn qname(&self) -> Option<&QName> {
        self.path.last_qname()
    }

    /// Field name, when the rule is named
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Whether the rule can be queried by field name
    pub fn is_named(&self) -> bool {
        self.field.is_some()
    }

    /// Set the field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the field type
    pub fn with_field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Arc::new(field_type);
        self
    }

    /// Set the attribute condition
    pub fn with_condition(mut self, condition: AttributeCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add an ignore/inline entry
    pub fn with_special(mut self, qname: QName, treatment: NodeTreatment) -> Self {
        self.special.insert(qname, treatment);
        self
    }

    /// Field type
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Analyzer identifier
    pub fn analyzer(&self) -> Option<&str> {
        self.field_type.analyzer.as_deref()
    }

    /// Attribute condition, if configured
    pub fn condition(&self) -> Option<&AttributeCondition> {
        self.condition.as_ref()
    }

    /// Base boost from the field type
    pub fn boost(&self) -> Option<f32> {
        self.field_type.boost
    }

    /// Boost for a concrete element: the attribute-condition boost when the
    /// element carries the attribute (with the configured value, if any),
    /// otherwise the base boost.
    pub fn boost_for(&self, element: Option<&Element>) -> Option<f32> {
        match (element, &self.condition) {
            (Some(el), Some(cond)) if cond.present_on(el) => cond.boost.or(self.boost()),
            _ => self.boost(),
        }
    }

    /// Attribute-condition predicate.
    ///
    /// Holds when no condition is configured, or when no element is
    /// available to check it against (attributes of an element being stored
    /// arrive after its start event).
    pub fn attributes_match(&self, element: Option<&Element>) -> bool {
        match (element, &self.condition) {
            (Some(el), Some(cond)) => cond.present_on(el),
            _ => true,
        }
    }

    /// Whether a node's path is selected by this rule
    pub fn matches(&self, path: &NodePath) -> bool {
        match &self.target {
            RuleTarget::Exact(qname) => path
                .last_qname()
                .is_some_and(|last| last.kind() == qname.kind() && last.equals_simple(qname)),
            RuleTarget::Pattern(pattern) => pattern.matches(path),
        }
    }

    /// Special treatment configured on this rule for a name
    pub fn treatment(&self, qname: &QName) -> Option<NodeTreatment> {
        self.special.get(qname).copied()
    }

    /// Whether text under `qname` is skipped by this rule
    pub fn is_ignored(&self, qname: &QName) -> bool {
        self.treatment(qname) == Some(NodeTreatment::Ignore)
    }

    /// Whether text under `qname` is inlined by this rule
    pub fn is_inline(&self, qname: &QName) -> bool {
        self.treatment(qname) == Some(NodeTreatment::Inline)
    }
}

/// Collect `<ignore qname=".."/>` and `<inline qname=".."/>` children
pub(crate) fn parse_special_nodes(
    node: &ConfigNode,
    namespaces: &Namespaces,
) -> Result<BTreeMap<QName, NodeTreatment>> {
    let mut special = BTreeMap::new();
    for child in &node.children {
        let treatment = match child.local_name() {
            IGNORE_ELEMENT => NodeTreatment::Ignore,
            INLINE_ELEMENT => NodeTreatment::Inline,
            _ => continue,
        };
        let name = non_empty(child.attribute(QNAME_ATTR)).ok_or_else(|| {
            Error::config(format!(
                "configuration element '{}' needs an attribute '{}'",
                child.local_name(),
                QNAME_ATTR
            ))
        })?;
        special.insert(QName::parse(name, namespaces)?, treatment);
    }
    Ok(special)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_boost(node: &ConfigNode, attr: &str) -> Result<Option<f32>> {
    let Some(raw) = non_empty(node.attribute(attr)) else {
        return Ok(None);
    };
    match raw.parse::<f32>() {
        Ok(boost) if boost.is_finite() => Ok(Some(boost)),
        _ => Err(Error::config(format!(
            "invalid value for attribute '{}': expected a number, got '{}'",
            attr, raw
        ))),
    }
}
