//! Per-collection index configuration
//!
//! `IndexConfig` is what one engine reads out of a collection's `<index>`
//! block: its rules in declaration order, the block-level ignore/inline map,
//! named field types and the engine element's own attributes as options.
//! Once parsed it is immutable and shared via `Arc` by every worker that
//! binds a document of the collection.
//!
//! `IndexSpec` bundles the configurations of all engines for one collection.

use crate::indexing::rule::{parse_special_nodes, FieldType, IndexMatchRule, NodeTreatment};
use crate::indexing::IndexKind;
use crate::xml::ConfigNode;
use nodex_core::{Namespaces, NodePath, QName, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const FIELD_TYPE_ELEMENT: &str = "fieldType";

/// Parsed configuration of one engine for one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexConfig {
    rules: Vec<IndexMatchRule>,
    special: BTreeMap<QName, NodeTreatment>,
    field_types: HashMap<String, Arc<FieldType>>,
    options: BTreeMap<String, String>,
    namespaces: Namespaces,
}

impl IndexConfig {
    /// Configuration with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an engine element such as `<fulltext>` or `<rdf>`.
    ///
    /// Children named `rule_element` become rules, `<fieldType>` children
    /// declare field types (usable by rules that follow them), and
    /// `<ignore>`/`<inline>` children populate the block-level map. Prefixes
    /// resolve against `namespaces` extended by the declarations in scope at
    /// `root`.
    ///
    /// # Errors
    /// The first rule or field type that fails to parse aborts the whole
    /// configuration with `Error::Config`.
    pub fn parse(root: &ConfigNode, namespaces: &Namespaces, rule_element: &str) -> Result<Self> {
        let mut scope = namespaces.clone();
        scope.extend(root.namespaces.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut config = IndexConfig {
            options: root.attributes.iter().cloned().collect(),
            special: parse_special_nodes(root, &scope)?,
            ..Default::default()
        };

        for child in &root.children {
            let name = child.local_name();
            if name == FIELD_TYPE_ELEMENT {
                let field_type = FieldType::from_node(child)?;
                if let Some(id) = field_type.id.clone() {
                    config.field_types.insert(id, Arc::new(field_type));
                }
            } else if name == rule_element {
                let mut child_scope = scope.clone();
                child_scope.extend(child.namespaces.iter().map(|(k, v)| (k.clone(), v.clone())));
                config
                    .rules
                    .push(IndexMatchRule::parse(child, &child_scope, &config.field_types)?);
            }
        }
        config.namespaces = scope;
        Ok(config)
    }

    /// Add a rule after the existing ones
    pub fn with_rule(mut self, rule: IndexMatchRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a block-level ignore/inline entry
    pub fn with_special(mut self, qname: QName, treatment: NodeTreatment) -> Self {
        self.special.insert(qname, treatment);
        self
    }

    /// Set an option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[IndexMatchRule] {
        &self.rules
    }

    /// Whether any rule is configured
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// First rule, in declaration order, that selects `path`
    pub fn matching(&self, path: &NodePath) -> Option<&IndexMatchRule> {
        self.rules.iter().find(|r| r.matches(path))
    }

    /// Every rule that selects `path`, in declaration order
    pub fn matching_all<'a>(
        &'a self,
        path: &'a NodePath,
    ) -> impl Iterator<Item = &'a IndexMatchRule> + 'a {
        self.rules.iter().filter(move |r| r.matches(path))
    }

    /// Exact-name rules whose name equals `qname`
    pub fn rules_for_qname<'a>(
        &'a self,
        qname: &'a QName,
    ) -> impl Iterator<Item = &'a IndexMatchRule> + 'a {
        self.rules
            .iter()
            .filter(move |r| r.is_exact() && r.qname() == Some(qname))
    }

    /// Block-level treatment of `qname`
    pub fn treatment(&self, qname: &QName) -> Option<NodeTreatment> {
        self.special.get(qname).copied()
    }

    /// Whether text under `qname` is skipped for every rule
    pub fn is_ignored(&self, qname: &QName) -> bool {
        self.treatment(qname) == Some(NodeTreatment::Ignore)
    }

    /// Whether text under `qname` is inlined for every rule
    pub fn is_inline(&self, qname: &QName) -> bool {
        self.treatment(qname) == Some(NodeTreatment::Inline)
    }

    /// Field type declared with `<fieldType id="..">`
    pub fn field_type(&self, id: &str) -> Option<&FieldType> {
        self.field_types.get(id).map(Arc::as_ref)
    }

    /// Attribute of the engine element, e.g. `base` on `<rdf>`
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Prefix bindings the configuration was parsed with
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }
}

/// Configurations of every active engine for one collection
#[derive(Debug, Clone, Default)]
pub struct IndexSpec {
    configs: BTreeMap<IndexKind, Arc<IndexConfig>>,
}

impl IndexSpec {
    /// No engine active
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate an engine with a configuration
    pub fn insert(&mut self, kind: IndexKind, config: IndexConfig) {
        self.configs.insert(kind, Arc::new(config));
    }

    /// Configuration for an engine, if active
    pub fn get(&self, kind: IndexKind) -> Option<Arc<IndexConfig>> {
        self.configs.get(&kind).cloned()
    }

    /// Whether an engine is active
    pub fn contains(&self, kind: IndexKind) -> bool {
        self.configs.contains_key(&kind)
    }

    /// Active engines
    pub fn kinds(&self) -> impl Iterator<Item = IndexKind> + '_ {
        self.configs.keys().copied()
    }

    /// Whether no engine is active
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
