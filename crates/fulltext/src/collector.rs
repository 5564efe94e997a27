//! Text extraction from the node stream
//!
//! The collector is the [`ElementSink`] behind the full-text listener. For
//! every element selected by a rule it gathers the text below it, skipping
//! ignored descendants and joining inline descendants to the surrounding
//! words. A rule matching inside an ignored subtree still collects its own
//! text. Attributes selected by a rule (`qname="@name"` or a pattern ending
//! in an attribute step) are indexed with their value.

use crate::postings::NodeText;
use crate::tokenizer::Analyzer;
use nodex_core::{Element, NodeId, NodePath, QName, Result, Text};
use nodex_engine::indexing::{ElementSink, IndexConfig, IndexMatchRule};
use std::sync::Arc;
use tracing::warn;

struct OpenMatch {
    node_id: NodeId,
    qname: QName,
    field: Option<String>,
    analyzer: Analyzer,
    boost: f32,
    /// Index of the rule, for rule-level ignore/inline lookups
    rule: usize,
    /// Ignore depth at the match; text at any other depth is skipped
    ignore_level: usize,
    text: String,
}

#[derive(Clone, Copy)]
struct Frame {
    matched: bool,
    ignored: bool,
    inline: bool,
}

/// Collects the text of rule-selected nodes
#[derive(Default)]
pub struct TextCollector {
    config: Option<Arc<IndexConfig>>,
    open: Vec<OpenMatch>,
    frames: Vec<Frame>,
    ignore_depth: usize,
    collected: Vec<NodeText>,
}

impl TextCollector {
    /// Start a new stream with the given configuration
    ///
    /// Text collected but never taken is dropped with a warning.
    pub fn reset(&mut self, config: Option<Arc<IndexConfig>>) {
        if !self.collected.is_empty() {
            warn!(
                target: "nodex::fulltext",
                nodes = self.collected.len(),
                "Collected text not empty at reset"
            );
        }
        self.config = config;
        self.open.clear();
        self.frames.clear();
        self.ignore_depth = 0;
        self.collected.clear();
    }

    /// Nodes completed so far
    pub fn collected(&self) -> &[NodeText] {
        &self.collected
    }

    /// Take the completed nodes
    pub fn take(&mut self) -> Vec<NodeText> {
        std::mem::take(&mut self.collected)
    }

    fn rule(&self, index: usize) -> Option<&IndexMatchRule> {
        self.config.as_ref().and_then(|c| c.rules().get(index))
    }

    fn is_ignored(&self, config: &IndexConfig, qname: &QName) -> bool {
        config.is_ignored(qname)
            || self
                .open
                .iter()
                .any(|m| self.rule(m.rule).is_some_and(|r| r.is_ignored(qname)))
    }

    fn is_inline(&self, config: &IndexConfig, qname: &QName) -> bool {
        config.is_inline(qname)
            || self
                .open
                .iter()
                .any(|m| self.rule(m.rule).is_some_and(|r| r.is_inline(qname)))
    }

    fn separate_words(&mut self) {
        for m in self.open.iter_mut() {
            if !m.text.is_empty() && !m.text.ends_with(' ') {
                m.text.push(' ');
            }
        }
    }

    fn index_attributes(&mut self, config: &IndexConfig, element: &Element, path: &NodePath) {
        for attribute in &element.attributes {
            let mut attr_path = path.clone();
            attr_path.push(attribute.qname.clone());
            for rule in config.matching_all(&attr_path) {
                let analyzer = Analyzer::from_id(rule.analyzer());
                self.collected.push(NodeText {
                    node_id: attribute.node_id.clone(),
                    qname: attribute.qname.clone(),
                    field: rule.field().map(str::to_string),
                    terms: analyzer.tokenize(&attribute.value),
                    boost: rule.boost_for(Some(element)).unwrap_or(1.0),
                });
            }
        }
    }
}

impl ElementSink for TextCollector {
    fn open(&mut self, element: &Element, path: &NodePath) -> Result<()> {
        let Some(config) = self.config.clone() else {
            return Ok(());
        };

        let mut frame = Frame {
            matched: false,
            ignored: false,
            inline: false,
        };

        if !self.open.is_empty() || self.ignore_depth > 0 {
            if self.is_ignored(&config, &element.qname) {
                frame.ignored = true;
                self.ignore_depth += 1;
            } else if self.is_inline(&config, &element.qname) {
                frame.inline = true;
            } else {
                self.separate_words();
            }
        }

        self.index_attributes(&config, element, path);
        for (index, rule) in config.rules().iter().enumerate() {
            if rule.matches(path) {
                frame.matched = true;
                self.open.push(OpenMatch {
                    node_id: element.node_id.clone(),
                    qname: element.qname.clone(),
                    field: rule.field().map(str::to_string),
                    analyzer: Analyzer::from_id(rule.analyzer()),
                    boost: rule.boost_for(Some(element)).unwrap_or(1.0),
                    rule: index,
                    ignore_level: self.ignore_depth,
                    text: String::new(),
                });
            }
        }

        self.frames.push(frame);
        Ok(())
    }

    fn text(&mut self, text: &Text, _path: &NodePath) -> Result<()> {
        let depth = self.ignore_depth;
        for m in self.open.iter_mut().filter(|m| m.ignore_level == depth) {
            m.text.push_str(&text.data);
        }
        Ok(())
    }

    fn close(&mut self, element: &Element, _path: &NodePath) -> Result<()> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        if frame.matched {
            while self
                .open
                .last()
                .is_some_and(|m| m.node_id == element.node_id)
            {
                if let Some(m) = self.open.pop() {
                    self.collected.push(NodeText {
                        node_id: m.node_id,
                        qname: m.qname,
                        field: m.field,
                        terms: m.analyzer.tokenize(&m.text),
                        boost: m.boost,
                    });
                }
            }
        }
        if frame.ignored {
            self.ignore_depth = self.ignore_depth.saturating_sub(1);
        } else if !frame.inline {
            self.separate_words();
        }
        Ok(())
    }
}
