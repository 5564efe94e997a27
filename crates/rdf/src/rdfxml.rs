//! Streaming RDF/XML reader
//!
//! `RdfXmlSink` turns the element stream of a document (or of one of its
//! subtrees) into triples. It keeps one frame per open element; node
//! elements contribute their subject, property elements wait for their
//! object until they close.
//!
//! Blank nodes that the document leaves unnamed are labelled from the node
//! id of the element introducing them, so walking the same subtree twice
//! yields the same triples. This is what lets a `RemoveSome` pass subtract
//! exactly what an earlier `Store` pass added.
//!
//! A walk may start at the document root or at a child of `rdf:RDF`. Other
//! starting points carry no subject context and are skipped.

use crate::term::{rdf_type, resolve_iri, Term, Triple, RDF_NS};
use nodex_core::{Attribute, Element, Error, NodeId, NodePath, PathComponent, QName, Result, Text, XML_NS};
use nodex_engine::indexing::ElementSink;
use tracing::{debug, warn};

/// Attributes that belong to the RDF/XML syntax rather than the graph.
/// Unqualified spellings are accepted as well.
const SYNTAX_ATTRIBUTES: [&str; 7] = ["about", "ID", "nodeID", "resource", "datatype", "parseType", "bagID"];

fn is_rdf(qname: &QName, local: &str) -> bool {
    qname.namespace() == RDF_NS && qname.local_name() == local
}

fn rdf(local: &str) -> Term {
    Term::iri(format!("{}{}", RDF_NS, local))
}

fn blank_for(id: &NodeId) -> Term {
    Term::blank(format!("n{}", id))
}

/// What an attribute contributes
enum AttrRole<'a> {
    Syntax(&'a str),
    Type,
    Property,
    Ignored,
}

fn classify(attr: &Attribute) -> AttrRole<'_> {
    let name = &attr.qname;
    let local = name.local_name();
    match name.namespace() {
        XML_NS => AttrRole::Ignored,
        RDF_NS if local == "type" => AttrRole::Type,
        RDF_NS if SYNTAX_ATTRIBUTES.contains(&local) => AttrRole::Syntax(local),
        "" if SYNTAX_ATTRIBUTES.contains(&local) => AttrRole::Syntax(local),
        "" => AttrRole::Ignored,
        _ => AttrRole::Property,
    }
}

fn syntax<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.attributes.iter().find_map(|a| match classify(a) {
        AttrRole::Syntax(local) if local == name => Some(a.value.as_str()),
        _ => None,
    })
}

/// A property element waiting for its object
#[derive(Debug)]
struct PropertyFrame {
    subject: Term,
    predicate: Term,
    object: Option<Term>,
    text: String,
    lang: Option<String>,
    datatype: Option<String>,
    literal: bool,
    collection: Option<Vec<(Term, NodeId)>>,
}

#[derive(Debug)]
enum Frame {
    /// `rdf:RDF`: children are node elements
    Root,
    /// Node element: children are property elements
    Node { subject: Term, next_li: u32 },
    /// Property element
    Property(PropertyFrame),
    /// Element inside a `parseType="Literal"` property
    LiteralContent,
    /// Subtree that yields nothing
    Skip,
}

/// Where the next element lands
enum Position {
    Top,
    NodeList,
    PropertyList,
    Object,
    Nothing,
}

/// Element sink producing triples from RDF/XML
#[derive(Debug, Default)]
pub struct RdfXmlSink {
    base: String,
    stack: Vec<Frame>,
    langs: Vec<Option<String>>,
    triples: Vec<Triple>,
}

impl RdfXmlSink {
    /// Sink resolving relative references against `base`
    pub fn new(base: impl Into<String>) -> Self {
        RdfXmlSink {
            base: base.into(),
            ..Default::default()
        }
    }

    /// Forget all state and start over with a new base
    ///
    /// Triples produced but never taken are dropped with a warning.
    pub fn reset(&mut self, base: impl Into<String>) {
        if !self.triples.is_empty() {
            warn!(
                target: "nodex::rdf",
                base = %self.base,
                triples = self.triples.len(),
                "Model is not empty at reset"
            );
        }
        self.base = base.into();
        self.stack.clear();
        self.langs.clear();
        self.triples.clear();
    }

    /// Base IRI in effect
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Triples produced so far
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Hand over the produced triples
    pub fn take(&mut self) -> Vec<Triple> {
        std::mem::take(&mut self.triples)
    }

    /// Resolve an IRI reference against the base
    pub fn resolve(&self, reference: &str) -> String {
        resolve_iri(&self.base, reference)
    }

    fn emit(&mut self, subject: Term, predicate: Term, object: Term) {
        self.triples.push(Triple::new(subject, predicate, object));
    }

    fn position(&self) -> Position {
        match self.stack.last() {
            None => Position::Top,
            Some(Frame::Root) => Position::NodeList,
            Some(Frame::Node { .. }) => Position::PropertyList,
            Some(Frame::Property(_)) => Position::Object,
            Some(Frame::LiteralContent) | Some(Frame::Skip) => Position::Nothing,
        }
    }

    fn element_lang(&self, element: &Element) -> Option<String> {
        let declared = element
            .attributes
            .iter()
            .find(|a| a.qname.namespace() == XML_NS && a.qname.local_name() == "lang");
        match declared {
            Some(attr) if attr.value.is_empty() => None,
            Some(attr) => Some(attr.value.clone()),
            None => self.langs.last().cloned().flatten(),
        }
    }

    fn literal(&self, value: &str, lang: &Option<String>) -> Term {
        Term::typed_literal(value, lang.clone(), None)
    }

    /// Triples of the property attributes of `element` about `subject`
    fn attribute_properties(&mut self, element: &Element, subject: &Term, lang: &Option<String>) {
        for attr in &element.attributes {
            match classify(attr) {
                AttrRole::Type => {
                    let class = Term::iri(self.resolve(&attr.value));
                    self.emit(subject.clone(), rdf_type(), class);
                }
                AttrRole::Property => {
                    let object = self.literal(&attr.value, lang);
                    self.emit(subject.clone(), Term::iri(attr.qname.expanded()), object);
                }
                AttrRole::Syntax(_) | AttrRole::Ignored => {}
            }
        }
    }

    fn has_attribute_properties(element: &Element) -> bool {
        element
            .attributes
            .iter()
            .any(|a| matches!(classify(a), AttrRole::Type | AttrRole::Property))
    }

    /// Subject of a node element plus its type and attribute triples
    fn open_node(&mut self, element: &Element, lang: &Option<String>) -> Term {
        let subject = if let Some(about) = syntax(element, "about") {
            Term::iri(self.resolve(about))
        } else if let Some(id) = syntax(element, "ID") {
            Term::iri(self.resolve(&format!("#{}", id)))
        } else if let Some(label) = syntax(element, "nodeID") {
            Term::blank(label)
        } else {
            blank_for(&element.node_id)
        };
        if !is_rdf(&element.qname, "Description") {
            self.emit(subject.clone(), rdf_type(), Term::iri(element.qname.expanded()));
        }
        self.attribute_properties(element, &subject, lang);
        subject
    }

    fn open_top(&mut self, element: &Element, path: &NodePath, lang: &Option<String>) -> Result<Frame> {
        let root_is_rdf = matches!(
            path.components().first(),
            Some(PathComponent::Name(q)) if is_rdf(q, "RDF")
        );
        if path.len() <= 1 {
            if is_rdf(&element.qname, "RDF") {
                return Ok(Frame::Root);
            }
        } else if path.len() != 2 || !root_is_rdf {
            return Err(Error::stream(format!(
                "cannot read RDF/XML starting at {} ({})",
                element.node_id, path
            )));
        }
        let subject = self.open_node(element, lang);
        Ok(Frame::Node { subject, next_li: 1 })
    }

    fn open_property(&mut self, element: &Element, lang: &Option<String>) -> Result<Frame> {
        let (subject, predicate) = match self.stack.last_mut() {
            Some(Frame::Node { subject, next_li }) => {
                let predicate = if is_rdf(&element.qname, "li") {
                    let p = rdf(&format!("_{}", next_li));
                    *next_li += 1;
                    p
                } else {
                    Term::iri(element.qname.expanded())
                };
                (subject.clone(), predicate)
            }
            _ => return Err(Error::stream("property element outside a node element")),
        };
        if syntax(element, "ID").is_some() {
            debug!(target: "nodex::rdf", node = %element.node_id, "Statement reification not supported");
        }

        let mut frame = PropertyFrame {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object: None,
            text: String::new(),
            lang: lang.clone(),
            datatype: syntax(element, "datatype").map(|d| self.resolve(d)),
            literal: false,
            collection: None,
        };

        match syntax(element, "parseType") {
            Some("Resource") => {
                let object = blank_for(&element.node_id);
                self.emit(subject, predicate, object.clone());
                return Ok(Frame::Node {
                    subject: object,
                    next_li: 1,
                });
            }
            Some("Collection") => {
                frame.collection = Some(Vec::new());
                return Ok(Frame::Property(frame));
            }
            Some(_) => {
                frame.literal = true;
                frame.datatype = Some(format!("{}XMLLiteral", RDF_NS));
                return Ok(Frame::Property(frame));
            }
            None => {}
        }

        frame.object = if let Some(resource) = syntax(element, "resource") {
            Some(Term::iri(self.resolve(resource)))
        } else {
            syntax(element, "nodeID").map(Term::blank)
        };
        if Self::has_attribute_properties(element) {
            let object = frame
                .object
                .get_or_insert_with(|| blank_for(&element.node_id))
                .clone();
            self.attribute_properties(element, &object, lang);
        }
        Ok(Frame::Property(frame))
    }

    /// A node element inside a property element becomes its object
    fn open_object(&mut self, element: &Element, lang: &Option<String>) -> Result<Frame> {
        let (literal, collection, taken) = match self.stack.last() {
            Some(Frame::Property(p)) => (p.literal, p.collection.is_some(), p.object.is_some()),
            _ => return Err(Error::stream("object outside a property element")),
        };
        if literal {
            return Ok(Frame::LiteralContent);
        }
        if taken && !collection {
            return Err(Error::stream(format!(
                "property element holds more than one object at {}",
                element.node_id
            )));
        }
        let subject = self.open_node(element, lang);
        if let Some(Frame::Property(p)) = self.stack.last_mut() {
            match p.collection.as_mut() {
                Some(items) => items.push((subject.clone(), element.node_id.clone())),
                None => p.object = Some(subject.clone()),
            }
        }
        Ok(Frame::Node { subject, next_li: 1 })
    }

    fn close_property(&mut self, frame: PropertyFrame) {
        let PropertyFrame {
            subject,
            predicate,
            object,
            text,
            lang,
            datatype,
            collection,
            ..
        } = frame;
        if let Some(items) = collection {
            let nil = rdf("nil");
            let cells: Vec<Term> = items
                .iter()
                .map(|(_, id)| Term::blank(format!("l{}", id)))
                .collect();
            self.emit(subject, predicate, cells.first().cloned().unwrap_or_else(|| nil.clone()));
            for (i, (item, _)) in items.into_iter().enumerate() {
                let rest = cells.get(i + 1).cloned().unwrap_or_else(|| nil.clone());
                self.emit(cells[i].clone(), rdf("first"), item);
                self.emit(cells[i].clone(), rdf("rest"), rest);
            }
            return;
        }
        let object = match object {
            Some(object) => object,
            None if datatype.is_some() => Term::typed_literal(text, None, datatype),
            None => self.literal(&text, &lang),
        };
        self.emit(subject, predicate, object);
    }

    fn open_frame(&mut self, element: &Element, path: &NodePath, lang: &Option<String>) -> Result<Frame> {
        match self.position() {
            Position::Top => self.open_top(element, path, lang),
            Position::NodeList => {
                let subject = self.open_node(element, lang);
                Ok(Frame::Node { subject, next_li: 1 })
            }
            Position::PropertyList => self.open_property(element, lang),
            Position::Object => self.open_object(element, lang),
            Position::Nothing => Ok(match self.stack.last() {
                Some(Frame::LiteralContent) => Frame::LiteralContent,
                _ => Frame::Skip,
            }),
        }
    }
}

impl ElementSink for RdfXmlSink {
    fn open(&mut self, element: &Element, path: &NodePath) -> Result<()> {
        let lang = self.element_lang(element);
        let opened = self.open_frame(element, path, &lang);
        self.langs.push(lang);
        match opened {
            Ok(frame) => {
                self.stack.push(frame);
                Ok(())
            }
            Err(e) => {
                self.stack.push(Frame::Skip);
                Err(e)
            }
        }
    }

    fn text(&mut self, text: &Text, _path: &NodePath) -> Result<()> {
        let target = self.stack.iter_mut().rev().find_map(|frame| match frame {
            Frame::Property(p) => Some(Some(p)),
            Frame::LiteralContent => None,
            _ => Some(None),
        });
        match target.flatten() {
            Some(property) if property.object.is_none() && property.collection.is_none() => {
                property.text.push_str(&text.data);
            }
            _ => {
                debug!(target: "nodex::rdf", node = %text.node_id, "Ignoring character data outside a property");
            }
        }
        Ok(())
    }

    fn close(&mut self, element: &Element, _path: &NodePath) -> Result<()> {
        self.langs.pop();
        match self.stack.pop() {
            Some(Frame::Property(frame)) => {
                self.close_property(frame);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(Error::stream(format!(
                "end of element {} without a matching start",
                element.node_id
            ))),
        }
    }
}
