//! Stream listeners
//!
//! While a document (or a subtree of it) is stored or removed, the store walks
//! its nodes in document order and hands every node to each active worker's
//! listener:
//!
//! - `start_element` before the element's attributes and children
//! - `attribute` once per attribute, after the start and before any child
//! - `characters` for text and CDATA
//! - `end_element` after the last child
//!
//! During a store the element seen by `start_element` has no attributes yet.
//! Listeners that need them wrap an [`ElementSink`] in [`Deferred`], which
//! holds the element back until its attributes are complete.

use nodex_concurrency::Transaction;
use nodex_core::{Attribute, Element, NodePath, Result, Text};
use tracing::warn;

/// Receives node events for the document the owning worker is bound to.
///
/// `path` ends with the node's own name for elements and attributes, and with
/// the parent element's name for text.
pub trait StreamListener {
    /// An element opens
    fn start_element(&mut self, _txn: &Transaction, _element: &Element, _path: &NodePath) {}

    /// An attribute of the element opened last
    fn attribute(&mut self, _txn: &Transaction, _attribute: &Attribute, _path: &NodePath) {}

    /// Character data
    fn characters(&mut self, _txn: &Transaction, _text: &Text, _path: &NodePath) {}

    /// An element closes
    fn end_element(&mut self, _txn: &Transaction, _element: &Element, _path: &NodePath) {}
}

/// One node event
#[derive(Debug, Clone, Copy)]
pub enum NodeEvent<'a> {
    /// Element start
    StartElement(&'a Element),
    /// Attribute
    Attribute(&'a Attribute),
    /// Text or CDATA
    Characters(&'a Text),
    /// Element end
    EndElement(&'a Element),
}

/// Fans node events out to every active listener, in a fixed order
pub struct StreamPipeline<'a> {
    txn: &'a Transaction,
    listeners: Vec<&'a mut dyn StreamListener>,
    events: usize,
}

impl<'a> StreamPipeline<'a> {
    /// Pipeline over the given listeners
    pub fn new(txn: &'a Transaction, listeners: Vec<&'a mut dyn StreamListener>) -> Self {
        StreamPipeline {
            txn,
            listeners,
            events: 0,
        }
    }

    /// Deliver one event to every listener
    pub fn dispatch(&mut self, event: NodeEvent<'_>, path: &NodePath) {
        self.events += 1;
        for listener in self.listeners.iter_mut() {
            match event {
                NodeEvent::StartElement(e) => listener.start_element(self.txn, e, path),
                NodeEvent::Attribute(a) => listener.attribute(self.txn, a, path),
                NodeEvent::Characters(t) => listener.characters(self.txn, t, path),
                NodeEvent::EndElement(e) => listener.end_element(self.txn, e, path),
            }
        }
    }

    /// Transaction the events belong to
    pub fn transaction(&self) -> &Transaction {
        self.txn
    }

    /// Number of listeners receiving events
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is active
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Events dispatched so far
    pub fn event_count(&self) -> usize {
        self.events
    }
}

// ============================================================================
// Deferred element finalization
// ============================================================================

/// Consumer of completed elements
pub trait ElementSink {
    /// An element opens, with all of its attributes
    fn open(&mut self, element: &Element, path: &NodePath) -> Result<()>;

    /// Character data inside the element opened last
    fn text(&mut self, text: &Text, path: &NodePath) -> Result<()>;

    /// An element closes
    fn close(&mut self, element: &Element, path: &NodePath) -> Result<()>;
}

/// Listener that delays each element until its attributes have arrived.
///
/// The pending element is finalized by the next `start_element`,
/// `characters` or `end_element`; `end_element` itself is never delayed. A
/// sink failure is logged and the stream continues.
pub struct Deferred<S> {
    sink: S,
    pending: Option<(Element, NodePath)>,
}

impl<S: ElementSink> Deferred<S> {
    /// Wrap a sink
    pub fn new(sink: S) -> Self {
        Deferred {
            sink,
            pending: None,
        }
    }

    /// The wrapped sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The wrapped sink, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Whether an element is waiting for finalization
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending element. Returns whether one was dropped; a pending
    /// element at this point means the stream ended without closing it.
    pub fn reset(&mut self) -> bool {
        match self.pending.take() {
            Some((element, _)) => {
                warn!(
                    target: "nodex::stream",
                    node = %element.node_id,
                    name = %element.qname,
                    "Discarding element left pending at end of stream"
                );
                true
            }
            None => false,
        }
    }

    fn finalize(&mut self) {
        if let Some((element, path)) = self.pending.take() {
            if let Err(e) = self.sink.open(&element, &path) {
                warn!(target: "nodex::stream", node = %element.node_id, error = %e, "Failed to process element");
            }
        }
    }
}

impl<S: ElementSink> StreamListener for Deferred<S> {
    fn start_element(&mut self, _txn: &Transaction, element: &Element, path: &NodePath) {
        self.finalize();
        self.pending = Some((element.clone(), path.clone()));
    }

    fn attribute(&mut self, _txn: &Transaction, attribute: &Attribute, _path: &NodePath) {
        match self.pending.as_mut() {
            Some((element, _)) => {
                if !element
                    .attributes
                    .iter()
                    .any(|a| a.node_id == attribute.node_id)
                {
                    element.attributes.push(attribute.clone());
                }
            }
            None => {
                warn!(target: "nodex::stream", node = %attribute.node_id, "Attribute without an open element");
            }
        }
    }

    fn characters(&mut self, _txn: &Transaction, text: &Text, path: &NodePath) {
        self.finalize();
        if let Err(e) = self.sink.text(text, path) {
            warn!(target: "nodex::stream", node = %text.node_id, error = %e, "Failed to process text");
        }
    }

    fn end_element(&mut self, _txn: &Transaction, element: &Element, path: &NodePath) {
        self.finalize();
        if let Err(e) = self.sink.close(element, path) {
            warn!(target: "nodex::stream", node = %element.node_id, error = %e, "Failed to close element");
        }
    }
}
