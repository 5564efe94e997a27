//! Secondary indexing framework
//!
//! This module provides:
//! - IndexConfig / IndexMatchRule: per-collection rules parsed from the
//!   `<index>` block of a collection configuration
//! - StreamListener / StreamPipeline: node events delivered while documents
//!   are stored or removed, with deferred element finalization
//! - IndexWorker / Index: per-session engine contexts and the engines that
//!   own them
//! - IndexController / IndexManager: drive every engine through a mutation
//!   cycle and through its lifecycle

pub mod config;
pub mod controller;
pub mod index;
pub mod kind;
pub mod listener;
pub mod manager;
pub mod mode;
pub mod query;
pub mod registry;
pub mod rule;
pub mod scan;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{IndexConfig, IndexSpec};
pub use controller::IndexController;
pub use index::{Index, IndexConstructor, IndexFactory, WorkerHandle};
pub use kind::IndexKind;
pub use listener::{Deferred, ElementSink, NodeEvent, StreamListener, StreamPipeline};
pub use manager::IndexManager;
pub use mode::Mode;
pub use query::{QueryHit, QueryResult, SolutionTable};
pub use registry::WorkerRegistry;
pub use rule::{AttributeCondition, FieldType, IndexMatchRule, NodeTreatment, RuleTarget};
pub use scan::{collect_occurrences, HintValue, NodeSet, Occurrences, ScanHints, QNAMES_KEY, START_VALUE};
pub use worker::{configure_from, DocumentBinding, IndexWorker};
