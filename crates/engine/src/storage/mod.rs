//! In-memory document store
//!
//! - `Document`: parsed XML with node ids and event replay
//! - `Collection`: named resources plus the collection's index configuration

pub mod collection;
pub mod document;

pub use collection::{Collection, Resource};
pub use document::Document;
