//! Worker modes
//!
//! A worker is bound to one document at a time in one of these modes. The mode
//! decides what `flush` does with the events buffered since the binding:
//!
//! - `Store`: add the buffered entries to the engine
//! - `RemoveSome`: subtract the buffered entries (a node subtree is going away)
//! - `RemoveAll`: drop everything indexed for the bound document; no events
//!   are streamed
//! - `RemoveBinary`: a binary resource is going away; it is never indexed, so
//!   flush only resets state

use std::fmt;

/// What the current streaming cycle does to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// New nodes are being added
    #[default]
    Store,
    /// The whole document is being removed
    RemoveAll,
    /// A subtree of the document is being removed
    RemoveSome,
    /// A binary resource is being removed
    RemoveBinary,
}

impl Mode {
    /// Whether a listener receives events in this mode
    pub fn streams(&self) -> bool {
        matches!(self, Mode::Store | Mode::RemoveSome)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Store => "store",
            Mode::RemoveAll => "remove-all",
            Mode::RemoveSome => "remove-some",
            Mode::RemoveBinary => "remove-binary",
        };
        f.write_str(s)
    }
}
