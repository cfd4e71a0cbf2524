//! Anchor descriptor types
//!
//! The JSON shape is persisted verbatim and shared with browser builds of the
//! reader:
//!
//! ```json
//! { "start": { "path": [0, 1, 0], "offset": 0 },
//!   "end":   { "path": [0, 1, 0], "offset": 5 } }
//! ```

use serde::{Deserialize, Serialize};

/// A range boundary addressed by child indices from the container root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeLocation {
    /// Child index at each level, root excluded, root-to-leaf order
    pub path: Vec<usize>,
    /// Character offset for text nodes; child-index offset for elements
    pub offset: usize,
}

impl NodeLocation {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Portable description of a highlighted span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorDescriptor {
    pub start: NodeLocation,
    pub end: NodeLocation,
}

impl AnchorDescriptor {
    pub fn new(start: NodeLocation, end: NodeLocation) -> Self {
        Self { start, end }
    }
}
