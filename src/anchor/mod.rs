//! Range anchors
//!
//! Converts a live selection inside the chapter container into an
//! [`AnchorDescriptor`] that survives a reload, and turns a descriptor back
//! into a [`Range`](crate::dom::Range) once the fragment has been rebuilt.
//!
//! Descriptor format: each boundary is a child-index path from the container
//! root plus an offset, e.g. `{"path": [0, 1, 0], "offset": 3}` for the fourth
//! character of the first child of the second child of the first top-level
//! node.

mod codec;
mod types;

pub use codec::{decode_range, encode_boundary, encode_range, resolve_path, AnchorError};
pub use types::{AnchorDescriptor, NodeLocation};
