//! Range <-> descriptor conversion
//!
//! Paths are plain child-index walks from the container root, counting every
//! node kind. They are only meaningful against a tree built from the same
//! fragment with the same earlier highlights applied, which is why restoring
//! a log must decode and wrap one descriptor at a time.

use std::cmp::Ordering;

use thiserror::Error;

use super::types::{AnchorDescriptor, NodeLocation};
use crate::dom::{Boundary, Document, NodeId, Range};

/// Why a selection could not be encoded or a descriptor could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("selection is collapsed")]
    Collapsed,

    #[error("selection is outside the container")]
    OutsideContainer,

    #[error("node is detached from the container")]
    Detached,

    #[error("path step {depth} (index {index}) does not exist")]
    Unresolvable { depth: usize, index: usize },

    #[error("offset {offset} is out of bounds for node of length {length}")]
    OffsetOutOfRange { offset: usize, length: usize },

    #[error("range end precedes its start")]
    Inverted,

    #[error("boundary lies inside a comment")]
    InComment,
}

/// Encode a selection made inside `root`.
///
/// Fails for collapsed selections, selections whose common ancestor is not
/// inside `root`, and selections that would be rejected on decode: offsets
/// outside their node, boundaries inside a comment, or an end before the
/// start.
pub fn encode_range(
    doc: &Document,
    root: NodeId,
    range: &Range,
) -> Result<AnchorDescriptor, AnchorError> {
    if range.collapsed() {
        return Err(AnchorError::Collapsed);
    }
    let common = doc
        .range_common_ancestor(range)
        .ok_or(AnchorError::OutsideContainer)?;
    if !doc.contains(root, common) {
        return Err(AnchorError::OutsideContainer);
    }
    check_boundary(doc, range.start)?;
    check_boundary(doc, range.end)?;
    match doc.compare_boundaries(range.start, range.end) {
        Some(Ordering::Less) => {}
        Some(Ordering::Equal) => return Err(AnchorError::Collapsed),
        Some(Ordering::Greater) | None => return Err(AnchorError::Inverted),
    }

    let start = encode_boundary(doc, root, range.start)?;
    let end = encode_boundary(doc, root, range.end)?;
    Ok(AnchorDescriptor { start, end })
}

/// Encode one boundary.
///
/// Element boundaries are first moved onto the child at the offset (or the
/// last child when the offset is past the end); the offset itself is kept.
pub fn encode_boundary(
    doc: &Document,
    root: NodeId,
    point: Boundary,
) -> Result<NodeLocation, AnchorError> {
    let mut cur = point.node;
    if doc.is_element(cur) {
        let children = doc.children(cur);
        if let Some(&child) = children.get(point.offset).or_else(|| children.last()) {
            cur = child;
        }
    }

    let mut path = Vec::new();
    while cur != root {
        let parent = doc.parent(cur).ok_or(AnchorError::Detached)?;
        let idx = doc.child_index(cur).ok_or(AnchorError::Detached)?;
        path.push(idx);
        cur = parent;
    }
    path.reverse();

    Ok(NodeLocation {
        path,
        offset: point.offset,
    })
}

/// Walk `path` down from `root`
pub fn resolve_path(doc: &Document, root: NodeId, path: &[usize]) -> Result<NodeId, AnchorError> {
    let mut cur = root;
    for (depth, &index) in path.iter().enumerate() {
        cur = *doc
            .children(cur)
            .get(index)
            .ok_or(AnchorError::Unresolvable { depth, index })?;
    }
    Ok(cur)
}

/// Rebuild a range from a descriptor against the current tree.
///
/// Besides unresolvable paths, this rejects offsets outside the resolved node
/// (including offsets inside a surrogate pair) and empty or inverted ranges,
/// so a mismatched rebuild never yields a bogus range.
pub fn decode_range(
    doc: &Document,
    root: NodeId,
    descriptor: &AnchorDescriptor,
) -> Result<Range, AnchorError> {
    let start = decode_boundary(doc, root, &descriptor.start)?;
    let end = decode_boundary(doc, root, &descriptor.end)?;

    match doc.compare_boundaries(start, end) {
        Some(Ordering::Less) => Ok(Range::new(start, end)),
        Some(Ordering::Equal) => Err(AnchorError::Collapsed),
        Some(Ordering::Greater) | None => Err(AnchorError::Inverted),
    }
}

fn decode_boundary(
    doc: &Document,
    root: NodeId,
    location: &NodeLocation,
) -> Result<Boundary, AnchorError> {
    let node = resolve_path(doc, root, &location.path)?;
    let point = Boundary::new(node, location.offset);
    check_boundary(doc, point)?;
    Ok(point)
}

/// Marks can only be placed at text or element positions
fn check_boundary(doc: &Document, point: Boundary) -> Result<(), AnchorError> {
    if doc.is_comment(point.node) {
        return Err(AnchorError::InComment);
    }
    doc.validate_boundary(point)
        .map_err(|_| AnchorError::OffsetOutOfRange {
            offset: point.offset,
            length: doc.length(point.node),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        Document::parse_fragment("div", html)
    }

    #[test]
    fn test_encode_text_inside_bold() {
        let doc = doc("<p>Hello <b>world</b></p>");
        let root = doc.root();
        let world = doc.find_text(root, "world").unwrap();

        let descriptor = encode_range(&doc, root, &Range::within(world, 0, 5)).unwrap();

        assert_eq!(descriptor.start, NodeLocation::new(vec![0, 1, 0], 0));
        assert_eq!(descriptor.end, NodeLocation::new(vec![0, 1, 0], 5));
    }

    #[test]
    fn test_round_trip_across_nodes() {
        let doc = doc("<h1>Title</h1>\n<p>alpha <i>beta</i> gamma</p><!-- x --><p>delta</p>");
        let root = doc.root();
        let alpha = doc.find_text(root, "alpha").unwrap();
        let delta = doc.find_text(root, "delta").unwrap();
        let range = Range::new(Boundary::new(alpha, 3), Boundary::new(delta, 2));

        let descriptor = encode_range(&doc, root, &range).unwrap();
        let decoded = decode_range(&doc, root, &descriptor).unwrap();

        assert_eq!(decoded, range);
        assert_eq!(descriptor.start.path, vec![2, 0]);
        assert_eq!(descriptor.end.path, vec![4, 0]);
    }

    #[test]
    fn test_round_trip_survives_rebuild() {
        let html = "<p>one <em>two</em> three</p>";
        let first = doc(html);
        let root = first.root();
        let two = first.find_text(root, "two").unwrap();
        let descriptor = encode_range(&first, root, &Range::within(two, 1, 3)).unwrap();

        let second = doc(html);
        let decoded = decode_range(&second, second.root(), &descriptor).unwrap();

        assert_eq!(second.text(decoded.start.node), Some("two"));
        assert_eq!((decoded.start.offset, decoded.end.offset), (1, 3));
    }

    #[test]
    fn test_encode_rejects_collapsed() {
        let doc = doc("<p>abc</p>");
        let text = doc.find_text(doc.root(), "abc").unwrap();
        assert_eq!(
            encode_range(&doc, doc.root(), &Range::within(text, 1, 1)),
            Err(AnchorError::Collapsed)
        );
    }

    #[test]
    fn test_encode_rejects_outside_container() {
        let mut doc = doc("<p>abc</p>");
        let loose = doc.create_text("detached");
        assert_eq!(
            encode_range(&doc, doc.root(), &Range::within(loose, 0, 3)),
            Err(AnchorError::OutsideContainer)
        );
    }

    #[test]
    fn test_encode_rejects_inverted_selection() {
        let doc = doc("<p>abc</p><p>def</p>");
        let root = doc.root();
        let abc = doc.find_text(root, "abc").unwrap();
        let def = doc.find_text(root, "def").unwrap();

        let same_node = Range::new(Boundary::new(abc, 2), Boundary::new(abc, 1));
        assert_eq!(
            encode_range(&doc, root, &same_node),
            Err(AnchorError::Inverted)
        );
        let across = Range::new(Boundary::new(def, 1), Boundary::new(abc, 1));
        assert_eq!(encode_range(&doc, root, &across), Err(AnchorError::Inverted));
    }

    #[test]
    fn test_encode_rejects_offset_past_node() {
        let doc = doc("<p>abc</p>");
        let root = doc.root();
        let abc = doc.find_text(root, "abc").unwrap();
        assert_eq!(
            encode_range(&doc, root, &Range::within(abc, 0, 99)),
            Err(AnchorError::OffsetOutOfRange {
                offset: 99,
                length: 3
            })
        );
    }

    #[test]
    fn test_comment_boundaries_rejected_both_ways() {
        let doc = doc("<p>a</p><!-- secret note -->");
        let root = doc.root();
        let comment = doc.children(root)[1];
        assert_eq!(
            encode_range(&doc, root, &Range::within(comment, 1, 7)),
            Err(AnchorError::InComment)
        );

        let descriptor = AnchorDescriptor::new(
            NodeLocation::new(vec![1], 1),
            NodeLocation::new(vec![1], 7),
        );
        assert_eq!(
            decode_range(&doc, root, &descriptor),
            Err(AnchorError::InComment)
        );
    }

    #[test]
    fn test_encode_element_boundary_moves_to_child() {
        let doc = doc("<p>ab<b>cd</b>ef</p>");
        let root = doc.root();
        let p = doc.children(root)[0];

        let inside = encode_boundary(&doc, root, Boundary::new(p, 1)).unwrap();
        assert_eq!(inside, NodeLocation::new(vec![0, 1], 1));

        let past_end = encode_boundary(&doc, root, Boundary::new(p, 3)).unwrap();
        assert_eq!(past_end, NodeLocation::new(vec![0, 2], 3));
    }

    #[test]
    fn test_encode_detached_subtree_fails() {
        let mut doc = doc("<p>abc</p>");
        let root = doc.root();
        let p = doc.children(root)[0];
        let text = doc.find_text(root, "abc").unwrap();
        doc.remove(p);
        assert_eq!(
            encode_boundary(&doc, root, Boundary::new(text, 1)),
            Err(AnchorError::Detached)
        );
    }

    #[test]
    fn test_decode_missing_path() {
        let doc = doc("<p>abc</p>");
        let descriptor = AnchorDescriptor::new(
            NodeLocation::new(vec![0, 0], 0),
            NodeLocation::new(vec![3, 0], 1),
        );
        assert_eq!(
            decode_range(&doc, doc.root(), &descriptor),
            Err(AnchorError::Unresolvable { depth: 0, index: 3 })
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range_offset() {
        let doc = doc("<p>abc</p>");
        let descriptor = AnchorDescriptor::new(
            NodeLocation::new(vec![0, 0], 1),
            NodeLocation::new(vec![0, 0], 9),
        );
        assert_eq!(
            decode_range(&doc, doc.root(), &descriptor),
            Err(AnchorError::OffsetOutOfRange {
                offset: 9,
                length: 3
            })
        );
    }

    #[test]
    fn test_decode_rejects_inverted_range() {
        let doc = doc("<p>abc</p><p>def</p>");
        let descriptor = AnchorDescriptor::new(
            NodeLocation::new(vec![1, 0], 1),
            NodeLocation::new(vec![0, 0], 1),
        );
        assert_eq!(
            decode_range(&doc, doc.root(), &descriptor),
            Err(AnchorError::Inverted)
        );
    }
}
