//! Ranges over a [`Document`]
//!
//! A [`Range`] is a plain value: it is not updated when the tree changes.
//! The mutating operations below (`extract_contents`, `insert_node`,
//! `surround_contents`) leave the range they were given in the same place a
//! live browser range would end up.

use std::cmp::Ordering;

use super::{utf16_to_byte, Document, DomError, NodeId};

/// A (node, offset) position in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A start/end pair of boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Range covering `[start, end)` of a single node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(Boundary::new(node, start), Boundary::new(node, end))
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }

    fn collapse_to(&mut self, point: Boundary) {
        self.start = point;
        self.end = point;
    }
}

impl Document {
    /// Check that `point` addresses a real position inside its node
    pub fn validate_boundary(&self, point: Boundary) -> Result<(), DomError> {
        let length = self.length(point.node);
        if point.offset > length {
            return Err(DomError::IndexSize {
                offset: point.offset,
                length,
            });
        }
        if let Some(data) = self.character_data(point.node) {
            if utf16_to_byte(data, point.offset).is_none() {
                return Err(DomError::IndexSize {
                    offset: point.offset,
                    length,
                });
            }
        }
        Ok(())
    }

    /// Deepest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let chain = self.ancestors(a);
        self.ancestors(b)
            .into_iter()
            .find(|candidate| chain.contains(candidate))
    }

    /// Common ancestor container of the range's boundaries
    pub fn range_common_ancestor(&self, range: &Range) -> Option<NodeId> {
        self.common_ancestor(range.start.node, range.end.node)
    }

    /// Tree-order comparison of two boundary points; `None` if they live in
    /// different trees.
    pub fn compare_boundaries(&self, a: Boundary, b: Boundary) -> Option<Ordering> {
        if a.node == b.node {
            return Some(a.offset.cmp(&b.offset));
        }
        self.common_ancestor(a.node, b.node)?;

        if let Some(child) = self.child_toward(a.node, b.node) {
            let idx = self.child_index(child)?;
            return Some(if idx < a.offset {
                Ordering::Greater
            } else {
                Ordering::Less
            });
        }
        if let Some(child) = self.child_toward(b.node, a.node) {
            let idx = self.child_index(child)?;
            return Some(if idx < b.offset {
                Ordering::Less
            } else {
                Ordering::Greater
            });
        }
        Some(self.tree_position(a.node).cmp(&self.tree_position(b.node)))
    }

    /// The child of `ancestor` on the way down to `node`, if `ancestor` is a
    /// proper ancestor of `node`
    fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut cur = node;
        while let Some(parent) = self.parent(cur) {
            if parent == ancestor {
                return Some(cur);
            }
            cur = parent;
        }
        None
    }

    fn tree_position(&self, node: NodeId) -> Vec<usize> {
        let mut position: Vec<usize> = self
            .ancestors(node)
            .into_iter()
            .filter_map(|id| self.child_index(id))
            .collect();
        position.reverse();
        position
    }

    /// Move the range's contents into a new detached fragment.
    ///
    /// Partially selected elements are split: a shallow copy holding the
    /// selected part goes into the fragment while the original keeps the rest.
    /// The range is collapsed to where the contents used to be.
    pub fn extract_contents(&mut self, range: &mut Range) -> Result<NodeId, DomError> {
        let fragment = self.create_fragment();
        if range.collapsed() {
            return Ok(fragment);
        }

        let Range { start, end } = *range;

        if start.node == end.node && self.is_character_data(start.node) {
            let count = end.offset.saturating_sub(start.offset);
            let clone = self.clone_node(start.node, false);
            let selected = self.substring_data(start.node, start.offset, count)?;
            let full = self.length(clone);
            self.replace_data(clone, 0, full, &selected)?;
            self.append_child(fragment, clone)?;
            self.replace_data(start.node, start.offset, count, "")?;
            range.collapse_to(start);
            return Ok(fragment);
        }

        let common = self
            .common_ancestor(start.node, end.node)
            .ok_or_else(|| DomError::InvalidState("range spans two trees".to_string()))?;

        let first_partial = if self.contains(start.node, end.node) {
            None
        } else {
            self.child_toward(common, start.node)
        };
        let last_partial = if self.contains(end.node, start.node) {
            None
        } else {
            self.child_toward(common, end.node)
        };

        let children = self.children(common).to_vec();
        let from = match first_partial {
            Some(child) => self.child_index(child).map(|idx| idx + 1).unwrap_or(0),
            None => start.offset,
        };
        let to = match last_partial {
            Some(child) => self.child_index(child).unwrap_or(children.len()),
            None => end.offset,
        };
        let contained: Vec<NodeId> = children
            .get(from..to.max(from))
            .map(|slice| slice.to_vec())
            .unwrap_or_default();

        let new_point = if self.contains(start.node, end.node) {
            start
        } else {
            let mut reference = start.node;
            while let Some(parent) = self.parent(reference) {
                if self.contains(parent, end.node) {
                    break;
                }
                reference = parent;
            }
            let parent = self
                .parent(reference)
                .ok_or_else(|| DomError::InvalidState("range start is detached".to_string()))?;
            let idx = self.child_index(reference).unwrap_or(0);
            Boundary::new(parent, idx + 1)
        };

        if let Some(partial) = first_partial {
            if self.is_character_data(partial) {
                let length = self.length(start.node);
                let clone = self.clone_node(start.node, false);
                let selected = self.substring_data(start.node, start.offset, length)?;
                let full = self.length(clone);
                self.replace_data(clone, 0, full, &selected)?;
                self.append_child(fragment, clone)?;
                self.replace_data(start.node, start.offset, length, "")?;
            } else {
                let clone = self.clone_node(partial, false);
                self.append_child(fragment, clone)?;
                let partial_length = self.length(partial);
                let mut subrange = Range::new(start, Boundary::new(partial, partial_length));
                let subfragment = self.extract_contents(&mut subrange)?;
                self.append_child(clone, subfragment)?;
            }
        }

        for child in contained {
            self.append_child(fragment, child)?;
        }

        if let Some(partial) = last_partial {
            if self.is_character_data(partial) {
                let clone = self.clone_node(end.node, false);
                let selected = self.substring_data(end.node, 0, end.offset)?;
                let full = self.length(clone);
                self.replace_data(clone, 0, full, &selected)?;
                self.append_child(fragment, clone)?;
                self.replace_data(end.node, 0, end.offset, "")?;
            } else {
                let clone = self.clone_node(partial, false);
                self.append_child(fragment, clone)?;
                let mut subrange = Range::new(Boundary::new(partial, 0), end);
                let subfragment = self.extract_contents(&mut subrange)?;
                self.append_child(clone, subfragment)?;
            }
        }

        range.collapse_to(new_point);
        Ok(fragment)
    }

    /// Insert `node` at the start of the range, splitting a text node if the
    /// range starts inside one. The end is adjusted only for collapsed ranges.
    pub fn insert_node(&mut self, range: &mut Range, node: NodeId) -> Result<(), DomError> {
        let start = range.start;
        if start.node == node {
            return Err(DomError::HierarchyRequest(
                "cannot insert a node at a boundary inside itself".to_string(),
            ));
        }
        if matches!(self.data(start.node), super::NodeData::Comment(_)) {
            return Err(DomError::HierarchyRequest(
                "cannot insert into a comment".to_string(),
            ));
        }

        let (parent, mut reference) = if self.is_text(start.node) {
            let parent = self.parent(start.node).ok_or_else(|| {
                DomError::HierarchyRequest("text node has no parent".to_string())
            })?;
            let tail = self.split_text(start.node, start.offset)?;
            if range.end.node == start.node && range.end.offset > start.offset {
                range.end = Boundary::new(tail, range.end.offset.saturating_sub(start.offset));
            }
            (parent, Some(tail))
        } else {
            self.validate_boundary(start)?;
            (start.node, self.children(start.node).get(start.offset).copied())
        };

        if reference == Some(node) {
            reference = self.next_sibling(node);
        }
        if self.parent(node).is_some() {
            self.remove(node);
        }

        let was_collapsed = range.collapsed();
        let inserted = match self.data(node) {
            super::NodeData::Fragment => self.children(node).len(),
            _ => 1,
        };
        let at = match reference {
            Some(reference) => self
                .child_index(reference)
                .unwrap_or(self.children(parent).len()),
            None => self.children(parent).len(),
        };

        self.insert_before(parent, node, reference)?;

        if was_collapsed {
            range.end = Boundary::new(parent, at + inserted);
        }
        Ok(())
    }

    /// Wrap the range's contents in `wrapper` and select the wrapper.
    ///
    /// Fails with [`DomError::InvalidState`] when a non-text node is only
    /// partially inside the range; the tree is untouched in that case.
    pub fn surround_contents(&mut self, range: &mut Range, wrapper: NodeId) -> Result<(), DomError> {
        for (from, other) in [
            (range.start.node, range.end.node),
            (range.end.node, range.start.node),
        ] {
            for ancestor in self.ancestors(from) {
                if !self.contains(ancestor, other) && !self.is_text(ancestor) {
                    return Err(DomError::InvalidState(
                        "range partially selects a non-text node".to_string(),
                    ));
                }
            }
        }
        self.validate_boundary(range.start)?;
        self.validate_boundary(range.end)?;

        let fragment = self.extract_contents(range)?;
        for child in self.children(wrapper).to_vec() {
            self.remove(child);
        }
        self.insert_node(range, wrapper)?;
        self.append_child(wrapper, fragment)?;

        let parent = self
            .parent(wrapper)
            .ok_or_else(|| DomError::InvalidState("wrapper was not inserted".to_string()))?;
        let idx = self.child_index(wrapper).unwrap_or(0);
        *range = Range::new(Boundary::new(parent, idx), Boundary::new(parent, idx + 1));
        Ok(())
    }
}
