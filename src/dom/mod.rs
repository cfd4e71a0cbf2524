//! Arena-backed DOM tree for chapter fragments
//!
//! A [`Document`] owns one container element (the injection target) and every
//! node created while working on it. Node handles ([`NodeId`]) are only
//! meaningful for the document that issued them: each chapter load builds a
//! fresh document, so handles never cross a render pass.
//!
//! Text offsets follow browser DOM semantics and count UTF-16 code units.

mod parser;
mod range;
mod serialize;

pub use range::{Boundary, Range};

use thiserror::Error;

/// Handle to a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Detached container produced by range extraction
    Fragment,
    /// Element with tag name and attributes
    Element(ElementData),
    /// Text run
    Text(String),
    /// Comment (counts as a child node like any other)
    Comment(String),
}

/// Tag name and attributes of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Whether the `class` attribute lists `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Errors raised by tree and range mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Offset {offset} is out of bounds for node of length {length}")]
    IndexSize { offset: usize, length: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Node {0:?} is not a child of the given parent")]
    NotAChild(NodeId),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A node arena rooted at a single container element.
///
/// Handles index straight into the arena; passing a handle issued by another
/// document is a logic error and may panic.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create an empty document whose container element is `container`
    pub fn new(container: &str) -> Self {
        let root = Node::new(NodeData::Element(ElementData::new(
            container.to_ascii_lowercase(),
        )));
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Create a document and inject `html` into its container
    pub fn parse_fragment(container: &str, html: &str) -> Self {
        let mut doc = Self::new(container);
        let root = doc.root;
        doc.set_inner_html(root, html);
        doc
    }

    /// The container element; root of every path computation
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.child_index(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    /// Position of `id` among its parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element(_))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Comment(_))
    }

    /// Text and comment nodes carry character data
    pub fn is_character_data(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(_) | NodeData::Comment(_))
    }

    fn character_data(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) | NodeData::Comment(text) => Some(text),
            _ => None,
        }
    }

    fn character_data_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes[id.0].data {
            NodeData::Text(text) | NodeData::Comment(text) => Some(text),
            _ => None,
        }
    }

    /// DOM node length: UTF-16 units for character data, child count otherwise
    pub fn length(&self, id: NodeId) -> usize {
        match self.character_data(id) {
            Some(data) => utf16_len(data),
            None => self.children(id).len(),
        }
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_with(ElementData::new(name.to_ascii_lowercase()))
    }

    pub fn create_element_with(&mut self, element: ElementData) -> NodeId {
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::Fragment)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    /// Inclusive containment: `node` is `ancestor` or one of its descendants
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Inclusive ancestors of `node`, nearest first
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cur = Some(node);
        while let Some(id) = cur {
            chain.push(id);
            cur = self.parent(id);
        }
        chain
    }

    /// Descendants of `id` in tree order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// First text node under `scope` whose data contains `needle`
    pub fn find_text(&self, scope: NodeId, needle: &str) -> Option<NodeId> {
        self.descendants(scope)
            .find(|&id| self.text(id).map(|t| t.contains(needle)).unwrap_or(false))
    }

    /// Elements under `scope` with tag name `name`
    pub fn elements_by_name(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| self.element(id).map(|el| el.name == name).unwrap_or(false))
            .collect()
    }

    /// Concatenated text of every descendant text node
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(data) = self.character_data(id) {
            return data.to_string();
        }
        self.descendants(id)
            .filter_map(|child| self.text(child))
            .collect()
    }

    /// Detach `id` from its parent. A no-op for parentless nodes.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `node` into `parent` before `reference` (or at the end).
    ///
    /// Inserting a fragment moves its children instead and leaves it empty.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if self.contains(node, parent) {
            return Err(DomError::HierarchyRequest(
                "cannot insert a node into itself or its descendant".to_string(),
            ));
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild(reference));
            }
        }
        let reference = if reference == Some(node) {
            self.next_sibling(node)
        } else {
            reference
        };

        let moving: Vec<NodeId> = if matches!(self.data(node), NodeData::Fragment) {
            std::mem::take(&mut self.nodes[node.0].children)
        } else {
            self.remove(node);
            vec![node]
        };

        let mut at = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|&child| child == reference)
                .ok_or(DomError::NotAChild(reference))?,
            None => self.children(parent).len(),
        };
        for child in moving {
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.insert(at, child);
            at += 1;
        }
        Ok(())
    }

    /// Replace every child of `parent` with the parsed `html`
    pub fn set_inner_html(&mut self, parent: NodeId, html: &str) {
        for child in std::mem::take(&mut self.nodes[parent.0].children) {
            self.nodes[child.0].parent = None;
        }
        parser::parse_into(self, parent, html);
    }

    /// Copy a node; `deep` also copies its subtree. The copy is detached.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let data = self.data(id).clone();
        let copy = self.push(data);
        if deep {
            for child in self.children(id).to_vec() {
                let child_copy = self.clone_node(child, true);
                self.nodes[child_copy.0].parent = Some(copy);
                self.nodes[copy.0].children.push(child_copy);
            }
        }
        copy
    }

    /// Character data of `id` from `offset`, at most `count` units long
    pub fn substring_data(
        &self,
        id: NodeId,
        offset: usize,
        count: usize,
    ) -> Result<String, DomError> {
        let data = self.character_data(id).ok_or_else(not_character_data)?;
        let (from, to) = utf16_span(data, offset, count)?;
        Ok(data[from..to].to_string())
    }

    /// Replace `count` units at `offset` with `replacement`
    pub fn replace_data(
        &mut self,
        id: NodeId,
        offset: usize,
        count: usize,
        replacement: &str,
    ) -> Result<(), DomError> {
        let data = self.character_data_mut(id).ok_or_else(not_character_data)?;
        let (from, to) = utf16_span(data, offset, count)?;
        data.replace_range(from..to, replacement);
        Ok(())
    }

    /// Split a text node at `offset`; the tail becomes its next sibling
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let data = self.text(id).ok_or_else(not_character_data)?;
        let length = utf16_len(data);
        let split_at = utf16_to_byte(data, offset).ok_or(DomError::IndexSize { offset, length })?;
        let tail = data[split_at..].to_string();

        let new_node = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let reference = self.next_sibling(id);
            self.insert_before(parent, new_node, reference)?;
        }
        self.replace_data(id, offset, length - offset, "")?;
        Ok(new_node)
    }

    /// Merge adjacent text runs and drop empty ones, throughout the subtree
    pub fn normalize(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            let text = match self.text(child) {
                Some(text) => text.to_string(),
                None => {
                    self.normalize(child);
                    kept.push(child);
                    continue;
                }
            };
            if text.is_empty() {
                self.nodes[child.0].parent = None;
                continue;
            }
            let previous_text = kept.last().copied().filter(|&prev| self.is_text(prev));
            match previous_text {
                Some(prev) => {
                    if let NodeData::Text(existing) = &mut self.nodes[prev.0].data {
                        existing.push_str(&text);
                    }
                    self.nodes[child.0].parent = None;
                }
                None => kept.push(child),
            }
        }

        self.nodes[id.0].children = kept;
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}

fn not_character_data() -> DomError {
    DomError::InvalidState("node does not carry character data".to_string())
}

pub(crate) fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte index of a UTF-16 offset; `None` when past the end or inside a
/// surrogate pair.
pub(crate) fn utf16_to_byte(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units == offset {
            return Some(idx);
        }
        units += ch.len_utf16();
        if units > offset {
            return None;
        }
    }
    (units == offset).then_some(text.len())
}

fn utf16_span(data: &str, offset: usize, count: usize) -> Result<(usize, usize), DomError> {
    let length = utf16_len(data);
    if offset > length {
        return Err(DomError::IndexSize { offset, length });
    }
    let end = offset + count.min(length - offset);
    let from = utf16_to_byte(data, offset).ok_or(DomError::IndexSize { offset, length })?;
    let to = utf16_to_byte(data, end).ok_or(DomError::IndexSize {
        offset: end,
        length,
    })?;
    Ok((from, to))
}
