//! Highlight markers in the live tree

use crate::anchor::{decode_range, AnchorDescriptor};
use crate::dom::{Document, DomError, ElementData, NodeId, Range};

/// How highlight markers are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkConfig {
    /// Wrapper element name
    pub tag: String,
    /// Class identifying a wrapper as a highlight marker
    pub class: String,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            tag: "mark".to_string(),
            class: "hl".to_string(),
        }
    }
}

impl MarkConfig {
    fn element(&self) -> ElementData {
        ElementData::new(self.tag.as_str()).with_attr("class", self.class.as_str())
    }

    /// Whether `node` is one of our markers
    pub fn is_marker(&self, doc: &Document, node: NodeId) -> bool {
        doc.element(node)
            .map(|el| el.name == self.tag && el.has_class(&self.class))
            .unwrap_or(false)
    }
}

/// Outcome of replaying a highlight log
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Number of descriptors that were decoded and wrapped
    pub applied: usize,
    /// Indices into the replayed descriptor slice of entries that could not
    /// be anchored
    pub skipped: Vec<usize>,
}

/// Wrap `range` in a new marker and return it.
///
/// Tries surround-contents first. When that is refused (a non-text node is
/// only partly selected) the contents are extracted, moved into the marker
/// and the marker is inserted where the range collapsed. Returns `None`
/// without touching the tree when a boundary lies inside a comment or is out
/// of bounds, and otherwise only if both attempts fail.
pub fn apply_mark(doc: &mut Document, range: &Range, config: &MarkConfig) -> Option<NodeId> {
    for point in [range.start, range.end] {
        if doc.is_comment(point.node) || doc.validate_boundary(point).is_err() {
            tracing::debug!("Refusing to mark at {:?}", point);
            return None;
        }
    }

    let marker = doc.create_element_with(config.element());
    let mut working = *range;
    match doc.surround_contents(&mut working, marker) {
        Ok(()) => return Some(marker),
        Err(e) => tracing::debug!("surround refused, extracting instead: {}", e),
    }

    let mut working = *range;
    match wrap_extracted(doc, &mut working, marker) {
        Ok(()) => Some(marker),
        Err(e) => {
            tracing::warn!("Could not wrap highlight: {}", e);
            None
        }
    }
}

fn wrap_extracted(doc: &mut Document, range: &mut Range, marker: NodeId) -> Result<(), DomError> {
    let fragment = doc.extract_contents(range)?;
    doc.append_child(marker, fragment)?;
    doc.insert_node(range, marker)
}

/// Replace every marker under `root` with its children, then merge the text
/// runs the markers had split. Returns the number of markers removed.
pub fn remove_all_marks(doc: &mut Document, root: NodeId, config: &MarkConfig) -> usize {
    let view: &Document = doc;
    let markers: Vec<NodeId> = view
        .descendants(root)
        .filter(|&node| config.is_marker(view, node))
        .collect();

    let mut removed = 0;
    for marker in markers {
        // Outer markers go first, so an inner one may have a new parent by now.
        let Some(parent) = doc.parent(marker) else {
            continue;
        };
        match unwrap_element(doc, parent, marker) {
            Ok(()) => {
                doc.normalize(parent);
                removed += 1;
            }
            Err(e) => tracing::warn!("Could not unwrap marker: {}", e),
        }
    }
    removed
}

fn unwrap_element(doc: &mut Document, parent: NodeId, element: NodeId) -> Result<(), DomError> {
    for child in doc.children(element).to_vec() {
        doc.insert_before(parent, child, Some(element))?;
    }
    doc.remove(element);
    Ok(())
}

/// Replay `descriptors` against the tree under `root`, in log order.
///
/// Each descriptor is decoded against the tree as the earlier ones left it,
/// so a failure only skips that one entry.
pub fn restore_highlights(
    doc: &mut Document,
    root: NodeId,
    descriptors: &[AnchorDescriptor],
    config: &MarkConfig,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for (position, descriptor) in descriptors.iter().enumerate() {
        let range = match decode_range(doc, root, descriptor) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!("Skipping highlight #{}: {}", position, e);
                report.skipped.push(position);
                continue;
            }
        };
        match apply_mark(doc, &range, config) {
            Some(_) => report.applied += 1,
            None => report.skipped.push(position),
        }
    }

    report
}
