//! Tolerant HTML fragment parser
//!
//! Builds nodes straight into a [`Document`] arena. It covers what converted
//! chapter fragments actually contain: nested elements, attributes, entities,
//! comments, void and raw-text elements, and the common implied end tags.
//! Everything the parser cannot make sense of is kept as text.

use html_escape::decode_html_entities;

use super::{Document, ElementData, NodeData, NodeId};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub(crate) const RAW_TEXT_ELEMENTS: &[&str] =
    &["script", "style", "xmp", "iframe", "noembed", "noframes"];

const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// Start tags that close an open `<p>`
const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Parse `input` and append the resulting nodes to `parent`
pub(crate) fn parse_into(doc: &mut Document, parent: NodeId, input: &str) {
    let mut builder = TreeBuilder {
        doc,
        stack: vec![parent],
    };
    builder.run(input);
}

struct TreeBuilder<'a> {
    doc: &'a mut Document,
    /// Open elements; index 0 is the injection parent and is never popped
    stack: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> NodeId {
        self.stack[self.stack.len() - 1]
    }

    fn run(&mut self, input: &str) {
        let bytes = input.as_bytes();
        let mut idx = 0_usize;

        while idx < bytes.len() {
            if bytes[idx] != b'<' {
                let next = find_byte(bytes, idx.saturating_add(1), b'<').unwrap_or(bytes.len());
                self.append_text(&decode_html_entities(&input[idx..next]));
                idx = next;
                continue;
            }

            if starts_with(bytes, idx, b"<!--") {
                let body_start = idx.saturating_add(4);
                let (body_end, after) = match find_subslice(bytes, body_start, b"-->") {
                    Some(end) => (end, end.saturating_add(3)),
                    None => (bytes.len(), bytes.len()),
                };
                let comment = self.doc.create_comment(&input[body_start..body_end]);
                self.attach(comment);
                idx = after;
                continue;
            }

            if starts_with(bytes, idx, b"<!") || starts_with(bytes, idx, b"<?") {
                idx = skip_to_gt(bytes, idx.saturating_add(2));
                continue;
            }

            let Some((tag, next_idx)) = parse_tag(input, idx) else {
                self.append_text("<");
                idx = idx.saturating_add(1);
                continue;
            };

            if tag.is_end {
                self.close_element(&tag.name);
                idx = next_idx;
                continue;
            }

            self.close_implied(&tag.name);

            let mut element = ElementData::new(tag.name.clone());
            for (name, value) in tag.attrs {
                if element.attr(&name).is_none() {
                    element.attrs.push((name, value));
                }
            }
            let node = self.doc.create_element_with(element);
            self.attach(node);

            let raw = is_raw_text(&tag.name);
            if raw || RCDATA_ELEMENTS.contains(&tag.name.as_str()) {
                let (content, after) = read_raw_text_until_end_tag(input, next_idx, &tag.name);
                if !content.is_empty() {
                    let text = if raw {
                        content.to_string()
                    } else {
                        decode_html_entities(content).into_owned()
                    };
                    let text_node = self.doc.create_text(text);
                    self.doc.nodes[text_node.0].parent = Some(node);
                    self.doc.nodes[node.0].children.push(text_node);
                }
                idx = after;
                continue;
            }

            let foreign = self.in_foreign_content();
            if !is_void(&tag.name) && !(tag.self_closing && foreign) {
                self.stack.push(node);
            }
            idx = next_idx;
        }
    }

    fn attach(&mut self, node: NodeId) {
        let parent = self.current();
        self.doc.nodes[node.0].parent = Some(parent);
        self.doc.nodes[parent.0].children.push(node);
    }

    /// Adjacent character tokens end up in a single text node
    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.doc.last_child(parent) {
            if let NodeData::Text(existing) = &mut self.doc.nodes[last.0].data {
                existing.push_str(text);
                return;
            }
        }
        let node = self.doc.create_text(text);
        self.attach(node);
    }

    fn open_position(&self, name: &str, boundaries: &[&str]) -> Option<usize> {
        for (pos, &id) in self.stack.iter().enumerate().skip(1).rev() {
            let Some(el) = self.doc.element(id) else {
                continue;
            };
            if el.name == name {
                return Some(pos);
            }
            if boundaries.contains(&el.name.as_str()) {
                return None;
            }
        }
        None
    }

    fn close_implied(&mut self, name: &str) {
        let (targets, boundaries): (&[&str], &[&str]) = match name {
            _ if P_CLOSERS.contains(&name) => (&["p"][..], &["button", "table"][..]),
            "li" => (&["li"][..], &["ul", "ol"][..]),
            "dt" | "dd" => (&["dt", "dd"][..], &["dl"][..]),
            "tr" => (&["tr", "td", "th"][..], &["table", "tbody", "thead", "tfoot"][..]),
            "td" | "th" => (&["td", "th"][..], &["tr", "table"][..]),
            "tbody" | "thead" | "tfoot" => (&["tbody", "thead", "tfoot"][..], &["table"][..]),
            "option" => (&["option"][..], &["select", "datalist"][..]),
            _ => return,
        };
        let pos = targets
            .iter()
            .filter_map(|target| self.open_position(target, boundaries))
            .min();
        if let Some(pos) = pos {
            self.stack.truncate(pos);
        }
    }

    /// Pop through the nearest open element named `name`; unmatched end tags
    /// are dropped.
    fn close_element(&mut self, name: &str) {
        if is_void(name) {
            return;
        }
        if let Some(pos) = self.open_position(name, &[]) {
            self.stack.truncate(pos);
        }
    }

    fn in_foreign_content(&self) -> bool {
        self.stack.iter().skip(1).any(|&id| {
            self.doc
                .element(id)
                .map(|el| el.name == "svg" || el.name == "math")
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    is_end: bool,
    self_closing: bool,
    attrs: Vec<(String, String)>,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    if !bytes.get(idx).map(|b| b.is_ascii_alphabetic()).unwrap_or(false) {
        return None;
    }
    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    let name = input[name_start..idx].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => {
                return Some((
                    ParsedTag {
                        name,
                        is_end,
                        self_closing,
                        attrs,
                    },
                    idx.saturating_add(1),
                ));
            }
            Some(b'/') => {
                self_closing = bytes.get(idx.saturating_add(1)).copied() == Some(b'>');
                idx = idx.saturating_add(1);
                continue;
            }
            Some(_) => {}
        }

        self_closing = false;
        let attr_start = idx;
        // A leading `=` belongs to the attribute name
        if bytes.get(idx).copied() == Some(b'=') {
            idx = idx.saturating_add(1);
        }
        while idx < bytes.len()
            && !bytes[idx].is_ascii_whitespace()
            && !matches!(bytes[idx], b'=' | b'>' | b'/')
        {
            idx = idx.saturating_add(1);
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            let (raw, next) = read_attr_value(input, idx)?;
            value = decode_html_entities(raw).into_owned();
            idx = next;
        }

        if !attr_name.is_empty() {
            attrs.push((attr_name, value));
        } else {
            let width = input
                .get(idx..)
                .and_then(|rest| rest.chars().next())
                .map_or(1, char::len_utf8);
            idx = idx.saturating_add(width);
        }
    }
}

fn read_attr_value(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    match bytes.get(start).copied()? {
        quote @ (b'"' | b'\'') => {
            let end = find_byte(bytes, start.saturating_add(1), quote)?;
            Some((&input[start.saturating_add(1)..end], end.saturating_add(1)))
        }
        _ => {
            let mut idx = start;
            while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>' {
                idx = idx.saturating_add(1);
            }
            Some((&input[start..idx], idx))
        }
    }
}

fn read_raw_text_until_end_tag<'a>(
    input: &'a str,
    start: usize,
    tag_name: &str,
) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            let end = skip_to_gt(bytes, idx.saturating_add(2));
            return (&input[start..idx], end);
        }
        idx = idx.saturating_add(1);
    }

    (&input[start..], bytes.len())
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }
    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }
    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, NodeData};

    fn names(doc: &Document, parent: crate::dom::NodeId) -> Vec<String> {
        doc.children(parent)
            .iter()
            .map(|&id| match doc.data(id) {
                NodeData::Element(el) => el.name.clone(),
                NodeData::Text(t) => format!("#text({t})"),
                NodeData::Comment(c) => format!("#comment({c})"),
                NodeData::Fragment => "#fragment".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_comments_and_whitespace_are_nodes() {
        let doc = Document::parse_fragment("div", "<h1>T</h1>\n<!-- note --><p>x</p>");
        assert_eq!(
            names(&doc, doc.root()),
            vec!["h1", "#text(\n)", "#comment( note )", "p"]
        );
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = Document::parse_fragment("div", "<p>a &amp; b &lt;c&gt; &#233;</p>");
        assert_eq!(doc.text_content(doc.root()), "a & b <c> \u{e9}");
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let doc = Document::parse_fragment("div", "<p>a<br>b<img src=x.png>c</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(names(&doc, p), vec!["#text(a)", "br", "#text(b)", "img", "#text(c)"]);
    }

    #[test]
    fn test_attributes() {
        let doc = Document::parse_fragment(
            "div",
            r#"<a href="ch1.html" data-x='1' hidden title=plain>x</a>"#,
        );
        let a = doc.children(doc.root())[0];
        let el = doc.element(a).unwrap();
        assert_eq!(el.attr("href"), Some("ch1.html"));
        assert_eq!(el.attr("data-x"), Some("1"));
        assert_eq!(el.attr("hidden"), Some(""));
        assert_eq!(el.attr("title"), Some("plain"));
    }

    #[test]
    fn test_implied_paragraph_and_list_item_ends() {
        let doc = Document::parse_fragment("div", "<p>one<p>two<ul><li>a<li>b</ul>");
        assert_eq!(names(&doc, doc.root()), vec!["p", "p", "ul"]);
        let ul = doc.children(doc.root())[2];
        assert_eq!(names(&doc, ul), vec!["li", "li"]);
    }

    #[test]
    fn test_unmatched_end_tag_is_ignored() {
        let doc = Document::parse_fragment("div", "<p>a</b>c</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(names(&doc, p), vec!["#text(ac)"]);
    }

    #[test]
    fn test_raw_text_is_not_parsed() {
        let doc = Document::parse_fragment("div", "<script>if (a < b) { x(); }</script>ok");
        let script = doc.children(doc.root())[0];
        assert_eq!(names(&doc, script), vec!["#text(if (a < b) { x(); })"]);
        assert_eq!(names(&doc, doc.root())[1], "#text(ok)");
    }

    #[test]
    fn test_nameless_attribute_before_non_ascii() {
        let doc = Document::parse_fragment("div", "<p =\"x\"\u{e9}>t</p><p ==\u{e9}>u</p>");
        let root = doc.root();
        assert_eq!(names(&doc, root), vec!["p", "p"]);
        assert_eq!(doc.text_content(root), "tu");

        let first = doc.element(doc.children(root)[0]).unwrap();
        assert_eq!(first.attrs.len(), 1);
        assert_eq!(first.attr("=\"x\"\u{e9}"), Some(""));
        let second = doc.element(doc.children(root)[1]).unwrap();
        assert_eq!(second.attr("="), Some("\u{e9}"));
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let doc = Document::parse_fragment("div", "1 < 2");
        assert_eq!(names(&doc, doc.root()), vec!["#text(1 < 2)"]);
    }
}
