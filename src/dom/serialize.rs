//! HTML serialization of subtrees

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::parser::{is_raw_text, is_void};
use super::{Document, NodeData, NodeId};

impl Document {
    /// Markup of the children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Markup of `id` including its own tag
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Fragment => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(&el.name) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
            NodeData::Text(text) => {
                let raw_parent = self
                    .parent(id)
                    .and_then(|parent| self.element(parent))
                    .map(|el| is_raw_text(&el.name))
                    .unwrap_or(false);
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&encode_text(text));
                }
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::Document;

    #[test]
    fn test_round_trips_markup() {
        let html = r#"<p class="lead">Hello <b>world</b><br><!-- c --></p>"#;
        let doc = Document::parse_fragment("div", html);
        assert_eq!(doc.inner_html(doc.root()), html);
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let mut doc = Document::new("div");
        let root = doc.root();
        let a = doc.create_element("a");
        doc.element_mut(a).unwrap().set_attr("title", "say \"hi\"");
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(a, text).unwrap();
        doc.append_child(root, a).unwrap();

        let html = doc.inner_html(root);
        assert!(html.contains("&quot;hi&quot;"));
        assert!(html.contains("1 &lt; 2 &amp; 3"));
    }

    #[test]
    fn test_outer_html_of_container() {
        let doc = Document::parse_fragment("article", "x");
        assert_eq!(doc.outer_html(doc.root()), "<article>x</article>");
    }
}
