//! HTML serialization for document trees

use super::tree::{DocumentTree, NodeId, NodeKind};

/// Elements that never have children or a closing tag.
pub(super) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted without escaping.
pub(super) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Escape text for use in HTML element content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use in a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

impl DocumentTree {
    /// Serialize the whole tree to HTML.
    pub fn to_html(&self) -> String {
        self.node_to_html(self.root())
    }

    /// Serialize a single node (and its subtree) to HTML.
    pub fn node_to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.kind(id) {
            None => {}
            Some(NodeKind::Document) => {
                for child in self.children(id) {
                    self.write_node(*child, false, out);
                }
            }
            Some(NodeKind::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Some(NodeKind::Raw(html)) => out.push_str(html),
            Some(NodeKind::Element(element)) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }

                let raw_children = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
                for child in self.children(id) {
                    self.write_node(*child, raw_children, out);
                }

                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}
