use crate::node::{Node, NodeType};
use crate::parse::{is_void_element, parse_fragment};

/// Children of these are written out without escaping.
const UNESCAPED_TEXT_PARENTS: &[&str] = &["script", "style", "xmp", "plaintext", "noscript"];

impl Node {
    /// Markup of the node's children. Shadow trees are not included.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.child_nodes() {
            write_node(&child, &mut out);
        }
        out
    }

    /// Markup of the node itself and its children.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    /// Replace the children with the parsed `markup`.
    pub fn set_inner_html(&self, markup: &str) {
        let fragment = parse_fragment(markup);
        if let Err(err) = self.replace_children([fragment]) {
            tracing::warn!(node = ?self, "cannot set inner html: {err}");
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node.node_type() {
        NodeType::Element => {
            let name = node.local_name().unwrap_or_default();
            out.push('<');
            out.push_str(name);
            for (attr, value) in node.attributes() {
                out.push(' ');
                out.push_str(&attr);
                out.push_str("=\"");
                out.push_str(&escape_attribute(&value));
                out.push('"');
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let raw = UNESCAPED_TEXT_PARENTS.contains(&name);
            for child in node.child_nodes() {
                match child.data() {
                    Some(text) if raw && child.node_type() == NodeType::Text => out.push_str(&text),
                    _ => write_node(&child, out),
                }
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeType::Text => out.push_str(&escape_text(&node.data().unwrap_or_default())),
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(&node.data().unwrap_or_default());
            out.push_str("-->");
        }
        NodeType::Document | NodeType::Fragment | NodeType::ShadowRoot => {
            for child in node.child_nodes() {
                write_node(&child, out);
            }
        }
    }
}

/// Escape text content.
pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\u{a0}' => result.push_str("&nbsp;"),
            _ => result.push(ch),
        }
    }
    result
}

/// Escape a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\u{a0}' => result.push_str("&nbsp;"),
            _ => result.push(ch),
        }
    }
    result
}
