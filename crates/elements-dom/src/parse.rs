//! Markup parser producing an inert fragment.
//!
//! Nodes built here are never upgraded and run no reactions: the fragment is
//! detached until a caller inserts it somewhere.

use crate::node::Node;

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "menuitem",
    "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is read as literal text up to the matching close tag.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "plaintext", "xmp"];

/// Raw-text elements whose content still has character references decoded.
const ESCAPABLE_RAW_TEXT: &[&str] = &["textarea", "title"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Parse `markup` into a detached fragment.
pub fn parse_fragment(markup: &str) -> Node {
    let fragment = Node::fragment();
    let mut parser = Parser {
        markup,
        pos: 0,
        open: vec![fragment.clone()],
        text: String::new(),
    };
    parser.run();
    fragment
}

struct Parser<'a> {
    markup: &'a str,
    pos: usize,
    /// Open elements, the fragment at the bottom.
    open: Vec<Node>,
    /// Pending text, flushed as one node so adjacent runs merge.
    text: String,
}

impl Parser<'_> {
    fn current(&self) -> &Node {
        // the fragment is never popped
        &self.open[self.open.len() - 1]
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.current().push_child(Node::text(text));
        }
    }

    fn skip_past(&mut self, needle: &str) -> Option<usize> {
        let found = self.markup[self.pos..].find(needle).map(|i| self.pos + i);
        self.pos = found.map_or(self.markup.len(), |i| i + needle.len());
        found
    }

    fn run(&mut self) {
        let bytes = self.markup.as_bytes();
        while self.pos < bytes.len() {
            if bytes[self.pos] != b'<' {
                let end = self.markup[self.pos..]
                    .find('<')
                    .map_or(bytes.len(), |i| self.pos + i);
                self.text.push_str(&decode_entities(&self.markup[self.pos..end]));
                self.pos = end;
                continue;
            }

            let rest = &self.markup[self.pos..];
            let next = rest.as_bytes().get(1).copied().unwrap_or(0);
            if rest.starts_with("<!--") {
                self.flush_text();
                let start = self.pos + 4;
                self.pos = start;
                let data = match self.skip_past("-->") {
                    Some(end) => &self.markup[start..end],
                    None => &self.markup[start..],
                };
                self.current().push_child(Node::comment(data));
            } else if next == b'!' || next == b'?' {
                // doctype, CDATA, processing instruction
                self.skip_past(">");
            } else if next == b'/' {
                self.close_tag();
            } else if next.is_ascii_alphabetic() {
                self.flush_text();
                self.open_tag();
            } else {
                self.text.push('<');
                self.pos += 1;
            }
        }
        self.flush_text();
    }

    fn close_tag(&mut self) {
        let start = self.pos + 2;
        let name_end = self.markup[start..]
            .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
            .map_or(self.markup.len(), |i| start + i);
        let name = self.markup[start..name_end].to_ascii_lowercase();
        self.pos = name_end;
        self.skip_past(">");
        if name.is_empty() {
            return;
        }

        // an open ancestor closes everything above it; anything else is ignored
        let matched = self
            .open
            .iter()
            .skip(1)
            .rposition(|node| node.local_name() == Some(name.as_str()));
        if let Some(index) = matched {
            self.flush_text();
            self.open.truncate(index + 1);
        }
    }

    fn open_tag(&mut self) {
        let start = self.pos + 1;
        let end = find_tag_end(self.markup, start);
        let mut content = &self.markup[start..end];
        self.pos = (end + 1).min(self.markup.len());
        if let Some(stripped) = content.strip_suffix('/') {
            content = stripped;
        }

        let name_end = content
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .unwrap_or(content.len());
        let name = content[..name_end].to_ascii_lowercase();
        let element = Node::element(&name);
        for (attr, value) in parse_attrs(&content[name_end..]) {
            element.push_attribute(attr, value);
        }
        self.current().push_child(element.clone());

        if is_void_element(&name) {
            return;
        }
        if is_raw_text_element(&name) {
            self.raw_text(&element, &name);
            return;
        }
        self.open.push(element);
    }

    fn raw_text(&mut self, element: &Node, name: &str) {
        let start = self.pos;
        let close = find_close_tag(&self.markup[start..], name).map(|i| start + i);
        let content = &self.markup[start..close.unwrap_or(self.markup.len())];
        if !content.is_empty() {
            let text = if ESCAPABLE_RAW_TEXT.contains(&name) {
                decode_entities(content)
            } else {
                content.to_string()
            };
            element.push_child(Node::text(text));
        }
        match close {
            Some(close) => {
                self.pos = close;
                self.skip_past(">");
            }
            None => self.pos = self.markup.len(),
        }
    }
}

/// Position of the `>` ending the tag that starts at `start`, skipping
/// quoted attribute values.
fn find_tag_end(markup: &str, start: usize) -> usize {
    let mut quote = None;
    for (i, b) in markup.as_bytes()[start..].iter().enumerate() {
        match (quote, *b) {
            (None, b'"' | b'\'') => quote = Some(*b),
            (Some(q), b) if q == b => quote = None,
            (None, b'>') => return start + i,
            _ => {}
        }
    }
    markup.len()
}

/// Offset of `</name` (any case) followed by a tag boundary.
fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let lower = haystack.to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let at = from + i;
        match lower.as_bytes().get(at + needle.len()) {
            None | Some(b'>' | b'/') => return Some(at),
            Some(b) if b.is_ascii_whitespace() => return Some(at),
            _ => from = at + needle.len(),
        }
    }
    None
}

/// Parse attributes from the part of a tag after its name.
/// Handles `key="value"`, `key='value'`, `key=value` and bare `key`.
fn parse_attrs(attr_str: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let s = attr_str;
    let bytes = s.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        pos += 1;
        while pos < bytes.len()
            && bytes[pos] != b'='
            && bytes[pos] != b'/'
            && !bytes[pos].is_ascii_whitespace()
        {
            pos += 1;
        }
        let name = s[name_start..pos].to_ascii_lowercase();

        let mut look = pos;
        while look < bytes.len() && bytes[look].is_ascii_whitespace() {
            look += 1;
        }
        if look >= bytes.len() || bytes[look] != b'=' {
            attrs.push((name, String::new()));
            continue;
        }

        pos = look + 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
            let quote = bytes[pos];
            pos += 1;
            let val_start = pos;
            while pos < bytes.len() && bytes[pos] != quote {
                pos += 1;
            }
            let val = &s[val_start..pos];
            if pos < bytes.len() {
                pos += 1;
            }
            val
        } else {
            let val_start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            &s[val_start..pos]
        };
        attrs.push((name, decode_entities(value)));
    }

    attrs
}

/// Decode the named references the engine emits plus numeric ones.
/// Unknown references are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let ch = match &rest[1..semi] {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                entity => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
