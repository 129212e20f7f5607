use elements_dom::{is_raw_text_element, Node, NodeType, Value};

use crate::error::TemplateError;
use crate::normalize::{marker, node_marker};

/// Forward pre-order walk over the elements and comments below `root`.
///
/// The next node is computed from the current one on every step, so nodes
/// inserted before the current position are never visited.
struct Walker {
    root: Node,
    current: Node,
}

impl Walker {
    fn new(root: &Node) -> Self {
        Self {
            root: root.clone(),
            current: root.clone(),
        }
    }

    fn next_node(&mut self) -> Option<Node> {
        loop {
            let next = self.advance()?;
            self.current = next.clone();
            if matches!(next.node_type(), NodeType::Element | NodeType::Comment) {
                return Some(next);
            }
        }
    }

    fn advance(&self) -> Option<Node> {
        if let Some(child) = self.current.first_child() {
            return Some(child);
        }
        let mut node = self.current.clone();
        loop {
            if node.ptr_eq(&self.root) {
                return None;
            }
            if let Some(sibling) = node.next_sibling() {
                return Some(sibling);
            }
            node = node.parent()?;
        }
    }
}

/// Consume `values` at the markers of a materialized template, in order.
///
/// Fails with [`TemplateError::Arity`] when the walk ends before every value
/// was consumed. Markers past the last value bind as `Null`.
pub fn bind(root: &Node, mut values: Vec<Value>) -> Result<(), TemplateError> {
    let supplied = values.len();
    let mut idx = 0;
    let mut take = |idx: usize| {
        values
            .get_mut(idx)
            .map(std::mem::take)
            .unwrap_or_default()
    };
    let mut walker = Walker::new(root);

    while let Some(node) = walker.next_node() {
        if node.node_type() == NodeType::Comment {
            if node.data().is_some_and(|data| data == marker(idx)) {
                insert_before_anchor(&node, take(idx))?;
                idx += 1;
            }
            continue;
        }

        loop {
            let search = marker(idx);
            let Some(name) = node.get_attribute(&search) else {
                break;
            };
            apply_attribute(&node, &name, take(idx));
            node.remove_attribute(&search);
            idx += 1;
        }

        let raw_text = node.local_name().is_some_and(is_raw_text_element);
        if raw_text && node.text_content().trim() == node_marker(idx) {
            let value = take(idx);
            let text = if value.is_nullish() {
                String::new()
            } else {
                value.to_string()
            };
            node.set_text_content(&text);
            idx += 1;
        }
    }

    if idx < supplied {
        return Err(TemplateError::Arity {
            supplied,
            consumed: idx,
        });
    }
    tracing::trace!(values = supplied, markers = idx, "bound template");
    Ok(())
}

/// Resolve one attribute marker whose original attribute was `name`.
fn apply_attribute(node: &Node, name: &str, value: Value) {
    if let Some(attr) = name.strip_prefix('?') {
        node.toggle_attribute(attr, Some(value.is_truthy()));
    } else if let Some(event) = name.strip_prefix('@').or_else(|| name.strip_prefix("on")) {
        node.set_property(&format!("on{event}"), value);
    } else if name == ".dataset" {
        let Some(entries) = value.as_map() else {
            tracing::warn!(?node, "`.dataset` expects a map, got {value:?}");
            return;
        };
        for (key, val) in entries {
            if val.is_nullish() {
                node.dataset_remove(key);
            } else {
                node.dataset_set(key, &val.to_string());
            }
        }
    } else if let Some(property) = name.strip_prefix('.') {
        node.set_property(property, value);
    } else if name == "ref" {
        match value {
            Value::RefCallback(callback) => callback.call(node),
            Value::Ref(holder) => holder.set(Some(node.clone())),
            other => tracing::warn!(?node, "`ref` expects a callback or a NodeRef, got {other:?}"),
        }
    } else if name == "aria" {
        let Some(entries) = value.as_map() else {
            tracing::warn!(?node, "`aria` expects a map, got {value:?}");
            return;
        };
        for (key, val) in entries {
            let attr = if key == "role" {
                key.clone()
            } else {
                format!("aria-{key}")
            };
            if val.is_nullish() {
                node.remove_attribute(&attr);
            } else {
                node.set_attribute(&attr, &val.to_string());
            }
        }
    } else if value.is_nullish() {
        node.remove_attribute(name);
    } else {
        node.set_attribute(name, &value.to_string());
    }
}

/// Insert `value` as siblings right before the anchor comment, flattening
/// nested lists. The anchor itself stays.
fn insert_before_anchor(anchor: &Node, value: Value) -> Result<(), TemplateError> {
    let Some(parent) = anchor.parent() else {
        return Ok(());
    };
    match value {
        Value::Null => {}
        Value::List(items) => {
            for item in items {
                insert_before_anchor(anchor, item)?;
            }
        }
        Value::Nodes(nodes) => {
            for node in nodes {
                parent.insert_before(&node, Some(anchor))?;
            }
        }
        other => {
            parent.insert_before(&Node::text(other.to_string()), Some(anchor))?;
        }
    }
    Ok(())
}
