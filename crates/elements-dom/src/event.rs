use std::cell::RefCell;

use crate::node::Node;
use crate::value::Value;

/// An event dispatched through the host tree.
///
/// `detail` carries the payload of custom events; plain events leave it `Null`.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    detail: Value,
    bubbles: bool,
    target: RefCell<Option<Node>>,
    current_target: RefCell<Option<Node>>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self::custom(kind, Value::Null)
    }

    /// A custom event with a payload. Custom events do not bubble unless asked to.
    pub fn custom(kind: impl Into<String>, detail: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
            bubbles: false,
            target: RefCell::new(None),
            current_target: RefCell::new(None),
        }
    }

    pub fn bubbling(mut self) -> Self {
        self.bubbles = true;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> Option<Node> {
        self.target.borrow().clone()
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> Option<Node> {
        self.current_target.borrow().clone()
    }

    pub(crate) fn set_target(&self, node: &Node) {
        *self.target.borrow_mut() = Some(node.clone());
    }

    pub(crate) fn set_current_target(&self, node: Option<&Node>) {
        *self.current_target.borrow_mut() = node.cloned();
    }
}
