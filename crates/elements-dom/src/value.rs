use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::event::Event;
use crate::node::Node;

/// An event handler. Identity (not behavior) decides equality, so the same
/// `Listener` value must be kept around to remove it again.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Listener) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

/// A callable `ref`: invoked with the node it was bound to.
#[derive(Clone)]
pub struct RefCallback(Rc<dyn Fn(&Node)>);

impl RefCallback {
    pub fn new(f: impl Fn(&Node) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, node: &Node) {
        (self.0)(node)
    }
}

impl fmt::Debug for RefCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefCallback(..)")
    }
}

/// A `{ current }` holder filled in by `ref` bindings.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<Node>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Node> {
        self.0.borrow().clone()
    }

    pub fn set(&self, node: Option<Node>) {
        *self.0.borrow_mut() = node;
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef").field("current", &self.0.borrow()).finish()
    }
}

/// A dynamic host value: what templates interpolate, what element properties
/// hold and what custom events carry as `detail`.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// An ordered sequence of nodes, typically a bound template's children.
    Nodes(Vec<Node>),
    Listener(Listener),
    RefCallback(RefCallback),
    Ref(NodeRef),
}

impl Value {
    /// Build a `Map` value from key/value pairs, keeping their order.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn listener(f: impl Fn(&Event) + 'static) -> Self {
        Value::Listener(Listener::new(f))
    }

    pub fn callback(f: impl Fn(&Node) + 'static) -> Self {
        Value::RefCallback(RefCallback::new(f))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// JavaScript truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Value::Listener(l) => Some(l),
            _ => None,
        }
    }
}

/// Format a number the way the host stringifies it: integral values have no
/// fractional part, non-finite values use their names.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Map(_) | Value::Ref(_) => f.write_str("[object Object]"),
            Value::Nodes(nodes) => {
                for node in nodes {
                    f.write_str(&node.text_content())?;
                }
                Ok(())
            }
            Value::Listener(_) | Value::RefCallback(_) => f.write_str("function"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

number_from!(i32, i64, u32, u64, usize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Nodes(vec![node])
    }
}

impl From<Listener> for Value {
    fn from(l: Listener) -> Self {
        Value::Listener(l)
    }
}

impl From<RefCallback> for Value {
    fn from(cb: RefCallback) -> Self {
        Value::RefCallback(cb)
    }
}

impl From<NodeRef> for Value {
    fn from(r: NodeRef) -> Self {
        Value::Ref(r)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::from(vec![0]).is_truthy());
        assert!(Value::map([("a", 1)]).is_truthy());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(Value::from(6).to_string(), "6");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn test_list_display_skips_null() {
        let v = Value::from(vec![Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(v.to_string(), "1,,x");
    }

    #[test]
    fn test_from_json_nested() {
        let v = Value::from(json!({"b": 1, "a": [true, null]}));
        let map = v.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert!(matches!(map["a"], Value::List(ref items) if items.len() == 2));
        assert_eq!(map["b"].as_f64(), Some(1.0));
    }

    #[test]
    fn test_listener_identity() {
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_option_into_value() {
        assert!(Value::from(None::<i32>).is_nullish());
        assert_eq!(Value::from(Some("on")).as_str(), Some("on"));
    }
}
