//! Change-tracking state container.
//!
//! An [`Observable`] wraps a JSON state tree. Writes go through
//! [`set`](Observable::set) and [`delete`](Observable::delete), which commit
//! the change and invoke the container's change callback. Compound values
//! are handed out as nested observables that share the same storage and
//! callback, so `state.get("user")` followed by a `set` on the result is seen
//! by whoever observes the root.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

/// A field name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

/// What a read returns: a scalar snapshot, or a nested observable for
/// objects and arrays.
#[derive(Debug, Clone)]
pub enum Field {
    Value(Json),
    Nested(Observable),
}

impl Field {
    pub fn as_value(&self) -> Option<&Json> {
        match self {
            Field::Value(value) => Some(value),
            Field::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Observable> {
        match self {
            Field::Value(_) => None,
            Field::Nested(nested) => Some(nested),
        }
    }
}

type Callback = Rc<dyn Fn()>;

struct Shared {
    root: RefCell<Json>,
    on_change: RefCell<Option<Callback>>,
}

struct Inner {
    shared: Rc<Shared>,
    path: Vec<Key>,
    nested: RefCell<HashMap<Key, Observable>>,
}

#[derive(Clone)]
pub struct Observable(Rc<Inner>);

impl Observable {
    /// A container nobody observes yet. Writes commit silently.
    pub fn detached(value: Json) -> Self {
        Self::with_callback(value, None)
    }

    /// A container that calls `on_change` after every committed write.
    pub fn wrap(value: Json, on_change: impl Fn() + 'static) -> Self {
        Self::with_callback(value, Some(Rc::new(on_change)))
    }

    fn with_callback(value: Json, on_change: Option<Callback>) -> Self {
        let shared = Rc::new(Shared {
            root: RefCell::new(value),
            on_change: RefCell::new(on_change),
        });
        Self::at(shared, Vec::new())
    }

    fn at(shared: Rc<Shared>, path: Vec<Key>) -> Self {
        Observable(Rc::new(Inner {
            shared,
            path,
            nested: RefCell::new(HashMap::new()),
        }))
    }

    /// Replace the change callback. Applies to every wrapper sharing this
    /// container's storage.
    pub fn set_on_change(&self, on_change: impl Fn() + 'static) {
        *self.0.shared.on_change.borrow_mut() = Some(Rc::new(on_change));
    }

    pub fn clear_on_change(&self) {
        *self.0.shared.on_change.borrow_mut() = None;
    }

    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Keys leading from the root to this wrapper.
    pub fn path(&self) -> &[Key] {
        &self.0.path
    }

    fn notify(&self) {
        let callback = self.0.shared.on_change.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn with_target<R>(&self, f: impl FnOnce(&Json) -> R) -> Option<R> {
        let root = self.0.shared.root.borrow();
        let mut target = &*root;
        for key in &self.0.path {
            target = child(target, key)?;
        }
        Some(f(target))
    }

    fn with_target_mut<R>(&self, f: impl FnOnce(&mut Json) -> R) -> Option<R> {
        let mut root = self.0.shared.root.borrow_mut();
        let mut target = &mut *root;
        for key in &self.0.path {
            target = match (target, key) {
                (Json::Object(map), Key::Field(name)) => map.get_mut(name)?,
                (Json::Array(items), Key::Index(index)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(f(target))
    }

    fn stale(&self) {
        tracing::warn!(path = ?self.0.path, "state path no longer exists");
    }

    /// Read `key`. Objects and arrays come back as nested observables,
    /// created on first read and reused after that.
    pub fn get(&self, key: impl Into<Key>) -> Option<Field> {
        let key = key.into();
        let value = self.with_target(|target| child(target, &key).cloned())??;
        if !(value.is_object() || value.is_array()) {
            return Some(Field::Value(value));
        }

        let mut nested = self.0.nested.borrow_mut();
        let wrapper = nested.entry(key.clone()).or_insert_with(|| {
            let mut path = self.0.path.clone();
            path.push(key);
            Observable::at(self.0.shared.clone(), path)
        });
        Some(Field::Nested(wrapper.clone()))
    }

    /// Plain snapshot of `key`.
    pub fn value(&self, key: impl Into<Key>) -> Option<Json> {
        let key = key.into();
        self.with_target(|target| child(target, &key).cloned())?
    }

    /// Plain snapshot of the whole wrapped value.
    pub fn snapshot(&self) -> Json {
        self.with_target(Json::clone).unwrap_or(Json::Null)
    }

    /// Write `key`. Nothing happens when the new value equals the current
    /// one; otherwise the change is committed and the callback runs.
    /// Returns whether a change was committed.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Json>) -> bool {
        let key = key.into();
        let value = value.into();
        let committed = self.with_target_mut(|target| match (target, &key) {
            (Json::Object(map), Key::Field(name)) => {
                if map.get(name) == Some(&value) {
                    return Some(false);
                }
                map.insert(name.clone(), value);
                Some(true)
            }
            (Json::Array(items), Key::Index(index)) => {
                if items.get(*index) == Some(&value) {
                    return Some(false);
                }
                if *index >= items.len() {
                    items.resize(*index + 1, Json::Null);
                }
                items[*index] = value;
                Some(true)
            }
            _ => None,
        });

        match committed {
            Some(Some(true)) => {
                self.0.nested.borrow_mut().remove(&key);
                tracing::trace!(path = ?self.0.path, %key, "state changed");
                self.notify();
                true
            }
            Some(Some(false)) => false,
            Some(None) => {
                tracing::warn!(path = ?self.0.path, %key, "cannot set a key of this kind here");
                false
            }
            None => {
                self.stale();
                false
            }
        }
    }

    /// Remove `key`. Always commits and runs the callback, even when the key
    /// was absent. Array slots are cleared to `null` so indices stay put.
    /// Returns whether the key existed.
    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        let existed = self.with_target_mut(|target| match (target, &key) {
            (Json::Object(map), Key::Field(name)) => map.remove(name).is_some(),
            (Json::Array(items), Key::Index(index)) => match items.get_mut(*index) {
                Some(slot) => {
                    *slot = Json::Null;
                    true
                }
                None => false,
            },
            _ => false,
        });
        let Some(existed) = existed else {
            self.stale();
            return false;
        };
        self.0.nested.borrow_mut().remove(&key);
        self.notify();
        existed
    }

    /// Compute a new value for `key` from its current one (`null` if absent)
    /// and [`set`](Self::set) it.
    pub fn update(&self, key: impl Into<Key>, f: impl FnOnce(&mut Json)) -> bool {
        let key = key.into();
        let mut value = self.value(key.clone()).unwrap_or(Json::Null);
        f(&mut value);
        self.set(key, value)
    }

    /// Append to a wrapped array. Returns the new length.
    pub fn push(&self, value: impl Into<Json>) -> Option<usize> {
        let value = value.into();
        let len = self.with_target_mut(|target| match target {
            Json::Array(items) => {
                items.push(value);
                Some(items.len())
            }
            _ => None,
        });
        match len {
            Some(Some(len)) => {
                self.notify();
                Some(len)
            }
            Some(None) => {
                tracing::warn!(path = ?self.0.path, "push on a value that is not an array");
                None
            }
            None => {
                self.stale();
                None
            }
        }
    }

    /// Number of fields or items of the wrapped value.
    pub fn len(&self) -> usize {
        self.with_target(|target| match target {
            Json::Object(map) => map.len(),
            Json::Array(items) => items.len(),
            _ => 0,
        })
        .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<Key> {
        self.with_target(|target| match target {
            Json::Object(map) => map.keys().map(|k| Key::Field(k.clone())).collect(),
            Json::Array(items) => (0..items.len()).map(Key::Index).collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default()
    }
}

fn child<'a>(value: &'a Json, key: &Key) -> Option<&'a Json> {
    match (value, key) {
        (Json::Object(map), Key::Field(name)) => map.get(name),
        (Json::Array(items), Key::Index(index)) => items.get(*index),
        _ => None,
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("path", &self.0.path)
            .field("value", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counted(value: Json) -> (Observable, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        (Observable::wrap(value, move || c.set(c.get() + 1)), calls)
    }

    #[test]
    fn test_set_only_notifies_on_change() {
        let (state, calls) = counted(json!({"count": 5}));
        assert!(!state.set("count", 5));
        assert_eq!(calls.get(), 0);
        assert!(state.set("count", 6));
        assert_eq!(calls.get(), 1);
        assert_eq!(state.value("count"), Some(json!(6)));
    }

    #[test]
    fn test_structural_equality() {
        let (state, calls) = counted(json!({"tags": ["a", "b"]}));
        assert!(!state.set("tags", json!(["a", "b"])));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_nested_wrappers_are_memoized() {
        let (state, calls) = counted(json!({"user": {"name": "ana"}}));
        let first = state.get("user").unwrap();
        let second = state.get("user").unwrap();
        assert!(first.as_nested().unwrap().ptr_eq(second.as_nested().unwrap()));

        let user = first.as_nested().unwrap();
        assert_eq!(user.path(), [Key::from("user")]);
        assert!(state.path().is_empty());
        assert!(user.set("name", "bia"));
        assert_eq!(calls.get(), 1);
        assert_eq!(state.snapshot(), json!({"user": {"name": "bia"}}));
    }

    #[test]
    fn test_set_drops_memoized_wrapper() {
        let (state, _) = counted(json!({"user": {"name": "ana"}}));
        let before = state.get("user").unwrap().as_nested().cloned().unwrap();
        state.set("user", json!({"name": "caio"}));
        let after = state.get("user").unwrap().as_nested().cloned().unwrap();
        assert!(!before.ptr_eq(&after));
        assert_eq!(after.value("name"), Some(json!("caio")));
    }

    #[test]
    fn test_delete_always_notifies() {
        let (state, calls) = counted(json!({"a": 1, "list": [1, 2, 3]}));
        assert!(state.delete("a"));
        assert!(!state.delete("missing"));
        assert_eq!(calls.get(), 2);

        let list = state.get("list").unwrap().as_nested().cloned().unwrap();
        assert!(list.delete(1));
        assert_eq!(list.snapshot(), json!([1, null, 3]));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_push_update_and_keys() {
        let (state, calls) = counted(json!({"items": [], "n": 1}));
        let items = state.get("items").unwrap().as_nested().cloned().unwrap();
        assert_eq!(items.push("x"), Some(1));
        assert!(state.update("n", |n| *n = json!(n.as_i64().unwrap_or(0) + 1)));
        assert_eq!(calls.get(), 2);
        assert_eq!(state.keys(), [Key::from("items"), Key::from("n")]);
        assert_eq!(items.keys(), [Key::Index(0)]);
    }

    #[test]
    fn test_stale_path_is_ignored() {
        let (state, calls) = counted(json!({"user": {"name": "ana"}}));
        let user = state.get("user").unwrap().as_nested().cloned().unwrap();
        state.delete("user");
        assert!(!user.set("name", "bia"));
        assert_eq!(calls.get(), 1);
        assert_eq!(user.snapshot(), Json::Null);
    }

    #[test]
    fn test_detached_commits_silently() {
        let state = Observable::detached(json!({"open": false}));
        assert!(state.set("open", true));
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        state.set_on_change(move || c.set(c.get() + 1));
        state.set("open", false);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_clear_on_change_silences_writes() {
        let (state, calls) = counted(json!({"n": 1}));
        state.clear_on_change();
        assert!(state.set("n", 2));
        assert_eq!(calls.get(), 0);
        assert_eq!(state.value("n"), Some(json!(2)));
    }

    #[test]
    fn test_scalar_reads() {
        let state = Observable::detached(json!({"count": 5}));
        assert!(matches!(state.get("count"), Some(Field::Value(v)) if v == json!(5)));
        assert!(state.get("missing").is_none());
    }
}
