use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::DomError;
use crate::event::Event;
use crate::registry::{self, CustomElement, CustomState};
use crate::style::StyleSheet;
use crate::value::{Listener, Value};

/// The kind of a host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Fragment,
    ShadowRoot,
    Element,
    Text,
    Comment,
}

/// A reference-counted handle to a node in the host tree.
///
/// Cloning a `Node` clones the handle, never the subtree. Equality is identity.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// A non-owning handle, used wherever a node refers back up the tree or a
/// deferred callback must not keep a node alive.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({node:?})"),
            None => f.write_str("WeakNode(dropped)"),
        }
    }
}

pub(crate) struct NodeInner {
    data: NodeData,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    properties: RefCell<IndexMap<String, Value>>,
    listeners: RefCell<Vec<(String, Listener)>>,
}

pub(crate) enum NodeData {
    Document(RootData),
    Fragment,
    ShadowRoot { host: Weak<NodeInner>, root: RootData },
    Element(ElementData),
    Text(RefCell<String>),
    Comment(RefCell<String>),
}

/// State shared by the roots that can adopt stylesheets.
#[derive(Default)]
pub(crate) struct RootData {
    adopted: RefCell<Vec<StyleSheet>>,
}

pub(crate) struct ElementData {
    local_name: String,
    attributes: RefCell<Vec<(String, String)>>,
    shadow_root: RefCell<Option<Node>>,
    pub(crate) custom: RefCell<CustomState>,
}

impl Node {
    fn from_data(data: NodeData) -> Self {
        Node(Rc::new(NodeInner {
            data,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            properties: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// A detached, un-upgraded element. Use `Window::create_element` to get
    /// an element that is upgraded when its name is defined.
    pub fn element(name: &str) -> Self {
        Self::from_data(NodeData::Element(ElementData {
            local_name: name.to_ascii_lowercase(),
            attributes: RefCell::new(Vec::new()),
            shadow_root: RefCell::new(None),
            custom: RefCell::new(CustomState::Undefined),
        }))
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self::from_data(NodeData::Text(RefCell::new(data.into())))
    }

    pub fn comment(data: impl Into<String>) -> Self {
        Self::from_data(NodeData::Comment(RefCell::new(data.into())))
    }

    pub fn fragment() -> Self {
        Self::from_data(NodeData::Fragment)
    }

    pub(crate) fn document() -> Self {
        Self::from_data(NodeData::Document(RootData::default()))
    }

    pub fn node_type(&self) -> NodeType {
        match &self.0.data {
            NodeData::Document(_) => NodeType::Document,
            NodeData::Fragment => NodeType::Fragment,
            NodeData::ShadowRoot { .. } => NodeType::ShadowRoot,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.data, NodeData::Element(_))
    }

    pub(crate) fn element_data(&self) -> Option<&ElementData> {
        match &self.0.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn root_data(&self) -> Option<&RootData> {
        match &self.0.data {
            NodeData::Document(root) | NodeData::ShadowRoot { root, .. } => Some(root),
            _ => None,
        }
    }

    fn is_container(&self) -> bool {
        !matches!(self.0.data, NodeData::Text(_) | NodeData::Comment(_))
    }

    /// Lower-cased tag name of an element.
    pub fn local_name(&self) -> Option<&str> {
        self.element_data().map(|el| el.local_name.as_str())
    }

    /// Character data of a text or comment node.
    pub fn data(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Text(data) | NodeData::Comment(data) => Some(data.borrow().clone()),
            _ => None,
        }
    }

    pub fn set_data(&self, value: impl Into<String>) {
        if let NodeData::Text(data) | NodeData::Comment(data) = &self.0.data {
            *data.borrow_mut() = value.into();
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    // ---- tree ----

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn child_nodes(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn has_child_nodes(&self) -> bool {
        !self.0.children.borrow().is_empty()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.children.borrow().last().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        let index = children.iter().position(|c| c.ptr_eq(self))?;
        children.get(index + 1).cloned()
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        let index = children.iter().position(|c| c.ptr_eq(self))?;
        index.checked_sub(1).and_then(|i| children.get(i).cloned())
    }

    /// Whether `other` is this node or one of its descendants. Does not look
    /// into shadow trees.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Descendants in tree order, excluding this node and shadow trees.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        for child in self.0.children.borrow().iter() {
            out.push(child.clone());
            out.extend(child.descendants());
        }
        out
    }

    /// This node and its descendants in shadow-including tree order: an
    /// element's shadow tree comes before its light children.
    pub(crate) fn shadow_including_inclusive_descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_shadow_including(&mut out);
        out
    }

    fn collect_shadow_including(&self, out: &mut Vec<Node>) {
        out.push(self.clone());
        if let Some(shadow) = self.shadow_root() {
            shadow.collect_shadow_including(out);
        }
        for child in self.child_nodes() {
            child.collect_shadow_including(out);
        }
    }

    fn parent_or_host(&self) -> Option<Node> {
        self.parent().or_else(|| self.host())
    }

    fn is_host_including_inclusive_ancestor_of(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent_or_host();
        }
        false
    }

    /// Whether the node is in a document, looking through shadow hosts.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        loop {
            if current.node_type() == NodeType::Document {
                return true;
            }
            match current.parent_or_host() {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Append without checks or lifecycle reactions. Only for building
    /// detached trees, as the parser does.
    pub(crate) fn push_child(&self, child: Node) {
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child);
    }

    fn ensure_pre_insert(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        if !self.is_container()
            || matches!(child.node_type(), NodeType::Document | NodeType::ShadowRoot)
            || child.is_host_including_inclusive_ancestor_of(self)
        {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if !reference.parent().is_some_and(|p| p.ptr_eq(self)) {
                return Err(DomError::NotFound);
            }
        }
        Ok(())
    }

    pub fn append_child(&self, child: &Node) -> Result<Node, DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference` (or at the end). A fragment moves its
    /// children instead of itself; a node that already has a parent is moved.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<Node, DomError> {
        self.ensure_pre_insert(child, reference)?;

        let mut reference = reference.cloned();
        if reference.as_ref().is_some_and(|r| r.ptr_eq(child)) {
            reference = child.next_sibling();
        }

        let nodes = if child.node_type() == NodeType::Fragment {
            let nodes = child.0.children.take();
            for node in &nodes {
                *node.0.parent.borrow_mut() = Weak::new();
            }
            nodes
        } else {
            child.remove();
            vec![child.clone()]
        };

        {
            let mut children = self.0.children.borrow_mut();
            let index = reference
                .as_ref()
                .and_then(|r| children.iter().position(|c| c.ptr_eq(r)))
                .unwrap_or(children.len());
            for (offset, node) in nodes.iter().enumerate() {
                children.insert(index + offset, node.clone());
            }
        }
        for node in &nodes {
            *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        }

        if self.is_connected() {
            for node in &nodes {
                registry::connected_reactions(node);
            }
        }
        Ok(child.clone())
    }

    /// Detach the node from its parent. Custom elements that leave the
    /// document get their disconnected reaction.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        let was_connected = parent.is_connected();
        parent.0.children.borrow_mut().retain(|c| !c.ptr_eq(self));
        *self.0.parent.borrow_mut() = Weak::new();
        if was_connected {
            registry::disconnected_reactions(self);
        }
    }

    pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
        if !child.parent().is_some_and(|p| p.ptr_eq(self)) {
            return Err(DomError::NotFound);
        }
        child.remove();
        Ok(child.clone())
    }

    /// Replace all children with `nodes`. Fragments contribute their children.
    pub fn replace_children(&self, nodes: impl IntoIterator<Item = Node>) -> Result<(), DomError> {
        let nodes: Vec<Node> = nodes.into_iter().collect();
        for node in &nodes {
            self.ensure_pre_insert(node, None)?;
        }
        for child in self.child_nodes() {
            child.remove();
        }
        for node in &nodes {
            self.append_child(node)?;
        }
        Ok(())
    }

    // ---- text ----

    /// Concatenated text of all descendant text nodes, or the data of a
    /// text/comment node.
    pub fn text_content(&self) -> String {
        match &self.0.data {
            NodeData::Text(data) | NodeData::Comment(data) => data.borrow().clone(),
            _ => {
                let mut out = String::new();
                for node in self.descendants() {
                    if let NodeData::Text(data) = &node.0.data {
                        out.push_str(&data.borrow());
                    }
                }
                out
            }
        }
    }

    /// Replace all children with a single text node (none for an empty string).
    pub fn set_text_content(&self, text: &str) {
        match &self.0.data {
            NodeData::Text(data) | NodeData::Comment(data) => *data.borrow_mut() = text.to_string(),
            _ => {
                for child in self.child_nodes() {
                    child.remove();
                }
                if !text.is_empty() {
                    let node = Node::text(text);
                    if self.append_child(&node).is_err() {
                        tracing::warn!("cannot set text content on {self:?}");
                    }
                }
            }
        }
    }

    // ---- attributes ----

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        let el = self.element_data()?;
        let name = name.to_ascii_lowercase();
        el.attributes
            .borrow()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let Some(el) = self.element_data() else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let old = {
            let mut attributes = el.attributes.borrow_mut();
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
                None => {
                    attributes.push((name.clone(), value.to_string()));
                    None
                }
            }
        };
        registry::attribute_changed_reaction(self, &name, old.as_deref(), Some(value));
    }

    pub fn remove_attribute(&self, name: &str) {
        let Some(el) = self.element_data() else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let old = {
            let mut attributes = el.attributes.borrow_mut();
            let index = attributes.iter().position(|(n, _)| *n == name);
            index.map(|i| attributes.remove(i).1)
        };
        if let Some(old) = old {
            registry::attribute_changed_reaction(self, &name, Some(&old), None);
        }
    }

    /// Toggle a boolean attribute. `force` pins the outcome. Returns whether
    /// the attribute is present afterwards.
    pub fn toggle_attribute(&self, name: &str, force: Option<bool>) -> bool {
        let present = self.has_attribute(name);
        let wanted = force.unwrap_or(!present);
        if wanted && !present {
            self.set_attribute(name, "");
        } else if !wanted && present {
            self.remove_attribute(name);
        }
        wanted
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes().into_iter().map(|(n, _)| n).collect()
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.element_data()
            .map(|el| el.attributes.borrow().clone())
            .unwrap_or_default()
    }

    /// Attribute insertion used by the parser: no reactions, first one wins.
    pub(crate) fn push_attribute(&self, name: String, value: String) {
        if let Some(el) = self.element_data() {
            let mut attributes = el.attributes.borrow_mut();
            if !attributes.iter().any(|(n, _)| *n == name) {
                attributes.push((name, value));
            }
        }
    }

    // ---- properties ----

    pub fn property(&self, name: &str) -> Option<Value> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: impl Into<Value>) {
        self.0
            .properties
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    pub fn remove_property(&self, name: &str) -> Option<Value> {
        self.0.properties.borrow_mut().shift_remove(name)
    }

    // ---- dataset ----

    pub fn dataset_get(&self, key: &str) -> Option<String> {
        self.get_attribute(&dataset_attribute(key))
    }

    pub fn dataset_set(&self, key: &str, value: &str) {
        self.set_attribute(&dataset_attribute(key), value);
    }

    pub fn dataset_remove(&self, key: &str) {
        self.remove_attribute(&dataset_attribute(key));
    }

    /// All `data-*` attributes, keyed by their camelCase dataset name.
    pub fn dataset(&self) -> IndexMap<String, String> {
        self.attributes()
            .into_iter()
            .filter_map(|(name, value)| name.strip_prefix("data-").map(|k| (dataset_key(k), value)))
            .collect()
    }

    // ---- events ----

    pub fn add_event_listener(&self, kind: &str, listener: Listener) {
        let mut listeners = self.0.listeners.borrow_mut();
        if !listeners.iter().any(|(k, l)| k == kind && l.ptr_eq(&listener)) {
            listeners.push((kind.to_string(), listener));
        }
    }

    pub fn remove_event_listener(&self, kind: &str, listener: &Listener) {
        self.0
            .listeners
            .borrow_mut()
            .retain(|(k, l)| !(k == kind && l.ptr_eq(listener)));
    }

    /// Dispatch `event` at this node. On each node of the path the `on<kind>`
    /// handler property runs first, then listeners in registration order.
    /// Bubbling events continue to the parent, or to the host of a shadow root.
    pub fn dispatch_event(&self, event: &Event) {
        event.set_target(self);
        let mut path = vec![self.clone()];
        if event.bubbles() {
            let mut current = self.parent_or_host();
            while let Some(node) = current {
                current = node.parent_or_host();
                path.push(node);
            }
        }

        let handler_name = format!("on{}", event.kind());
        for node in &path {
            event.set_current_target(Some(node));
            if let Some(Value::Listener(handler)) = node.property(&handler_name) {
                handler.call(event);
            }
            let listeners: Vec<Listener> = node
                .0
                .listeners
                .borrow()
                .iter()
                .filter(|(k, _)| k == event.kind())
                .map(|(_, l)| l.clone())
                .collect();
            for listener in listeners {
                listener.call(event);
            }
        }
        event.set_current_target(None);
    }

    pub fn click(&self) {
        self.dispatch_event(&Event::new("click").bubbling());
    }

    // ---- shadow roots and styles ----

    pub fn attach_shadow(&self) -> Result<Node, DomError> {
        let Some(el) = self.element_data() else {
            return Err(DomError::HierarchyRequest);
        };
        if el.shadow_root.borrow().is_some() {
            return Err(DomError::ShadowRootExists(el.local_name.clone()));
        }
        let shadow = Node::from_data(NodeData::ShadowRoot {
            host: Rc::downgrade(&self.0),
            root: RootData::default(),
        });
        *el.shadow_root.borrow_mut() = Some(shadow.clone());
        Ok(shadow)
    }

    pub fn shadow_root(&self) -> Option<Node> {
        self.element_data()?.shadow_root.borrow().clone()
    }

    /// The host element of a shadow root.
    pub fn host(&self) -> Option<Node> {
        match &self.0.data {
            NodeData::ShadowRoot { host, .. } => host.upgrade().map(Node),
            _ => None,
        }
    }

    /// Stylesheets adopted by a document or shadow root.
    pub fn adopted_style_sheets(&self) -> Vec<StyleSheet> {
        self.root_data()
            .map(|root| root.adopted.borrow().clone())
            .unwrap_or_default()
    }

    pub fn set_adopted_style_sheets(&self, sheets: Vec<StyleSheet>) {
        match self.root_data() {
            Some(root) => *root.adopted.borrow_mut() = sheets,
            None => tracing::warn!("{self:?} cannot adopt stylesheets"),
        }
    }

    /// The custom element instance of an upgraded element.
    pub fn custom_element(&self) -> Option<Rc<dyn CustomElement>> {
        match &*self.element_data()?.custom.borrow() {
            CustomState::Custom(slot) => Some(slot.instance.clone()),
            _ => None,
        }
    }
}

/// `fooBar` -> `data-foo-bar`
fn dataset_attribute(key: &str) -> String {
    let mut name = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// `foo-bar` -> `fooBar`
fn dataset_key(suffix: &str) -> String {
    let mut key = String::with_capacity(suffix.len());
    let mut chars = suffix.chars().peekable();
    while let Some(ch) = chars.next() {
        match chars.peek() {
            Some(next) if ch == '-' && next.is_ascii_lowercase() => {
                key.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => key.push(ch),
        }
    }
    key
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            NodeData::Document(_) => f.write_str("#document"),
            NodeData::Fragment => f.write_str("#document-fragment"),
            NodeData::ShadowRoot { .. } => f.write_str("#shadow-root"),
            NodeData::Element(el) => write!(f, "<{}>", el.local_name),
            NodeData::Text(data) => write!(f, "#text {:?}", data.borrow()),
            NodeData::Comment(data) => write!(f, "<!--{}-->", data.borrow()),
        }
    }
}
