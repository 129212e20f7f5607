use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::Context;
use elements_dom::{
    window, CustomElement, Event, FrameHandle, Listener, Node, StyleSheet, Value, WeakNode,
};
use elements_template::{html, Fragment, TemplateError};

use crate::state::Observable;

/// A component class: its configuration, its view and its lifecycle hooks.
///
/// One value of the type is created per element, through `Default`, when
/// the element is upgraded. Hooks and `render` receive the element
/// controller for access to state, attributes and the host tree.
pub trait Component: Default + 'static {
    /// Render into an attached shadow root instead of the element itself.
    const SHADOW: bool = true;

    /// Stylesheet adopted by every render root of this class. Evaluated once
    /// when the class is defined.
    fn styles() -> Option<StyleSheet> {
        None
    }

    /// Attributes whose changes reach [`attribute_changed`](Self::attribute_changed).
    fn observed_attributes() -> &'static [&'static str] {
        &[]
    }

    /// Initial state of every instance.
    fn state() -> serde_json::Value {
        serde_json::Value::Object(Default::default())
    }

    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        html!(["<slot></slot>"])
    }

    fn connected(&self, _el: &Element<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnected(&self, _el: &Element<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    fn attribute_changed(
        &self,
        _el: &Element<Self>,
        _name: &str,
        _old: Option<&str>,
        _new: Option<&str>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct AttributeChange {
    name: String,
    old: Option<String>,
    new: Option<String>,
}

/// The lifecycle controller of one upgraded element.
///
/// Owns the component value and its state, renders into the element's
/// render root, and collapses any number of render requests within one
/// animation frame into a single commit.
pub struct Element<C: Component> {
    this: Weak<Element<C>>,
    component: C,
    host: WeakNode,
    mounted: Cell<bool>,
    state: Observable,
    pending_frame: Cell<Option<FrameHandle>>,
    update_listener: RefCell<Option<Listener>>,
    /// Attribute changes that arrived before the first connect.
    parked: RefCell<Vec<AttributeChange>>,
}

/// A weak handle to an element controller, for use in event listeners and
/// other callbacks that must not keep the element alive.
pub struct Handle<C: Component>(Weak<Element<C>>);

impl<C: Component> Clone for Handle<C> {
    fn clone(&self) -> Self {
        Handle(self.0.clone())
    }
}

impl<C: Component> Handle<C> {
    pub fn upgrade(&self) -> Option<Rc<Element<C>>> {
        self.0.upgrade()
    }
}

impl<C: Component> Element<C> {
    /// Run at upgrade time: attach the shadow root when the class asks for
    /// one and adopt the class stylesheet into the render root, or into the
    /// document for light-DOM components.
    pub(crate) fn construct(host: &Node, styles: Option<&StyleSheet>) -> anyhow::Result<Rc<Self>> {
        let target = if C::SHADOW {
            host.attach_shadow()
                .with_context(|| format!("cannot attach a shadow root to {host:?}"))?
        } else {
            window().document()
        };
        if let Some(sheet) = styles {
            let mut adopted = target.adopted_style_sheets();
            if !adopted.contains(sheet) {
                adopted.push(sheet.clone());
                target.set_adopted_style_sheets(adopted);
            }
        }

        tracing::debug!(?host, shadow = C::SHADOW, "constructed element");
        Ok(Rc::new_cyclic(|this| Element {
            this: this.clone(),
            component: C::default(),
            host: host.downgrade(),
            mounted: Cell::new(false),
            state: Observable::detached(C::state()),
            pending_frame: Cell::new(None),
            update_listener: RefCell::new(None),
            parked: RefCell::new(Vec::new()),
        }))
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn state(&self) -> &Observable {
        &self.state
    }

    pub fn handle(&self) -> Handle<C> {
        Handle(self.this.clone())
    }

    /// Whether the element has been connected at least once.
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// The element itself.
    pub fn host(&self) -> Option<Node> {
        self.host.upgrade()
    }

    /// The render root: the shadow root, or the element for light-DOM
    /// components.
    pub fn root(&self) -> Option<Node> {
        let host = self.host()?;
        Some(host.shadow_root().unwrap_or(host))
    }

    pub fn query(&self, selector: &str) -> Option<Node> {
        self.root()?.query_selector(selector)
    }

    pub fn query_all(&self, selector: &str) -> Vec<Node> {
        self.root()
            .map(|root| root.query_selector_all(selector))
            .unwrap_or_default()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.host()?.get_attribute(name)
    }

    /// Set (`Some`) or remove (`None`) an attribute of the element, then
    /// read it back.
    pub fn set_attr(&self, name: &str, value: Option<&str>) -> Option<String> {
        let host = self.host()?;
        match value {
            Some(value) => host.set_attribute(name, value),
            None => host.remove_attribute(name),
        }
        host.get_attribute(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.host().is_some_and(|host| host.has_attribute(name))
    }

    /// Dispatch a custom event carrying `detail` at the element.
    pub fn emit(&self, name: &str, detail: impl Into<Value>) {
        if let Some(host) = self.host() {
            host.dispatch_event(&Event::custom(name, detail));
        }
    }

    /// Listen for `name` events at the element. There are no listener
    /// options; a listener is registered at most once per event name.
    pub fn on(&self, name: &str, listener: Listener) {
        if let Some(host) = self.host() {
            host.add_event_listener(name, listener);
        }
    }

    /// Remove a listener added with [`on`](Self::on), matched by identity.
    pub fn off(&self, name: &str, listener: &Listener) {
        if let Some(host) = self.host() {
            host.remove_event_listener(name, listener);
        }
    }

    /// Schedule a commit for the next animation frame, replacing any commit
    /// already scheduled for this element.
    pub fn request_render(&self) {
        let w = window();
        if let Some(handle) = self.pending_frame.take() {
            w.cancel_animation_frame(handle);
        }
        let this = self.this.clone();
        let handle = w.request_animation_frame(move || match this.upgrade() {
            Some(el) => {
                el.pending_frame.set(None);
                el.commit()
            }
            None => Ok(()),
        });
        self.pending_frame.set(Some(handle));
    }

    /// Render and replace the render root's children. Does nothing while the
    /// element is not connected.
    fn commit(&self) -> anyhow::Result<()> {
        let Some(host) = self.host() else {
            return Ok(());
        };
        if !host.is_connected() {
            tracing::trace!(?host, "skipping commit of a disconnected element");
            return Ok(());
        }
        let fragment = self
            .component
            .render(self)
            .with_context(|| format!("failed to render {host:?}"))?;
        let root = host.shadow_root().unwrap_or_else(|| host.clone());
        root.replace_children(fragment.into_nodes())?;
        tracing::debug!(?host, "committed render");
        Ok(())
    }

    fn defer_attribute_change(&self, change: AttributeChange) {
        let this = self.this.clone();
        window().queue_microtask(move || match this.upgrade() {
            Some(el) => el.deliver_deferred(change),
            None => Ok(()),
        });
    }

    fn deliver_deferred(&self, change: AttributeChange) -> anyhow::Result<()> {
        if !self.mounted.get() {
            tracing::trace!(name = %change.name, "parking attribute change until connect");
            self.parked.borrow_mut().push(change);
            return Ok(());
        }
        self.attribute_changed(&change.name, change.old.as_deref(), change.new.as_deref())
    }
}

impl<C: Component> CustomElement for Element<C> {
    fn connected(&self) -> anyhow::Result<()> {
        tracing::debug!(host = ?self.host(), "connected");
        self.mounted.set(true);

        let this = self.this.clone();
        self.state.set_on_change(move || {
            if let Some(el) = this.upgrade() {
                el.request_render();
            }
        });

        let this = self.this.clone();
        let listener = Listener::new(move |_| {
            if let Some(el) = this.upgrade() {
                el.request_render();
            }
        });
        if let Some(previous) = self.update_listener.replace(Some(listener.clone())) {
            self.off("update", &previous);
        }
        self.on("update", listener);

        let hook = self.component.connected(self);
        for change in self.parked.take() {
            self.defer_attribute_change(change);
        }

        match (hook, self.commit()) {
            (Err(hook), Err(render)) => {
                window().report_error(hook);
                Err(render)
            }
            (hook, committed) => committed.and(hook),
        }
    }

    fn disconnected(&self) -> anyhow::Result<()> {
        tracing::debug!(host = ?self.host(), "disconnected");
        if let Some(listener) = self.update_listener.take() {
            self.off("update", &listener);
        }
        self.state.clear_on_change();
        self.component.disconnected(self)
    }

    fn attribute_changed(&self, name: &str, old: Option<&str>, new: Option<&str>) -> anyhow::Result<()> {
        let change = AttributeChange {
            name: name.to_string(),
            old: old.map(String::from),
            new: new.map(String::from),
        };
        if !self.mounted.get() {
            self.defer_attribute_change(change);
            return Ok(());
        }
        tracing::trace!(?change, "attribute changed");
        let hook = self.component.attribute_changed(self, name, old, new);
        self.request_render();
        hook
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// The controller of an upgraded element of class `C`.
pub fn instance<C: Component>(node: &Node) -> Option<Rc<Element<C>>> {
    node.custom_element()?.as_any().downcast::<Element<C>>().ok()
}
