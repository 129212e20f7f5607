//! Reactive custom elements.
//!
//! Implement [`Component`] for a type, register it with [`define`], and every
//! element with that tag gets an [`Element`] controller: it renders the
//! component's template into the element (or its shadow root) when the
//! element is connected, and re-renders at most once per animation frame
//! after state changes, observed attribute changes or `update` events.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn state() -> serde_json::Value {
//!         json!({ "count": 0 })
//!     }
//!
//!     fn render(&self, el: &Element<Self>) -> Result<Fragment, TemplateError> {
//!         let handle = el.handle();
//!         let inc = Value::listener(move |_| {
//!             if let Some(el) = handle.upgrade() {
//!                 el.state().update("count", |n| *n = json!(n.as_i64().unwrap_or(0) + 1));
//!             }
//!         });
//!         html!(["<button @click=", ">", "</button>"], inc, el.state().value("count"))
//!     }
//! }
//!
//! define::<Counter>("x-counter")?;
//! ```

mod component;
mod state;

use std::rc::Rc;

pub use component::{instance, Component, Element, Handle};
pub use elements_dom::{window, DefineOptions, DomError, Node, StyleSheet, Value};
pub use elements_template::{html, Fragment, TemplateError};
pub use state::{Field, Key, Observable};

use elements_dom::{CustomElement, ElementDefinition};

/// Register `C` under `tag`. Does nothing when `tag` is already registered.
pub fn define<C: Component>(tag: &str) -> Result<(), DomError> {
    define_with::<C>(tag, DefineOptions::default())
}

/// [`define`] with options, e.g. to customize a built-in element.
pub fn define_with<C: Component>(tag: &str, options: DefineOptions) -> Result<(), DomError> {
    let registry = window().custom_elements();
    if registry.is_defined(tag) {
        tracing::trace!(tag, "already defined");
        return Ok(());
    }

    let styles = C::styles();
    let definition = ElementDefinition {
        constructor: Rc::new(move |node: &Node| -> anyhow::Result<Rc<dyn CustomElement>> {
            let element: Rc<dyn CustomElement> = Element::<C>::construct(node, styles.as_ref())?;
            Ok(element)
        }),
        observed_attributes: C::observed_attributes()
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect(),
        extends: options.extends,
    };
    registry.define(tag, definition)
}
