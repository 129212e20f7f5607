use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::DomError;
use crate::node::Node;
use crate::window::window;

/// Lifecycle reactions of an upgraded custom element.
///
/// All callbacks run synchronously from the tree operation that triggered
/// them. A returned error is reported through the window and does not abort
/// that operation.
pub trait CustomElement: 'static {
    fn connected(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnected(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Only called for names listed in the definition's observed attributes.
    fn attribute_changed(
        &self,
        _name: &str,
        _old: Option<&str>,
        _new: Option<&str>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// Builds the instance for an element being upgraded.
pub type Constructor = Rc<dyn Fn(&Node) -> anyhow::Result<Rc<dyn CustomElement>>>;

#[derive(Clone)]
pub struct ElementDefinition {
    pub constructor: Constructor,
    pub observed_attributes: Rc<[String]>,
    /// Built-in element this definition customizes (`<button is="...">`).
    pub extends: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DefineOptions {
    pub extends: Option<String>,
}

pub(crate) enum CustomState {
    Undefined,
    Custom(CustomSlot),
    Failed,
}

pub(crate) struct CustomSlot {
    pub(crate) instance: Rc<dyn CustomElement>,
    pub(crate) observed: Rc<[String]>,
}

const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// A valid custom element name starts with an ASCII lowercase letter,
/// contains a hyphen, has no ASCII uppercase and is not reserved.
pub fn is_valid_custom_element_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.contains('-')
        && !name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '<' | '>' | '/' | '"' | '\'' | '='))
        && !RESERVED_NAMES.contains(&name)
}

/// Name -> definition table of one window.
#[derive(Default)]
pub struct CustomElementRegistry {
    definitions: RefCell<IndexMap<String, ElementDefinition>>,
}

impl CustomElementRegistry {
    /// Register `definition` under `name` and upgrade every matching element
    /// already in the document.
    pub fn define(&self, name: &str, definition: ElementDefinition) -> Result<(), DomError> {
        if !is_valid_custom_element_name(name) {
            return Err(DomError::InvalidName(name.to_string()));
        }
        if self.is_defined(name) {
            return Err(DomError::AlreadyDefined(name.to_string()));
        }
        tracing::debug!(name, extends = ?definition.extends, "defining custom element");
        self.definitions
            .borrow_mut()
            .insert(name.to_string(), definition);

        let document = window().document();
        for node in document.shadow_including_inclusive_descendants() {
            if lookup_name(&node).as_deref() == Some(name) {
                try_upgrade(&node);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ElementDefinition> {
        self.definitions.borrow().get(name).cloned()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.borrow().keys().cloned().collect()
    }

    /// Definition applying to an element with the given tag and `is` value.
    fn lookup(&self, local_name: &str, is: Option<&str>) -> Option<ElementDefinition> {
        let definitions = self.definitions.borrow();
        match definitions.get(local_name) {
            Some(def) if def.extends.is_none() => Some(def.clone()),
            _ => is
                .and_then(|is| definitions.get(is))
                .filter(|def| def.extends.as_deref() == Some(local_name))
                .cloned(),
        }
    }
}

fn lookup_name(node: &Node) -> Option<String> {
    let local_name = node.local_name()?;
    node.get_attribute("is").or_else(|| Some(local_name.to_string()))
}

/// Upgrade an undefined element if a definition applies to it.
pub(crate) fn try_upgrade(node: &Node) {
    let Some(el) = node.element_data() else {
        return;
    };
    if !matches!(*el.custom.borrow(), CustomState::Undefined) {
        return;
    }
    let Some(local_name) = node.local_name() else {
        return;
    };
    let is = node.get_attribute("is");
    let Some(definition) = window().custom_elements().lookup(local_name, is.as_deref()) else {
        return;
    };
    upgrade(node, definition);
}

fn upgrade(node: &Node, definition: ElementDefinition) {
    let Some(el) = node.element_data() else {
        return;
    };
    tracing::trace!(?node, "upgrading");
    let instance = match (definition.constructor)(node) {
        Ok(instance) => instance,
        Err(err) => {
            *el.custom.borrow_mut() = CustomState::Failed;
            window().report_error(err.context(format!("failed to construct {node:?}")));
            return;
        }
    };
    *el.custom.borrow_mut() = CustomState::Custom(CustomSlot {
        instance: instance.clone(),
        observed: definition.observed_attributes.clone(),
    });

    for name in definition.observed_attributes.iter() {
        if let Some(value) = node.get_attribute(name) {
            report(instance.attribute_changed(name, None, Some(&value)));
        }
    }
    if node.is_connected() {
        report(instance.connected());
    }
}

fn report(result: anyhow::Result<()>) {
    if let Err(err) = result {
        window().report_error(err);
    }
}

/// Run after `node` was inserted into a connected parent.
pub(crate) fn connected_reactions(node: &Node) {
    for node in node.shadow_including_inclusive_descendants() {
        // an earlier reaction may have moved it out again
        if !node.is_element() || !node.is_connected() {
            continue;
        }
        match node.custom_element() {
            Some(instance) => report(instance.connected()),
            None => try_upgrade(&node),
        }
    }
}

/// Run after `node` was removed from a connected parent.
pub(crate) fn disconnected_reactions(node: &Node) {
    for node in node.shadow_including_inclusive_descendants() {
        if node.is_connected() {
            continue;
        }
        if let Some(instance) = node.custom_element() {
            report(instance.disconnected());
        }
    }
}

pub(crate) fn attribute_changed_reaction(
    node: &Node,
    name: &str,
    old: Option<&str>,
    new: Option<&str>,
) {
    let Some(el) = node.element_data() else {
        return;
    };
    let instance = match &*el.custom.borrow() {
        CustomState::Custom(slot) if slot.observed.iter().any(|n| n == name) => {
            slot.instance.clone()
        }
        _ => return,
    };
    report(instance.attribute_changed(name, old, new));
}
