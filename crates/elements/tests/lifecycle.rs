//! Lifecycle tests for components
//!
//! These drive the window's event loop by hand to observe when renders are
//! scheduled, coalesced and committed.

use std::cell::{Cell, RefCell};

use elements::{
    define, html, instance, window, Component, DomError, Element, Fragment, Node, StyleSheet,
    TemplateError, Value,
};
use serde_json::json;

#[derive(Default)]
struct Counter {
    renders: Cell<usize>,
    changes: RefCell<Vec<String>>,
}

impl Component for Counter {
    fn observed_attributes() -> &'static [&'static str] {
        &["label"]
    }

    fn state() -> serde_json::Value {
        json!({ "count": 5 })
    }

    fn render(&self, el: &Element<Self>) -> Result<Fragment, TemplateError> {
        self.renders.set(self.renders.get() + 1);
        let count = el.state().value("count");
        let handle = el.handle();
        let increment = Value::listener(move |_| {
            if let Some(el) = handle.upgrade() {
                el.state()
                    .update("count", |n| *n = json!(n.as_i64().unwrap_or(0) + 1));
            }
        });
        html!(
            ["<button title=", " @click=", ">", "</button><p>", "</p>"],
            el.attr("label"),
            increment,
            count,
            el.attr("label")
        )
    }

    fn attribute_changed(
        &self,
        _el: &Element<Self>,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> anyhow::Result<()> {
        self.changes
            .borrow_mut()
            .push(format!("{name}:{}->{}", old.unwrap_or("-"), new.unwrap_or("-")));
        Ok(())
    }
}

fn mount_counter() -> (Node, std::rc::Rc<Element<Counter>>) {
    define::<Counter>("x-counter").unwrap();
    let node = window().create_element("x-counter");
    window().body().append_child(&node).unwrap();
    let el = instance::<Counter>(&node).unwrap();
    (node, el)
}

fn shadow_html(node: &Node) -> String {
    node.shadow_root().unwrap().inner_html()
}

/// Connecting renders synchronously into the shadow root.
#[test]
fn connect_renders_immediately() {
    let (node, el) = mount_counter();
    assert!(el.is_mounted());
    assert_eq!(el.component().renders.get(), 1);
    assert_eq!(
        shadow_html(&node),
        "<button>5<!--δ2--></button><p><!--δ3--></p>"
    );
    assert_eq!(window().event_loop().pending_frames(), 0);
}

/// A state change re-renders on the next frame with fresh nodes and no
/// leftover marker attributes.
#[test]
fn rerender_replaces_content() {
    let (node, el) = mount_counter();
    let old_button = el.query("button").unwrap();

    assert!(el.state().set("count", 6));
    assert_eq!(el.component().renders.get(), 1);
    assert_eq!(window().run_animation_frame(), 1);

    assert_eq!(el.component().renders.get(), 2);
    let html = shadow_html(&node);
    assert_eq!(html, "<button>6<!--δ2--></button><p><!--δ3--></p>");
    assert!(!html.contains("δ0="));
    let new_button = el.query("button").unwrap();
    assert!(!new_button.ptr_eq(&old_button));
    assert!(!old_button.is_connected());
}

#[test]
fn unchanged_state_schedules_nothing() {
    let (_node, el) = mount_counter();
    assert!(!el.state().set("count", 5));
    assert_eq!(window().event_loop().pending_frames(), 0);
}

#[test]
fn changes_within_a_frame_commit_once() {
    let (node, el) = mount_counter();
    el.state().set("count", 6);
    el.state().set("count", 7);
    el.state().set("count", 8);
    assert_eq!(window().event_loop().pending_frames(), 1);

    window().run_until_idle();
    assert_eq!(el.component().renders.get(), 2);
    assert!(shadow_html(&node).starts_with("<button>8"));
}

#[test]
fn click_handler_updates_state_through_handle() {
    let (node, el) = mount_counter();
    el.query("button").unwrap().click();
    window().run_until_idle();
    assert_eq!(el.state().value("count"), Some(json!(6)));
    assert!(shadow_html(&node).starts_with("<button>6"));
}

/// A change delivered before the first connect waits for it and is handled
/// exactly once.
#[test]
fn attribute_change_before_mount_is_applied_once() {
    define::<Counter>("x-counter").unwrap();
    let node = window().create_element("x-counter");
    let el = instance::<Counter>(&node).unwrap();

    node.set_attribute("label", "hi");
    // the queued delivery finds the element still unmounted and parks it
    window().perform_microtask_checkpoint();
    window().perform_microtask_checkpoint();
    assert!(el.component().changes.borrow().is_empty());

    window().body().append_child(&node).unwrap();
    window().run_until_idle();

    assert_eq!(*el.component().changes.borrow(), ["label:-->hi"]);
    assert!(shadow_html(&node).contains(r#"<button title="hi">"#));
    assert!(shadow_html(&node).contains("<p>hi<!--δ3--></p>"));
}

#[test]
fn attribute_change_before_mount_with_connect_in_same_tick() {
    define::<Counter>("x-counter").unwrap();
    let node = window().create_element("x-counter");
    node.set_attribute("label", "early");
    window().body().append_child(&node).unwrap();
    window().run_until_idle();

    let el = instance::<Counter>(&node).unwrap();
    assert_eq!(*el.component().changes.borrow(), ["label:-->early"]);
}

#[test]
fn attribute_change_after_mount_schedules_render() {
    let (node, el) = mount_counter();
    node.set_attribute("label", "now");
    node.set_attribute("ignored", "x");
    assert_eq!(*el.component().changes.borrow(), ["label:-->now"]);
    assert_eq!(window().event_loop().pending_frames(), 1);

    window().run_animation_frame();
    assert_eq!(el.component().renders.get(), 2);
    assert_eq!(el.attr("label").as_deref(), Some("now"));
}

#[test]
fn update_event_requests_render() {
    let (node, el) = mount_counter();
    el.emit("update", Value::Null);
    window().run_animation_frame();
    assert_eq!(el.component().renders.get(), 2);

    node.remove();
    el.emit("update", Value::Null);
    assert_eq!(window().event_loop().pending_frames(), 0);
}

/// Removing the element turns an already scheduled commit into a no-op.
#[test]
fn disconnect_cancels_pending_commit_effect() {
    let (node, el) = mount_counter();
    el.state().set("count", 42);
    node.remove();
    window().run_until_idle();

    assert_eq!(el.component().renders.get(), 1);
    assert!(shadow_html(&node).starts_with("<button>5"));
    assert!(window().take_errors().is_empty());
}

#[test]
fn define_is_idempotent() {
    define::<Counter>("x-counter").unwrap();
    define::<Counter>("x-counter").unwrap();
    assert_eq!(window().custom_elements().names(), ["x-counter"]);
    assert_eq!(
        define::<Counter>("counter"),
        Err(DomError::InvalidName("counter".into()))
    );
}

#[derive(Default)]
struct Badge;

impl Component for Badge {
    const SHADOW: bool = false;

    fn styles() -> Option<StyleSheet> {
        Some(StyleSheet::new("x-badge { display: inline-block; }"))
    }

    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        html!(["<span>badge</span>"])
    }
}

#[derive(Default)]
struct Card;

impl Component for Card {
    fn styles() -> Option<StyleSheet> {
        Some(StyleSheet::new(":host { display: block; }"))
    }
}

#[test]
fn light_dom_stylesheet_adopted_once_by_document() {
    elements::define::<Badge>("x-badge").unwrap();
    let body = window().body();
    for _ in 0..3 {
        body.append_child(&window().create_element("x-badge")).unwrap();
    }

    let sheets = window().document().adopted_style_sheets();
    assert_eq!(sheets.len(), 1);
    let first = body.first_child().unwrap();
    assert!(first.shadow_root().is_none());
    assert_eq!(first.inner_html(), "<span>badge</span>");
}

#[test]
fn shadow_stylesheet_shared_between_instances() {
    elements::define::<Card>("x-card").unwrap();
    let a = window().create_element("x-card");
    let b = window().create_element("x-card");

    let sheets_a = a.shadow_root().unwrap().adopted_style_sheets();
    let sheets_b = b.shadow_root().unwrap().adopted_style_sheets();
    assert_eq!(sheets_a.len(), 1);
    assert_eq!(sheets_a, sheets_b);
    assert!(window().document().adopted_style_sheets().is_empty());
}

#[test]
fn default_render_is_a_slot() {
    elements::define::<Card>("x-card").unwrap();
    let card = window().create_element("x-card");
    card.append_child(&Node::text("light")).unwrap();
    window().body().append_child(&card).unwrap();
    assert_eq!(card.shadow_root().unwrap().inner_html(), "<slot></slot>");
    assert_eq!(card.inner_html(), "light");
}

#[derive(Default)]
struct Shell;

impl Component for Shell {
    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        html!(["<header>shell</header><x-counter label=\"inner\"></x-counter>"])
    }
}

#[test]
fn nested_components_render_on_parent_commit() {
    define::<Counter>("x-counter").unwrap();
    define::<Shell>("x-shell").unwrap();
    let shell = window().create_element("x-shell");
    window().body().append_child(&shell).unwrap();

    let inner = shell
        .shadow_root()
        .unwrap()
        .query_selector("x-counter")
        .unwrap();
    let counter = instance::<Counter>(&inner).unwrap();
    window().run_until_idle();

    assert_eq!(*counter.component().changes.borrow(), ["label:-->inner"]);
    assert!(shadow_html(&inner).contains("<p>inner<!--δ3--></p>"));
}

#[derive(Default)]
struct Broken;

impl Component for Broken {
    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        html!(["<p>", "</p>"], 1, 2)
    }
}

#[test]
fn render_errors_are_reported() {
    define::<Broken>("x-broken").unwrap();
    window()
        .body()
        .append_child(&window().create_element("x-broken"))
        .unwrap();
    let errors = window().take_errors();
    assert_eq!(errors.len(), 1);
    assert!(format!("{:#}", errors[0]).contains("bad template"));
}

#[derive(Default)]
struct Flaky {
    attempts: Cell<usize>,
    changes: RefCell<Vec<String>>,
}

impl Component for Flaky {
    fn observed_attributes() -> &'static [&'static str] {
        &["label"]
    }

    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        self.attempts.set(self.attempts.get() + 1);
        if self.attempts.get() == 1 {
            return html!(["<p>", "</p>"], 1, 2);
        }
        html!(["<p>ok</p>"])
    }

    fn attribute_changed(
        &self,
        _el: &Element<Self>,
        name: &str,
        _old: Option<&str>,
        new: Option<&str>,
    ) -> anyhow::Result<()> {
        self.changes
            .borrow_mut()
            .push(format!("{name}={}", new.unwrap_or("-")));
        Ok(())
    }
}

/// A parked attribute change survives a first render that fails.
#[test]
fn parked_attribute_change_survives_failed_first_render() {
    define::<Flaky>("x-flaky").unwrap();
    let node = window().create_element("x-flaky");
    let el = instance::<Flaky>(&node).unwrap();
    node.set_attribute("label", "hi");
    window().perform_microtask_checkpoint();

    window().body().append_child(&node).unwrap();
    window().run_until_idle();

    assert_eq!(window().take_errors().len(), 1);
    assert_eq!(*el.component().changes.borrow(), ["label=hi"]);
    assert_eq!(shadow_html(&node), "<p>ok</p>");
}

#[derive(Default)]
struct Grumpy;

impl Component for Grumpy {
    fn connected(&self, _el: &Element<Self>) -> anyhow::Result<()> {
        anyhow::bail!("hook failed")
    }

    fn render(&self, _el: &Element<Self>) -> Result<Fragment, TemplateError> {
        html!(["<p>", "</p>"], 1, 2)
    }
}

/// When both the connected hook and the first render fail, both are reported.
#[test]
fn hook_and_render_errors_are_both_reported() {
    define::<Grumpy>("x-grumpy").unwrap();
    window()
        .body()
        .append_child(&window().create_element("x-grumpy"))
        .unwrap();

    let errors: Vec<String> = window()
        .take_errors()
        .iter()
        .map(|e| format!("{e:#}"))
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("hook failed"));
    assert!(errors[1].contains("bad template"));
}

#[test]
fn state_changes_after_disconnect_schedule_nothing() {
    let (node, el) = mount_counter();
    node.remove();
    assert!(el.state().set("count", 9));
    assert_eq!(window().event_loop().pending_frames(), 0);

    window().body().append_child(&node).unwrap();
    assert_eq!(el.component().renders.get(), 2);
    assert!(shadow_html(&node).starts_with("<button>9"));
    el.state().set("count", 10);
    assert_eq!(window().event_loop().pending_frames(), 1);
}
