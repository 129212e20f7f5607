use std::rc::Rc;

use crate::event_loop::{EventLoop, FrameHandle};
use crate::node::Node;
use crate::registry::{self, CustomElementRegistry};

thread_local! {
    static WINDOW: Window = Window::new();
}

/// The window of the current thread.
pub fn window() -> Window {
    WINDOW.with(Window::clone)
}

/// Global state of one UI thread: the document, its custom element registry
/// and the event loop.
#[derive(Clone)]
pub struct Window(Rc<WindowInner>);

struct WindowInner {
    document: Node,
    body: Node,
    custom_elements: Rc<CustomElementRegistry>,
    event_loop: Rc<EventLoop>,
}

impl Window {
    fn new() -> Self {
        let document = Node::document();
        let html = Node::element("html");
        let head = Node::element("head");
        let body = Node::element("body");
        html.push_child(head);
        html.push_child(body.clone());
        document.push_child(html);
        Window(Rc::new(WindowInner {
            document,
            body,
            custom_elements: Rc::new(CustomElementRegistry::default()),
            event_loop: Rc::new(EventLoop::default()),
        }))
    }

    pub fn document(&self) -> Node {
        self.0.document.clone()
    }

    pub fn body(&self) -> Node {
        self.0.body.clone()
    }

    pub fn custom_elements(&self) -> Rc<CustomElementRegistry> {
        self.0.custom_elements.clone()
    }

    pub fn event_loop(&self) -> Rc<EventLoop> {
        self.0.event_loop.clone()
    }

    /// A new element owned by the document. Defined names are upgraded
    /// right away; the instance sees no attributes and is not connected yet.
    pub fn create_element(&self, name: &str) -> Node {
        let node = Node::element(name);
        registry::try_upgrade(&node);
        node
    }

    pub fn queue_microtask(&self, task: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.0.event_loop.queue_microtask(task);
    }

    pub fn request_animation_frame(
        &self,
        task: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) -> FrameHandle {
        self.0.event_loop.request_animation_frame(task)
    }

    pub fn cancel_animation_frame(&self, handle: FrameHandle) -> bool {
        self.0.event_loop.cancel_animation_frame(handle)
    }

    pub fn perform_microtask_checkpoint(&self) -> usize {
        self.0.event_loop.perform_microtask_checkpoint()
    }

    pub fn run_animation_frame(&self) -> usize {
        self.0.event_loop.run_animation_frame()
    }

    pub fn run_until_idle(&self) {
        self.0.event_loop.run_until_idle();
    }

    pub fn report_error(&self, err: anyhow::Error) {
        self.0.event_loop.report(err);
    }

    pub fn take_errors(&self) -> Vec<anyhow::Error> {
        self.0.event_loop.take_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_skeleton() {
        let w = window();
        let html = w.document().first_child().unwrap();
        assert_eq!(html.local_name(), Some("html"));
        assert_eq!(w.body().parent(), Some(html));
        assert!(w.body().is_connected());
    }

    #[test]
    fn test_window_is_per_thread_singleton() {
        let body = window().body();
        body.append_child(&Node::element("p")).unwrap();
        assert_eq!(window().body().child_nodes().len(), 1);

        let other = std::thread::spawn(|| window().body().child_nodes().len())
            .join()
            .unwrap();
        assert_eq!(other, 0);
    }
}
