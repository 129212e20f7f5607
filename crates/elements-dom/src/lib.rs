//! In-process host platform for the elements component framework.
//!
//! Provides the pieces a browser would: a reference-counted node tree with
//! attributes, properties and events, a markup parser and serializer, a
//! custom element registry with synchronous lifecycle reactions, adoptable
//! stylesheets and an explicitly driven event loop. Everything is
//! single-threaded; each thread has its own [`Window`].

mod error;
mod event;
mod event_loop;
mod node;
mod parse;
mod registry;
mod select;
mod serialize;
mod style;
mod value;
mod window;

pub use error::DomError;
pub use event::Event;
pub use event_loop::{EventLoop, FrameHandle, Task};
pub use node::{Node, NodeType, WeakNode};
pub use parse::{
    decode_entities, is_raw_text_element, is_void_element, parse_fragment, RAW_TEXT_ELEMENTS,
    VOID_ELEMENTS,
};
pub use registry::{
    is_valid_custom_element_name, Constructor, CustomElement, CustomElementRegistry,
    DefineOptions, ElementDefinition,
};
pub use serialize::{escape_attribute, escape_text};
pub use style::StyleSheet;
pub use value::{format_number, Listener, NodeRef, RefCallback, Value};
pub use window::{window, Window};
