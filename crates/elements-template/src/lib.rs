//! Tagged-template HTML engine.
//!
//! A template is the list of literal segments of one call site plus the values
//! interpolated between them. Rendering runs four steps:
//!
//! 1. [`normalize`] rewrites the joined segments into markup with a marker at
//!    every interpolation point (memoized per call site by [`cached`]);
//! 2. [`materialize`] parses that markup into an inert fragment;
//! 3. [`bind`] walks the fragment and consumes the values at their markers;
//! 4. the bound nodes are returned as a [`Fragment`].
//!
//! ```ignore
//! let count = 5;
//! let view = html!(["<button ?disabled=", ">", "</button>"], count > 9, count)?;
//! ```

mod bind;
mod cache;
mod error;
mod materialize;
mod normalize;

pub use bind::bind;
pub use cache::{cached, with_cache, TemplateCache};
pub use elements_dom::Value;
pub use error::TemplateError;
pub use materialize::materialize;
pub use normalize::{marker, node_marker, normalize, MARKER_PREFIX};

use elements_dom::Node;

/// The result of rendering a template: a detached fragment whose children
/// are the bound nodes.
#[derive(Debug, Clone)]
pub struct Fragment {
    root: Node,
}

impl Fragment {
    /// The top-level nodes, in order.
    pub fn nodes(&self) -> Vec<Node> {
        self.root.child_nodes()
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.root.child_nodes()
    }

    /// The detached fragment node holding the nodes.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn to_html(&self) -> String {
        self.root.inner_html()
    }
}

impl From<Fragment> for Value {
    fn from(fragment: Fragment) -> Self {
        Value::Nodes(fragment.into_nodes())
    }
}

/// Render the template whose literal segments are `segments` with `values`
/// interpolated in order.
pub fn html(segments: &'static [&'static str], values: Vec<Value>) -> Result<Fragment, TemplateError> {
    let markup = cached(segments);
    let root = materialize(&markup);
    bind(&root, values)?;
    Ok(Fragment { root })
}

/// `html!(["<p>", "</p>"], value, ...)`: render a template from literal
/// segments and any values convertible into [`Value`].
#[macro_export]
macro_rules! html {
    ([$($segment:expr),* $(,)?] $(, $value:expr)* $(,)?) => {{
        const SEGMENTS: &[&str] = &[$($segment),*];
        $crate::html(SEGMENTS, ::std::vec![$($crate::Value::from($value)),*])
    }};
}
