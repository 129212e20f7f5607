use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A constructable stylesheet that can be adopted by a document or shadow root.
///
/// Equality is identity: two sheets with the same text are still different
/// sheets, so a root can tell whether it already adopted a given object.
#[derive(Clone)]
pub struct StyleSheet(Rc<RefCell<String>>);

impl StyleSheet {
    pub fn new(css: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(css.into())))
    }

    /// Replace the sheet's rules in place. Every root that adopted it sees the change.
    pub fn replace_sync(&self, css: impl Into<String>) {
        *self.0.borrow_mut() = css.into();
    }

    pub fn css_text(&self) -> String {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &StyleSheet) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for StyleSheet {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for StyleSheet {}

impl fmt::Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StyleSheet").field(&self.0.borrow().len()).finish()
    }
}
