use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::normalize::normalize;

/// Normalized markup memoized per template, keyed by the static segment
/// sequence of the call site. Entries are never evicted.
#[derive(Default)]
pub struct TemplateCache {
    entries: RefCell<HashMap<&'static [&'static str], Rc<str>>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl TemplateCache {
    pub fn get_or_normalize(&self, segments: &'static [&'static str]) -> Rc<str> {
        if let Some(markup) = self.entries.borrow().get(segments) {
            self.hits.set(self.hits.get() + 1);
            return markup.clone();
        }
        self.misses.set(self.misses.get() + 1);
        let markup: Rc<str> = normalize(segments).into();
        self.entries.borrow_mut().insert(segments, markup.clone());
        markup
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

thread_local! {
    static CACHE: TemplateCache = TemplateCache::default();
}

/// Normalized markup for `segments`, from the thread's template cache.
pub fn cached(segments: &'static [&'static str]) -> Rc<str> {
    CACHE.with(|cache| cache.get_or_normalize(segments))
}

/// Inspect the thread's template cache.
pub fn with_cache<R>(f: impl FnOnce(&TemplateCache) -> R) -> R {
    CACHE.with(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lookup_is_a_hit() {
        static SEGMENTS: &[&str] = &["<b>", "</b>"];
        let cache = TemplateCache::default();
        let first = cache.get_or_normalize(SEGMENTS);
        let second = cache.get_or_normalize(SEGMENTS);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(&*first, "<b><!--δ0--></b>");
    }

    #[test]
    fn test_equal_segments_share_an_entry() {
        let cache = TemplateCache::default();
        cache.get_or_normalize(&["<i>", "</i>"]);
        cache.get_or_normalize(&["<i>", "</i>"]);
        cache.get_or_normalize(&["<u>", "</u>"]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_thread_cache() {
        static SEGMENTS: &[&str] = &["<em>", "</em>"];
        let before = with_cache(|cache| cache.misses());
        cached(SEGMENTS);
        cached(SEGMENTS);
        with_cache(|cache| {
            assert_eq!(cache.misses(), before + 1);
            assert!(cache.hits() >= 1);
        });
    }
}
