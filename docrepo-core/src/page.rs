//! Page results of sorted queries.

use serde::{Deserialize, Serialize};

/// A window of query results, with the offset and limit it was read with.
///
/// # Example
///
/// ```ignore
/// use docrepo::page::Page;
///
/// let page = Page::new(vec!["a", "b"], 0, 2);
///
/// assert_eq!(page.next_offset(), Some(2));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Number of matching items skipped before this page.
    pub offset: usize,
    /// Maximum number of items the page could hold.
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, offset: usize, limit: usize) -> Self {
        Self { items, offset, limit }
    }

    /// The offset of the following page, or `None` if this page was not full.
    ///
    /// A full last page still yields an offset; reading it returns an empty page.
    pub fn next_offset(&self) -> Option<usize> {
        (self.limit > 0 && self.items.len() >= self.limit).then(|| self.offset + self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
