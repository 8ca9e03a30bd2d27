//! Queries and lookups.
//!
//! A [`Query`] combines an optional [`Filter`] with an optional [`Sort`]; the typed
//! constructors require at least one of them. A [`Lookup`] names which form of read a
//! caller wants, replacing shape-based guessing at the call site.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::query::{Lookup, Query};
//!
//! let page = Lookup::ByQuery(
//!     Query::filtered(Filter::new().within(AGE, 18..))
//!         .with_sort(Sort::new().by(AGE).limit(10)),
//! );
//! ```

use std::fmt;

use crate::{filter::Filter, sort::Sort, storable::Storable};

/// A filter plus ordering and page window.
pub struct Query<S> {
    pub filter: Option<Filter<S>>,
    pub sort: Option<Sort<S>>,
}

impl<S> Query<S> {
    /// Creates a query with a filter and default ordering.
    pub fn filtered(filter: Filter<S>) -> Self {
        Self { filter: Some(filter), sort: None }
    }

    /// Creates an unfiltered query with the given ordering.
    pub fn sorted(sort: Sort<S>) -> Self {
        Self { filter: None, sort: Some(sort) }
    }

    /// Sets the ordering of this query.
    pub fn with_sort(mut self, sort: Sort<S>) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the filter of this query.
    pub fn with_filter(mut self, filter: Filter<S>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// A query with neither part, reachable only from dynamic input.
    /// It matches everything with the default ordering.
    pub(crate) fn unconstrained() -> Self {
        Self { filter: None, sort: None }
    }
}

impl<S> Clone for Query<S> {
    fn clone(&self) -> Self {
        Self { filter: self.filter.clone(), sort: self.sort.clone() }
    }
}

impl<S> PartialEq for Query<S> {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter && self.sort == other.sort
    }
}

impl<S> fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .finish()
    }
}

/// The form of a read against a repository.
pub enum Lookup<S: Storable> {
    /// A single entity by identifier.
    ById(S::Key),
    /// Every entity whose identifier is listed.
    ByIds(Vec<S::Key>),
    /// Every entity matching the filter, unpaginated.
    ByFilter(Filter<S>),
    /// A sorted page of entities matching the query's filter.
    ByQuery(Query<S>),
}

impl<S: Storable> Lookup<S> {
    /// Matches every entity in the collection.
    pub fn all() -> Self {
        Lookup::ByFilter(Filter::new())
    }
}

impl<S: Storable> Clone for Lookup<S> {
    fn clone(&self) -> Self {
        match self {
            Lookup::ById(id) => Lookup::ById(id.clone()),
            Lookup::ByIds(ids) => Lookup::ByIds(ids.clone()),
            Lookup::ByFilter(filter) => Lookup::ByFilter(filter.clone()),
            Lookup::ByQuery(query) => Lookup::ByQuery(query.clone()),
        }
    }
}

impl<S: Storable> fmt::Debug for Lookup<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::ById(id) => f.debug_tuple("ById").field(id).finish(),
            Lookup::ByIds(ids) => f.debug_tuple("ByIds").field(ids).finish(),
            Lookup::ByFilter(filter) => f.debug_tuple("ByFilter").field(filter).finish(),
            Lookup::ByQuery(query) => f.debug_tuple("ByQuery").field(query).finish(),
        }
    }
}

impl<S: Storable> From<Filter<S>> for Lookup<S> {
    fn from(filter: Filter<S>) -> Self {
        Lookup::ByFilter(filter)
    }
}

impl<S: Storable> From<Query<S>> for Lookup<S> {
    fn from(query: Query<S>) -> Self {
        Lookup::ByQuery(query)
    }
}
