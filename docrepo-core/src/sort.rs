//! Ordering and pagination of query results.
//!
//! A [`Sort`] may leave any of its parts unset. [`SortDefaults`] fills the gaps when a
//! query runs, producing a [`ResolvedSort`].

use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData};

use crate::{filter::Field, storable::CREATED_AT_FIELD};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Lowest first.
    Ascending,
    /// Highest first.
    Descending,
}

/// A partially specified ordering and page window over entity `S`.
///
/// # Example
///
/// ```ignore
/// use docrepo::sort::{Sort, SortOrder};
///
/// let sort = Sort::new()
///     .by(AGE)
///     .order(SortOrder::Ascending)
///     .limit(10);
/// ```
pub struct Sort<S> {
    properties: Vec<String>,
    order: Option<SortOrder>,
    offset: Option<usize>,
    limit: Option<usize>,
    _marker: PhantomData<fn() -> S>,
}

impl<S> Sort<S> {
    /// Creates a sort with every part left to the defaults.
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            order: None,
            offset: None,
            limit: None,
            _marker: PhantomData,
        }
    }

    /// Adds a field to sort by. Later fields break ties of earlier ones.
    pub fn by<T>(self, field: Field<S, T>) -> Self {
        self.by_name(field.name())
    }

    /// Adds a field to sort by, by serialized name.
    pub fn by_name(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }

    /// Sets the sort direction, applied to every sort field.
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets the number of matching entities to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the maximum number of entities to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the sort fields, most significant first.
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Returns the direction, if set.
    pub fn get_order(&self) -> Option<SortOrder> {
        self.order
    }

    /// Returns the number of entities to skip, if set.
    pub fn get_offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns the page size, if set.
    pub fn get_limit(&self) -> Option<usize> {
        self.limit
    }
}

impl<S> Default for Sort<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Sort<S> {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            order: self.order,
            offset: self.offset,
            limit: self.limit,
            _marker: PhantomData,
        }
    }
}

impl<S> PartialEq for Sort<S> {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
            && self.order == other.order
            && self.offset == other.offset
            && self.limit == other.limit
    }
}

impl<S> fmt::Debug for Sort<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sort")
            .field("properties", &self.properties)
            .field("order", &self.order)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

/// A fully specified ordering and page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSort {
    pub properties: Vec<String>,
    pub order: SortOrder,
    pub offset: usize,
    pub limit: usize,
}

/// Values used for the parts of a [`Sort`] a caller leaves unset.
///
/// Deserializes from configuration; omitted keys take the built-in defaults
/// (`createdAt`, descending, offset 0, limit 100). No upper bound is enforced on
/// `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortDefaults {
    pub property: String,
    pub order: SortOrder,
    pub offset: usize,
    pub limit: usize,
}

impl Default for SortDefaults {
    fn default() -> Self {
        Self {
            property: CREATED_AT_FIELD.to_string(),
            order: SortOrder::Descending,
            offset: 0,
            limit: 100,
        }
    }
}

impl SortDefaults {
    /// Fills every unset part of `sort` from these defaults.
    pub fn resolve<S>(&self, sort: Option<&Sort<S>>) -> ResolvedSort {
        let properties = match sort {
            Some(sort) if !sort.properties.is_empty() => sort.properties.clone(),
            _ => vec![self.property.clone()],
        };

        ResolvedSort {
            properties,
            order: sort
                .and_then(|sort| sort.order)
                .unwrap_or(self.order),
            offset: sort
                .and_then(|sort| sort.offset)
                .unwrap_or(self.offset),
            limit: sort
                .and_then(|sort| sort.limit)
                .unwrap_or(self.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item;

    const SCORE: Field<Item, i64> = Field::new("score");

    #[test]
    fn missing_sort_resolves_to_defaults() {
        assert_eq!(
            SortDefaults::default().resolve::<Item>(None),
            ResolvedSort {
                properties: vec!["createdAt".into()],
                order: SortOrder::Descending,
                offset: 0,
                limit: 100,
            }
        );
    }

    #[test]
    fn caller_values_win_over_defaults() {
        let sort = Sort::new()
            .by(SCORE)
            .order(SortOrder::Ascending)
            .limit(2);

        assert_eq!(
            SortDefaults::default().resolve(Some(&sort)),
            ResolvedSort {
                properties: vec!["score".into()],
                order: SortOrder::Ascending,
                offset: 0,
                limit: 2,
            }
        );
    }

    #[test]
    fn zero_values_are_kept() {
        let sort = Sort::<Item>::new().offset(0).limit(0);
        let defaults = SortDefaults { offset: 7, limit: 9, ..SortDefaults::default() };

        let resolved = defaults.resolve(Some(&sort));

        assert_eq!((resolved.offset, resolved.limit), (0, 0));
    }

    #[test]
    fn defaults_load_partially_from_configuration() {
        let defaults: SortDefaults = serde_json::from_value(serde_json::json!({
            "order": "ascending",
            "limit": 25,
        }))
        .unwrap();

        assert_eq!(
            defaults,
            SortDefaults {
                order: SortOrder::Ascending,
                limit: 25,
                ..SortDefaults::default()
            }
        );
    }
}
