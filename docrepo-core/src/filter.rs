//! Typed filters over entity fields.
//!
//! A [`Filter`] maps field names to [`Condition`]s and matches an entity when every
//! condition holds (implicit AND). Fields are addressed through [`Field`] handles that
//! carry the entity type and the field's value type, so the builder only accepts the
//! condition forms that make sense for that type:
//!
//! - equality for every [`FilterValue`] (booleans are limited to this form),
//! - set membership for every [`ListValue`],
//! - ranges and range lists for every [`Orderable`] value.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::filter::{Field, Filter};
//!
//! const NAME: Field<User, String> = Field::new("name");
//! const AGE: Field<User, i64> = Field::new("age");
//!
//! let filter = Filter::new()
//!     .one_of(NAME, ["Alice", "Bob"])
//!     .within(AGE, 18..);
//! ```

use bson::{Bson, DateTime, oid::ObjectId};
use std::{collections::BTreeMap, fmt, marker::PhantomData};

use crate::{
    error::{RepositoryError, RepositoryResult},
    range::Range,
    storable::{CREATED_AT_FIELD, UPDATED_AT_FIELD},
};

/// A value that can be compared for equality in a filter.
pub trait FilterValue: Into<Bson> {}

/// A value that can appear in a set-membership list.
pub trait ListValue: FilterValue {}

/// A value with a total order, usable as a range bound.
pub trait Orderable: ListValue {}

impl FilterValue for String {}
impl FilterValue for bool {}
impl FilterValue for i32 {}
impl FilterValue for i64 {}
impl FilterValue for f64 {}
impl FilterValue for DateTime {}
impl FilterValue for chrono::DateTime<chrono::Utc> {}
impl FilterValue for ObjectId {}

impl ListValue for String {}
impl ListValue for i32 {}
impl ListValue for i64 {}
impl ListValue for f64 {}
impl ListValue for DateTime {}
impl ListValue for chrono::DateTime<chrono::Utc> {}
impl ListValue for ObjectId {}

impl Orderable for i32 {}
impl Orderable for i64 {}
impl Orderable for f64 {}
impl Orderable for DateTime {}
impl Orderable for chrono::DateTime<chrono::Utc> {}

/// Checks that `field` names a top-level entity field.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidQuery`] for empty names, dotted paths and names
/// starting with `$`, which a document store would read as nested paths or operators.
pub fn check_field_name(field: &str) -> RepositoryResult<()> {
    if field.is_empty() || field.contains('.') || field.starts_with('$') {
        return Err(RepositoryError::InvalidQuery(format!(
            "`{}` is not a top-level field name",
            field
        )));
    }

    Ok(())
}

/// A typed handle to a field of entity `S` holding values of type `T`.
pub struct Field<S, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (S, T)>,
}

impl<S, T> Field<S, T> {
    /// Creates a handle for the field serialized under `name`.
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    /// Returns the serialized field name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<S> Field<S, DateTime> {
    /// The store-stamped creation timestamp.
    pub const fn created_at() -> Self {
        Self::new(CREATED_AT_FIELD)
    }

    /// The store-stamped update timestamp.
    pub const fn updated_at() -> Self {
        Self::new(UPDATED_AT_FIELD)
    }
}

impl<S, T> Clone for Field<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for Field<S, T> {}

impl<S, T> fmt::Debug for Field<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

/// The condition a single field must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value.
    Equals(Bson),
    /// The field equals one of the values. An empty list leaves the field unconstrained.
    OneOf(Vec<Bson>),
    /// The field lies within the range.
    Within(Range<Bson>),
    /// The field lies within at least one of the ranges. An empty list leaves the
    /// field unconstrained.
    WithinAny(Vec<Range<Bson>>),
}

/// A conjunction of per-field conditions over entity `S`.
pub struct Filter<S> {
    conditions: BTreeMap<String, Condition>,
    _marker: PhantomData<fn() -> S>,
}

impl<S> Filter<S> {
    /// Creates an empty filter, which matches every entity.
    pub fn new() -> Self {
        Self { conditions: BTreeMap::new(), _marker: PhantomData }
    }

    /// Requires `field` to equal `value`.
    pub fn eq<T: FilterValue>(self, field: Field<S, T>, value: impl Into<T>) -> Self {
        self.condition(field.name(), Condition::Equals(Into::<T>::into(value).into()))
    }

    /// Requires `field` to equal one of `values`.
    pub fn one_of<T, V>(self, field: Field<S, T>, values: impl IntoIterator<Item = V>) -> Self
    where
        T: ListValue,
        V: Into<T>,
    {
        self.condition(
            field.name(),
            Condition::OneOf(
                values
                    .into_iter()
                    .map(|value| Into::<T>::into(value).into())
                    .collect(),
            ),
        )
    }

    /// Requires `field` to lie within `range`.
    pub fn within<T: Orderable>(self, field: Field<S, T>, range: impl Into<Range<T>>) -> Self {
        self.condition(
            field.name(),
            Condition::Within(Into::<Range<T>>::into(range).map(Into::into)),
        )
    }

    /// Requires `field` to lie within at least one of `ranges`.
    pub fn within_any<T, R>(self, field: Field<S, T>, ranges: impl IntoIterator<Item = R>) -> Self
    where
        T: Orderable,
        R: Into<Range<T>>,
    {
        self.condition(
            field.name(),
            Condition::WithinAny(
                ranges
                    .into_iter()
                    .map(|range| Into::<Range<T>>::into(range).map(Into::into))
                    .collect(),
            ),
        )
    }

    /// Sets the condition for a field by name, replacing any previous one.
    ///
    /// This is the untyped entry point used for dynamically built filters. The name
    /// is checked with [`check_field_name`] when the filter is translated.
    pub fn condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(field.into(), condition);
        self
    }

    /// Returns the condition set for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    /// Iterates over the field conditions in field-name order.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions
            .iter()
            .map(|(field, condition)| (field.as_str(), condition))
    }

    /// Returns `true` if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl<S> Default for Filter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for Filter<S> {
    fn clone(&self) -> Self {
        Self { conditions: self.conditions.clone(), _marker: PhantomData }
    }
}

impl<S> PartialEq for Filter<S> {
    fn eq(&self, other: &Self) -> bool {
        self.conditions == other.conditions
    }
}

impl<S> fmt::Debug for Filter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.conditions.iter()).finish()
    }
}
