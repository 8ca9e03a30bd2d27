//! Store-native predicates and the visitor backends use to execute them.
//!
//! A [`Predicate`] is what a [`Filter`](crate::filter::Filter) lowers to: a map from
//! native field name to a [`FieldPredicate`], all of which must hold. It only speaks
//! in the operators every backend supports: equality, set membership, and inclusive
//! bounds (optionally OR-ed).
//!
//! Backends walk a predicate with a [`PredicateVisitor`]. The in-memory backend
//! evaluates it against records, the MongoDB backend renders it as a query document.

use bson::Bson;
use std::collections::BTreeMap;

use crate::{error::RepositoryError, storable::NATIVE_ID_FIELD};

/// Inclusive bounds on a field. At least one side is present once translated.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub greater_or_equal: Option<Bson>,
    pub less_or_equal: Option<Bson>,
}

/// The native condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPredicate {
    /// Field equals the value.
    Equals(Bson),
    /// Field equals one of the values. An empty list matches nothing.
    In(Vec<Bson>),
    /// Field lies within the bounds.
    Bounds(Bounds),
    /// Field lies within any of the bounds.
    AnyBounds(Vec<Bounds>),
}

/// A conjunction of native field predicates. An empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    fields: BTreeMap<String, FieldPredicate>,
}

impl Predicate {
    /// Creates a predicate that matches every record.
    pub fn new() -> Self {
        Self { fields: BTreeMap::new() }
    }

    /// Matches records whose native identifier is one of `ids`.
    pub fn ids_in(ids: Vec<Bson>) -> Self {
        Self::new().with(NATIVE_ID_FIELD, FieldPredicate::In(ids))
    }

    /// Adds (or replaces) the predicate on a native field.
    pub fn with(mut self, field: impl Into<String>, predicate: FieldPredicate) -> Self {
        self.fields.insert(field.into(), predicate);
        self
    }

    /// Returns the predicate on a native field, if any.
    pub fn get(&self, field: &str) -> Option<&FieldPredicate> {
        self.fields.get(field)
    }

    /// Iterates over the field predicates in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldPredicate)> {
        self.fields
            .iter()
            .map(|(field, predicate)| (field.as_str(), predicate))
    }

    /// Returns `true` if the predicate matches every record.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Walks a [`Predicate`], producing one output per field and combining them.
pub trait PredicateVisitor {
    type Output;
    type Error: Into<RepositoryError>;

    fn visit_equals(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error>;
    fn visit_in(&mut self, field: &str, values: &[Bson]) -> Result<Self::Output, Self::Error>;
    fn visit_bounds(&mut self, field: &str, bounds: &Bounds) -> Result<Self::Output, Self::Error>;
    fn visit_any_bounds(
        &mut self,
        field: &str,
        bounds: &[Bounds],
    ) -> Result<Self::Output, Self::Error>;

    /// Combines the per-field outputs into the conjunction. Receives an empty vector
    /// for an empty predicate.
    fn visit_all(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error>;

    fn visit_field(
        &mut self,
        field: &str,
        predicate: &FieldPredicate,
    ) -> Result<Self::Output, Self::Error> {
        match predicate {
            FieldPredicate::Equals(value) => self.visit_equals(field, value),
            FieldPredicate::In(values) => self.visit_in(field, values),
            FieldPredicate::Bounds(bounds) => self.visit_bounds(field, bounds),
            FieldPredicate::AnyBounds(bounds) => self.visit_any_bounds(field, bounds),
        }
    }

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        let outputs = predicate
            .fields()
            .map(|(field, field_predicate)| self.visit_field(field, field_predicate))
            .collect::<Result<Vec<_>, _>>()?;

        self.visit_all(outputs)
    }
}
