//! Predicate evaluation for in-memory record filtering.
//!
//! Matching follows the document-store conventions the MongoDB backend gets natively:
//! numbers compare across integer and float encodings, a missing field equals
//! `null`, comparisons across different types never match, and an array field
//! matches when any of its elements does.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use docrepo_core::{
    error::RepositoryError,
    predicate::{Bounds, Predicate, PredicateVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Integers keep their exact value; they are widened to f64 only when compared
/// with a double.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Reads a field of a record. A missing field reads as null.
    pub fn field(record: &'a Document, field: &str) -> Self {
        record
            .get(field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null)
    }

    /// Position of the value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Integer(_) | Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: by type rank first, then by value.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }

    /// Applies `test` to the value, or to each element if the value is an array.
    fn any(&self, mut test: impl FnMut(&Comparable<'a>) -> bool) -> bool {
        match self {
            Comparable::Array(items) => test(self) || items.iter().any(test),
            value => test(value),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Integer(a), Comparable::Integer(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Integer(a), Comparable::Number(b)) => *a as f64 == *b,
            (Comparable::Number(a), Comparable::Integer(b)) => *a == *b as f64,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Integer(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

fn within(value: &Comparable<'_>, bounds: &Bounds) -> bool {
    let lower = bounds
        .greater_or_equal
        .as_ref()
        .is_none_or(|start| {
            matches!(
                value.partial_cmp(&Comparable::from(start)),
                Some(Ordering::Greater | Ordering::Equal)
            )
        });
    let upper = bounds
        .less_or_equal
        .as_ref()
        .is_none_or(|end| {
            matches!(
                value.partial_cmp(&Comparable::from(end)),
                Some(Ordering::Less | Ordering::Equal)
            )
        });

    lower && upper
}

/// Evaluates a [`Predicate`] against a single record.
pub(crate) struct RecordEvaluator<'a> {
    record: &'a Document,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Document) -> Self {
        Self { record }
    }

    pub fn evaluate(&mut self, predicate: &Predicate) -> Result<bool, RepositoryError> {
        self.visit_predicate(predicate)
    }
}

impl<'a> PredicateVisitor for RecordEvaluator<'a> {
    type Output = bool;
    type Error = RepositoryError;

    fn visit_equals(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        Ok(Comparable::field(self.record, field).any(|item| *item == expected))
    }

    fn visit_in(&mut self, field: &str, values: &[Bson]) -> Result<Self::Output, Self::Error> {
        let expected = values
            .iter()
            .map(Comparable::from)
            .collect::<Vec<_>>();

        Ok(Comparable::field(self.record, field).any(|item| expected.contains(item)))
    }

    fn visit_bounds(&mut self, field: &str, bounds: &Bounds) -> Result<Self::Output, Self::Error> {
        Ok(Comparable::field(self.record, field).any(|item| within(item, bounds)))
    }

    fn visit_any_bounds(
        &mut self,
        field: &str,
        bounds: &[Bounds],
    ) -> Result<Self::Output, Self::Error> {
        let value = Comparable::field(self.record, field);

        Ok(bounds
            .iter()
            .any(|bounds| value.any(|item| within(item, bounds))))
    }

    fn visit_all(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        Ok(outputs.into_iter().all(|matched| matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docrepo_core::predicate::FieldPredicate;

    fn bounds(gte: Option<Bson>, lte: Option<Bson>) -> Bounds {
        Bounds { greater_or_equal: gte, less_or_equal: lte }
    }

    fn matches(record: &Document, predicate: &Predicate) -> bool {
        RecordEvaluator::new(record)
            .evaluate(predicate)
            .unwrap()
    }

    #[test]
    fn empty_predicates_match_everything() {
        assert!(matches(&doc! {}, &Predicate::new()));
    }

    #[test]
    fn numbers_compare_across_encodings() {
        let record = doc! { "numberProperty": 20_i32 };

        assert!(matches(&record, &Predicate::new().with("numberProperty", FieldPredicate::Equals(Bson::Int64(20)))));
        assert!(matches(&record, &Predicate::new().with("numberProperty", FieldPredicate::Equals(Bson::Double(20.0)))));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let above = (1_i64 << 53) + 1;
        let record = doc! { "numberProperty": above };

        assert!(matches(&record, &Predicate::new().with("numberProperty", FieldPredicate::Equals(Bson::Int64(above)))));
        assert!(!matches(&record, &Predicate::new().with("numberProperty", FieldPredicate::Equals(Bson::Int64(above - 1)))));
        assert!(!matches(
            &record,
            &Predicate::new().with(
                "numberProperty",
                FieldPredicate::Bounds(bounds(Some(Bson::Int64(above + 1)), None)),
            )
        ));
    }

    #[test]
    fn bounds_are_inclusive() {
        let record = doc! { "numberProperty": 10 };

        for (gte, lte, expected) in [
            (Some(10), None, true),
            (None, Some(10), true),
            (Some(11), None, false),
            (Some(0), Some(9), false),
        ] {
            let predicate = Predicate::new().with(
                "numberProperty",
                FieldPredicate::Bounds(bounds(gte.map(Bson::Int32), lte.map(Bson::Int32))),
            );

            assert_eq!(matches(&record, &predicate), expected, "{:?}..{:?}", gte, lte);
        }
    }

    #[test]
    fn any_bounds_is_a_union() {
        let predicate = Predicate::new().with(
            "numberProperty",
            FieldPredicate::AnyBounds(vec![
                bounds(Some(Bson::Int32(0)), Some(Bson::Int32(10))),
                bounds(Some(Bson::Int32(20)), Some(Bson::Int32(30))),
            ]),
        );

        assert!(matches(&doc! { "numberProperty": 5 }, &predicate));
        assert!(matches(&doc! { "numberProperty": 30 }, &predicate));
        assert!(!matches(&doc! { "numberProperty": 15 }, &predicate));
    }

    #[test]
    fn mismatched_types_never_match() {
        let predicate = Predicate::new().with(
            "numberProperty",
            FieldPredicate::Bounds(bounds(Some(Bson::Int32(0)), None)),
        );

        assert!(!matches(&doc! { "numberProperty": "7" }, &predicate));
        assert!(!matches(&doc! {}, &predicate));
    }

    #[test]
    fn missing_fields_equal_null() {
        let predicate = Predicate::new().with("flag", FieldPredicate::Equals(Bson::Null));

        assert!(matches(&doc! {}, &predicate));
        assert!(!matches(&doc! { "flag": true }, &predicate));
    }

    #[test]
    fn array_fields_match_on_any_element() {
        let record = doc! { "tags": ["a", "b"] };

        assert!(matches(&record, &Predicate::new().with("tags", FieldPredicate::Equals("b".into()))));
        assert!(matches(&record, &Predicate::new().with("tags", FieldPredicate::In(vec!["z".into(), "a".into()]))));
        assert!(!matches(&record, &Predicate::new().with("tags", FieldPredicate::In(vec![]))));
    }

    #[test]
    fn sort_order_ranks_types_before_values() {
        let null = Bson::Null;
        let one = Bson::Int32(1);
        let two = Bson::Double(2.0);
        let text = Bson::String("a".into());

        assert_eq!(Comparable::from(&null).sort_cmp(&Comparable::from(&one)), Ordering::Less);
        assert_eq!(Comparable::from(&two).sort_cmp(&Comparable::from(&one)), Ordering::Greater);
        assert_eq!(Comparable::from(&text).sort_cmp(&Comparable::from(&two)), Ordering::Greater);
    }
}
