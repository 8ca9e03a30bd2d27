//! Lowering of typed filters into store-native predicates.

use bson::{Bson, oid::ObjectId};
use tracing::warn;

use crate::{
    error::{RepositoryError, RepositoryResult},
    filter::{Condition, Filter, check_field_name},
    predicate::{Bounds, FieldPredicate, Predicate},
    range::Range,
    storable::{ID_FIELD, NATIVE_ID_FIELD},
};

/// Maps a public field name to the name the store uses for it.
pub fn native_field_name(field: &str) -> &str {
    if field == ID_FIELD { NATIVE_ID_FIELD } else { field }
}

/// Identifier values given as hex strings are compared as object ids.
fn native_value(field: &str, value: &Bson) -> Bson {
    match value {
        Bson::String(hex) if field == NATIVE_ID_FIELD => ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}

/// Lowers a range to inclusive bounds.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidQuery`] if the range has neither bound.
pub fn translate_range(field: &str, range: &Range<Bson>) -> RepositoryResult<Bounds> {
    if !range.is_bounded() {
        return Err(RepositoryError::InvalidQuery(format!(
            "range on `{}` has neither start nor end",
            field
        )));
    }

    Ok(Bounds {
        greater_or_equal: range
            .start
            .as_ref()
            .map(|start| native_value(field, start)),
        less_or_equal: range
            .end
            .as_ref()
            .map(|end| native_value(field, end)),
    })
}

/// Lowers a set-membership list. An empty list leaves the field unconstrained.
pub fn translate_values(field: &str, values: &[Bson]) -> Option<FieldPredicate> {
    if values.is_empty() {
        warn!(field, "empty value list leaves the field unconstrained");
        return None;
    }

    Some(FieldPredicate::In(
        values
            .iter()
            .map(|value| native_value(field, value))
            .collect(),
    ))
}

/// Lowers a list of ranges to their union. An empty list leaves the field
/// unconstrained.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidQuery`] if any range has neither bound.
pub fn translate_ranges(
    field: &str,
    ranges: &[Range<Bson>],
) -> RepositoryResult<Option<FieldPredicate>> {
    if ranges.is_empty() {
        warn!(field, "empty range list leaves the field unconstrained");
        return Ok(None);
    }

    Ok(Some(FieldPredicate::AnyBounds(
        ranges
            .iter()
            .map(|range| translate_range(field, range))
            .collect::<RepositoryResult<Vec<_>>>()?,
    )))
}

/// Lowers a single field condition. `None` means the field is unconstrained.
pub fn translate_condition(
    field: &str,
    condition: &Condition,
) -> RepositoryResult<Option<FieldPredicate>> {
    Ok(match condition {
        Condition::Equals(value) => Some(FieldPredicate::Equals(native_value(field, value))),
        Condition::OneOf(values) => translate_values(field, values),
        Condition::Within(range) => Some(FieldPredicate::Bounds(translate_range(field, range)?)),
        Condition::WithinAny(ranges) => translate_ranges(field, ranges)?,
    })
}

/// Lowers a filter to the conjunction of its field predicates.
///
/// An absent or empty filter lowers to the empty predicate, which matches every record.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidQuery`] if a range has neither bound or a field
/// name is not a top-level field.
pub fn translate_filter<S>(filter: Option<&Filter<S>>) -> RepositoryResult<Predicate> {
    let Some(filter) = filter else {
        return Ok(Predicate::new());
    };

    filter
        .conditions()
        .try_fold(Predicate::new(), |predicate, (field, condition)| {
            check_field_name(field)?;
            let field = native_field_name(field);

            Ok(match translate_condition(field, condition)? {
                Some(field_predicate) => predicate.with(field, field_predicate),
                None => predicate,
            })
        })
}
