//! Classification of dynamic query values.
//!
//! Typed callers build a [`Lookup`] directly. Callers holding an untyped value (a
//! request body, a message payload) hand it to [`classify`], which decides which
//! lookup the value describes:
//!
//! 1. absent or `null` matches every entity,
//! 2. an array is a list of identifiers,
//! 3. any other non-document value is a single identifier,
//! 4. a document with `filter` and/or `sort` keys is a query,
//! 5. any other document is a filter.
//!
//! Entity fields named `filter` or `sort` cannot be queried through this path: a
//! document mixing those keys with other keys is rejected as ambiguous.
//!
//! Untyped input carries no dates or object ids of its own (JSON has neither), so
//! [`cast_lookup`] converts filter values to the kinds the bound [`Schema`] declares.

use bson::{Bson, DateTime, Document, oid::ObjectId, ser::serialize_to_bson};
use serde_json::Value;

use crate::{
    error::{RepositoryError, RepositoryResult},
    filter::{Condition, Filter, check_field_name},
    key::EntityKey,
    query::{Lookup, Query},
    range::{Range, is_range, range_from_document},
    schema::{FieldKind, Schema},
    sort::{Sort, SortOrder},
    storable::{CREATED_AT_FIELD, Storable, UPDATED_AT_FIELD},
};

/// Key selecting the filter part of a dynamic query.
pub const QUERY_FILTER: &str = "filter";
/// Key selecting the sort part of a dynamic query.
pub const QUERY_SORT: &str = "sort";

/// Decides which lookup a dynamic value describes.
///
/// # Errors
///
/// Returns [`RepositoryError::AmbiguousQueryShape`] if the value does not fit exactly
/// one shape, or [`RepositoryError::InvalidQuery`] if a filter or sort inside it is
/// malformed.
pub fn classify<S: Storable>(input: Option<&Bson>) -> RepositoryResult<Lookup<S>> {
    match input {
        None | Some(Bson::Null) => Ok(Lookup::all()),
        Some(Bson::Array(values)) => Ok(Lookup::ByIds(
            values
                .iter()
                .map(key_from_input::<S>)
                .collect::<RepositoryResult<Vec<_>>>()?,
        )),
        Some(Bson::Document(document)) if is_query(document) => {
            Ok(Lookup::ByQuery(parse_query(document)?))
        }
        Some(Bson::Document(document)) => Ok(Lookup::ByFilter(parse_filter(document)?)),
        Some(value) => Ok(Lookup::ById(key_from_input::<S>(value)?)),
    }
}

/// Same as [`classify`], for JSON input.
pub fn classify_json<S: Storable>(input: &Value) -> RepositoryResult<Lookup<S>> {
    classify(Some(&serialize_to_bson(input)?))
}

fn key_from_input<S: Storable>(value: &Bson) -> RepositoryResult<S::Key> {
    S::Key::from_native(value).map_err(|e| {
        RepositoryError::AmbiguousQueryShape(format!("value is not an identifier: {}", e))
    })
}

fn is_query(document: &Document) -> bool {
    document.contains_key(QUERY_FILTER) || document.contains_key(QUERY_SORT)
}

fn parse_query<S>(document: &Document) -> RepositoryResult<Query<S>> {
    if let Some(key) = document
        .keys()
        .find(|key| *key != QUERY_FILTER && *key != QUERY_SORT)
    {
        return Err(RepositoryError::AmbiguousQueryShape(format!(
            "`{}` next to `filter`/`sort`: entity fields cannot be named `filter` or `sort`",
            key
        )));
    }

    let mut query = Query::unconstrained();

    match document.get(QUERY_FILTER) {
        None | Some(Bson::Null) => {}
        Some(Bson::Document(filter)) => query.filter = Some(parse_filter(filter)?),
        Some(_) => {
            return Err(RepositoryError::AmbiguousQueryShape("`filter` must be a document".into()));
        }
    }

    match document.get(QUERY_SORT) {
        None | Some(Bson::Null) => {}
        Some(Bson::Document(sort)) => query.sort = Some(parse_sort(sort)?),
        Some(_) => {
            return Err(RepositoryError::AmbiguousQueryShape("`sort` must be a document".into()));
        }
    }

    Ok(query)
}

/// Parses a dynamic filter document, one condition per entry.
pub fn parse_filter<S>(document: &Document) -> RepositoryResult<Filter<S>> {
    document
        .iter()
        .try_fold(Filter::new(), |filter, (field, value)| {
            check_field_name(field)?;
            Ok(filter.condition(field.as_str(), parse_condition(field, value)?))
        })
}

/// Parses the condition for one field of a dynamic filter.
///
/// An array whose first element is a range must hold only ranges; an array whose
/// first element is a scalar must hold no ranges.
pub fn parse_condition(field: &str, value: &Bson) -> RepositoryResult<Condition> {
    match value {
        Bson::Array(values) => match values.first() {
            None => Ok(Condition::OneOf(Vec::new())),
            Some(first) if is_range(first) => Ok(Condition::WithinAny(
                values
                    .iter()
                    .map(|value| match value {
                        Bson::Document(document) if is_range(value) => {
                            Ok(range_from_document(document))
                        }
                        _ => Err(mixed_array(field)),
                    })
                    .collect::<RepositoryResult<Vec<Range<Bson>>>>()?,
            )),
            Some(_) if values.iter().any(is_range) => Err(mixed_array(field)),
            Some(_) => Ok(Condition::OneOf(values.clone())),
        },
        Bson::Document(document) if is_range(value) => {
            Ok(Condition::Within(range_from_document(document)))
        }
        Bson::Document(_) => Err(RepositoryError::InvalidQuery(format!(
            "`{}`: embedded documents can only be ranges with `start`/`end`",
            field
        ))),
        _ => Ok(Condition::Equals(value.clone())),
    }
}

fn mixed_array(field: &str) -> RepositoryError {
    RepositoryError::InvalidQuery(format!("`{}` mixes ranges and plain values", field))
}

/// Parses a dynamic sort document with `property`, `order`, `offset` and `limit`.
pub fn parse_sort<S>(document: &Document) -> RepositoryResult<Sort<S>> {
    let mut sort = Sort::new();

    for (key, value) in document {
        sort = match (key.as_str(), value) {
            (_, Bson::Null) => sort,
            ("property", Bson::String(property)) => {
                check_field_name(property)?;
                sort.by_name(property.as_str())
            }
            ("property", Bson::Array(properties)) => {
                properties
                    .iter()
                    .try_fold(sort, |sort, property| match property {
                        Bson::String(property) => {
                            check_field_name(property)?;
                            Ok(sort.by_name(property.as_str()))
                        }
                        _ => Err(RepositoryError::InvalidQuery(
                            "sort properties must be strings".into(),
                        )),
                    })?
            }
            ("order", Bson::String(order)) => sort.order(parse_order(order)?),
            ("offset", value) => sort.offset(parse_count("offset", value)?),
            ("limit", value) => sort.limit(parse_count("limit", value)?),
            (key, _) => {
                return Err(RepositoryError::InvalidQuery(format!(
                    "unexpected sort key or value for `{}`",
                    key
                )));
            }
        };
    }

    Ok(sort)
}

/// Converts the filter values of a classified lookup to the kinds `schema` declares.
///
/// Date fields (including the store timestamps) accept RFC 3339 strings and
/// millisecond counts; object id fields accept hex strings. Other values pass through
/// unchanged.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidQuery`] if a string cannot be read as the
/// declared kind.
pub fn cast_lookup<S: Storable>(lookup: Lookup<S>, schema: &Schema) -> RepositoryResult<Lookup<S>> {
    Ok(match lookup {
        Lookup::ByFilter(filter) => Lookup::ByFilter(cast_filter(&filter, schema)?),
        Lookup::ByQuery(mut query) => {
            query.filter = query
                .filter
                .map(|filter| cast_filter(&filter, schema))
                .transpose()?;
            Lookup::ByQuery(query)
        }
        lookup => lookup,
    })
}

fn cast_filter<S>(filter: &Filter<S>, schema: &Schema) -> RepositoryResult<Filter<S>> {
    filter
        .conditions()
        .try_fold(Filter::new(), |cast, (field, condition)| {
            let condition = match declared_kind(schema, field) {
                Some(kind @ (FieldKind::Date | FieldKind::ObjectId)) => {
                    cast_condition(field, kind, condition)?
                }
                _ => condition.clone(),
            };

            Ok(cast.condition(field, condition))
        })
}

fn declared_kind(schema: &Schema, field: &str) -> Option<FieldKind> {
    match field {
        CREATED_AT_FIELD | UPDATED_AT_FIELD => Some(FieldKind::Date),
        _ => schema.field(field).map(|declared| declared.kind),
    }
}

fn cast_condition(field: &str, kind: FieldKind, condition: &Condition) -> RepositoryResult<Condition> {
    let cast_range = |range: &Range<Bson>| -> RepositoryResult<Range<Bson>> {
        Ok(Range {
            start: range
                .start
                .as_ref()
                .map(|start| cast_value(field, kind, start))
                .transpose()?,
            end: range
                .end
                .as_ref()
                .map(|end| cast_value(field, kind, end))
                .transpose()?,
        })
    };

    Ok(match condition {
        Condition::Equals(value) => Condition::Equals(cast_value(field, kind, value)?),
        Condition::OneOf(values) => Condition::OneOf(
            values
                .iter()
                .map(|value| cast_value(field, kind, value))
                .collect::<RepositoryResult<_>>()?,
        ),
        Condition::Within(range) => Condition::Within(cast_range(range)?),
        Condition::WithinAny(ranges) => Condition::WithinAny(
            ranges
                .iter()
                .map(cast_range)
                .collect::<RepositoryResult<_>>()?,
        ),
    })
}

fn cast_value(field: &str, kind: FieldKind, value: &Bson) -> RepositoryResult<Bson> {
    match (kind, value) {
        (FieldKind::Date, Bson::String(text)) => DateTime::parse_rfc3339_str(text)
            .map(Bson::DateTime)
            .map_err(|e| {
                RepositoryError::InvalidQuery(format!("`{}` expects a date: {}", field, e))
            }),
        (FieldKind::Date, Bson::Int32(millis)) => {
            Ok(Bson::DateTime(DateTime::from_millis(i64::from(*millis))))
        }
        (FieldKind::Date, Bson::Int64(millis)) => Ok(Bson::DateTime(DateTime::from_millis(*millis))),
        (FieldKind::ObjectId, Bson::String(hex)) => ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .map_err(|e| {
                RepositoryError::InvalidQuery(format!("`{}` expects an object id: {}", field, e))
            }),
        _ => Ok(value.clone()),
    }
}

fn parse_order(order: &str) -> RepositoryResult<SortOrder> {
    match order {
        "ascending" => Ok(SortOrder::Ascending),
        "descending" => Ok(SortOrder::Descending),
        other => Err(RepositoryError::InvalidQuery(format!(
            "sort order must be `ascending` or `descending`, found `{}`",
            other
        ))),
    }
}

fn parse_count(key: &str, value: &Bson) -> RepositoryResult<usize> {
    let count = match value {
        Bson::Int32(count) => i64::from(*count),
        Bson::Int64(count) => *count,
        Bson::Double(count) if count.fract() == 0.0 => *count as i64,
        _ => -1,
    };

    usize::try_from(count).map_err(|_| {
        RepositoryError::InvalidQuery(format!("sort `{}` must be a non-negative integer", key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, doc, oid::ObjectId};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Item {
        id: String,
        created_at: DateTime,
        updated_at: DateTime,
        number_property: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ItemProperties {
        number_property: i64,
    }

    impl Storable for Item {
        type Key = String;
        type Properties = ItemProperties;

        fn id(&self) -> &String {
            &self.id
        }
    }

    fn classify_doc(document: Document) -> RepositoryResult<Lookup<Item>> {
        classify(Some(&Bson::Document(document)))
    }

    #[test]
    fn absent_input_matches_everything() {
        assert!(matches!(classify::<Item>(None), Ok(Lookup::ByFilter(f)) if f.is_empty()));
        assert!(matches!(classify::<Item>(Some(&Bson::Null)), Ok(Lookup::ByFilter(f)) if f.is_empty()));
    }

    #[test]
    fn scalars_and_arrays_are_identifiers() {
        let oid = ObjectId::new();

        assert!(matches!(
            classify::<Item>(Some(&Bson::String("abc".into()))),
            Ok(Lookup::ById(id)) if id == "abc"
        ));
        assert!(matches!(
            classify::<Item>(Some(&Bson::Array(vec![Bson::ObjectId(oid), "invalidId".into()]))),
            Ok(Lookup::ByIds(ids)) if ids == vec![oid.to_hex(), "invalidId".to_string()]
        ));
        assert!(matches!(
            classify::<Item>(Some(&Bson::Int32(4))),
            Err(RepositoryError::AmbiguousQueryShape(_))
        ));
    }

    #[test]
    fn filter_and_sort_keys_make_a_query() {
        let lookup = classify_doc(doc! {
            "filter": { "numberProperty": { "start": 15 } },
            "sort": { "limit": 2, "offset": 0, "order": "ascending", "property": "numberProperty" },
        })
        .unwrap();

        let Lookup::ByQuery(query) = lookup else { panic!("expected a query") };
        let filter = query.filter.unwrap();
        let sort = query.sort.unwrap();

        assert_eq!(
            filter.get("numberProperty"),
            Some(&Condition::Within(Range::starting_at(Bson::Int32(15))))
        );
        assert_eq!(sort.properties(), ["numberProperty".to_string()]);
        assert_eq!(sort.get_order(), Some(SortOrder::Ascending));
        assert_eq!((sort.get_offset(), sort.get_limit()), (Some(0), Some(2)));
    }

    #[test]
    fn queries_with_null_parts_are_unconstrained() {
        let Lookup::ByQuery(query) = classify_doc(doc! { "filter": Bson::Null }).unwrap() else {
            panic!("expected a query")
        };

        assert!(query.filter.is_none() && query.sort.is_none());
    }

    #[test]
    fn entity_fields_named_like_query_keys_are_ambiguous() {
        assert!(matches!(
            classify_doc(doc! { "filter": {}, "numberProperty": 3 }),
            Err(RepositoryError::AmbiguousQueryShape(_))
        ));
        assert!(matches!(
            classify_doc(doc! { "sort": "name" }),
            Err(RepositoryError::AmbiguousQueryShape(_))
        ));
    }

    #[test]
    fn other_documents_are_filters() {
        let Lookup::ByFilter(filter) = classify_doc(doc! {
            "numberProperty": [10, 30],
            "stringProperty": "AAA",
            "dateProperty": [{ "start": 0, "end": 10 }, { "start": 20 }],
        })
        .unwrap() else {
            panic!("expected a filter")
        };

        assert_eq!(
            filter.get("numberProperty"),
            Some(&Condition::OneOf(vec![Bson::Int32(10), Bson::Int32(30)]))
        );
        assert_eq!(filter.get("stringProperty"), Some(&Condition::Equals("AAA".into())));
        assert_eq!(
            filter.get("dateProperty"),
            Some(&Condition::WithinAny(vec![
                Range::between(Bson::Int32(0), Bson::Int32(10)),
                Range::starting_at(Bson::Int32(20)),
            ]))
        );
    }

    #[test]
    fn mixed_arrays_are_rejected() {
        for value in [
            bson::bson!([{ "start": 1 }, 5]),
            bson::bson!([5, { "end": 1 }]),
        ] {
            assert!(matches!(
                parse_condition("numberProperty", &value),
                Err(RepositoryError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn embedded_documents_are_not_filters() {
        assert!(matches!(
            classify_doc(doc! { "numberProperty": { "gte": 3 } }),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn malformed_sorts_are_rejected() {
        for sort in [
            doc! { "order": "sideways" },
            doc! { "limit": -1 },
            doc! { "property": 3 },
            doc! { "direction": "ascending" },
        ] {
            assert!(parse_sort::<Item>(&sort).is_err(), "{:?}", sort);
        }
    }

    #[test]
    fn operator_and_path_keys_are_rejected() {
        for filter in [
            doc! { "$where": "sleep(100)" },
            doc! { "a.b": 1 },
            doc! { "numberProperty": 1, "$or": [] },
        ] {
            assert!(
                matches!(classify_doc(filter.clone()), Err(RepositoryError::InvalidQuery(_))),
                "{:?}",
                filter
            );
        }

        assert!(matches!(
            parse_sort::<Item>(&doc! { "property": ["numberProperty", "$natural"] }),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn multi_property_sorts_keep_their_order() {
        let sort = parse_sort::<Item>(&doc! {
            "property": ["booleanProperty", "numberProperty"],
            "order": "descending",
        })
        .unwrap();

        assert_eq!(
            sort.properties(),
            ["booleanProperty".to_string(), "numberProperty".to_string()]
        );
        assert_eq!(sort.get_order(), Some(SortOrder::Descending));
    }

    #[test]
    fn declared_dates_and_ids_are_cast() {
        let oid = ObjectId::new();
        let schema = Schema::new()
            .required("dateProperty", FieldKind::Date)
            .optional("ownerId", FieldKind::ObjectId)
            .optional("stringProperty", FieldKind::String);

        let lookup = classify_json::<Item>(&serde_json::json!({
            "dateProperty": [{ "start": "1970-01-01T00:00:15Z" }, { "end": 5000 }],
            "ownerId": oid.to_hex(),
            "stringProperty": "1970-01-01T00:00:15Z",
            "createdAt": { "end": "1970-01-01T00:00:01Z" },
        }))
        .unwrap();

        let Lookup::ByFilter(filter) = cast_lookup(lookup, &schema).unwrap() else {
            panic!("expected a filter")
        };

        assert_eq!(
            filter.get("dateProperty"),
            Some(&Condition::WithinAny(vec![
                Range::starting_at(Bson::DateTime(DateTime::from_millis(15_000))),
                Range::ending_at(Bson::DateTime(DateTime::from_millis(5_000))),
            ]))
        );
        assert_eq!(filter.get("ownerId"), Some(&Condition::Equals(Bson::ObjectId(oid))));
        assert_eq!(
            filter.get("stringProperty"),
            Some(&Condition::Equals("1970-01-01T00:00:15Z".into()))
        );
        assert_eq!(
            filter.get("createdAt"),
            Some(&Condition::Within(Range::ending_at(Bson::DateTime(DateTime::from_millis(1_000)))))
        );
    }

    #[test]
    fn unreadable_dates_are_invalid_queries() {
        let schema = Schema::new().required("dateProperty", FieldKind::Date);
        let lookup = classify_doc(doc! {
            "filter": { "dateProperty": "yesterday" },
        })
        .unwrap();

        assert!(matches!(
            cast_lookup(lookup, &schema),
            Err(RepositoryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn json_input_is_accepted() {
        let lookup = classify_json::<Item>(&serde_json::json!({ "numberProperty": 20 })).unwrap();

        let Lookup::ByFilter(filter) = lookup else { panic!("expected a filter") };
        assert!(matches!(filter.get("numberProperty"), Some(Condition::Equals(_))));
    }
}
