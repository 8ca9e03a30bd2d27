//! Predicate translation to MongoDB query syntax.
//!
//! Field predicates become field-level operator documents. A range union on a field
//! becomes a top-level `$or`; several unions are joined under `$and`, since a query
//! document holds a single `$or` key.

use bson::{Bson, Document, doc};

use docrepo_core::{
    backend::FindOptions,
    error::RepositoryError,
    predicate::{Bounds, PredicateVisitor},
    sort::SortOrder,
};

pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn bounds(bounds: &Bounds) -> Document {
        let mut operators = Document::new();

        if let Some(start) = &bounds.greater_or_equal {
            operators.insert("$gte", start.clone());
        }
        if let Some(end) = &bounds.less_or_equal {
            operators.insert("$lte", end.clone());
        }

        operators
    }

    /// Renders the ordering of a find as a sort document. `None` keeps natural order.
    pub fn sort(options: &FindOptions) -> Option<Document> {
        if options.sort.is_empty() {
            return None;
        }

        Some(
            options
                .sort
                .iter()
                .map(|(field, order)| {
                    (
                        field.clone(),
                        Bson::Int32(match order {
                            SortOrder::Ascending => 1,
                            SortOrder::Descending => -1,
                        }),
                    )
                })
                .collect(),
        )
    }
}

impl PredicateVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RepositoryError;

    fn visit_equals(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$eq": value.clone() },
        })
    }

    fn visit_in(&mut self, field: &str, values: &[Bson]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$in": values.to_vec() },
        })
    }

    fn visit_bounds(&mut self, field: &str, bounds: &Bounds) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: Self::bounds(bounds),
        })
    }

    fn visit_any_bounds(
        &mut self,
        field: &str,
        bounds: &[Bounds],
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": bounds
                .iter()
                .map(|bounds| doc! { field: Self::bounds(bounds) })
                .collect::<Vec<_>>(),
        })
    }

    fn visit_all(&mut self, outputs: Vec<Self::Output>) -> Result<Self::Output, Self::Error> {
        let (mut alternatives, fields): (Vec<_>, Vec<_>) = outputs
            .into_iter()
            .partition(|output| output.contains_key("$or"));

        let mut query = Document::new();

        for (key, value) in fields.into_iter().flatten() {
            query.insert(key, value);
        }

        match alternatives.len() {
            0 => {}
            1 => {
                for (key, value) in alternatives.remove(0) {
                    query.insert(key, value);
                }
            }
            _ => {
                query.insert("$and", alternatives);
            }
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_core::predicate::{FieldPredicate, Predicate};

    fn translate(predicate: &Predicate) -> Document {
        MongoQueryTranslator
            .visit_predicate(predicate)
            .unwrap()
    }

    fn bounds(gte: Option<i32>, lte: Option<i32>) -> Bounds {
        Bounds {
            greater_or_equal: gte.map(Bson::Int32),
            less_or_equal: lte.map(Bson::Int32),
        }
    }

    #[test]
    fn empty_predicates_match_everything() {
        assert_eq!(translate(&Predicate::new()), doc! {});
    }

    #[test]
    fn fields_are_conjoined_in_one_document() {
        let predicate = Predicate::new()
            .with("stringProperty", FieldPredicate::In(vec!["AAA".into(), "CCC".into()]))
            .with("numberProperty", FieldPredicate::Bounds(bounds(Some(15), None)))
            .with("booleanProperty", FieldPredicate::Equals(Bson::Boolean(true)));

        assert_eq!(
            translate(&predicate),
            doc! {
                "booleanProperty": { "$eq": true },
                "numberProperty": { "$gte": 15 },
                "stringProperty": { "$in": ["AAA", "CCC"] },
            }
        );
    }

    #[test]
    fn bounds_keep_only_present_sides() {
        let predicate = Predicate::new()
            .with("numberProperty", FieldPredicate::Bounds(bounds(Some(0), Some(9))));

        assert_eq!(
            translate(&predicate),
            doc! { "numberProperty": { "$gte": 0, "$lte": 9 } }
        );
    }

    #[test]
    fn range_unions_become_top_level_alternatives() {
        let predicate = Predicate::new()
            .with("numberProperty", FieldPredicate::AnyBounds(vec![bounds(Some(0), Some(10)), bounds(Some(20), None)]))
            .with("stringProperty", FieldPredicate::Equals("AAA".into()));

        assert_eq!(
            translate(&predicate),
            doc! {
                "stringProperty": { "$eq": "AAA" },
                "$or": [
                    { "numberProperty": { "$gte": 0, "$lte": 10 } },
                    { "numberProperty": { "$gte": 20 } },
                ],
            }
        );
    }

    #[test]
    fn several_unions_are_joined_with_and() {
        let predicate = Predicate::new()
            .with("a", FieldPredicate::AnyBounds(vec![bounds(None, Some(1))]))
            .with("b", FieldPredicate::AnyBounds(vec![bounds(Some(2), None)]));

        assert_eq!(
            translate(&predicate),
            doc! {
                "$and": [
                    { "$or": [{ "a": { "$lte": 1 } }] },
                    { "$or": [{ "b": { "$gte": 2 } }] },
                ],
            }
        );
    }

    #[test]
    fn sorts_render_one_direction_per_field() {
        let options = FindOptions {
            sort: vec![
                ("numberProperty".into(), SortOrder::Ascending),
                ("createdAt".into(), SortOrder::Descending),
            ],
            ..FindOptions::default()
        };

        assert_eq!(
            MongoQueryTranslator::sort(&options),
            Some(doc! { "numberProperty": 1, "createdAt": -1 })
        );
        assert_eq!(MongoQueryTranslator::sort(&FindOptions::default()), None);
    }
}
