//! Storage backend abstraction for repositories.
//!
//! The [`StoreBackend`] trait is the boundary between the typed repository layer and
//! a concrete document store. Backends receive already-lowered [`Predicate`]s and
//! plain BSON payloads; everything typed stays on the repository side.
//!
//! A backend owns:
//!
//! - schema validation of payloads against the model bound to a collection,
//! - identifier assignment (`_id`) and timestamp stamping (`createdAt`, `updatedAt`),
//! - execution of predicates, ordering and page windows.
//!
//! # Examples
//!
//! ```ignore
//! use docrepo::backend::{FindOptions, StoreBackend};
//! use docrepo::predicate::Predicate;
//! use bson::doc;
//!
//! backend.bind_model("users", &schema).await?;
//! backend.insert_one("users", doc! { "name": "Alice" }).await?;
//! let everyone = backend.find("users", &Predicate::new(), FindOptions::default()).await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    error::RepositoryResult,
    predicate::Predicate,
    schema::Schema,
    sort::{ResolvedSort, SortOrder},
    translate::native_field_name,
};

/// Ordering and page window applied by [`StoreBackend::find`].
///
/// Empty `sort` keeps the store's native order. Absent `offset`/`limit` do not
/// restrict the result. Sort fields are native names (`_id`, not `id`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl From<ResolvedSort> for FindOptions {
    fn from(sort: ResolvedSort) -> Self {
        let order = sort.order;

        Self {
            sort: sort
                .properties
                .into_iter()
                .map(|property| (native_field_name(&property).to_string(), order))
                .collect(),
            offset: Some(sort.offset),
            limit: Some(sort.limit),
        }
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must support concurrent calls from multiple async tasks. How they
/// synchronize internally is up to them.
///
/// # Errors
///
/// Every operation on a collection without a bound model fails with
/// [`RepositoryError::UnboundRepository`](crate::error::RepositoryError::UnboundRepository).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Registers the schema for a collection. A collection can be bound once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for a malformed schema and `ModelAlreadyBound` if the
    /// collection already has a model.
    async fn bind_model(&self, collection: &str, schema: &Schema) -> RepositoryResult<()>;

    /// Validates and stores a payload, returning the stored record.
    ///
    /// The returned record carries the assigned `_id` and both timestamps.
    async fn insert_one(&self, collection: &str, payload: Document) -> RepositoryResult<Document>;

    /// Validates and stores several payloads, returning the records in input order.
    async fn insert_many(
        &self,
        collection: &str,
        payloads: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>>;

    /// Finds the record with the given native identifier.
    ///
    /// An identifier of the wrong type matches nothing.
    async fn find_by_id(&self, collection: &str, id: &Bson) -> RepositoryResult<Option<Document>>;

    /// Finds every record matching the predicate.
    async fn find(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>>;

    /// Releases the resources held by the backend.
    async fn close(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// Factory trait for constructing store backend instances.
///
/// # Example
///
/// ```ignore
/// use docrepo::backend::StoreBackendBuilder;
///
/// let backend = InMemoryStoreBuilder::new().build().await?;
/// ```
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns `Initialization` if the backend cannot be set up.
    async fn build(self) -> RepositoryResult<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_sorts_apply_one_order_to_every_property() {
        let options = FindOptions::from(ResolvedSort {
            properties: vec!["numberProperty".into(), "createdAt".into()],
            order: SortOrder::Ascending,
            offset: 4,
            limit: 2,
        });

        assert_eq!(
            options,
            FindOptions {
                sort: vec![
                    ("numberProperty".into(), SortOrder::Ascending),
                    ("createdAt".into(), SortOrder::Ascending),
                ],
                offset: Some(4),
                limit: Some(2),
            }
        );
    }

    #[test]
    fn sorting_by_id_uses_the_native_identifier() {
        let options = FindOptions::from(ResolvedSort {
            properties: vec!["id".into(), "numberProperty".into()],
            order: SortOrder::Descending,
            offset: 0,
            limit: 10,
        });

        assert_eq!(
            options.sort,
            vec![
                ("_id".to_string(), SortOrder::Descending),
                ("numberProperty".to_string(), SortOrder::Descending),
            ]
        );
    }
}
