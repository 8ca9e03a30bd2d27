//! Typed repositories over a single collection.
//!
//! A [`Repository`] turns typed calls (`create`, `get`) into backend operations:
//! payloads are serialized and checked for store-managed attributes, filters are
//! lowered to native predicates, sorts are resolved against the repository's
//! [`SortDefaults`], and records coming back are rebuilt into entities.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::prelude::*;
//!
//! let users = session
//!     .repository::<User>("users", schema)
//!     .bind()
//!     .await?;
//!
//! let alice = users.create(UserProperties { name: "Alice".into(), age: 30 }).await?;
//! let adults = users.get_by_filter(&Filter::new().within(AGE, 18..)).await?;
//! ```

use bson::{Bson, Document};
use serde_json::Value;
use std::{
    fmt,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::debug;

use crate::{
    backend::{FindOptions, StoreBackend},
    error::{RepositoryError, RepositoryResult},
    filter::{Filter, check_field_name},
    key::EntityKey,
    page::Page,
    predicate::Predicate,
    query::{Lookup, Query},
    schema::Schema,
    shape::{cast_lookup, classify, classify_json},
    sort::SortDefaults,
    storable::{Storable, properties_to_payload, record_to_entity, records_to_entities},
    translate::translate_filter,
};

/// The result of [`Repository::get`], one variant per [`Lookup`] form.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<S> {
    One(Option<S>),
    Many(Vec<S>),
    Page(Page<S>),
}

impl<S> Fetched<S> {
    /// Flattens any result into the entities it holds.
    pub fn into_vec(self) -> Vec<S> {
        match self {
            Fetched::One(entity) => entity.into_iter().collect(),
            Fetched::Many(entities) => entities,
            Fetched::Page(page) => page.items,
        }
    }
}

/// Two-phase construction of a [`Repository`]: configure, then bind.
pub struct RepositoryBuilder<S, B: StoreBackend> {
    collection: String,
    schema: Schema,
    sort_defaults: SortDefaults,
    backend: Arc<B>,
    open: Arc<AtomicBool>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Storable, B: StoreBackend> RepositoryBuilder<S, B> {
    pub(crate) fn new(
        collection: String,
        schema: Schema,
        backend: Arc<B>,
        open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            collection,
            schema,
            sort_defaults: SortDefaults::default(),
            backend,
            open,
            _marker: PhantomData,
        }
    }

    /// Overrides the ordering and page window used when a query leaves them unset.
    pub fn sort_defaults(mut self, sort_defaults: SortDefaults) -> Self {
        self.sort_defaults = sort_defaults;
        self
    }

    /// Registers the schema with the backend and returns the bound repository.
    ///
    /// # Errors
    ///
    /// Returns `UnboundRepository` if the session is closed, `InvalidSchema` for a
    /// malformed schema, and `ModelAlreadyBound` if the collection is already bound.
    pub async fn bind(self) -> RepositoryResult<Repository<S, B>> {
        if !self.open.load(Ordering::Acquire) {
            return Err(RepositoryError::UnboundRepository(self.collection));
        }

        self.backend
            .bind_model(&self.collection, &self.schema)
            .await?;

        debug!(collection = %self.collection, "bound repository");

        Ok(Repository {
            collection: self.collection,
            schema: self.schema,
            sort_defaults: self.sort_defaults,
            backend: self.backend,
            open: self.open,
            _marker: PhantomData,
        })
    }
}

/// Typed create/read access to one collection.
///
/// Cloning is cheap; clones share the backend.
pub struct Repository<S, B: StoreBackend> {
    collection: String,
    schema: Schema,
    sort_defaults: SortDefaults,
    backend: Arc<B>,
    open: Arc<AtomicBool>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Storable, B: StoreBackend> Repository<S, B> {
    /// Returns the name of the bound collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the schema the collection was bound with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sort_defaults(&self) -> &SortDefaults {
        &self.sort_defaults
    }

    fn ensure_open(&self) -> RepositoryResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RepositoryError::UnboundRepository(self.collection.clone()))
        }
    }

    /// Persists a new entity.
    ///
    /// The store assigns the identifier and both timestamps.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the payload carries a store-managed attribute or the
    /// backend rejects it against the bound schema.
    pub async fn create(&self, properties: S::Properties) -> RepositoryResult<S> {
        self.ensure_open()?;

        let payload = properties_to_payload(&properties)?;
        debug!(collection = %self.collection, "creating entity");

        let record = self
            .backend
            .insert_one(&self.collection, payload)
            .await?;

        record_to_entity(record)
    }

    /// Persists several new entities, returned in input order.
    ///
    /// An empty input returns an empty vector without reaching the store.
    pub async fn create_many(&self, properties: Vec<S::Properties>) -> RepositoryResult<Vec<S>> {
        self.ensure_open()?;

        if properties.is_empty() {
            return Ok(Vec::new());
        }

        let payloads = properties
            .iter()
            .map(properties_to_payload)
            .collect::<RepositoryResult<Vec<Document>>>()?;
        debug!(collection = %self.collection, count = payloads.len(), "creating entities");

        let records = self
            .backend
            .insert_many(&self.collection, payloads)
            .await?;

        records_to_entities(records)
    }

    /// Reads entities in the form named by `lookup`.
    pub async fn get(&self, lookup: Lookup<S>) -> RepositoryResult<Fetched<S>> {
        Ok(match lookup {
            Lookup::ById(id) => Fetched::One(self.get_by_id(&id).await?),
            Lookup::ByIds(ids) => Fetched::Many(self.get_by_ids(&ids).await?),
            Lookup::ByFilter(filter) => Fetched::Many(self.get_by_filter(&filter).await?),
            Lookup::ByQuery(query) => Fetched::Page(self.get_by_query(&query).await?),
        })
    }

    /// Classifies a dynamic value and reads entities accordingly.
    ///
    /// Filter values are cast to the kinds the bound schema declares, so dates may be
    /// given as RFC 3339 strings.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousQueryShape` or `InvalidQuery` if the value cannot be
    /// classified, before anything reaches the store.
    pub async fn get_dynamic(&self, input: Option<&Bson>) -> RepositoryResult<Fetched<S>> {
        self.get(cast_lookup(classify(input)?, &self.schema)?)
            .await
    }

    /// Same as [`get_dynamic`](Self::get_dynamic), for JSON input.
    pub async fn get_json(&self, input: &Value) -> RepositoryResult<Fetched<S>> {
        self.get(cast_lookup(classify_json(input)?, &self.schema)?)
            .await
    }

    /// Reads every entity in the collection, in store order.
    pub async fn get_all(&self) -> RepositoryResult<Vec<S>> {
        self.get_by_filter(&Filter::new()).await
    }

    /// Reads a single entity. A malformed identifier is reported as not found.
    pub async fn get_by_id(&self, id: &S::Key) -> RepositoryResult<Option<S>> {
        self.ensure_open()?;

        let Some(native) = id.to_native() else {
            debug!(collection = %self.collection, ?id, "malformed identifier");
            return Ok(None);
        };

        self.backend
            .find_by_id(&self.collection, &native)
            .await?
            .map(record_to_entity)
            .transpose()
    }

    /// Reads every entity whose identifier is listed. Malformed identifiers are
    /// skipped; unknown ones are simply absent from the result.
    pub async fn get_by_ids(&self, ids: &[S::Key]) -> RepositoryResult<Vec<S>> {
        self.ensure_open()?;

        let natives = ids
            .iter()
            .filter_map(|id| id.to_native())
            .collect::<Vec<_>>();

        if natives.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            collection = %self.collection,
            requested = ids.len(),
            valid = natives.len(),
            "reading entities by id"
        );

        self.find(&Predicate::ids_in(natives), FindOptions::default())
            .await
    }

    /// Reads every entity matching `filter`, unpaginated and in store order.
    pub async fn get_by_filter(&self, filter: &Filter<S>) -> RepositoryResult<Vec<S>> {
        self.ensure_open()?;

        let predicate = translate_filter(Some(filter))?;
        debug!(collection = %self.collection, ?predicate, "reading entities by filter");

        self.find(&predicate, FindOptions::default())
            .await
    }

    /// Reads a sorted page of entities matching the query's filter.
    ///
    /// Unset sort parts come from the repository's [`SortDefaults`].
    pub async fn get_by_query(&self, query: &Query<S>) -> RepositoryResult<Page<S>> {
        self.ensure_open()?;

        let predicate = translate_filter(query.filter.as_ref())?;
        let sort = self
            .sort_defaults
            .resolve(query.sort.as_ref());
        sort.properties
            .iter()
            .try_for_each(|property| check_field_name(property))?;
        let (offset, limit) = (sort.offset, sort.limit);
        debug!(collection = %self.collection, ?predicate, ?sort, "reading entities by query");

        let items = self
            .find(&predicate, FindOptions::from(sort))
            .await?;

        Ok(Page::new(items, offset, limit))
    }

    async fn find(&self, predicate: &Predicate, options: FindOptions) -> RepositoryResult<Vec<S>> {
        let records = self
            .backend
            .find(&self.collection, predicate, options)
            .await?;

        records_to_entities(records)
    }
}

impl<S, B: StoreBackend> Clone for Repository<S, B> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            schema: self.schema.clone(),
            sort_defaults: self.sort_defaults.clone(),
            backend: self.backend.clone(),
            open: self.open.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, B: StoreBackend> fmt::Debug for Repository<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection)
            .field("sort_defaults", &self.sort_defaults)
            .field("backend", &self.backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetched_results_flatten_to_entities() {
        assert_eq!(Fetched::One(Some(1)).into_vec(), vec![1]);
        assert_eq!(Fetched::<i32>::One(None).into_vec(), Vec::<i32>::new());
        assert_eq!(Fetched::Many(vec![1, 2]).into_vec(), vec![1, 2]);
        assert_eq!(Fetched::Page(Page::new(vec![3], 0, 1)).into_vec(), vec![3]);
    }
}
