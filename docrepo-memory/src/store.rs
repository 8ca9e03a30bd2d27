//! In-memory storage implementation for repositories.
//!
//! Records live in per-collection vectors (insertion order is the store's native
//! order) with an identifier index, behind an async-safe read-write lock.

use async_trait::async_trait;
use bson::{Bson, DateTime, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use docrepo_core::{
    backend::{FindOptions, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    predicate::Predicate,
    schema::Schema,
    sort::SortOrder,
    storable::{CREATED_AT_FIELD, NATIVE_ID_FIELD, UPDATED_AT_FIELD, VERSION_FIELD},
};

use crate::evaluator::{Comparable, RecordEvaluator};

#[derive(Debug)]
struct CollectionState {
    schema: Schema,
    records: Vec<Document>,
    index: HashMap<ObjectId, usize>,
}

impl CollectionState {
    fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Validates a payload and stamps the store-managed attributes.
    fn prepare(&self, payload: &Document) -> RepositoryResult<Document> {
        let now = DateTime::now();
        let mut record = Document::new();

        record.insert(NATIVE_ID_FIELD, ObjectId::new());
        for (field, value) in self.schema.conform(payload)? {
            record.insert(field, value);
        }
        record.insert(CREATED_AT_FIELD, now);
        record.insert(UPDATED_AT_FIELD, now);
        record.insert(VERSION_FIELD, 0_i32);

        Ok(record)
    }

    fn push(&mut self, record: Document) -> RepositoryResult<()> {
        let id = record
            .get_object_id(NATIVE_ID_FIELD)
            .map_err(|e| RepositoryError::InvalidDocument(e.to_string()))?;

        self.index.insert(id, self.records.len());
        self.records.push(record);

        Ok(())
    }
}

type StoreMap = HashMap<String, CollectionState>;

/// A [`StoreBackend`] keeping every record in process memory.
///
/// Clones share the same data.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn unbound(collection: &str) -> RepositoryError {
    RepositoryError::UnboundRepository(collection.to_string())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn bind_model(&self, collection: &str, schema: &Schema) -> RepositoryResult<()> {
        schema.check()?;

        let mut store = self.store.write().await;

        if store.contains_key(collection) {
            return Err(RepositoryError::ModelAlreadyBound(collection.to_string()));
        }

        store.insert(collection.to_string(), CollectionState::new(schema.clone()));
        trace!(collection, "bound model");

        Ok(())
    }

    async fn insert_one(&self, collection: &str, payload: Document) -> RepositoryResult<Document> {
        let mut store = self.store.write().await;
        let state = store
            .get_mut(collection)
            .ok_or_else(|| unbound(collection))?;

        let record = state.prepare(&payload)?;
        state.push(record.clone())?;
        trace!(collection, "inserted record");

        Ok(record)
    }

    async fn insert_many(
        &self,
        collection: &str,
        payloads: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        let mut store = self.store.write().await;
        let state = store
            .get_mut(collection)
            .ok_or_else(|| unbound(collection))?;

        // Validate the whole batch before storing any of it
        let records = payloads
            .iter()
            .map(|payload| state.prepare(payload))
            .collect::<RepositoryResult<Vec<_>>>()?;

        for record in &records {
            state.push(record.clone())?;
        }
        trace!(collection, count = records.len(), "inserted records");

        Ok(records)
    }

    async fn find_by_id(&self, collection: &str, id: &Bson) -> RepositoryResult<Option<Document>> {
        let store = self.store.read().await;
        let state = store
            .get(collection)
            .ok_or_else(|| unbound(collection))?;

        let Bson::ObjectId(id) = id else {
            return Ok(None);
        };

        Ok(state
            .index
            .get(id)
            .and_then(|position| state.records.get(*position))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        let store = self.store.read().await;
        let state = store
            .get(collection)
            .ok_or_else(|| unbound(collection))?;

        let mut matched = Vec::new();

        for record in &state.records {
            if RecordEvaluator::new(record).evaluate(predicate)? {
                matched.push(record);
            }
        }

        // Stable sort: ties keep insertion order
        if !options.sort.is_empty() {
            matched.sort_by(|a, b| {
                options
                    .sort
                    .iter()
                    .map(|(field, order)| {
                        let ordering = Comparable::field(a, field)
                            .sort_cmp(&Comparable::field(b, field));

                        match order {
                            SortOrder::Ascending => ordering,
                            SortOrder::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        trace!(collection, matched = matched.len(), "found records");

        Ok(matched
            .into_iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Builder for [`InMemoryStore`].
#[derive(Default)]
pub struct InMemoryStoreBuilder;

impl InMemoryStoreBuilder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
