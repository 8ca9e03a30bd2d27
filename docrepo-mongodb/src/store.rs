use async_trait::async_trait;
use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mea::rwlock::RwLock;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions as MongoFindOptions},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use docrepo_core::{
    backend::{FindOptions, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    predicate::{Predicate, PredicateVisitor},
    schema::Schema,
    storable::{CREATED_AT_FIELD, NATIVE_ID_FIELD, UPDATED_AT_FIELD, VERSION_FIELD},
};

use crate::query::MongoQueryTranslator;

fn backend_error(e: mongodb::error::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

/// A [`StoreBackend`] persisting records in a MongoDB database.
///
/// Bound schemas are kept by the store and enforced on every insert.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
    models: Arc<RwLock<HashMap<String, Schema>>>,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self {
            client,
            database,
            models: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn schema(&self, collection: &str) -> RepositoryResult<Schema> {
        self.models
            .read()
            .await
            .get(collection)
            .cloned()
            .ok_or_else(|| RepositoryError::UnboundRepository(collection.to_string()))
    }

    fn prepare_document(schema: &Schema, payload: &Document) -> RepositoryResult<Document> {
        let now = DateTime::now();

        Ok(Document::from_iter(
            [(NATIVE_ID_FIELD.to_string(), Bson::ObjectId(ObjectId::new()))]
                .into_iter()
                .chain(schema.conform(payload)?)
                .chain([
                    (CREATED_AT_FIELD.to_string(), Bson::DateTime(now)),
                    (UPDATED_AT_FIELD.to_string(), Bson::DateTime(now)),
                    (VERSION_FIELD.to_string(), Bson::Int32(0)),
                ]),
        ))
    }

    /// Driver options for a find. A window too large for the driver's integer types
    /// is left unset, which reads as unbounded.
    fn find_options(options: &FindOptions) -> MongoFindOptions {
        let mut find_options = MongoFindOptions::default();

        find_options.sort = MongoQueryTranslator::sort(options);
        find_options.skip = options
            .offset
            .and_then(|skip| u64::try_from(skip).ok());
        // A negative limit asks MongoDB for a single batch
        find_options.limit = options
            .limit
            .and_then(|limit| i64::try_from(limit).ok());

        find_options
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn bind_model(&self, collection: &str, schema: &Schema) -> RepositoryResult<()> {
        schema.check()?;

        let mut models = self.models.write().await;

        if models.contains_key(collection) {
            return Err(RepositoryError::ModelAlreadyBound(collection.to_string()));
        }

        models.insert(collection.to_string(), schema.clone());
        trace!(collection, database = %self.database, "bound model");

        Ok(())
    }

    async fn insert_one(&self, collection: &str, payload: Document) -> RepositoryResult<Document> {
        let schema = self.schema(collection).await?;
        let record = Self::prepare_document(&schema, &payload)?;

        self.get_collection(collection)
            .insert_one(&record)
            .await
            .map_err(backend_error)?;
        trace!(collection, "inserted record");

        Ok(record)
    }

    async fn insert_many(
        &self,
        collection: &str,
        payloads: Vec<Document>,
    ) -> RepositoryResult<Vec<Document>> {
        let schema = self.schema(collection).await?;
        let records = payloads
            .iter()
            .map(|payload| Self::prepare_document(&schema, payload))
            .collect::<RepositoryResult<Vec<Document>>>()?;

        if records.is_empty() {
            return Ok(records);
        }

        self.get_collection(collection)
            .insert_many(&records)
            .await
            .map_err(backend_error)?;
        trace!(collection, count = records.len(), "inserted records");

        Ok(records)
    }

    async fn find_by_id(&self, collection: &str, id: &Bson) -> RepositoryResult<Option<Document>> {
        self.schema(collection).await?;

        self.get_collection(collection)
            .find_one(doc! { NATIVE_ID_FIELD: id.clone() })
            .await
            .map_err(backend_error)
    }

    async fn find(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        self.schema(collection).await?;

        // A zero limit means "no limit" to MongoDB
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let filter = MongoQueryTranslator.visit_predicate(predicate)?;
        trace!(collection, %filter, "finding records");

        self.get_collection(collection)
            .find(filter)
            .with_options(Self::find_options(&options))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn close(&self) -> RepositoryResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Connection settings for [`MongoDbStore`], loadable from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoDbConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    pub database: String,
}

impl MongoDbConfig {
    pub fn builder(&self) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(&self.uri, &self.database)
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

impl From<MongoDbConfig> for MongoDbStoreBuilder {
    fn from(config: MongoDbConfig) -> Self {
        Self {
            dsn: config.uri,
            database: config.database,
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> RepositoryResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            )
            .map_err(|e| RepositoryError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_core::{schema::FieldKind, sort::SortOrder};

    #[test]
    fn records_are_stamped_before_insert() {
        let schema = Schema::new()
            .required("name", FieldKind::String)
            .optional("rank", FieldKind::Number);

        let record = MongoDbStore::prepare_document(&schema, &doc! { "name": "a", "stray": true }).unwrap();

        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            ["_id", "name", "createdAt", "updatedAt", "__v"]
        );
    }

    #[test]
    fn invalid_payloads_never_reach_the_driver() {
        let schema = Schema::new().required("name", FieldKind::String);

        assert!(matches!(
            MongoDbStore::prepare_document(&schema, &doc! { "name": 3 }),
            Err(RepositoryError::Validation(_))
        ));
    }

    #[test]
    fn find_windows_map_to_driver_options() {
        let options = MongoDbStore::find_options(&FindOptions {
            sort: vec![("_id".into(), SortOrder::Descending)],
            offset: Some(3),
            limit: Some(5),
        });

        assert_eq!(options.sort, Some(doc! { "_id": -1 }));
        assert_eq!(options.skip, Some(3));
        assert_eq!(options.limit, Some(5));

        let unwindowed = MongoDbStore::find_options(&FindOptions::default());

        assert_eq!((unwindowed.sort, unwindowed.skip, unwindowed.limit), (None, None, None));
    }

    #[test]
    fn oversized_limits_stay_unbounded() {
        let options = MongoDbStore::find_options(&FindOptions {
            limit: Some(usize::MAX),
            ..FindOptions::default()
        });

        assert_eq!(options.limit, None);
    }

    #[test]
    fn config_loads_into_a_builder() {
        let config: MongoDbConfig = serde_json::from_value(serde_json::json!({
            "uri": "mongodb://localhost:27017",
            "database": "docrepo",
        }))
        .unwrap();

        let builder = MongoDbStoreBuilder::from(config.clone());

        assert_eq!(builder.dsn, config.uri);
        assert_eq!(builder.database, "docrepo");
    }
}
