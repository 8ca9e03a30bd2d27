//! Shared fixtures for repository integration tests.
//!
//! Provides `TestEntity`, whose fields cover the string, number, date and boolean
//! filter forms, its schema, and helpers for seeding an in-memory repository.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use bson::DateTime;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use docrepo::{
    Field, Repository, RepositoryResult, Session, Storable,
    memory::{InMemoryStore, InMemoryStoreBuilder},
    schema::{FieldKind, Schema},
};

pub const COLLECTION: &str = "test_entities";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEntity {
    pub id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub string_property: String,
    pub number_property: i64,
    pub date_property: DateTime,
    pub boolean_property: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProperties {
    pub string_property: String,
    pub number_property: i64,
    pub date_property: DateTime,
    pub boolean_property: bool,
}

impl Storable for TestEntity {
    type Key = String;
    type Properties = TestProperties;

    fn id(&self) -> &String {
        &self.id
    }
}

pub const STRING: Field<TestEntity, String> = Field::new("stringProperty");
pub const NUMBER: Field<TestEntity, i64> = Field::new("numberProperty");
pub const DATE: Field<TestEntity, DateTime> = Field::new("dateProperty");
pub const BOOLEAN: Field<TestEntity, bool> = Field::new("booleanProperty");

pub type TestRepository = Repository<TestEntity, InMemoryStore>;

/// Installs a log subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_schema() -> Schema {
    Schema::new()
        .required("stringProperty", FieldKind::String)
        .required("numberProperty", FieldKind::Number)
        .required("dateProperty", FieldKind::Date)
        .required("booleanProperty", FieldKind::Boolean)
}

pub fn properties(string: &str, number: i64) -> TestProperties {
    TestProperties {
        string_property: string.to_string(),
        number_property: number,
        date_property: DateTime::from_millis(number * 1_000),
        boolean_property: number % 20 == 0,
    }
}

pub async fn open_session() -> Session<InMemoryStore> {
    init_tracing();

    Session::open(InMemoryStoreBuilder::new())
        .await
        .expect("in-memory session opens")
}

pub async fn bind(session: &Session<InMemoryStore>) -> RepositoryResult<TestRepository> {
    session
        .repository::<TestEntity>(COLLECTION, test_schema())
        .bind()
        .await
}

/// Seeds A(10), B(20) and C(30), returned in that order.
pub async fn seed_abc(repository: &TestRepository) -> (TestEntity, TestEntity, TestEntity) {
    let mut created = repository
        .create_many(vec![properties("AAA", 10), properties("BBB", 20), properties("CCC", 30)])
        .await
        .expect("seeding succeeds")
        .into_iter();

    match (created.next(), created.next(), created.next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => panic!("expected three seeded entities"),
    }
}

/// Sorts entities by id, for comparing result sets regardless of order.
pub fn by_id(mut entities: Vec<TestEntity>) -> Vec<TestEntity> {
    entities.sort_by(|a, b| a.id.cmp(&b.id));
    entities
}

pub fn numbers(entities: &[TestEntity]) -> Vec<i64> {
    entities
        .iter()
        .map(|entity| entity.number_property)
        .collect()
}
