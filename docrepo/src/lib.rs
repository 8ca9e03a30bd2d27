//! Main docrepo crate providing typed repositories over document stores.
//!
//! This crate is the primary entry point for users of the docrepo framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! convenient access to the storage backends.
//!
//! # Features
//!
//! - **Typed entities** - Declare an entity once with Serde and get typed create/read operations
//! - **Portable queries** - Filters, ranges, sorts and pages instead of store-native query syntax
//! - **Dynamic lookups** - Classify untyped request values into the lookup they describe
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStoreBuilder};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct User {
//!     pub id: String,
//!     pub created_at: bson::DateTime,
//!     pub updated_at: bson::DateTime,
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserProperties {
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl Storable for User {
//!     type Key = String;
//!     type Properties = UserProperties;
//!
//!     fn id(&self) -> &String { &self.id }
//! }
//!
//! const AGE: Field<User, i64> = Field::new("age");
//!
//! #[tokio::main]
//! async fn main() -> RepositoryResult<()> {
//!     let session = Session::open(InMemoryStoreBuilder::new()).await?;
//!
//!     let users = session
//!         .repository::<User>(
//!             "users",
//!             Schema::new()
//!                 .required("name", FieldKind::String)
//!                 .required("age", FieldKind::Number),
//!         )
//!         .bind()
//!         .await?;
//!
//!     users.create(UserProperties { name: "Alice".into(), age: 30 }).await?;
//!
//!     let page = users
//!         .get_by_query(&Query::filtered(Filter::new().within(AGE, 18..)).with_sort(Sort::new().by(AGE).limit(10)))
//!         .await?;
//!
//!     println!("Adults: {:?}", page.items);
//!
//!     session.close().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrepo_core::{
    backend, error, filter, key, page, predicate, query, range, repository, schema, session,
    shape, sort, storable, translate,
};

pub use docrepo_core::{
    error::{RepositoryError, RepositoryResult},
    filter::{Field, Filter},
    query::{Lookup, Query},
    range::Range,
    repository::{Fetched, Repository},
    session::Session,
    sort::{Sort, SortOrder},
    storable::Storable,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
}
