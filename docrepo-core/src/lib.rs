//! A typed data-access layer over document stores.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Entities** ([`storable`], [`key`]) - Traits for persisted entities and their identifiers
//! - **Query DSL** ([`filter`], [`range`], [`sort`], [`query`]) - Typed filters, ranges, sorts and lookups
//! - **Translation** ([`translate`], [`predicate`]) - Lowering of filters into store-native predicates
//! - **Classification** ([`shape`]) - Deciding which lookup a dynamic value describes
//! - **Store backend abstraction** ([`backend`], [`schema`]) - Traits for implementing storage backends
//! - **Repositories** ([`repository`], [`session`]) - Typed create/read access to bound collections
//! - **Error handling** ([`error`]) - Error types and result types
//! - **Pagination** ([`page`]) - Page results of sorted queries
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{Storable, Field, Filter};
//! use bson::DateTime;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct User {
//!     pub id: String,
//!     pub created_at: DateTime,
//!     pub updated_at: DateTime,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserProperties {
//!     pub name: String,
//! }
//!
//! impl Storable for User {
//!     type Key = String;
//!     type Properties = UserProperties;
//!
//!     fn id(&self) -> &String {
//!         &self.id
//!     }
//! }
//!
//! const NAME: Field<User, String> = Field::new("name");
//!
//! let filter = Filter::new().one_of(NAME, ["Alice", "Bob"]);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod error;
pub mod filter;
pub mod key;
pub mod page;
pub mod predicate;
pub mod query;
pub mod range;
pub mod repository;
pub mod schema;
pub mod session;
pub mod shape;
pub mod sort;
pub mod storable;
pub mod translate;
