//! MongoDB backend implementation for docrepo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Native predicates are rendered as MongoDB query documents and executed by the
//! server's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Records are persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native queries** - Filtering, sorting and page windows run on the server
//! - **Async/await** - Fully asynchronous API built on MongoDB's async driver
//!
//! # Connection
//!
//! The connection string and database are given to the builder directly, or loaded
//! from configuration as a [`MongoDbConfig`].
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{Session, mongodb::MongoDbStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open(MongoDbStoreBuilder::new("mongodb://localhost:27017", "my_database")).await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

mod query;
pub mod store;

pub use store::{MongoDbConfig, MongoDbStore, MongoDbStoreBuilder};
