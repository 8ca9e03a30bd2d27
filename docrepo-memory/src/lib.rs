//! In-memory storage backend for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Schema validation** - Payloads are checked against the bound model's schema
//! - **Full predicate support** - Equality, set membership and range unions, with sorting and pagination
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{Session, memory::InMemoryStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open(InMemoryStoreBuilder::new()).await?;
//!     let users = session
//!         .repository::<User>("users", user_schema())
//!         .bind()
//!         .await?;
//!
//!     let alice = users.create(UserProperties { name: "Alice".into() }).await?;
//!     assert_eq!(users.get_by_id(&alice.id).await?, Some(alice));
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
