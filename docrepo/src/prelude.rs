//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```
//!
//! This provides access to:
//! - Entity and key traits
//! - Sessions, repositories and backend traits
//! - Filter, range, sort and query construction
//! - Schemas and error types

pub use docrepo_core::{
    backend::{FindOptions, StoreBackend, StoreBackendBuilder},
    error::{RepositoryError, RepositoryResult},
    filter::{Condition, Field, Filter},
    key::EntityKey,
    page::Page,
    query::{Lookup, Query},
    range::Range,
    repository::{Fetched, Repository, RepositoryBuilder},
    schema::{FieldKind, Schema},
    session::Session,
    shape::{classify, classify_json},
    sort::{Sort, SortDefaults, SortOrder},
    storable::Storable,
};
