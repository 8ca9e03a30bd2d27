//! Sessions: the owner of a backend connection and the entry point to repositories.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::session::Session;
//!
//! let session = Session::open(InMemoryStoreBuilder::new()).await?;
//! let users = session
//!     .repository::<User>("users", schema)
//!     .bind()
//!     .await?;
//!
//! // ...
//!
//! session.close().await?;
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::debug;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::RepositoryResult,
    repository::RepositoryBuilder,
    schema::Schema,
    storable::Storable,
};

/// An open connection to a store backend.
///
/// Clones share the backend and the open state. Once any clone is closed, every
/// repository created from the session fails with `UnboundRepository`.
#[derive(Debug)]
pub struct Session<B: StoreBackend> {
    backend: Arc<B>,
    open: Arc<AtomicBool>,
}

impl<B: StoreBackend> Session<B> {
    /// Wraps an already built backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Builds a backend and opens a session on it.
    pub async fn open<T>(builder: T) -> RepositoryResult<Self>
    where
        T: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Starts binding a repository for entity `S` to `collection`.
    ///
    /// Nothing reaches the backend until [`RepositoryBuilder::bind`] is awaited.
    pub fn repository<S: Storable>(
        &self,
        collection: impl Into<String>,
        schema: Schema,
    ) -> RepositoryBuilder<S, B> {
        RepositoryBuilder::new(
            collection.into(),
            schema,
            self.backend.clone(),
            self.open.clone(),
        )
    }

    /// Closes the session and releases the backend's resources.
    ///
    /// Closing an already closed session does nothing.
    pub async fn close(self) -> RepositoryResult<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("closing session");
            self.backend.close().await?;
        }

        Ok(())
    }
}

impl<B: StoreBackend> Clone for Session<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            open: self.open.clone(),
        }
    }
}
