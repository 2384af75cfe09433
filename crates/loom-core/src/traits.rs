//! Core traits for the remote document-store boundary.
//!
//! The state manager is the only component that talks to a
//! [`DocumentStore`]; everything else goes through the manager. Backends
//! classify their failures into the loom error taxonomy so the shared
//! retry policy can decide what to do with them.

use async_trait::async_trait;

use crate::document::DocumentRecord;
use crate::error::Result;

/// Collection-scoped CRUD over identifier → field-mapping documents.
///
/// Implementations must map transport faults to
/// [`Error::TransientStore`](crate::Error::TransientStore) (worth
/// retrying), [`Error::PermanentStore`](crate::Error::PermanentStore)
/// (not worth retrying), or [`Error::Connection`](crate::Error::Connection)
/// (session unusable, handle must be re-dialed).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document. Absence is `Ok(None)`, never an error.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentRecord>>;

    /// Insert or replace a document under its identifier.
    ///
    /// Replaying the same record is safe; `set` is idempotent per
    /// identifier.
    async fn set(&self, collection: &str, record: &DocumentRecord) -> Result<()>;

    /// Remove a document. Removing an absent identifier succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Cheap liveness probe used by the connect step.
    async fn ping(&self) -> Result<()>;
}
