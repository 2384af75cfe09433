//! # loom-store
//!
//! Remote document-store state manager for loom.
//!
//! This crate provides:
//! - The process-wide [`StateManager`] owning the single store session
//! - A shared exponential-backoff [`RetryPolicy`] for all operations
//! - Content-addressed, deduplicating writes
//! - An HTTP backend ([`RestDocumentStore`]) and an in-memory backend
//!   ([`MemoryDocumentStore`]) for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use loom_core::Settings;
//! use loom_store::{RestConnector, StateManager, WriteRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let manager = StateManager::new(settings, std::sync::Arc::new(RestConnector));
//!
//!     let fields = serde_json::json!({"domain": "systems_biology", "insight": "..."})
//!         .as_object()
//!         .cloned()
//!         .unwrap();
//!     let outcome = manager
//!         .write("insights", WriteRequest::content_addressed(fields))
//!         .await?;
//!     println!("stored as {}", outcome.id);
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod memory;
pub mod rest;
pub mod retry;

// Re-export core types
pub use loom_core::*;

pub use manager::{Connector, DocId, StateManager, WriteOutcome, WriteRequest};
pub use memory::{MemoryConnector, MemoryDocumentStore, StoreCall};
pub use rest::{RestConnector, RestDocumentStore};
pub use retry::RetryPolicy;
