//! # loom-core
//!
//! Core types, configuration, and abstractions for the loom
//! cross-domain knowledge integration engine.
//!
//! This crate provides the foundational pieces the stateful crates
//! depend on: the error taxonomy, validated application settings, the
//! document record model, content addressing, the structured logging
//! schema, and the remote document-store boundary trait.

pub mod config;
pub mod defaults;
pub mod document;
pub mod error;
pub mod hash;
pub mod logging;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{LogLevel, Settings};
pub use document::{DocumentRecord, FieldMap};
pub use error::{Error, Result};
pub use traits::DocumentStore;
