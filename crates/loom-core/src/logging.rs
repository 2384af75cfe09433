//! Structured logging schema and field name constants for loom.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized field names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (connect, shutdown), operation completions |
//! | DEBUG | Decision points, dedup hits, config choices |
//! | TRACE | Per-attempt detail, high-volume data |

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "config", "store"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "manager", "retry", "rest"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "connect", "read", "write", "delete"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Collection being operated on.
pub const COLLECTION: &str = "collection";

/// Document identifier being operated on.
pub const DOC_ID: &str = "doc_id";

/// Content digest of the document being written.
pub const CONTENT_HASH: &str = "content_hash";

// ─── Measurement fields ────────────────────────────────────────────────────

/// 1-based attempt number within a retry loop.
pub const ATTEMPT: &str = "attempt";

/// Backoff delay chosen before the next attempt, in milliseconds.
pub const BACKOFF_MS: &str = "backoff_ms";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install the global tracing subscriber from validated settings.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("loom={}", settings.log_level.as_filter())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            knowledge_base_path: dir.path().join("kb"),
            ..Settings::default()
        };
        init_tracing(&settings);
        init_tracing(&settings);
    }
}
