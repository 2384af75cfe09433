//! Centralized default constants for the loom system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// RETRY / BACKOFF
// =============================================================================

/// Maximum attempts per store operation, including the first one.
pub const RETRY_MAX_ATTEMPTS: u32 = 4;

/// Base backoff delay in milliseconds before the second attempt.
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Multiplier applied to the backoff delay after each attempt.
pub const RETRY_GROWTH_FACTOR: f64 = 2.0;

/// Ceiling on any single backoff delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 8_000;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Prefix for all recognized environment variables.
pub const ENV_PREFIX: &str = "LOOM_";

/// Default path to the store service-account credentials file.
pub const CREDENTIALS_PATH: &str = "./credentials/service-account.json";

/// Default remote store project identifier.
pub const PROJECT_ID: &str = "loom-dev";

/// Default root directory for local knowledge-base state.
pub const KNOWLEDGE_BASE_PATH: &str = "./knowledge_base";

/// Default number of worker threads.
pub const MAX_WORKERS: usize = 4;

/// Default cap on concurrent store requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Default minimum similarity score for a cross-domain connection.
pub const SIMILARITY_THRESHOLD: f64 = 0.65;

/// Default minimum confidence for integration suggestions.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Domains analyzed when no explicit list is configured.
pub const DEFAULT_DOMAINS: &[&str] = &[
    "machine_learning",
    "systems_biology",
    "quantum_computing",
    "materials_science",
    "cognitive_psychology",
    "financial_modeling",
];

// =============================================================================
// REMOTE STORE
// =============================================================================

/// Default remote document-store endpoint.
pub const STORE_ENDPOINT: &str = "https://store.loomworks.dev";

/// Timeout for individual store requests (seconds).
pub const STORE_TIMEOUT_SECS: u64 = 30;
