//! Process-wide state manager for the remote document store.
//!
//! The manager owns the single live session to the store for the lifetime
//! of the process. All application reads and writes go through it; no
//! other component talks to the store directly. It is safe to share
//! across tasks: the connection handle sits behind a read/write lock,
//! one-time setup is serialized by a dedicated dial lock, and backoff
//! sleeps never run while a lock is held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use loom_core::{hash, DocumentRecord, DocumentStore, Error, FieldMap, Result, Settings};

use crate::retry::RetryPolicy;

static GLOBAL: OnceCell<Arc<StateManager>> = OnceCell::new();

/// Factory producing a connected [`DocumentStore`] session.
///
/// The production implementation is
/// [`RestConnector`](crate::rest::RestConnector); tests use
/// [`MemoryConnector`](crate::memory::MemoryConnector).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a live session against the remote store.
    ///
    /// Malformed or unreadable credentials map to [`Error::Config`];
    /// an unreachable or rejecting endpoint maps to
    /// [`Error::Connection`].
    async fn connect(&self, settings: &Settings) -> Result<Arc<dyn DocumentStore>>;
}

/// How a write names its document.
#[derive(Debug, Clone)]
pub enum DocId {
    /// Caller-assigned identifier.
    Assigned(String),
    /// Fresh time-ordered UUID minted at write time.
    Generated,
    /// Identifier derived from the content hash, optionally namespaced.
    ContentAddressed { namespace: Option<String> },
}

/// A write operation against a collection.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub id: DocId,
    pub fields: FieldMap,
}

impl WriteRequest {
    /// Write under a caller-assigned identifier.
    pub fn assigned(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: DocId::Assigned(id.into()),
            fields,
        }
    }

    /// Write under a freshly generated identifier.
    pub fn generated(fields: FieldMap) -> Self {
        Self {
            id: DocId::Generated,
            fields,
        }
    }

    /// Write under the content-derived identifier.
    pub fn content_addressed(fields: FieldMap) -> Self {
        Self {
            id: DocId::ContentAddressed { namespace: None },
            fields,
        }
    }

    /// Write under the content-derived identifier with a namespace prefix.
    pub fn content_addressed_in(namespace: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: DocId::ContentAddressed {
                namespace: Some(namespace.into()),
            },
            fields,
        }
    }
}

/// Result of a write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// Identifier the document is stored under.
    pub id: String,
    /// True when an identical record already existed and nothing was
    /// written; `updated_at` is then the existing record's timestamp.
    pub deduplicated: bool,
    /// Last-modified timestamp of the stored record.
    pub updated_at: DateTime<Utc>,
}

/// State manager for the remote document store.
///
/// Construct one per process with pre-validated [`Settings`] and a
/// [`Connector`], then pass the handle to consumers explicitly.
/// [`StateManager::init_global`] is available for binaries that need a
/// process-wide accessor, but dependency injection is the preferred way
/// to hand the manager around.
pub struct StateManager {
    settings: Settings,
    connector: Arc<dyn Connector>,
    retry: RetryPolicy,
    /// The Connection Handle. `None` until the first successful dial and
    /// after invalidation.
    handle: RwLock<Option<Arc<dyn DocumentStore>>>,
    /// Serializes dialing so concurrent first access opens one session.
    dial_lock: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    reconnects: AtomicU64,
}

impl StateManager {
    /// Create a manager. The connection is established lazily on the
    /// first operation (or eagerly via [`StateManager::connect`]).
    pub fn new(settings: Settings, connector: Arc<dyn Connector>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            settings,
            connector,
            retry: RetryPolicy::default(),
            handle: RwLock::new(None),
            dial_lock: Mutex::new(()),
            shutdown_tx,
            shutdown_rx,
            reconnects: AtomicU64::new(0),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Install `manager` as the process-wide instance, or return the one
    /// already installed. Concurrent first calls run the installation
    /// exactly once; the loser's manager is dropped unconnected.
    pub fn init_global(manager: StateManager) -> Arc<StateManager> {
        GLOBAL.get_or_init(|| Arc::new(manager)).clone()
    }

    /// The process-wide instance, if one was installed.
    pub fn global() -> Option<Arc<StateManager>> {
        GLOBAL.get().cloned()
    }

    /// The settings this manager was constructed with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of times the connection handle has been invalidated.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Whether a live session is currently cached.
    pub async fn is_connected(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// Establish the connection eagerly. Idempotent: a live session is
    /// reused, never replaced.
    pub async fn connect(&self) -> Result<()> {
        self.acquire().await.map(|_| ())
    }

    /// Signal shutdown and release the session.
    ///
    /// In-flight retries observe the signal promptly and return
    /// [`Error::Cancelled`]; subsequent operations fail the same way.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut guard = self.handle.write().await;
        if guard.take().is_some() {
            info!(
                subsystem = "store",
                component = "manager",
                op = "shutdown",
                "Store session released"
            );
        }
    }

    /// Fetch a document. Absence is `Ok(None)`, never an error.
    pub async fn read(&self, collection: &str, id: &str) -> Result<Option<DocumentRecord>> {
        let start = Instant::now();
        let result = self
            .retry
            .run("read", self.shutdown_rx.clone(), || async move {
                let store = self.acquire().await?;
                store.get(collection, id).await
            })
            .await;
        self.observe("read", collection, id, start, &result).await;
        result
    }

    /// Write a document, deduplicating by content hash.
    ///
    /// An existing record with the same identifier and identical content
    /// is left untouched (its timestamp included) and reported as
    /// `deduplicated`. Otherwise the record is stored with a fresh
    /// `updated_at`.
    pub async fn write(&self, collection: &str, request: WriteRequest) -> Result<WriteOutcome> {
        let content_hash = hash::content_hash(&request.fields);
        let id = match &request.id {
            DocId::Assigned(id) => id.clone(),
            DocId::Generated => Uuid::now_v7().to_string(),
            DocId::ContentAddressed { namespace } => {
                hash::content_address(namespace.as_deref(), &content_hash)
            }
        };

        let start = Instant::now();
        let result = self
            .retry
            .run("write", self.shutdown_rx.clone(), || {
                let id = id.clone();
                let content_hash = content_hash.clone();
                let fields = request.fields.clone();
                async move {
                    let store = self.acquire().await?;
                    if let Some(existing) = store.get(collection, &id).await? {
                        if existing.content_hash == content_hash {
                            debug!(
                                subsystem = "store",
                                component = "manager",
                                op = "write",
                                collection,
                                doc_id = %id,
                                content_hash = %content_hash,
                                "Identical content already stored, write skipped"
                            );
                            return Ok(WriteOutcome {
                                id: existing.id,
                                deduplicated: true,
                                updated_at: existing.updated_at,
                            });
                        }
                    }
                    let record = DocumentRecord {
                        id: id.clone(),
                        fields,
                        content_hash: content_hash.clone(),
                        updated_at: Utc::now(),
                    };
                    store.set(collection, &record).await?;
                    Ok(WriteOutcome {
                        id: record.id,
                        deduplicated: false,
                        updated_at: record.updated_at,
                    })
                }
            })
            .await;
        self.observe("write", collection, &id, start, &result).await;
        result
    }

    /// Remove a document. Removing an absent identifier succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let start = Instant::now();
        let result = self
            .retry
            .run("delete", self.shutdown_rx.clone(), || async move {
                let store = self.acquire().await?;
                store.delete(collection, id).await
            })
            .await;
        self.observe("delete", collection, id, start, &result).await;
        result
    }

    /// Current handle, dialing if necessary.
    ///
    /// Fast path takes the read lock only. The slow path serializes on
    /// the dial lock and re-checks before dialing, so concurrent first
    /// access cannot open duplicate sessions; the handle write lock is
    /// held only for the final swap.
    async fn acquire(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(store) = self.handle.read().await.clone() {
            return Ok(store);
        }

        let _dialing = self.dial_lock.lock().await;
        if let Some(store) = self.handle.read().await.clone() {
            return Ok(store);
        }

        let start = Instant::now();
        let store = self.dial().await?;
        *self.handle.write().await = Some(store.clone());
        info!(
            subsystem = "store",
            component = "manager",
            op = "connect",
            project_id = %self.settings.project_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Store session established"
        );
        Ok(store)
    }

    /// Dial the store under the retry policy.
    ///
    /// Connection faults are retried here and only here: there is no
    /// session yet to invalidate. A spent budget surfaces as
    /// [`Error::Connection`], configuration problems as [`Error::Config`].
    async fn dial(&self) -> Result<Arc<dyn DocumentStore>> {
        let result = self
            .retry
            .run("connect", self.shutdown_rx.clone(), || async move {
                self.connector
                    .connect(&self.settings)
                    .await
                    .map_err(|e| match e {
                        Error::Connection(msg) => Error::TransientStore(msg),
                        other => other,
                    })
            })
            .await;

        result.map_err(|e| match e {
            Error::RetryExhausted { attempts, last } => Error::Connection(format!(
                "could not establish store session after {} attempts: {}",
                attempts, last
            )),
            Error::TransientStore(msg) => Error::Connection(msg),
            other => other,
        })
    }

    /// Invalidate the handle after a connection fault so the next
    /// operation reconnects. The swap is atomic; concurrent readers see
    /// either the old session or none.
    async fn invalidate_handle(&self, err: &Error) {
        let mut guard = self.handle.write().await;
        if guard.take().is_some() {
            let reconnects = self.reconnects.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(
                subsystem = "store",
                component = "manager",
                op = "invalidate",
                reconnects,
                error = %err,
                "Connection handle invalidated, next operation reconnects"
            );
        }
    }

    async fn observe<T>(
        &self,
        op: &'static str,
        collection: &str,
        id: &str,
        start: Instant,
        result: &Result<T>,
    ) {
        match result {
            Ok(_) => debug!(
                subsystem = "store",
                component = "manager",
                op,
                collection,
                doc_id = id,
                duration_ms = start.elapsed().as_millis() as u64,
                success = true,
                "Store operation complete"
            ),
            Err(e) => {
                if e.is_connection_fault() {
                    self.invalidate_handle(e).await;
                }
                debug!(
                    subsystem = "store",
                    component = "manager",
                    op,
                    collection,
                    doc_id = id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    success = false,
                    error = %e,
                    "Store operation failed"
                );
            }
        }
    }
}
