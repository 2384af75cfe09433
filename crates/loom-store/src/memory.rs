//! In-memory document store for tests and offline development.
//!
//! Deterministic stand-in for the remote store: documents live in a
//! process-local map, failures are injected as an explicit queue, and
//! every operation is recorded in a call log so tests can count attempts.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use loom_core::{DocumentRecord, DocumentStore, Error, Result, Settings};

use crate::manager::Connector;

/// One recorded store operation.
#[derive(Debug, Clone)]
pub struct StoreCall {
    pub op: String,
    pub collection: String,
    pub id: String,
}

#[derive(Default)]
struct Inner {
    docs: HashMap<(String, String), DocumentRecord>,
    failures: VecDeque<Error>,
    calls: Vec<StoreCall>,
}

/// In-memory [`DocumentStore`] with failure injection and a call log.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error; the next operation returns it instead of running.
    pub fn inject_failure(&self, err: Error) {
        self.inner.lock().unwrap().failures.push_back(err);
    }

    /// Queue `times` errors produced by `make`.
    pub fn inject_failures(&self, make: impl Fn() -> Error, times: usize) {
        let mut inner = self.inner.lock().unwrap();
        for _ in 0..times {
            inner.failures.push_back(make());
        }
    }

    /// All recorded operations, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of recorded operations with the given name.
    pub fn call_count(&self, op: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Number of stored documents across all collections.
    pub fn document_count(&self) -> usize {
        self.inner.lock().unwrap().docs.len()
    }

    /// Direct lookup bypassing the failure queue and call log.
    pub fn stored(&self, collection: &str, id: &str) -> Option<DocumentRecord> {
        self.inner
            .lock()
            .unwrap()
            .docs
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    fn record(&self, op: &str, collection: &str, id: &str) -> Option<Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(StoreCall {
            op: op.to_string(),
            collection: collection.to_string(),
            id: id.to_string(),
        });
        inner.failures.pop_front()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentRecord>> {
        if let Some(err) = self.record("get", collection, id) {
            return Err(err);
        }
        Ok(self.stored(collection, id))
    }

    async fn set(&self, collection: &str, record: &DocumentRecord) -> Result<()> {
        if let Some(err) = self.record("set", collection, &record.id) {
            return Err(err);
        }
        self.inner.lock().unwrap().docs.insert(
            (collection.to_string(), record.id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(err) = self.record("delete", collection, id) {
            return Err(err);
        }
        self.inner
            .lock()
            .unwrap()
            .docs
            .remove(&(collection.to_string(), id.to_string()));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if let Some(err) = self.record("ping", "", "") {
            return Err(err);
        }
        Ok(())
    }
}

/// [`Connector`] over a [`MemoryDocumentStore`], counting dial attempts.
pub struct MemoryConnector {
    store: MemoryDocumentStore,
    connects: AtomicUsize,
    connect_failures: Mutex<VecDeque<Error>>,
}

impl MemoryConnector {
    /// Wrap a store; every successful connect hands out a clone of it.
    pub fn new(store: MemoryDocumentStore) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
            connect_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of connect attempts made so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Queue an error for the next connect attempt.
    pub fn inject_connect_failure(&self, err: Error) {
        self.connect_failures.lock().unwrap().push_back(err);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _settings: &Settings) -> Result<Arc<dyn DocumentStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.connect_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.store.ping().await?;
        Ok(Arc::new(self.store.clone()))
    }
}
