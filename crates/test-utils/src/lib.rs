use anyhow::{bail, Result};
use async_trait::async_trait;
use feedrag::ingest::RetrievalEngine;
use feedrag::store::Store;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// --- Test Setup ---

/// A helper struct to manage store creation for each test.
pub struct TestSetup {
    pub store: Store,
}

impl TestSetup {
    /// Creates a new, isolated in-memory store and initializes the schema.
    pub async fn new() -> Result<Self> {
        let store = Store::new(":memory:").await?;
        store.initialize_schema().await?;
        Ok(Self { store })
    }
}

// --- Mock Retrieval Engine ---

/// One recorded insertion.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub document: String,
    pub ids: Vec<String>,
    pub source_refs: Vec<String>,
}

/// A programmable stand-in for the retrieval engine.
///
/// Every `insert` attempt is recorded, including failing ones, so tests can
/// assert attempt counts. Failures are either queued (consumed in order,
/// then the engine succeeds) or permanent.
#[derive(Clone, Default)]
pub struct MockEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    queued_failures: Arc<Mutex<VecDeque<String>>>,
    permanent_failure: Arc<Mutex<Option<String>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one failure; the next `insert` returns it, later ones succeed.
    pub fn fail_once(&self, message: &str) {
        self.queued_failures
            .lock()
            .unwrap()
            .push_back(message.to_string());
    }

    /// Makes every `insert` fail with `message` until cleared.
    pub fn fail_always(&self, message: &str) {
        *self.permanent_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Clears a permanent failure set by `fail_always`.
    pub fn recover(&self) {
        *self.permanent_failure.lock().unwrap() = None;
    }

    /// All insert attempts so far, successful and failed alike.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RetrievalEngine for MockEngine {
    async fn insert(&self, document: &str, ids: &[String], source_refs: &[String]) -> Result<()> {
        self.calls.lock().unwrap().push(EngineCall {
            document: document.to_string(),
            ids: ids.to_vec(),
            source_refs: source_refs.to_vec(),
        });

        if let Some(message) = self.permanent_failure.lock().unwrap().clone() {
            bail!(message);
        }
        if let Some(message) = self.queued_failures.lock().unwrap().pop_front() {
            bail!(message);
        }
        Ok(())
    }
}
