#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared helpers for the `feedrag` integration tests: tracing setup, an
//! in-memory store, and a programmable mock retrieval engine.

use anyhow::{bail, Result};
use async_trait::async_trait;
use feedrag::ingest::RetrievalEngine;
use feedrag::store::Store;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });
}

/// Creates an isolated in-memory store with the schema applied.
pub async fn setup_store() -> Result<Store> {
    let store = Store::new(":memory:").await?;
    store.initialize_schema().await?;
    Ok(store)
}

/// One recorded insertion attempt.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub document: String,
    pub ids: Vec<String>,
    pub source_refs: Vec<String>,
}

/// A mock retrieval engine recording every insert attempt, with queued or
/// permanent failures.
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

    /// Queues one failure; the next insert returns it, later ones succeed.
    pub fn fail_once(&self, message: &str) {
        self.queued_failures
            .lock()
            .unwrap()
            .push_back(message.to_string());
    }

    /// Makes every insert fail with `message` until `recover` is called.
    pub fn fail_always(&self, message: &str) {
        *self.permanent_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.permanent_failure.lock().unwrap() = None;
    }

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
