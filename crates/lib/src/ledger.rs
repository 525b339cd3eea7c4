//! # Cost Ledger
//!
//! Thread-safe, durable accounting of billable LLM and embedding API usage.
//! Records are append-only; the backing file is rewritten in full on every
//! append, which is acceptable because the ledger stays small relative to
//! memory. The read-modify-persist sequence runs inside one exclusive
//! critical section, so concurrent recorders never overwrite each other and
//! summaries never observe a half-written append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// USD per one million tokens: `(input, output)`.
///
/// Unknown models fall through to a small flat rate so usage is still
/// metered while the table catches up.
fn model_pricing(model: &str) -> (f64, f64) {
    match model {
        "gpt-4o-mini" => (0.15, 0.60),
        "gpt-4o" => (2.50, 10.00),
        "claude-sonnet-4" => (3.00, 15.00),
        "claude-3-5-haiku" => (0.80, 4.00),
        "text-embedding-3-small" => (0.02, 0.0),
        "text-embedding-3-large" => (0.13, 0.0),
        _ => (0.01, 0.01),
    }
}

/// Record of a single billable API call. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCall {
    pub timestamp: DateTime<Utc>,
    /// Free-form category, e.g. "embedding" or "summarization".
    pub operation: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

/// Aggregates over the recorded calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostSummary {
    pub total_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    /// Cost per operation tag.
    pub by_operation: HashMap<String, f64>,
    /// Cost per model.
    pub by_model: HashMap<String, f64>,
}

/// Append-only ledger of API calls with optional file persistence.
pub struct CostLedger {
    storage_path: Option<PathBuf>,
    calls: Mutex<Vec<ApiCall>>,
}

impl CostLedger {
    /// Creates a ledger backed by `storage_path`. An existing file is loaded
    /// as the initial record sequence; a corrupt or unreadable file starts
    /// the ledger empty rather than failing startup.
    pub fn new(storage_path: Option<PathBuf>) -> Self {
        let calls = match &storage_path {
            Some(path) if path.exists() => load_calls(path),
            _ => Vec::new(),
        };
        Self {
            storage_path,
            calls: Mutex::new(calls),
        }
    }

    /// A ledger with no backing file; records live only in memory.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Records one API call and returns its computed cost in USD.
    ///
    /// The append and the file rewrite happen under one lock. A persistence
    /// failure is logged and costs only durability of the latest write,
    /// never the in-memory record.
    pub fn record_call(
        &self,
        operation: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> f64 {
        let (input_rate, output_rate) = model_pricing(model);
        let cost = (input_tokens as f64 / 1_000_000.0) * input_rate
            + (output_tokens as f64 / 1_000_000.0) * output_rate;

        let call = ApiCall {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd: cost,
        };

        {
            let mut calls = self.lock();
            calls.push(call);
            self.persist(&calls);
        }

        debug!(
            "API call: {operation} ({model}) - {input_tokens} in / {output_tokens} out = ${cost:.6}"
        );
        cost
    }

    /// Aggregates all records, or only those at or after `since`, as one
    /// consistent snapshot.
    pub fn summary(&self, since: Option<DateTime<Utc>>) -> CostSummary {
        let calls = self.lock();
        let mut summary = CostSummary::default();
        for call in calls.iter() {
            if let Some(since) = since {
                if call.timestamp < since {
                    continue;
                }
            }
            summary.total_calls += 1;
            summary.total_input_tokens += call.input_tokens;
            summary.total_output_tokens += call.output_tokens;
            summary.total_cost_usd += call.cost_usd;
            *summary.by_operation.entry(call.operation.clone()).or_default() += call.cost_usd;
            *summary.by_model.entry(call.model.clone()).or_default() += call.cost_usd;
        }
        summary
    }

    /// Atomically empties the ledger and persists the empty state.
    pub fn clear(&self) {
        let mut calls = self.lock();
        calls.clear();
        self.persist(&calls);
    }

    /// A poisoned lock only means another recorder panicked mid-append; the
    /// ledger data itself is still consistent, so recover the guard.
    fn lock(&self) -> MutexGuard<'_, Vec<ApiCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, calls: &[ApiCall]) {
        let Some(path) = &self.storage_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create ledger directory {}: {e}", parent.display());
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(calls) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    error!("Failed to persist cost ledger to {}: {e}", path.display());
                }
            }
            Err(e) => error!("Failed to serialize cost ledger: {e}"),
        }
    }
}

fn load_calls(path: &Path) -> Vec<ApiCall> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(calls) => calls,
            Err(e) => {
                warn!(
                    "Cost ledger at {} is corrupt, starting empty: {e}",
                    path.display()
                );
                Vec::new()
            }
        },
        Err(e) => {
            warn!(
                "Cost ledger at {} is unreadable, starting empty: {e}",
                path.display()
            );
            Vec::new()
        }
    }
}
