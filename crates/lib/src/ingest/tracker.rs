//! # Submission Tracker
//!
//! Drives pending items through the retrieval engine. Per item the state
//! machine is minimal: unsubmitted items are submitted and, only on
//! confirmed success, marked in the store; failures leave the item
//! unsubmitted and eligible for a later run. There is no terminal "failed"
//! state — failures are transient by design.

use crate::ingest::traits::RetrievalEngine;
use crate::retry::RetryPolicy;
use crate::store::{Store, StoreError};
use crate::types::Item;
use futures::stream::{self, Stream};
use serde::Serialize;
use tracing::{error, info};

/// Result of submitting a single item.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub item_id: i64,
    pub title: String,
    pub success: bool,
    /// The content-addressed identifier, present on success.
    pub submission_id: Option<String>,
    /// The final error message, present on failure.
    pub error: Option<String>,
}

/// Derives the content-addressed submission identifier for a link.
///
/// Pure and stable: the same link always yields the same 32-character hex
/// digest, which is what makes engine insertion idempotent.
pub fn derive_submission_id(link: &str) -> String {
    format!("{:x}", md5::compute(link.as_bytes()))
}

/// Composes the document payload submitted to the engine. An empty body is
/// fine; title and link alone form a valid minimal document.
pub fn compose_document(title: &str, link: &str, body: Option<&str>) -> String {
    format!("Title: {title}\n\nURL: {link}\n\n{}", body.unwrap_or_default())
}

/// Submits one item through the retry policy.
///
/// On exhausted retries (or a non-retryable engine error) the outcome
/// carries the final error message; store state is never touched here — the
/// caller decides whether and when to persist.
pub async fn submit_one(
    engine: &dyn RetrievalEngine,
    retry: &RetryPolicy,
    item: &Item,
) -> SubmissionOutcome {
    let submission_id = derive_submission_id(&item.link);
    let document = compose_document(&item.title, &item.link, item.body.as_deref());
    let ids = [submission_id.clone()];
    let source_refs = [item.link.clone()];

    match retry
        .run(|| engine.insert(&document, &ids, &source_refs))
        .await
    {
        Ok(()) => {
            info!("Submitted item {}: {}", item.id, item.title);
            SubmissionOutcome {
                item_id: item.id,
                title: item.title.clone(),
                success: true,
                submission_id: Some(submission_id),
                error: None,
            }
        }
        Err(failure) => {
            error!("Failed to submit item {}: {}", item.id, failure.0);
            SubmissionOutcome {
                item_id: item.id,
                title: item.title.clone(),
                success: false,
                submission_id: None,
                error: Some(failure.0),
            }
        }
    }
}

/// Submits up to `limit` pending items, newest publication first, yielding
/// one outcome per item as a lazy, finite stream.
///
/// Each success is recorded in the store *before* the next item starts, so
/// a crash partway through leaves correctly-recorded partial progress: on
/// the next run, marked items are excluded by the pending filter and
/// unmarked ones are retried from scratch. One item's failure never aborts
/// the batch.
pub async fn submit_pending<'a>(
    store: &'a Store,
    engine: &'a dyn RetrievalEngine,
    retry: &'a RetryPolicy,
    limit: Option<u32>,
) -> Result<impl Stream<Item = SubmissionOutcome> + 'a, StoreError> {
    let items = store.items_pending_submission(limit).await?;
    info!("Found {} item(s) pending submission", items.len());

    Ok(stream::unfold(
        items.into_iter(),
        move |mut remaining| async move {
            let item = remaining.next()?;
            let mut outcome = submit_one(engine, retry, &item).await;

            if outcome.success {
                if let Some(id) = outcome.submission_id.clone() {
                    if let Err(e) = store.mark_submitted(item.id, &id).await {
                        // The engine accepted the document but the mark did
                        // not land; the item stays pending and the
                        // content-addressed id keeps the eventual resubmit
                        // idempotent on the engine side.
                        error!("Failed to record submission for item {}: {e}", item.id);
                        outcome.success = false;
                        outcome.error = Some(e.to_string());
                    }
                }
            }

            Some((outcome, remaining))
        },
    ))
}
