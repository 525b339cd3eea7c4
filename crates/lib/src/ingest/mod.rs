//! # Ingestion Tracking
//!
//! Exactly-once submission of stored items into the external retrieval
//! engine. The engine itself is a collaborator behind the
//! [`RetrievalEngine`] trait; this module owns the state machine around it:
//! which items are pending, how their content-addressed identifiers are
//! derived, and when the store records a confirmed submission.

pub mod tracker;
pub mod traits;

pub use tracker::{
    compose_document, derive_submission_id, submit_one, submit_pending, SubmissionOutcome,
};
pub use traits::RetrievalEngine;
