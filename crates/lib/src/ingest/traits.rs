use anyhow::Result;
use async_trait::async_trait;

/// The external retrieval engine's insertion boundary.
///
/// The engine builds and queries the knowledge graph; none of that is this
/// crate's concern. This crate supplies exactly one document per call, keyed
/// by a content-addressed id, so a repeated insert of the same link is a
/// repeat to the engine rather than a duplicate.
///
/// Implementations surface failures as `anyhow` errors; the message text is
/// what [`crate::retry::RetryPolicy`] classifies for retryability.
#[async_trait]
pub trait RetrievalEngine: Send + Sync {
    /// Inserts one document.
    ///
    /// # Arguments
    ///
    /// * `document`: The full document text.
    /// * `ids`: The content-addressed identifiers for the document (always
    ///   exactly one from this crate).
    /// * `source_refs`: The originating links, parallel to `ids`.
    async fn insert(&self, document: &str, ids: &[String], source_refs: &[String]) -> Result<()>;
}
