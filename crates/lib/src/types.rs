//! # Core Data Types
//!
//! Plain records returned by the item store. Row mapping from the database
//! lives next to the SQL in [`crate::store`].

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An external feed, identified by its URL.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub id: i64,
    pub url: String,
    /// Display title, filled in lazily once a fetch learns it.
    pub title: Option<String>,
    pub last_fetched: Option<DateTime<Utc>>,
    /// Inactive sources are skipped by bulk fetches but keep their items.
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A deduplicated unit of content, identified globally by its link.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub body: Option<String>,
    /// Canonical link; the sole deduplication key.
    pub link: String,
    /// Publication timestamp when the feed carried one; unknown dates sort
    /// last in every ordered view.
    pub pub_date: Option<DateTime<Utc>>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// `None` until the item has been submitted to the retrieval engine,
    /// then the content-addressed identifier assigned at submission time.
    pub submission_id: Option<String>,
}

/// Aggregate counters over the store.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub total_sources: u64,
    pub active_sources: u64,
    pub total_items: u64,
    pub pending_items: u64,
    pub submitted_items: u64,
}
