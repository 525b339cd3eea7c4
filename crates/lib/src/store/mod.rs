//! # Item Store
//!
//! Durable persistence for sources (feeds) and their deduplicated items,
//! backed by a local SQLite database via Turso.
//!
//! Two invariants are enforced here and nowhere else:
//!
//! - **Link uniqueness**: `items.link` carries a UNIQUE constraint, and
//!   inserts go through `ON CONFLICT(link) DO NOTHING`. Deduplication is
//!   therefore serialized by the database, not by an application lock, which
//!   makes concurrent fetches of overlapping feeds safe.
//! - **One-way submission marking**: `submission_id` moves from NULL to a
//!   value at most once. A repeated mark with the same value is a no-op; a
//!   mark with a different value is rejected loudly.

use crate::types::{Item, Source, StoreStats};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};
use turso::{params, Connection, Database, Value as TursoValue};

pub mod sql;

/// Errors surfaced by store operations.
///
/// Duplicate inserts are *not* errors: `add_source` resolves to the existing
/// row and `add_item` returns `None`. The `NotFound` variants flag writes
/// against ids that do not exist, which is a programmer error and is never
/// retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database operation failed: {0}")]
    Database(#[from] turso::Error),
    #[error("source {0} not found")]
    SourceNotFound(i64),
    #[error("item {0} not found")]
    ItemNotFound(i64),
    #[error("item {item_id} is already submitted as {existing}")]
    SubmissionConflict { item_id: i64, existing: String },
    #[error("unexpected store state: {0}")]
    Unexpected(String),
}

/// A handle to the item store.
///
/// Holds a `turso::Database`, which manages a connection pool. Cloning the
/// store shares the same underlying database, so one instance can be handed
/// to concurrent tasks.
#[derive(Clone)]
pub struct Store {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl Store {
    /// Opens (or creates) the store at `db_path`.
    ///
    /// Use `":memory:"` for an isolated in-memory database; to share an
    /// in-memory store across handles, clone one `Store` instead of calling
    /// `new` twice.
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let db = turso::Builder::new_local(db_path).build().await?;

        // WAL improves concurrency for file-backed databases and is a no-op
        // for in-memory ones. PRAGMA returns a row, so `query` it.
        let conn = db.connect()?;
        conn.query("PRAGMA journal_mode=WAL;", ()).await?;

        Ok(Self { db })
    }

    /// Ensures all tables and indexes exist. Idempotent; safe on every
    /// startup.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    // --- Sources ---

    /// Inserts a source, or resolves the existing row if the URL is already
    /// known. Never errors on duplicates and never modifies an existing row.
    pub async fn add_source(&self, url: &str, title: Option<&str>) -> Result<i64, StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "INSERT INTO sources (url, title, created_at) VALUES (?, ?, ?)
                 ON CONFLICT(url) DO NOTHING",
                params![url, title, now_rfc3339()],
            )
            .await?;
        if changes > 0 {
            info!("Added new source: {url}");
        }

        let mut rows = conn
            .query("SELECT id FROM sources WHERE url = ?", params![url])
            .await?;
        match rows.next().await? {
            Some(row) => require_integer(row.get_value(0)?),
            None => Err(StoreError::Unexpected(format!(
                "source row for {url} vanished after insert"
            ))),
        }
    }

    /// Fetches a source by id.
    pub async fn source(&self, source_id: i64) -> Result<Option<Source>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, url, title, last_fetched, active, created_at
                 FROM sources WHERE id = ?",
                params![source_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(source_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Fetches a source by URL.
    pub async fn source_by_url(&self, url: &str) -> Result<Option<Source>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, url, title, last_fetched, active, created_at
                 FROM sources WHERE url = ?",
                params![url],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(source_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Lists sources, optionally restricted to active ones.
    pub async fn all_sources(&self, active_only: bool) -> Result<Vec<Source>, StoreError> {
        let conn = self.db.connect()?;
        let sql = if active_only {
            "SELECT id, url, title, last_fetched, active, created_at
             FROM sources WHERE active = 1 ORDER BY id"
        } else {
            "SELECT id, url, title, last_fetched, active, created_at
             FROM sources ORDER BY id"
        };
        let mut rows = conn.query(sql, ()).await?;
        let mut sources = Vec::new();
        while let Some(row) = rows.next().await? {
            sources.push(source_from_row(&row)?);
        }
        Ok(sources)
    }

    /// Updates a source's display title.
    pub async fn update_source_title(&self, source_id: i64, title: &str) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "UPDATE sources SET title = ? WHERE id = ?",
                params![title, source_id],
            )
            .await?;
        if changes == 0 {
            return Err(StoreError::SourceNotFound(source_id));
        }
        Ok(())
    }

    /// Stamps the source's last successful fetch time with the current time.
    pub async fn touch_last_fetched(&self, source_id: i64) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "UPDATE sources SET last_fetched = ? WHERE id = ?",
                params![now_rfc3339(), source_id],
            )
            .await?;
        if changes == 0 {
            return Err(StoreError::SourceNotFound(source_id));
        }
        Ok(())
    }

    /// Soft-disables a source; bulk fetches skip it, its items remain.
    pub async fn deactivate_source(&self, source_id: i64) -> Result<(), StoreError> {
        self.set_source_active(source_id, false).await
    }

    /// Re-enables a previously deactivated source.
    pub async fn reactivate_source(&self, source_id: i64) -> Result<(), StoreError> {
        self.set_source_active(source_id, true).await
    }

    async fn set_source_active(&self, source_id: i64, active: bool) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "UPDATE sources SET active = ? WHERE id = ?",
                params![i64::from(active), source_id],
            )
            .await?;
        if changes == 0 {
            return Err(StoreError::SourceNotFound(source_id));
        }
        Ok(())
    }

    /// Hard-deletes a source together with its items and their history, in
    /// one transaction.
    pub async fn delete_source(&self, source_id: i64) -> Result<(), StoreError> {
        let mut conn = self.db.connect()?;
        if !source_exists(&conn, source_id).await? {
            return Err(StoreError::SourceNotFound(source_id));
        }

        let tx = conn.transaction().await?;
        tx.execute(
            "DELETE FROM item_history
             WHERE item_id IN (SELECT id FROM items WHERE source_id = ?)",
            params![source_id],
        )
        .await?;
        tx.execute("DELETE FROM items WHERE source_id = ?", params![source_id])
            .await?;
        tx.execute("DELETE FROM sources WHERE id = ?", params![source_id])
            .await?;
        tx.commit().await?;

        info!("Deleted source {source_id} and its items");
        Ok(())
    }

    // --- Items ---

    /// Inserts an item, returning its id, or `None` if the link is already
    /// stored anywhere.
    ///
    /// This is the dedup gate: the insert races on the UNIQUE constraint for
    /// `link`, so two concurrent calls with the same link resolve to exactly
    /// one stored row with no pre-check window.
    pub async fn add_item(
        &self,
        source_id: i64,
        title: &str,
        body: Option<&str>,
        link: &str,
        pub_date: Option<DateTime<Utc>>,
    ) -> Result<Option<i64>, StoreError> {
        let conn = self.db.connect()?;
        if !source_exists(&conn, source_id).await? {
            return Err(StoreError::SourceNotFound(source_id));
        }

        let changes = conn
            .execute(
                "INSERT INTO items (source_id, title, body, link, pub_date, fetched_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(link) DO NOTHING",
                params![
                    source_id,
                    title,
                    body,
                    link,
                    pub_date.map(|d| d.to_rfc3339()),
                    now_rfc3339()
                ],
            )
            .await?;

        if changes == 0 {
            debug!("Duplicate link, skipping: {link}");
            return Ok(None);
        }

        let mut rows = conn
            .query("SELECT id FROM items WHERE link = ?", params![link])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(require_integer(row.get_value(0)?)?)),
            None => Err(StoreError::Unexpected(format!(
                "item row for {link} vanished after insert"
            ))),
        }
    }

    /// Fetches an item by id.
    pub async fn item(&self, item_id: i64) -> Result<Option<Item>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("{ITEM_COLUMNS} WHERE id = ?"),
                params![item_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Fetches an item by its link.
    pub async fn item_by_link(&self, link: &str) -> Result<Option<Item>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(&format!("{ITEM_COLUMNS} WHERE link = ?"), params![link])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Lists a source's items, newest publication first, undated last.
    pub async fn items_for_source(
        &self,
        source_id: i64,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "{ITEM_COLUMNS} WHERE source_id = ? ORDER BY pub_date DESC LIMIT {limit}"
                ),
                params![source_id],
            )
            .await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(item_from_row(&row)?);
        }
        Ok(items)
    }

    /// Items not yet submitted to the retrieval engine, newest publication
    /// first (SQLite sorts NULL `pub_date` last under DESC).
    pub async fn items_pending_submission(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<Item>, StoreError> {
        let conn = self.db.connect()?;
        let mut query = format!(
            "{ITEM_COLUMNS} WHERE submission_id IS NULL ORDER BY pub_date DESC"
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }
        let mut rows = conn.query(&query, ()).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(item_from_row(&row)?);
        }
        Ok(items)
    }

    /// Count of items awaiting submission.
    pub async fn pending_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM items WHERE submission_id IS NULL")
            .await
    }

    /// Count of items already submitted.
    pub async fn submitted_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM items WHERE submission_id IS NOT NULL")
            .await
    }

    /// Records a confirmed submission: the one-way NULL→value transition.
    ///
    /// Repeating the call with the same identifier is a no-op. A call with a
    /// *different* identifier means two code paths disagree about the item's
    /// content address and is rejected as [`StoreError::SubmissionConflict`].
    pub async fn mark_submitted(
        &self,
        item_id: i64,
        submission_id: &str,
    ) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "UPDATE items SET submission_id = ?
                 WHERE id = ? AND (submission_id IS NULL OR submission_id = ?)",
                params![submission_id, item_id, submission_id],
            )
            .await?;
        if changes > 0 {
            debug!("Marked item {item_id} submitted as {submission_id}");
            return Ok(());
        }

        // Zero changes: either the item does not exist, or it already
        // carries a different submission id.
        let mut rows = conn
            .query(
                "SELECT submission_id FROM items WHERE id = ?",
                params![item_id],
            )
            .await?;
        match rows.next().await? {
            None => Err(StoreError::ItemNotFound(item_id)),
            Some(row) => {
                let existing = text_or_empty(row.get_value(0)?);
                Err(StoreError::SubmissionConflict { item_id, existing })
            }
        }
    }

    /// Explicitly reverts an item to unsubmitted. The only sanctioned way to
    /// clear a submission mark.
    pub async fn reset_submission(&self, item_id: i64) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                "UPDATE items SET submission_id = NULL WHERE id = ?",
                params![item_id],
            )
            .await?;
        if changes == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }
        Ok(())
    }

    /// Aggregate counters across the store.
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            total_sources: self.count("SELECT COUNT(*) FROM sources").await?,
            active_sources: self
                .count("SELECT COUNT(*) FROM sources WHERE active = 1")
                .await?,
            total_items: self.count("SELECT COUNT(*) FROM items").await?,
            pending_items: self.pending_count().await?,
            submitted_items: self.submitted_count().await?,
        })
    }

    async fn count(&self, query: &str) -> Result<u64, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(query, ()).await?;
        match rows.next().await? {
            Some(row) => Ok(require_integer(row.get_value(0)?)? as u64),
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

const ITEM_COLUMNS: &str = "SELECT id, source_id, title, body, link, pub_date, fetched_at, \
                            submission_id FROM items";

async fn source_exists(conn: &Connection, source_id: i64) -> Result<bool, StoreError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM sources WHERE id = ? LIMIT 1",
            params![source_id],
        )
        .await?;
    Ok(rows.next().await?.is_some())
}

// --- Row mapping ---

fn source_from_row(row: &turso::Row) -> Result<Source, StoreError> {
    Ok(Source {
        id: require_integer(row.get_value(0)?)?,
        url: text_or_empty(row.get_value(1)?),
        title: text_opt(row.get_value(2)?),
        last_fetched: timestamp_opt(row.get_value(3)?),
        active: matches!(row.get_value(4)?, TursoValue::Integer(i) if i != 0),
        created_at: timestamp_opt(row.get_value(5)?),
    })
}

fn item_from_row(row: &turso::Row) -> Result<Item, StoreError> {
    Ok(Item {
        id: require_integer(row.get_value(0)?)?,
        source_id: require_integer(row.get_value(1)?)?,
        title: text_or_empty(row.get_value(2)?),
        body: text_opt(row.get_value(3)?),
        link: text_or_empty(row.get_value(4)?),
        pub_date: timestamp_opt(row.get_value(5)?),
        fetched_at: timestamp_opt(row.get_value(6)?),
        submission_id: text_opt(row.get_value(7)?),
    })
}

fn require_integer(value: TursoValue) -> Result<i64, StoreError> {
    match value {
        TursoValue::Integer(i) => Ok(i),
        other => Err(StoreError::Unexpected(format!(
            "expected integer column, got {other:?}"
        ))),
    }
}

fn text_opt(value: TursoValue) -> Option<String> {
    match value {
        TursoValue::Text(s) => Some(s),
        _ => None,
    }
}

fn text_or_empty(value: TursoValue) -> String {
    text_opt(value).unwrap_or_default()
}

fn timestamp_opt(value: TursoValue) -> Option<DateTime<Utc>> {
    text_opt(value).and_then(|s| parse_timestamp(&s))
}

/// Parses our own RFC 3339 stamps, tolerating the plain SQLite
/// `CURRENT_TIMESTAMP` format for rows written by other tools.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
