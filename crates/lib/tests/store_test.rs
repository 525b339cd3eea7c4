//! # Item Store Tests
//!
//! Each test uses an isolated in-memory database, so there is no file
//! system cleanup and tests cannot observe each other's state. The focus is
//! the store's two hard invariants: link-level dedup and the one-way
//! submission transition.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{setup_store, setup_tracing};
use feedrag::store::StoreError;
use turso::params;

#[tokio::test]
async fn test_add_item_deduplicates_on_link() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;

    let first = store
        .add_item(source_id, "One", Some("body"), "https://example.com/a", None)
        .await?;
    assert!(first.is_some());

    // Same link again: not an error, just `None`.
    let second = store
        .add_item(source_id, "One again", None, "https://example.com/a", None)
        .await?;
    assert!(second.is_none());

    let stats = store.stats().await?;
    assert_eq!(stats.total_items, 1);
    Ok(())
}

#[tokio::test]
async fn test_dedup_is_global_across_sources() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let first_source = store.add_source("https://a.example/feed", None).await?;
    let second_source = store.add_source("https://b.example/feed", None).await?;

    let link = "https://shared.example/story";
    assert!(store
        .add_item(first_source, "Story", None, link, None)
        .await?
        .is_some());
    // A different source listing the same link collapses to the same item.
    assert!(store
        .add_item(second_source, "Story", None, link, None)
        .await?
        .is_none());

    let item = store.item_by_link(link).await?.expect("item should exist");
    assert_eq!(item.source_id, first_source);
    Ok(())
}

#[tokio::test]
async fn test_add_source_is_idempotent_and_preserves_title() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;

    let id = store
        .add_source("https://example.com/feed", Some("Original Title"))
        .await?;
    let again = store
        .add_source("https://example.com/feed", Some("Different Title"))
        .await?;
    assert_eq!(id, again);

    let source = store.source(id).await?.expect("source should exist");
    assert_eq!(source.title.as_deref(), Some("Original Title"));
    Ok(())
}

#[tokio::test]
async fn test_pending_items_order_newest_first_undated_last() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;

    let now = Utc::now();
    store
        .add_item(source_id, "Old", None, "https://example.com/old", Some(now - Duration::days(2)))
        .await?;
    store
        .add_item(source_id, "Undated", None, "https://example.com/undated", None)
        .await?;
    store
        .add_item(source_id, "New", None, "https://example.com/new", Some(now))
        .await?;

    let pending = store.items_pending_submission(None).await?;
    let titles: Vec<&str> = pending.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["New", "Old", "Undated"]);

    let limited = store.items_pending_submission(Some(2)).await?;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].title, "New");
    Ok(())
}

#[tokio::test]
async fn test_mark_submitted_is_one_way() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;
    let item_id = store
        .add_item(source_id, "One", None, "https://example.com/a", None)
        .await?
        .expect("fresh link should insert");

    store.mark_submitted(item_id, "abc123").await?;
    let item = store.item(item_id).await?.expect("item should exist");
    assert_eq!(item.submission_id.as_deref(), Some("abc123"));

    // Same value again: no-op.
    store.mark_submitted(item_id, "abc123").await?;

    // Different value: rejected loudly.
    let conflict = store.mark_submitted(item_id, "zzz999").await;
    assert!(matches!(
        conflict,
        Err(StoreError::SubmissionConflict { existing, .. }) if existing == "abc123"
    ));
    Ok(())
}

#[tokio::test]
async fn test_pending_and_submitted_accounting() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;

    let mut ids = Vec::new();
    for n in 0..3 {
        let id = store
            .add_item(source_id, "Item", None, &format!("https://example.com/{n}"), None)
            .await?
            .expect("fresh link should insert");
        ids.push(id);
    }
    assert_eq!(store.pending_count().await?, 3);
    assert_eq!(store.submitted_count().await?, 0);

    store.mark_submitted(ids[0], "id0").await?;
    assert_eq!(store.pending_count().await?, 2);
    assert_eq!(store.submitted_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_reset_submission_returns_item_to_pending() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;
    let item_id = store
        .add_item(source_id, "One", None, "https://example.com/a", None)
        .await?
        .expect("fresh link should insert");

    store.mark_submitted(item_id, "abc123").await?;
    assert_eq!(store.pending_count().await?, 0);

    store.reset_submission(item_id).await?;
    assert_eq!(store.pending_count().await?, 1);
    // After the reset a different id may be recorded.
    store.mark_submitted(item_id, "def456").await?;
    Ok(())
}

#[tokio::test]
async fn test_writes_against_missing_ids_are_not_found() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;

    assert!(matches!(
        store.touch_last_fetched(999).await,
        Err(StoreError::SourceNotFound(999))
    ));
    assert!(matches!(
        store.update_source_title(999, "x").await,
        Err(StoreError::SourceNotFound(999))
    ));
    assert!(matches!(
        store.add_item(999, "t", None, "https://example.com/a", None).await,
        Err(StoreError::SourceNotFound(999))
    ));
    assert!(matches!(
        store.mark_submitted(999, "abc").await,
        Err(StoreError::ItemNotFound(999))
    ));
    Ok(())
}

#[tokio::test]
async fn test_deactivate_excludes_source_from_active_listing() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let id = store.add_source("https://example.com/feed", None).await?;

    assert_eq!(store.all_sources(true).await?.len(), 1);
    store.deactivate_source(id).await?;
    assert_eq!(store.all_sources(true).await?.len(), 0);
    assert_eq!(store.all_sources(false).await?.len(), 1);

    store.reactivate_source(id).await?;
    assert_eq!(store.all_sources(true).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_source_cascades_items_and_history() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let source_id = store.add_source("https://example.com/feed", None).await?;
    let item_id = store
        .add_item(source_id, "One", None, "https://example.com/a", None)
        .await?
        .expect("fresh link should insert");

    // Seed a history row the way an outer layer would.
    let conn = store.db.connect()?;
    conn.execute(
        "INSERT INTO item_history (item_id, action) VALUES (?, 'read')",
        params![item_id],
    )
    .await?;

    store.delete_source(source_id).await?;

    assert!(store.source(source_id).await?.is_none());
    assert!(store.item(item_id).await?.is_none());
    let mut rows = conn
        .query("SELECT COUNT(*) FROM item_history", ())
        .await?;
    let row = rows.next().await?.expect("count row");
    assert!(matches!(row.get_value(0)?, turso::Value::Integer(0)));
    Ok(())
}

#[tokio::test]
async fn test_last_fetched_stamp_is_persisted() -> Result<()> {
    setup_tracing();
    let store = setup_store().await?;
    let id = store.add_source("https://example.com/feed", None).await?;

    let before = store.source(id).await?.expect("source should exist");
    assert!(before.last_fetched.is_none());

    store.touch_last_fetched(id).await?;
    let after = store.source(id).await?.expect("source should exist");
    assert!(after.last_fetched.is_some());
    Ok(())
}
