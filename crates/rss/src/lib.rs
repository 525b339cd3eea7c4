//! # `feedrag-rss`: Feed Acquisition Plugin
//!
//! This crate pulls raw entries from RSS/Atom feeds, normalizes them, and
//! persists only previously-unseen items through the core `feedrag` store.
//! Deduplication itself lives in the store's UNIQUE link constraint; this
//! crate's job is fetching, tolerant parsing, and normalization.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use feedrag::store::{Store, StoreError};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal failures while acquiring a feed. A malformed-but-readable feed is
/// *not* fatal; see [`FetchedFeed::warning`].
#[derive(Error, Debug)]
pub enum FeedFetchError {
    #[error("failed to fetch feed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// A normalized feed entry, ready for the store.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub body: Option<String>,
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
}

/// Everything one fetch extracted from a feed.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
    /// Present when the document was malformed but entries were still
    /// recovered. Non-empty `entries` plus a warning is a partial success,
    /// not a failure.
    pub warning: Option<String>,
}

/// Per-source outcome of a fetch-and-store pass.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub url: String,
    pub title: Option<String>,
    /// Entries extracted from the feed.
    pub found: usize,
    /// Entries that were actually new to the store.
    pub new: usize,
    pub error: Option<String>,
}

impl FetchResult {
    fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            found: 0,
            new: 0,
            error: Some(error),
        }
    }
}

/// Fetches and parses a single feed, keeping at most `max_items` entries.
///
/// HTTP failures and unrecoverable parse failures are errors. A recoverable
/// malformation (see [`parse_feed_bytes`]) yields the surviving entries
/// plus a warning.
pub async fn fetch_feed(url: &str, max_items: usize) -> Result<FetchedFeed, FeedFetchError> {
    info!("Fetching feed: {url}");
    let content = reqwest::get(url)
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let (feed, warning) = parse_feed_bytes(&content)?;
    if let Some(w) = &warning {
        warn!("Feed {url} has issues but is usable: {w}");
    }

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty());

    let mut entries = Vec::new();
    for entry in feed.entries.iter().take(max_items) {
        match normalize_entry(entry) {
            // The link is the dedup key, so entries without one are useless.
            Some(normalized) => entries.push(normalized),
            None => debug!("Dropping entry without link from {url}"),
        }
    }

    info!("Fetched {} entries from {url}", entries.len());
    Ok(FetchedFeed {
        title,
        entries,
        warning,
    })
}

/// Parses feed bytes, recovering from the most common malformation.
///
/// Non-whitespace content before the document's first tag (server banners,
/// PHP warnings) would make a strict parser reject an otherwise readable
/// feed. The document is parsed from its first tag instead, and when that
/// recovery was needed and entries survived, the malformation is reported
/// as a warning. A document with no tags at all, one the parser cannot
/// read, or a recovered document with zero entries is fatal.
fn parse_feed_bytes(bytes: &[u8]) -> Result<(Feed, Option<String>), FeedFetchError> {
    let Some(start) = bytes.iter().position(|b| *b == b'<') else {
        return Err(FeedFetchError::Parse("no XML document found".to_string()));
    };
    let has_leading_garbage = bytes[..start].iter().any(|b| !b.is_ascii_whitespace());

    let feed = parser::parse(&bytes[start..]).map_err(|e| FeedFetchError::Parse(e.to_string()))?;

    if !has_leading_garbage {
        return Ok((feed, None));
    }
    if feed.entries.is_empty() {
        return Err(FeedFetchError::Parse(
            "malformed feed with no recoverable entries".to_string(),
        ));
    }
    Ok((
        feed,
        Some(format!("{start} bytes of content before document start")),
    ))
}

fn normalize_entry(entry: &Entry) -> Option<FeedEntry> {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .filter(|href| !href.trim().is_empty())?;

    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    // Publication timestamp from `published`, falling back to `updated`.
    // feed-rs already drops out-of-range values to `None`, which matches
    // "unknown date" handling: keep the entry, sort it last.
    let pub_date = entry.published.or(entry.updated);

    Some(FeedEntry {
        title,
        body: extract_body(entry),
        link,
        pub_date,
    })
}

/// Body text preference: full content over summary, first non-empty wins.
/// feed-rs folds an RSS `<description>` into `summary`, so the original
/// content > summary > description order is preserved.
fn extract_body(entry: &Entry) -> Option<String> {
    if let Some(content) = &entry.content {
        if let Some(body) = &content.body {
            if !body.trim().is_empty() {
                return Some(body.clone());
            }
        }
    }
    entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .filter(|s| !s.trim().is_empty())
}

/// Fetches one feed and stores its new entries.
///
/// Resolves or creates the source row (filling in a missing title when the
/// fetch learned one), inserts each normalized entry through the store's
/// dedup gate, and stamps the source's last-fetch time. Feed-level failures
/// fold into the returned [`FetchResult`]; only store failures are errors.
/// Safe to call repeatedly or concurrently for the same URL.
pub async fn fetch_and_store(
    store: &Store,
    url: &str,
    max_items: usize,
) -> Result<FetchResult, StoreError> {
    let fetched = match fetch_feed(url, max_items).await {
        Ok(fetched) => fetched,
        Err(e) => return Ok(FetchResult::failed(url, e.to_string())),
    };

    let source_id = match store.source_by_url(url).await? {
        Some(source) => {
            if source.title.is_none() {
                if let Some(title) = &fetched.title {
                    store.update_source_title(source.id, title).await?;
                }
            }
            source.id
        }
        None => store.add_source(url, fetched.title.as_deref()).await?,
    };

    let found = fetched.entries.len();
    let mut new_count = 0;
    for entry in &fetched.entries {
        let inserted = store
            .add_item(
                source_id,
                &entry.title,
                entry.body.as_deref(),
                &entry.link,
                entry.pub_date,
            )
            .await?;
        if inserted.is_some() {
            new_count += 1;
        }
    }

    store.touch_last_fetched(source_id).await?;

    Ok(FetchResult {
        url: url.to_string(),
        title: fetched.title,
        found,
        new: new_count,
        error: fetched.warning,
    })
}

/// Fetches every active source, yielding one [`FetchResult`] per source as
/// it completes.
///
/// The stream is lazy and finite. One failing source never aborts the
/// batch: its store errors are folded into that source's result and the
/// stream moves on.
pub async fn fetch_all_sources(
    store: &Store,
    max_items: usize,
) -> Result<impl Stream<Item = FetchResult> + '_, StoreError> {
    let sources = store.all_sources(true).await?;
    info!("Fetching {} active source(s)", sources.len());

    Ok(stream::unfold(
        sources.into_iter(),
        move |mut remaining| async move {
            let source = remaining.next()?;
            let result = match fetch_and_store(store, &source.url, max_items).await {
                Ok(result) => result,
                Err(e) => FetchResult::failed(&source.url, e.to_string()),
            };
            Some((result, remaining))
        },
    ))
}

/// Imports source URLs from a text file, one per line; `#` comments and
/// blank lines are ignored. Returns how many sources were new. A missing
/// file is a warning, not an error.
pub async fn import_sources_from_file(store: &Store, path: &Path) -> Result<usize, StoreError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Sources file not found: {} ({e})", path.display());
            return Ok(0);
        }
    };

    let mut new_count = 0;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if store.source_by_url(line).await?.is_none() {
            store.add_source(line, None).await?;
            new_count += 1;
        }
    }

    info!("Imported {new_count} new source(s) from {}", path.display());
    Ok(new_count)
}
