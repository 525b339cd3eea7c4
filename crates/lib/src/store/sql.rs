//! # Item Store Schema
//!
//! This module centralizes the DDL for the item store. Keeping the SQL in
//! one place isolates database-specific syntax from the store logic.

pub const CREATE_SOURCES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT UNIQUE NOT NULL,
        title TEXT,
        last_fetched TEXT,
        active INTEGER DEFAULT 1,
        created_at TEXT
    );";

pub const CREATE_ITEMS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        body TEXT,
        link TEXT UNIQUE NOT NULL,
        pub_date TEXT,
        fetched_at TEXT,
        submission_id TEXT,
        FOREIGN KEY (source_id) REFERENCES sources(id)
    );";

/// Auxiliary per-item history. Only `delete_source`'s cascade touches it
/// from this crate.
pub const CREATE_ITEM_HISTORY_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS item_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        action TEXT NOT NULL,
        created_at TEXT,
        FOREIGN KEY (item_id) REFERENCES items(id)
    );";

pub const CREATE_ITEMS_SOURCE_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_items_source_id ON items(source_id);";

pub const CREATE_ITEMS_LINK_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_items_link ON items(link);";

pub const CREATE_ITEMS_PUB_DATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_items_pub_date ON items(pub_date);";

pub const CREATE_ITEM_HISTORY_ITEM_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_item_history_item_id ON item_history(item_id);";

/// Every statement `Store::initialize_schema` runs, in order. Idempotent.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_SOURCES_TABLE,
    CREATE_ITEMS_TABLE,
    CREATE_ITEM_HISTORY_TABLE,
    CREATE_ITEMS_SOURCE_ID_INDEX,
    CREATE_ITEMS_LINK_INDEX,
    CREATE_ITEMS_PUB_DATE_INDEX,
    CREATE_ITEM_HISTORY_ITEM_ID_INDEX,
];
