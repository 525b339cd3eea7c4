//! # Shared Constants
//!
//! Centralized defaults shared across the `feedrag` workspace, so that the
//! library, the RSS plugin, and the tests agree on paths without magic
//! strings.

/// The root directory for all local state.
pub const DB_DIR: &str = "db";

/// The default path for the main application SQLite database.
pub const DEFAULT_DB_FILE: &str = "db/feedrag.db";

/// The default path for the cost ledger's backing file.
pub const DEFAULT_LEDGER_FILE: &str = "db/cost_history.json";

/// How many entries a single feed fetch considers by default.
pub const DEFAULT_MAX_ITEMS_PER_FETCH: usize = 50;
