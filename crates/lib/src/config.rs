//! # Configuration
//!
//! Environment-driven settings with sensible defaults. A `.env` file is
//! honored when present.

use crate::constants::{DEFAULT_DB_FILE, DEFAULT_LEDGER_FILE};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the SQLite item store.
    pub db_path: String,
    /// Path of the cost ledger's backing file.
    pub ledger_path: String,
    pub embeddings_api_url: Option<String>,
    pub embeddings_model: String,
    pub embeddings_api_key: Option<String>,
}

impl AppConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            db_path: env::var("FEEDRAG_DB_FILE").unwrap_or_else(|_| DEFAULT_DB_FILE.to_string()),
            ledger_path: env::var("FEEDRAG_LEDGER_FILE")
                .unwrap_or_else(|_| DEFAULT_LEDGER_FILE.to_string()),
            embeddings_api_url: env::var("EMBEDDINGS_API_URL").ok(),
            embeddings_model: env::var("EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embeddings_api_key: env::var("EMBEDDINGS_API_KEY").ok(),
        }
    }
}
