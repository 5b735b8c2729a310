//! Application configuration loading.
//!
//! Settings are a single YAML document; every tuning knob has a serde
//! default so a minimal file only needs the API endpoint and model names:
//!
//! ```yaml
//! api_base: "http://localhost:11434/v1"
//! api_key: ""
//! generation_model: "llama3:70b"
//! embedding_model: "nomic-embed-text-v1.5"
//! db_url: "attache.db"
//! ```
//!
//! The recognized options and their defaults mirror the deployment this core
//! was built for: retrieval top-K (2), generation temperature (0.6) and max
//! tokens (400), cache-similarity threshold (0.8), session timeout (3600 s),
//! suggestions per request (2).

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::AssistantError;

/// Represents the application's configuration.
///
/// Construct by loading a YAML file with [`load_config`], or literally in
/// tests.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct AssistantConfig {
    /// Base URL of the OpenAI-compatible endpoint (e.g. `http://localhost:11434/v1`).
    pub api_base: String,

    /// API key; may be empty when talking to a local, unsecured backend.
    pub api_key: String,

    /// Model identifier used for answer/suggestion generation.
    pub generation_model: String,

    /// Model identifier used for chunk and query embeddings.
    pub embedding_model: String,

    /// SQLite database location (users, conversations, messages, sessions).
    pub db_url: String,

    /// Directory holding the question cache and the document index.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// How many chunks the retriever returns per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Sampling temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per generated response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Jaccard similarity floor for fuzzy cache hits.
    #[serde(default = "default_similarity_threshold")]
    pub cache_similarity_threshold: f64,

    /// Sliding session lifetime, in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: i64,

    /// Response suggestions generated per inquiry.
    #[serde(default = "default_num_suggestions")]
    pub num_suggestions: usize,
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

fn default_top_k() -> usize {
    2
}

fn default_temperature() -> f32 {
    0.6
}

fn default_max_tokens() -> u32 {
    400
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_session_timeout() -> i64 {
    3600
}

fn default_num_suggestions() -> usize {
    2
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// Fails if the file cannot be read or the YAML does not deserialize into
/// an [`AssistantConfig`].
pub fn load_config(file: &str) -> Result<AssistantConfig, AssistantError> {
    tracing::debug!("Loading config from {file}");
    let content = fs::read_to_string(file)?;
    let config: AssistantConfig =
        serde_yaml::from_str(&content).map_err(|e| AssistantError::Config(e.to_string()))?;
    Ok(config)
}

/// Open a SQLite connection to `db_url`.
///
/// A busy timeout is set so that a write transaction blocked by a
/// concurrent writer waits for the lock instead of failing immediately
/// with `SQLITE_BUSY`.
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection, AssistantError> {
    let mut connection = SqliteConnection::establish(db_url)?;
    connection.batch_execute("PRAGMA busy_timeout = 5000;")?;
    Ok(connection)
}
