//! # Attaché (library root)
//!
//! Attaché is the orchestration core of a business-document question-answering
//! assistant. It owns everything with actual invariants:
//!
//! - Durable conversation threads and messages over SQLite (`store`,
//!   `conversation`, `models`, `schema`).
//! - User accounts and token-based sessions with sliding expiry (`auth`).
//! - A fuzzy question/answer cache keyed by normalized-text hashes (`cache`).
//! - Retrieval-augmented answer and suggestion generation with a layered
//!   fallback chain (`orchestrator`, `index`, `client`, `prompts`,
//!   `suggestions`).
//! - Per-user UI state with one-shot fields (`session_state`) and the
//!   inquiry payload handed over by the OCR collaborator (`inquiry`).
//!
//! The presentation layer (whatever renders chat bubbles and upload buttons)
//! sits on top of [`assistant::Assistant`] and never touches the store or the
//! model clients directly. PDF extraction, chunking, and the inference
//! engines themselves are external collaborators reached over a local
//! OpenAI-compatible HTTP API.
//!
//! ## Configuration layout
//! Runtime settings live in a YAML file under the per-platform configuration
//! directory (see [`config_dir`]), e.g. `~/.config/attache/config.yaml` on
//! Linux. The SQLite database, the question cache, and the document index
//! live wherever that file points them.

use directories::ProjectDirs;
use std::error::Error;

pub mod assistant;
pub mod auth;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod index;
pub mod inquiry;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod schema;
pub mod session_state;
pub mod store;
pub mod suggestions;

/// Return the per-platform configuration directory used by Attaché.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "attache", "attache")`, so you get the right place on each OS
/// (e.g., `~/Library/Application Support/com.attache.attache` on macOS,
/// `~/.config/attache` on Linux).
///
/// The directory is **not** created by this function; callers that need it
/// should create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be
/// determined (rare, but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "attache", "attache")
        .ok_or("Unable to determine config directory")?;

    Ok(proj_dirs.config_dir().to_path_buf())
}
