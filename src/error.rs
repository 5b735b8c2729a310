//! Crate-wide error taxonomy.
//!
//! Three families live here:
//!
//! - **User-input errors** (`DuplicateUser`, `InvalidCredentials`): surfaced
//!   verbatim to the caller, never retried.
//! - **Transient collaborator errors** (`RetrievalUnavailable`,
//!   `GenerationUnavailable`, `EmptyGeneration`): handled by the one-hop
//!   fallback in the orchestrator; past that boundary they surface wrapped in
//!   `GenerationFailure` with the triggering cause attached.
//! - **Store/infrastructure errors** (`Database`, `Io`, `Config`): propagate
//!   unmodified through the conversation layer.
//!
//! Session expiry is deliberately *not* an error: `SessionAuth::validate`
//! returns `false` and the caller routes to re-authentication.

use thiserror::Error;

/// The primary error type for the Attaché core.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// A user with this username already exists.
    #[error("username already taken: {0}")]
    DuplicateUser(String),

    /// Username/password pair did not check out. Never reveals which half
    /// was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// A message was addressed to a conversation id the store has never
    /// seen. The conversation manager absorbs this by auto-creating the
    /// thread; the store itself is strict.
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    /// The document retriever could not be reached or failed mid-call.
    #[error("document retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The text-generation backend could not be reached or failed mid-call.
    #[error("text generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The model returned an empty or sub-minimal response.
    #[error("model returned an empty or truncated response")]
    EmptyGeneration,

    /// Terminal failure after the fallback chain is exhausted. Carries the
    /// error that sank the final attempt.
    #[error("response generation failed: {source}")]
    GenerationFailure {
        #[source]
        source: Box<AssistantError>,
    },

    /// The retrieval index has no documents yet; nothing to ground on.
    #[error("document index is not initialized; ingest documents first")]
    IndexNotReady,

    /// An error from the underlying database library.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failure establishing the SQLite connection.
    #[error("database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// Password hashing or verification failed internally (not a mismatch).
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// Filesystem error (cache file, index file, config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration, cache, or index payload.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    /// Wrap `self` as the terminal failure of an exhausted fallback chain.
    pub fn into_terminal(self) -> AssistantError {
        AssistantError::GenerationFailure {
            source: Box::new(self),
        }
    }
}
