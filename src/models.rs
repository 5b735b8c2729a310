//! # Database models
//!
//! Data structures that map to the SQLite schema via **Diesel**.
//!
//! Four tables back the core:
//!
//! - [`User`]: one row per registered account.
//! - [`Conversation`]: a thread owned by at most one user.
//! - [`Message`]: one row per turn, ordered by a per-conversation `position`.
//! - [`Session`]: an opaque authentication token with an absolute expiry.
//!
//! All primary keys are opaque text identifiers generated by the core
//! (`USR_`/`CNV_`/`MSG_` prefixes plus 12 random hex characters; session
//! tokens are full random hex). Timestamps are RFC 3339 text, which keeps
//! lexicographic and chronological ordering identical.

use diesel::prelude::*;

/// A registered account.
///
/// Created at registration, mutated only for credential rotation, deleted
/// only by explicit admin action (not exposed here).
#[derive(Queryable, Identifiable, Insertable, Debug, Selectable, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    /// Opaque stable identifier (`USR_<12 hex>`).
    pub id: String,
    /// Unique login name.
    pub username: String,
    /// Salted adaptive-cost hash (argon2 PHC string).
    pub password_hash: String,
    /// Optional contact address.
    pub email: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// A conversation thread.
///
/// `title` is set exactly once, from the first user message truncated to
/// 100 characters, and is immutable afterwards. `user_id` is `None` only in
/// anonymous/single-user mode.
#[derive(Queryable, Identifiable, Insertable, Associations, Debug, Selectable, Clone)]
#[diesel(belongs_to(User))]
#[diesel(table_name = crate::schema::conversations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Conversation {
    /// Opaque globally unique identifier (`CNV_<12 hex>`), generated by the
    /// core, never by the caller.
    pub id: String,
    /// Owning user, if any.
    pub user_id: Option<String>,
    /// Derived topic; `None` until the first user message lands.
    pub title: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One turn in a conversation. Append-only; never mutated or reordered.
#[derive(Queryable, Identifiable, Insertable, Associations, Debug, Selectable, Clone)]
#[diesel(belongs_to(Conversation))]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Message {
    /// Opaque unique identifier (`MSG_<12 hex>`).
    pub id: String,
    /// Owning thread.
    pub conversation_id: String,
    /// Monotonically increasing per conversation, assigned by the store,
    /// starting at 1.
    pub position: i32,
    /// `"user"` or `"assistant"` (see [`Sender`]).
    pub sender: String,
    /// Raw message text.
    pub body: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// An authentication session token.
///
/// Expiry is absolute epoch seconds; every successful validation slides it
/// forward. Expired rows are purged on read.
#[derive(Queryable, Insertable, Debug, Selectable, Clone)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(primary_key(token))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Session {
    /// Opaque unguessable token.
    pub token: String,
    /// Owning user.
    pub user_id: String,
    /// Absolute expiry, epoch seconds.
    pub expires_at: i64,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// The text stored in the `sender` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    /// Parse a stored sender column. Unknown values read back as
    /// `Assistant`; the store only ever writes the two known strings.
    pub fn from_str(s: &str) -> Sender {
        match s {
            "user" => Sender::User,
            _ => Sender::Assistant,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
