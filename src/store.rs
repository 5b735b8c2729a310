//! # Relational store
//!
//! The sole writer of persisted entities. Every mutating call runs inside a
//! transaction and commits before returning, so callers may assume
//! durability on return — there is no write-ahead batching.
//!
//! ## Schema bootstrap
//! [`Store::open`] creates the four tables with `CREATE TABLE IF NOT EXISTS`
//! DDL, so pointing the store at an empty file is enough to get a working
//! database.
//!
//! ## Append atomicity
//! [`Store::append_message`] computes `max(position) + 1` and inserts inside
//! a single `BEGIN IMMEDIATE` transaction. SQLite's writer lock makes the
//! read-max-then-insert sequence exclusive, so two concurrent appends to the
//! same conversation can never compute the same position — they serialize.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::dsl::max;
use diesel::prelude::*;
use tracing::debug;

use crate::error::AssistantError;
use crate::models::{Conversation, Message, Sender, Session, User};
use crate::schema::{conversations, messages, sessions, users};

const DDL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    email TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    title TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY(user_id) REFERENCES users (id)
);
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    sender TEXT NOT NULL CHECK(sender IN ('user','assistant')),
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY(conversation_id) REFERENCES conversations (id)
);
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at BIGINT NOT NULL,
    FOREIGN KEY(user_id) REFERENCES users (id)
);
";

/// 12 random hex characters, the tail of a v4 UUID.
pub(crate) fn short_hex() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Durable CRUD plus typed helper operations over SQLite.
pub struct Store {
    connection: SqliteConnection,
}

impl Store {
    /// Open (and if necessary initialize) the database at `db_url`.
    pub fn open(db_url: &str) -> Result<Self, AssistantError> {
        let mut connection = crate::config::establish_connection(db_url)?;
        connection
            .batch_execute(DDL)
            .map_err(AssistantError::Database)?;
        Ok(Self { connection })
    }

    // --- users -------------------------------------------------------------

    /// Insert a new user row.
    ///
    /// Fails with [`AssistantError::DuplicateUser`] if the username exists.
    /// The existence check runs before the insert; the narrow race window
    /// under concurrent writers is accepted (the UNIQUE constraint still
    /// backstops it as a `Database` error).
    pub fn create_user(
        &mut self,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<User, AssistantError> {
        let user = User {
            id: format!("USR_{}", short_hex()),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: email.map(str::to_string),
            created_at: now_rfc3339(),
        };

        self.connection.transaction(|conn| {
            let existing: Option<User> = users::table
                .filter(users::username.eq(username))
                .first(conn)
                .optional()?;
            if existing.is_some() {
                return Err(AssistantError::DuplicateUser(username.to_string()));
            }

            diesel::insert_into(users::table)
                .values(&user)
                .returning(User::as_returning())
                .get_result(conn)
                .map_err(AssistantError::Database)
        })
    }

    /// Look up a user by username and verify the plaintext password against
    /// the stored argon2 hash.
    ///
    /// Returns `None` on a missing user or a mismatch. The missing-user path
    /// returns early and therefore skips the hash verification, so the
    /// no-enumeration property is best effort, not a strict guarantee.
    pub fn verify_credentials(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AssistantError> {
        let user: Option<User> = users::table
            .filter(users::username.eq(username))
            .first(&mut self.connection)
            .optional()?;

        let Some(user) = user else {
            return Ok(None);
        };

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AssistantError::PasswordHash(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(Some(user)),
            Err(argon2::password_hash::Error::Password) => Ok(None),
            Err(e) => Err(AssistantError::PasswordHash(e.to_string())),
        }
    }

    // --- conversations -----------------------------------------------------

    /// Create a conversation row, idempotently.
    ///
    /// If a conversation with `id` already exists it is returned unmodified;
    /// there is no duplicate-create error.
    pub fn create_conversation(
        &mut self,
        id: &str,
        title: Option<&str>,
        owner: Option<&str>,
    ) -> Result<Conversation, AssistantError> {
        self.connection.transaction(|conn| {
            let existing: Option<Conversation> = conversations::table
                .find(id)
                .first(conn)
                .optional()?;
            if let Some(existing) = existing {
                debug!(conversation = id, "create_conversation: already exists");
                return Ok(existing);
            }

            let conversation = Conversation {
                id: id.to_string(),
                user_id: owner.map(str::to_string),
                title: title.map(str::to_string),
                created_at: now_rfc3339(),
            };
            diesel::insert_into(conversations::table)
                .values(&conversation)
                .returning(Conversation::as_returning())
                .get_result(conn)
                .map_err(AssistantError::Database)
        })
    }

    /// Fetch one conversation row, if present.
    pub fn get_conversation(&mut self, id: &str) -> Result<Option<Conversation>, AssistantError> {
        Ok(conversations::table
            .find(id)
            .first(&mut self.connection)
            .optional()?)
    }

    /// All conversations, newest first, optionally filtered by owner.
    pub fn list_conversations(
        &mut self,
        owner: Option<&str>,
    ) -> Result<Vec<Conversation>, AssistantError> {
        let mut query = conversations::table.into_boxed();
        if let Some(owner) = owner {
            query = query.filter(conversations::user_id.eq(owner.to_string()));
        }
        Ok(query
            .order(conversations::created_at.desc())
            .load(&mut self.connection)?)
    }

    /// Write the title if and only if none has been set. A no-op when a
    /// title already exists.
    pub fn set_title_once(&mut self, id: &str, title: &str) -> Result<(), AssistantError> {
        let updated = diesel::update(
            conversations::table
                .find(id)
                .filter(conversations::title.is_null()),
        )
        .set(conversations::title.eq(title))
        .execute(&mut self.connection)?;
        if updated > 0 {
            debug!(conversation = id, "title set");
        }
        Ok(())
    }

    /// Delete a conversation and all of its messages.
    pub fn delete_conversation(&mut self, id: &str) -> Result<(), AssistantError> {
        self.connection.transaction(|conn| {
            diesel::delete(messages::table.filter(messages::conversation_id.eq(id)))
                .execute(conn)?;
            diesel::delete(conversations::table.find(id)).execute(conn)?;
            Ok(())
        })
    }

    // --- messages ----------------------------------------------------------

    /// Append a message at `max(position) + 1`.
    ///
    /// Fails with [`AssistantError::UnknownConversation`] when the thread
    /// does not exist — callers must create it first (or go through the
    /// conversation manager, which auto-creates).
    pub fn append_message(
        &mut self,
        conversation_id: &str,
        sender: Sender,
        body: &str,
    ) -> Result<i32, AssistantError> {
        self.connection.immediate_transaction(|conn| {
            let exists: Option<String> = conversations::table
                .find(conversation_id)
                .select(conversations::id)
                .first(conn)
                .optional()?;
            if exists.is_none() {
                return Err(AssistantError::UnknownConversation(
                    conversation_id.to_string(),
                ));
            }

            let last: Option<i32> = messages::table
                .filter(messages::conversation_id.eq(conversation_id))
                .select(max(messages::position))
                .first(conn)?;
            let position = last.unwrap_or(0) + 1;

            let message = Message {
                id: format!("MSG_{}", short_hex()),
                conversation_id: conversation_id.to_string(),
                position,
                sender: sender.as_str().to_string(),
                body: body.to_string(),
                created_at: now_rfc3339(),
            };
            diesel::insert_into(messages::table)
                .values(&message)
                .execute(conn)?;

            debug!(conversation = conversation_id, position, "message appended");
            Ok(position)
        })
    }

    /// All messages of a conversation, ascending by position. An unknown id
    /// yields an empty vec, not an error.
    pub fn list_messages(
        &mut self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, AssistantError> {
        Ok(messages::table
            .filter(messages::conversation_id.eq(conversation_id))
            .order(messages::position.asc())
            .load(&mut self.connection)?)
    }

    /// Number of messages in a conversation.
    pub fn count_messages(&mut self, conversation_id: &str) -> Result<i64, AssistantError> {
        Ok(messages::table
            .filter(messages::conversation_id.eq(conversation_id))
            .count()
            .get_result(&mut self.connection)?)
    }

    // --- sessions ----------------------------------------------------------

    /// Issue a fresh session token for `user_id` expiring at `expires_at`
    /// (epoch seconds).
    pub fn create_session(
        &mut self,
        user_id: &str,
        expires_at: i64,
    ) -> Result<Session, AssistantError> {
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            expires_at,
        };
        diesel::insert_into(sessions::table)
            .values(&session)
            .execute(&mut self.connection)?;
        Ok(session)
    }

    /// Look up a session row by token.
    pub fn find_session(&mut self, token: &str) -> Result<Option<Session>, AssistantError> {
        Ok(sessions::table
            .find(token)
            .first(&mut self.connection)
            .optional()?)
    }

    /// Slide a session's expiry forward.
    pub fn extend_session(&mut self, token: &str, new_expiry: i64) -> Result<(), AssistantError> {
        diesel::update(sessions::table.find(token))
            .set(sessions::expires_at.eq(new_expiry))
            .execute(&mut self.connection)?;
        Ok(())
    }

    /// Delete a session row unconditionally.
    pub fn delete_session(&mut self, token: &str) -> Result<(), AssistantError> {
        diesel::delete(sessions::table.find(token)).execute(&mut self.connection)?;
        Ok(())
    }

    /// Run `f` inside one exclusive write transaction. Used by the auth
    /// layer to make validate-and-extend atomic per token.
    pub(crate) fn exclusive<T>(
        &mut self,
        f: impl FnOnce(&mut SqliteConnection) -> Result<T, AssistantError>,
    ) -> Result<T, AssistantError> {
        self.connection.immediate_transaction(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{SaltString, rand_core::OsRng};
    use argon2::PasswordHasher;
    use tempfile::tempdir;

    fn open_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = dir.path().join("test.db");
        (Store::open(db.to_str().unwrap()).unwrap(), dir)
    }

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_create_user_and_duplicate() {
        let (mut store, _dir) = open_store();
        let user = store.create_user("ana", &hash("secret"), None).unwrap();
        assert!(user.id.starts_with("USR_"));

        let err = store.create_user("ana", &hash("other"), None).unwrap_err();
        assert!(matches!(err, AssistantError::DuplicateUser(_)));
    }

    #[test]
    fn test_verify_credentials() {
        let (mut store, _dir) = open_store();
        store
            .create_user("bram", &hash("hunter2"), Some("b@example.com"))
            .unwrap();

        assert!(store.verify_credentials("bram", "hunter2").unwrap().is_some());
        assert!(store.verify_credentials("bram", "wrong").unwrap().is_none());
        assert!(store.verify_credentials("nobody", "hunter2").unwrap().is_none());
    }

    #[test]
    fn test_positions_are_gapless() {
        let (mut store, _dir) = open_store();
        store.create_conversation("CNV_a", None, None).unwrap();
        for expected in 1..=5 {
            let position = store
                .append_message("CNV_a", Sender::User, "hello")
                .unwrap();
            assert_eq!(position, expected);
        }
        let messages = store.list_messages("CNV_a").unwrap();
        let positions: Vec<i32> = messages.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_append_to_unknown_conversation() {
        let (mut store, _dir) = open_store();
        let err = store
            .append_message("CNV_missing", Sender::User, "hi")
            .unwrap_err();
        assert!(matches!(err, AssistantError::UnknownConversation(_)));
    }

    #[test]
    fn test_create_conversation_idempotent() {
        let (mut store, _dir) = open_store();
        let owner = store.create_user("dot", &hash("pw"), None).unwrap();
        let first = store
            .create_conversation("CNV_x", Some("t"), Some(&owner.id))
            .unwrap();
        let second = store
            .create_conversation("CNV_x", Some("other title"), Some(&owner.id))
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.title.as_deref(), Some("t"));
        assert_eq!(store.list_conversations(Some(&owner.id)).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_serialize() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("concurrent.db");
        let path = db.to_str().unwrap().to_string();
        {
            let mut store = Store::open(&path).unwrap();
            store.create_conversation("CNV_c", None, None).unwrap();
        }

        let mut writers = Vec::new();
        for writer in 0..2 {
            let path = path.clone();
            writers.push(std::thread::spawn(move || {
                let mut store = Store::open(&path).unwrap();
                for i in 0..10 {
                    store
                        .append_message("CNV_c", Sender::User, &format!("writer {writer} msg {i}"))
                        .unwrap();
                }
            }));
        }
        for writer in writers {
            writer.join().unwrap();
        }

        let mut store = Store::open(&path).unwrap();
        let positions: Vec<i32> = store
            .list_messages("CNV_c")
            .unwrap()
            .iter()
            .map(|m| m.position)
            .collect();
        assert_eq!(positions, (1..=20).collect::<Vec<i32>>());
    }

    #[test]
    fn test_set_title_once() {
        let (mut store, _dir) = open_store();
        store.create_conversation("CNV_t", None, None).unwrap();
        store.set_title_once("CNV_t", "first").unwrap();
        store.set_title_once("CNV_t", "second").unwrap();
        let conversation = store.get_conversation("CNV_t").unwrap().unwrap();
        assert_eq!(conversation.title.as_deref(), Some("first"));
    }

    #[test]
    fn test_list_messages_empty_for_unknown() {
        let (mut store, _dir) = open_store();
        assert!(store.list_messages("CNV_nope").unwrap().is_empty());
        assert_eq!(store.count_messages("CNV_nope").unwrap(), 0);
    }

    #[test]
    fn test_session_roundtrip() {
        let (mut store, _dir) = open_store();
        let user = store.create_user("cleo", &hash("pw"), None).unwrap();
        let session = store.create_session(&user.id, 1_000).unwrap();

        let found = store.find_session(&session.token).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert_eq!(found.expires_at, 1_000);

        store.extend_session(&session.token, 2_000).unwrap();
        assert_eq!(
            store.find_session(&session.token).unwrap().unwrap().expires_at,
            2_000
        );

        store.delete_session(&session.token).unwrap();
        assert!(store.find_session(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_delete_conversation_removes_messages() {
        let (mut store, _dir) = open_store();
        store.create_conversation("CNV_d", None, None).unwrap();
        store.append_message("CNV_d", Sender::User, "one").unwrap();
        store
            .append_message("CNV_d", Sender::Assistant, "two")
            .unwrap();

        store.delete_conversation("CNV_d").unwrap();
        assert!(store.get_conversation("CNV_d").unwrap().is_none());
        assert!(store.list_messages("CNV_d").unwrap().is_empty());
    }
}
