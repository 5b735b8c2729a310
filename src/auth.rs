//! # Session & auth
//!
//! Credential checks, token issuance, and expiry-based validation/renewal.
//!
//! A session token walks a small state machine:
//!
//! ```text
//! Created --validate(ok)--> Active --validate(ok)--> Active (expiry renewed)
//!                              |
//!                              +--validate(expired) or logout--> Deleted
//! ```
//!
//! Every successful [`SessionAuth::validate`] is also a sliding-expiry
//! renewal; expired tokens are inert and purged on read. Validation runs
//! lookup, expiry check, and delete-or-extend inside one exclusive
//! transaction so a stale extension can never race a concurrent logout back
//! to life.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use diesel::prelude::*;
use tracing::{debug, info};

use crate::error::AssistantError;
use crate::models::{Session, User};
use crate::schema::sessions;
use crate::store::Store;

/// A successful login: who authenticated and the token the client should
/// carry.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

/// Credential and session policy. Holds only the timeout; all persistence
/// goes through the [`Store`].
pub struct SessionAuth {
    timeout_secs: i64,
}

impl SessionAuth {
    pub fn new(timeout_secs: i64) -> Self {
        Self { timeout_secs }
    }

    /// Register a new account. The plaintext password is hashed with argon2
    /// (fresh random salt) before it ever reaches the store.
    pub fn register(
        &self,
        store: &mut Store,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, AssistantError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AssistantError::PasswordHash(e.to_string()))?
            .to_string();

        let user = store.create_user(username, &password_hash, email)?;
        info!(user = %user.id, "account registered");
        Ok(user)
    }

    /// Check credentials and, on success, issue a session token.
    ///
    /// Returns `None` on any credential failure. Callers show one generic
    /// invalid-credentials message — never distinguish "no such user" from
    /// "wrong password".
    pub fn login(
        &self,
        store: &mut Store,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticatedSession>, AssistantError> {
        let Some(user) = store.verify_credentials(username, password)? else {
            debug!(username, "login rejected");
            return Ok(None);
        };

        let expires_at = Utc::now().timestamp() + self.timeout_secs;
        let session = store.create_session(&user.id, expires_at)?;
        info!(user = %user.id, "session created");

        Ok(Some(AuthenticatedSession {
            user_id: user.id,
            username: user.username,
            token: session.token,
        }))
    }

    /// Validate a token.
    ///
    /// Absent or expired tokens are deleted (purge-on-read) and yield
    /// `false`. A live token has its expiry slid forward to
    /// `now + timeout` and yields `true`. The whole check-and-renew runs in
    /// one exclusive transaction per token.
    pub fn validate(&self, store: &mut Store, token: &str) -> Result<bool, AssistantError> {
        let timeout = self.timeout_secs;
        let now = Utc::now().timestamp();

        store.exclusive(|conn| {
            let session: Option<Session> = sessions::table
                .find(token)
                .first(conn)
                .optional()?;

            let Some(session) = session else {
                return Ok(false);
            };

            if now >= session.expires_at {
                diesel::delete(sessions::table.find(token)).execute(conn)?;
                debug!("expired session purged");
                return Ok(false);
            }

            diesel::update(sessions::table.find(token))
                .set(sessions::expires_at.eq(now + timeout))
                .execute(conn)?;
            Ok(true)
        })
    }

    /// Resolve a live token to its user id without renewing it. Expired
    /// rows are purged exactly as in [`validate`].
    pub fn user_for_token(
        &self,
        store: &mut Store,
        token: &str,
    ) -> Result<Option<String>, AssistantError> {
        let now = Utc::now().timestamp();
        match store.find_session(token)? {
            Some(session) if now < session.expires_at => Ok(Some(session.user_id)),
            Some(_) => {
                store.delete_session(token)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Delete the session row unconditionally. The caller clears its own
    /// client-side copy of the token.
    pub fn logout(&self, store: &mut Store, token: &str) -> Result<(), AssistantError> {
        store.delete_session(token)?;
        info!("session deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup(timeout: i64) -> (SessionAuth, Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = dir.path().join("auth.db");
        let store = Store::open(db.to_str().unwrap()).unwrap();
        (SessionAuth::new(timeout), store, dir)
    }

    #[test]
    fn test_register_then_login() {
        let (auth, mut store, _dir) = setup(3600);
        auth.register(&mut store, "dara", "s3cret", None).unwrap();

        let session = auth.login(&mut store, "dara", "s3cret").unwrap().unwrap();
        assert_eq!(session.username, "dara");
        assert!(!session.token.is_empty());

        assert!(auth.login(&mut store, "dara", "wrong").unwrap().is_none());
        assert!(auth.login(&mut store, "ghost", "s3cret").unwrap().is_none());
    }

    #[test]
    fn test_validate_slides_expiry() {
        let (auth, mut store, _dir) = setup(3600);
        let user = auth.register(&mut store, "emil", "pw", None).unwrap();

        // Session that would expire in 60 seconds.
        let initial_expiry = Utc::now().timestamp() + 60;
        let session = store.create_session(&user.id, initial_expiry).unwrap();

        assert!(auth.validate(&mut store, &session.token).unwrap());
        let renewed = store.find_session(&session.token).unwrap().unwrap();
        assert!(renewed.expires_at >= Utc::now().timestamp() + 3600 - 5);
    }

    #[test]
    fn test_validate_purges_expired() {
        let (auth, mut store, _dir) = setup(3600);
        let user = auth.register(&mut store, "fern", "pw", None).unwrap();
        let session = store
            .create_session(&user.id, Utc::now().timestamp() - 1)
            .unwrap();

        assert!(!auth.validate(&mut store, &session.token).unwrap());
        assert!(store.find_session(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_validate_unknown_token() {
        let (auth, mut store, _dir) = setup(3600);
        assert!(!auth.validate(&mut store, "no-such-token").unwrap());
    }

    #[test]
    fn test_logout_deletes() {
        let (auth, mut store, _dir) = setup(3600);
        auth.register(&mut store, "gil", "pw", None).unwrap();
        let session = auth.login(&mut store, "gil", "pw").unwrap().unwrap();

        auth.logout(&mut store, &session.token).unwrap();
        assert!(!auth.validate(&mut store, &session.token).unwrap());
    }

    #[test]
    fn test_user_for_token() {
        let (auth, mut store, _dir) = setup(3600);
        let user = auth.register(&mut store, "hana", "pw", None).unwrap();
        let session = auth.login(&mut store, "hana", "pw").unwrap().unwrap();

        assert_eq!(
            auth.user_for_token(&mut store, &session.token).unwrap(),
            Some(user.id)
        );
        assert_eq!(auth.user_for_token(&mut store, "bogus").unwrap(), None);
    }
}
