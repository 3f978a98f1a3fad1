//! Durable session storage: a user snapshot and a bearer token under two
//! fixed keys in the session directory.
//!
//! The adapter never raises on bad stored data: a corrupt user record or
//! token simply reads as "no session". The server stays the only authority
//! over accounts.

use crate::types::User;
use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

const USER_FILE: &str = "user.json";
const TOKEN_FILE: &str = "token";

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Persist both session entries.
    pub fn save(&self, user: &User, token: &str) -> Result<()> {
        fs::write(self.user_path(), serde_json::to_string(user)?)?;
        fs::write(self.token_path(), token)?;
        Ok(())
    }

    /// Remove both session entries. Already-absent entries are fine.
    pub fn clear(&self) {
        let _ = fs::remove_file(self.user_path());
        let _ = fs::remove_file(self.token_path());
    }

    /// The last-saved user snapshot, or `None` when absent or unparsable.
    pub fn current_user(&self) -> Option<User> {
        let raw = fs::read_to_string(self.user_path()).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn token(&self) -> Option<String> {
        let raw = fs::read_to_string(self.token_path()).ok()?;
        let token = raw.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Whether a stored token exists and its expiration claim is in the
    /// future. Missing, malformed, and expired tokens are all invalid.
    pub fn is_token_valid(&self) -> bool {
        match self.token() {
            Some(token) => match token_expiry(&token) {
                Some(exp) => Utc::now().timestamp() < exp,
                None => false,
            },
            None => false,
        }
    }
}

/// Extract the `exp` claim (seconds since epoch) from a JWT payload without
/// verifying the signature. The server remains the authority; the client
/// only needs expiry for the authentication predicate.
fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

/// Unsigned JWT with the given exp claim, good enough for the decoder.
#[cfg(test)]
pub(crate) fn token_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": "u1" }).to_string());
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_user(), "tok").unwrap();
        assert_eq!(store.current_user().unwrap().email, "ana@example.com");
        assert_eq!(store.token().as_deref(), Some("tok"));
    }

    #[test]
    fn test_clear_removes_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_user(), "tok").unwrap();
        store.clear();
        assert!(store.current_user().is_none());
        assert!(store.token().is_none());

        // Clearing an empty store is a no-op, not an error.
        store.clear();
    }

    #[test]
    fn test_corrupt_user_record_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        std::fs::write(dir.path().join(USER_FILE), "{not json").unwrap();
        assert!(store.current_user().is_none());
    }

    #[test]
    fn test_missing_token_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        assert!(!store.is_token_valid());
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_user(), "not-a-jwt").unwrap();
        assert!(!store.is_token_valid());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        let expired = token_with_exp(Utc::now().timestamp() - 60);
        store.save(&sample_user(), &expired).unwrap();
        assert!(!store.is_token_valid());
    }

    #[test]
    fn test_future_token_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        let live = token_with_exp(Utc::now().timestamp() + 3600);
        store.save(&sample_user(), &live).unwrap();
        assert!(store.is_token_valid());
    }

    #[test]
    fn test_token_without_exp_claim_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\"}");
        let payload = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"u1\"}");
        store
            .save(&sample_user(), &format!("{}.{}.sig", header, payload))
            .unwrap();
        assert!(!store.is_token_valid());
    }
}
