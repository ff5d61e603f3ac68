//! Local identity provider: sign-up, sign-in and a persisted session.
//!
//! Credentials live next to the documents in the same SQLite file. The
//! session table holds at most one row, so the CLI commands and the TUI
//! agree on who is signed in.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::models::User;
use super::storage::Database;
use super::store::StoreError;
use crate::error::{TrackerError, TrackerResult};

/// Collection holding public profile documents (`{name, email}`), keyed by uid
pub const USERS_COLLECTION: &str = "users";

const MIN_PASSWORD_LEN: usize = 6;

/// Identity operations consumed by the application
pub trait IdentityProvider {
    fn sign_up(&self, email: &str, password: &str, display_name: &str) -> TrackerResult<User>;
    fn sign_in(&self, email: &str, password: &str) -> TrackerResult<User>;
    fn sign_out(&self) -> TrackerResult<()>;
    fn current_user(&self) -> TrackerResult<Option<User>>;
}

/// Salted SHA-256 of a password.
///
/// A fast hash: adequate for a single-user local database, not for
/// credentials stored on a shared server. Swap in a slow KDF before
/// exposing the credentials table beyond the local machine.
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> TrackerResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(TrackerError::auth(format!("'{email}' is not a valid email address")));
    }
    Ok(email)
}

/// [`IdentityProvider`] backed by the local database
pub struct SqliteIdentity {
    db: Database,
}

impl SqliteIdentity {
    pub fn new(db: Database) -> Self {
        SqliteIdentity { db }
    }

    fn start_session(&self, uid: &str) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO session (slot, uid, signed_in_at) VALUES (1, ?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET uid = excluded.uid, signed_in_at = excluded.signed_in_at",
            params![uid, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl IdentityProvider for SqliteIdentity {
    fn sign_up(&self, email: &str, password: &str, display_name: &str) -> TrackerResult<User> {
        let email = normalize_email(email)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(TrackerError::auth("display name is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TrackerError::auth(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let user = User {
            uid: Uuid::new_v4().simple().to_string(),
            email,
            display_name: display_name.to_string(),
        };
        let salt = Uuid::new_v4().simple().to_string();

        {
            let mut conn = self.db.lock()?;
            let tx = conn.transaction().map_err(StoreError::from)?;
            let taken: Option<String> = tx
                .query_row(
                    "SELECT uid FROM credentials WHERE email = ?1",
                    params![user.email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::from)?;
            if taken.is_some() {
                tracing::warn!(email = %user.email, "sign-up rejected: email in use");
                return Err(TrackerError::auth("email already in use"));
            }

            tx.execute(
                "INSERT INTO credentials (uid, email, display_name, salt, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.uid,
                    user.email,
                    user.display_name,
                    salt,
                    hash_password(&salt, password),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(StoreError::from)?;

            let profile = serde_json::json!({ "name": user.display_name, "email": user.email });
            tx.execute(
                "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
                params![USERS_COLLECTION, user.uid, profile.to_string()],
            )
            .map_err(StoreError::from)?;

            tx.commit().map_err(StoreError::from)?;
        }

        self.start_session(&user.uid)?;
        tracing::info!(uid = %user.uid, "user signed up");
        Ok(user)
    }

    fn sign_in(&self, email: &str, password: &str) -> TrackerResult<User> {
        let rejected = || TrackerError::auth("invalid email or password");
        let email = normalize_email(email).map_err(|_| rejected())?;

        let row = {
            let conn = self.db.lock()?;
            conn.query_row(
                "SELECT uid, display_name, salt, password_hash FROM credentials WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(StoreError::from)?
        };

        let Some((uid, display_name, salt, stored_hash)) = row else {
            tracing::warn!(email = %email, "sign-in rejected: unknown email");
            return Err(rejected());
        };
        if hash_password(&salt, password) != stored_hash {
            tracing::warn!(email = %email, "sign-in rejected: wrong password");
            return Err(rejected());
        }

        self.start_session(&uid)?;
        tracing::info!(uid = %uid, "user signed in");
        Ok(User {
            uid,
            email,
            display_name,
        })
    }

    fn sign_out(&self) -> TrackerResult<()> {
        let conn = self.db.lock()?;
        conn.execute("DELETE FROM session", [])
            .map_err(StoreError::from)?;
        tracing::info!("user signed out");
        Ok(())
    }

    fn current_user(&self) -> TrackerResult<Option<User>> {
        let conn = self.db.lock()?;
        let user = conn
            .query_row(
                "SELECT c.uid, c.email, c.display_name
                 FROM session s JOIN credentials c ON c.uid = s.uid
                 WHERE s.slot = 1",
                [],
                |row| {
                    Ok(User {
                        uid: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(user)
    }
}
