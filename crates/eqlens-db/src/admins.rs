//! Admin users for the dashboard API.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use tracing::warn;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Admin users store with a borrowed connection.
pub struct AdminUsers<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> AdminUsers<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Create an admin with an argon2-hashed password.
    pub fn create(&self, username: &str, password: &str) -> Result<()> {
        if self.exists(username)? {
            return Err(DbError::DuplicateUser(username.to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DbError::PasswordHash(e.to_string()))?
            .to_string();

        self.conn.execute(
            "INSERT INTO admin_users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, hash, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    /// Check a username/password pair. Unknown users verify as `false`.
    ///
    /// Runs argon2 while this store holds the connection; request handlers
    /// should fetch [`password_hash`](Self::password_hash), release the store,
    /// then call [`verify_password`].
    pub fn verify(&self, username: &str, password: &str) -> Result<bool> {
        Ok(self
            .password_hash(username)?
            .is_some_and(|stored| verify_password(username, &stored, password)))
    }

    /// The stored argon2 hash for `username`, if the user exists.
    pub fn password_hash(&self, username: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT password_hash FROM admin_users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM admin_users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list(&self) -> Result<Vec<AdminUser>> {
        let mut stmt = self
            .conn
            .prepare("SELECT username, created_at FROM admin_users ORDER BY username")?;
        let rows = stmt.query_map([], |row| {
            let created_at: String = row.get(1)?;
            Ok(AdminUser {
                username: row.get(0)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn delete(&self, username: &str) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM admin_users WHERE username = ?1", params![username])?;
        Ok(rows_affected > 0)
    }

    /// Number of admin users.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM admin_users", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Check `password` against a stored argon2 hash. Needs no connection.
pub fn verify_password(username: &str, stored: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(username, error = %e, "Stored password hash is unreadable");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
