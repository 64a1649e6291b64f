//! Database layer for eqlens.
//!
//! Provides a unified `Database` struct that owns the SQLite connection
//! and provides access to domain-specific stores. The schema is managed by
//! an ordered list of migrations recorded in `schema_migrations`.

mod admins;
mod assessments;
mod error;
mod migrations;

pub use admins::{verify_password, AdminUser, AdminUsers};
pub use assessments::{
    AssessmentFilter, AssessmentRecord, AssessmentStats, AssessmentStatus, AssessmentSummary,
    Assessments, Completion, DayCount, LevelCount, NewAssessment, TrackStats,
};
pub use error::{DbError, Result};
pub use migrations::Migration;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/eqlens/eqlens.db`.
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path.
    ///
    /// Does not touch the schema; call [`Database::migrate`] or use
    /// [`Database::open_and_migrate`].
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a database and apply any pending migrations.
    pub fn open_and_migrate(path: &Path) -> Result<Self> {
        let db = Self::open_at(path)?;
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eqlens")
            .join("eqlens.db")
    }

    /// Apply pending migrations, each in its own transaction.
    ///
    /// Returns the versions that were applied.
    pub fn migrate(&self) -> Result<Vec<u32>> {
        let mut conn = self.lock();
        migrations::apply_pending(&mut conn)
    }

    /// Migrations that have not been applied yet.
    pub fn pending_migrations(&self) -> Result<Vec<&'static Migration>> {
        let conn = self.lock();
        migrations::pending(&conn)
    }

    /// Access the assessments store.
    pub fn assessments(&self) -> Assessments<'_> {
        Assessments::new(self.lock())
    }

    /// Access the admin users store.
    pub fn admin_users(&self) -> AdminUsers<'_> {
        AdminUsers::new(self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("Database lock poisoned")
    }
}
