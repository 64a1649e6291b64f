//! Ordered schema migrations.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{DbError, Result};

/// A numbered schema change.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_assessments",
        sql: r#"
            CREATE TABLE assessments (
                id TEXT PRIMARY KEY,
                age INTEGER NOT NULL,
                gender TEXT NOT NULL,
                profession TEXT NOT NULL,
                track TEXT NOT NULL,
                scenario TEXT NOT NULL,
                questions TEXT NOT NULL,
                responses TEXT,
                report TEXT,
                overall_score REAL,
                eq_level TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE INDEX idx_assessments_created_at ON assessments(created_at DESC);
            CREATE INDEX idx_assessments_status ON assessments(status);
        "#,
    },
    Migration {
        version: 2,
        name: "create_admin_users",
        sql: r#"
            CREATE TABLE admin_users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
    },
];

fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<HashSet<u32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let rows = stmt.query_map([], |row| row.get::<_, u32>(0))?;

    let mut versions = HashSet::new();
    for row in rows {
        versions.insert(row?);
    }
    Ok(versions)
}

pub(crate) fn pending(conn: &Connection) -> Result<Vec<&'static Migration>> {
    ensure_table(conn)?;
    let applied = applied_versions(conn)?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect())
}

pub(crate) fn apply_pending(conn: &mut Connection) -> Result<Vec<u32>> {
    let todo = pending(conn)?;
    let mut applied = Vec::with_capacity(todo.len());

    for migration in todo {
        let wrap = |source| DbError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        };

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(wrap)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, Utc::now().to_rfc3339()],
        )
        .map_err(wrap)?;
        tx.commit()?;

        info!(version = migration.version, name = migration.name, "Applied migration");
        applied.push(migration.version);
    }

    Ok(applied)
}
