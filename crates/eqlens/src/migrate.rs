use anyhow::{Context, Result};
use colored::Colorize;

use eqlens::config::AppConfig;
use eqlens_db::Database;

pub fn handle_migrate_command(config: &AppConfig, dry_run: bool) -> Result<()> {
    let path = config.database_path();
    let db = Database::open_at(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;

    println!("{}  {}", "Database:".dimmed(), path.display());

    if dry_run {
        let pending = db.pending_migrations()?;
        if pending.is_empty() {
            println!("{}", "Schema is up to date.".dimmed());
        } else {
            for m in pending {
                println!("  {} {:>3}  {}", "pending".bright_yellow(), m.version, m.name);
            }
        }
        return Ok(());
    }

    let applied = db.migrate()?;
    if applied.is_empty() {
        println!("{}", "Schema is up to date.".dimmed());
    } else {
        for version in applied {
            println!("  {} {:>3}", "applied".bright_green(), version);
        }
    }

    Ok(())
}
