use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use eqlens_db::Database;
use eqlens_logging::{AssessmentEvent, Logger};
use eqlens_model::load_classifiers;

use crate::api::{self, AppState};
use crate::config::AppConfig;

/// Open the database, load the classifiers and serve the app until Ctrl+C.
pub async fn serve(config: &AppConfig, open_browser: bool) -> Result<()> {
    let db_path = config.database_path();
    let db = Database::open_and_migrate(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    info!(path = %db_path.display(), "Database ready");

    let settings = config.model.clone();
    eprintln!(
        "  {} Loading {} classifiers...",
        "->".dimmed(),
        settings.backend.to_string().bold()
    );
    let classifiers = tokio::task::spawn_blocking(move || load_classifiers(&settings))
        .await
        .context("Classifier loading task panicked")?
        .context("Failed to load classifiers")?;

    let logger = match &config.logging.events_file {
        Some(path) => Logger::with_file(config.logging.format, path)
            .with_context(|| format!("Failed to open events file {}", path.display()))?,
        None => Logger::new(config.logging.format),
    };
    let logger = Arc::new(logger);

    let state = AppState::with_min_words(
        Arc::new(db),
        &classifiers,
        logger.clone(),
        config.assessment.min_words,
    )
    .inference_timeout(config.model.inference_timeout);

    let router = api::create_router(state, config.server.cors_permissive);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    logger.log(&AssessmentEvent::ServerStarted {
        addr: addr.clone(),
        backend: classifiers.backend.to_string(),
    });

    let url = format!("http://{}", addr);
    eprintln!();
    eprintln!("  {} {}", "->".bright_green(), format!("Open {}", url).bold());
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    if open_browser {
        if let Err(e) = open::that(&url) {
            eprintln!("Failed to open browser: {} (open {} manually)", e, url);
        }
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed.
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
