mod admin;
mod analyze;
mod assessments;
mod migrate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use eqlens::config::{AppConfig, Overrides};
use eqlens::server;
use eqlens_db::Database;
use eqlens_logging::{init_tracing, LogFormat};
use eqlens_model::ModelBackend;

use admin::AdminAction;
use assessments::AssessmentsAction;

#[derive(Parser, Debug)]
#[command(
    name = "eqlens",
    about = "Emotional intelligence self-assessment",
    version,
    author
)]
struct Cli {
    /// Path to a config file (default: ./eqlens.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "EQLENS_DB")]
    db: Option<PathBuf>,

    /// Log filter, e.g. "info" or "eqlens=debug"
    #[arg(long, global = true, env = "EQLENS_LOG")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatChoice>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web app
    Serve {
        /// Address to bind
        #[arg(long, env = "EQLENS_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "EQLENS_PORT")]
        port: Option<u16>,

        /// Classifier backend
        #[arg(long, value_enum, env = "EQLENS_BACKEND")]
        backend: Option<BackendChoice>,

        /// Open the app in a browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Apply database migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage dashboard administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Browse stored assessments
    Assessments {
        #[command(subcommand)]
        action: AssessmentsAction,
    },

    /// Score a single piece of text with the configured classifiers
    Analyze {
        /// Text to analyze
        text: String,

        /// Classifier backend
        #[arg(long, value_enum, env = "EQLENS_BACKEND")]
        backend: Option<BackendChoice>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendChoice {
    Candle,
    Lexicon,
}

impl From<BackendChoice> for ModelBackend {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Candle => ModelBackend::Candle,
            BackendChoice::Lexicon => ModelBackend::Lexicon,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let mut config = AppConfig::resolve(cli.config.as_deref(), &working_dir)?;

    let (host, port, backend) = match &cli.command {
        Commands::Serve {
            host,
            port,
            backend,
            ..
        } => (host.clone(), *port, *backend),
        Commands::Analyze { backend, .. } => (None, None, *backend),
        _ => (None, None, None),
    };

    config.apply(Overrides {
        host,
        port,
        db: cli.db,
        backend: backend.map(Into::into),
        log_level: cli.log_level,
        log_format: cli.log_format.map(Into::into),
    });

    let _guard = init_tracing(
        &config.logging.level,
        config.logging.format,
        config.logging.file.as_deref(),
    );

    match cli.command {
        Commands::Serve { open, .. } => server::serve(&config, open).await,
        Commands::Migrate { dry_run } => migrate::handle_migrate_command(&config, dry_run),
        Commands::Admin { action } => {
            let db = open_database(&config)?;
            admin::handle_admin_command(&db, action)
        }
        Commands::Assessments { action } => {
            let db = open_database(&config)?;
            assessments::handle_assessments_command(&db, action)
        }
        Commands::Analyze { text, json, .. } => {
            analyze::handle_analyze_command(&config, &text, json).await
        }
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path();
    Database::open_and_migrate(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))
}
