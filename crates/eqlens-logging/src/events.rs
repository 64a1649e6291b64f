use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for an assessment's lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssessmentEvent {
    ServerStarted {
        addr: String,
        backend: String,
    },
    AssessmentCreated {
        id: String,
        track: String,
        age: u8,
    },
    ValidationFailed {
        id: String,
        reason: String,
    },
    ResponseAnalyzed {
        id: String,
        answer: usize,
        sentiment: String,
        sentiment_score: f64,
        primary_emotion: Option<String>,
    },
    EmotionFallback {
        id: String,
        answer: usize,
        error: String,
    },
    ScoresCalculated {
        id: String,
        overall_score: f64,
        eq_level: String,
    },
    AssessmentCompleted {
        id: String,
        overall_score: f64,
        eq_level: String,
        duration_secs: f64,
    },
    AssessmentFailed {
        id: String,
        error: String,
    },
}

impl AssessmentEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for assessment events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
    quiet: bool,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
            quiet: false,
        }
    }

    /// A logger that prints nothing. Used by tests and one-shot commands.
    pub fn quiet() -> Self {
        Self {
            format: LogFormat::Compact,
            file_writer: None,
            quiet: true,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
            quiet: false,
        })
    }

    pub fn log(&self, event: &AssessmentEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if self.quiet {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &AssessmentEvent) {
        let _ = writeln!(std::io::stderr(), "{}", event.with_timestamp());
    }

    fn log_pretty(&self, event: &AssessmentEvent) {
        let mut stderr = std::io::stderr();
        match event {
            AssessmentEvent::ServerStarted { addr, backend } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "eqlens".bold().bright_white(),
                    format!("listening on http://{}", addr).dimmed()
                );
                let _ = writeln!(stderr, "  {} {}", "Model backend:".dimmed(), backend);
                let _ = writeln!(stderr);
            }
            AssessmentEvent::AssessmentCreated { id, track, age } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "▶".bright_cyan(),
                    "New assessment".bright_cyan().bold(),
                    format!("{} ({} track, age {})", short_id(id), track, age).dimmed()
                );
            }
            AssessmentEvent::ValidationFailed { id, reason } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "✗".bright_yellow(),
                    short_id(id).dimmed(),
                    reason.bright_yellow()
                );
            }
            AssessmentEvent::ResponseAnalyzed {
                answer,
                sentiment,
                sentiment_score,
                primary_emotion,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Answer {}: {} ({:.2}), {}",
                    "│".dimmed(),
                    answer,
                    sentiment,
                    sentiment_score,
                    primary_emotion.as_deref().unwrap_or("no emotion")
                );
            }
            AssessmentEvent::EmotionFallback { answer, error, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Answer {}: emotion analysis failed: {}",
                    "⚠".bright_yellow(),
                    answer,
                    error.bright_red()
                );
            }
            AssessmentEvent::ScoresCalculated { .. } => {
                // Reported together with completion
            }
            AssessmentEvent::AssessmentCompleted {
                id,
                overall_score,
                eq_level,
                duration_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {:.1} {} {}",
                    "✓".bright_green(),
                    short_id(id).dimmed(),
                    overall_score,
                    eq_level.color(level_color(eq_level)).bold(),
                    format!("({:.1}s)", duration_secs).dimmed()
                );
            }
            AssessmentEvent::AssessmentFailed { id, error } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "✗".bright_red(),
                    short_id(id).dimmed(),
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &AssessmentEvent) {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "{}", Self::compact_line(event));
    }

    fn compact_line(event: &AssessmentEvent) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        match event {
            AssessmentEvent::ServerStarted { addr, backend } => {
                format!("[{}] server:start {} backend={}", timestamp, addr, backend)
            }
            AssessmentEvent::AssessmentCreated { id, track, .. } => {
                format!("[{}] assessment:new:{} {}", timestamp, short_id(id), track)
            }
            AssessmentEvent::ValidationFailed { id, reason } => {
                format!("[{}] assessment:invalid:{} {}", timestamp, short_id(id), reason)
            }
            AssessmentEvent::ResponseAnalyzed {
                id,
                answer,
                sentiment,
                ..
            } => format!(
                "[{}] analysis:{}:{} {}",
                timestamp,
                short_id(id),
                answer,
                sentiment
            ),
            AssessmentEvent::EmotionFallback { id, answer, error } => format!(
                "[{}] emotion:fallback:{}:{} {}",
                timestamp,
                short_id(id),
                answer,
                error
            ),
            AssessmentEvent::ScoresCalculated {
                id,
                overall_score,
                eq_level,
            } => format!(
                "[{}] scores:{} {:.1} {}",
                timestamp,
                short_id(id),
                overall_score,
                eq_level
            ),
            AssessmentEvent::AssessmentCompleted {
                id,
                overall_score,
                duration_secs,
                ..
            } => format!(
                "[{}] assessment:done:{} {:.1} {:.1}s",
                timestamp,
                short_id(id),
                overall_score,
                duration_secs
            ),
            AssessmentEvent::AssessmentFailed { id, error } => {
                format!("[{}] assessment:error:{} {}", timestamp, short_id(id), error)
            }
        }
    }
}

/// Console colour for an EQ level label ("Low EQ", "Average EQ", "High EQ").
fn level_color(eq_level: &str) -> Color {
    match eq_level.split_whitespace().next() {
        Some("High") => Color::BrightGreen,
        Some("Average") => Color::BrightYellow,
        Some("Low") => Color::BrightRed,
        _ => Color::White,
    }
}

/// First eight characters of an id, for console output
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
