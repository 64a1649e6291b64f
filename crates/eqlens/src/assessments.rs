use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use eqlens::filter::{build_filter, ListParams};
use eqlens_core::{AssessmentReport, EqLevel};
use eqlens_db::{AssessmentFilter, AssessmentRecord, AssessmentStats, AssessmentSummary, Database};

#[derive(Subcommand, Debug)]
pub enum AssessmentsAction {
    /// List assessments, newest first
    List {
        /// Filter by status (pending, completed)
        #[arg(long)]
        status: Option<String>,

        /// Filter by EQ level (low, average, high)
        #[arg(long)]
        level: Option<String>,

        /// Filter by scenario track (education, healthcare, leadership, general)
        #[arg(long)]
        track: Option<String>,

        /// Search profession text
        #[arg(long)]
        search: Option<String>,

        /// Show assessments started on or after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Show assessments started on or before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Maximum number of rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one assessment with its scores
    Show {
        /// Assessment ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an assessment
    Delete {
        /// Assessment ID (launches interactive picker if omitted)
        id: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show aggregate statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_assessments_command(db: &Database, action: AssessmentsAction) -> Result<()> {
    match action {
        AssessmentsAction::List {
            status,
            level,
            track,
            search,
            after,
            before,
            limit,
            json,
        } => {
            let filter = build_filter(ListParams {
                status,
                eq_level: level,
                track,
                search,
                after,
                before,
                limit,
                offset: None,
            })?;
            let summaries = db.assessments().list(&filter)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("{}", "No assessments found.".dimmed());
            } else {
                print_assessments_table(&summaries);
            }
        }
        AssessmentsAction::Show { id, json } => {
            let id = resolve_assessment_id(db, id)?;
            let Some(record) = db.assessments().get(&id)? else {
                anyhow::bail!("Assessment not found: {}", id);
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_assessment_detail(&record);
            }
        }
        AssessmentsAction::Delete { id, yes } => {
            let id = resolve_assessment_id(db, id)?;

            if !yes
                && !dialoguer::Confirm::new()
                    .with_prompt(format!("Delete assessment {}?", id))
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }

            if db.assessments().delete(&id)? {
                println!("{} {}", "Deleted".bright_yellow(), id);
            } else {
                anyhow::bail!("Assessment not found: {}", id);
            }
        }
        AssessmentsAction::Stats { json } => {
            let stats = db.assessments().stats(&AssessmentFilter::default())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
    }

    Ok(())
}

fn resolve_assessment_id(db: &Database, id: Option<String>) -> Result<String> {
    if let Some(id) = id {
        return Ok(id);
    }

    let summaries = db.assessments().list(&AssessmentFilter::default())?;
    if summaries.is_empty() {
        anyhow::bail!("No assessments found.");
    }

    let items: Vec<String> = summaries
        .iter()
        .map(|s| {
            format!(
                "{} | {:9} | {:<18} | {} ({})",
                s.created_at.format("%Y-%m-%d %H:%M"),
                s.status,
                s.eq_level.as_deref().unwrap_or("-"),
                truncate(&s.profession, 40),
                s.age
            )
        })
        .collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select an assessment")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(summaries[selection].id.clone())
}

fn level_colored(level: &str) -> String {
    match level.parse::<EqLevel>() {
        Ok(EqLevel::High) => level.bright_green().to_string(),
        Ok(EqLevel::Average) => level.bright_yellow().to_string(),
        Ok(EqLevel::Low) => level.bright_red().to_string(),
        Err(_) => level.to_string(),
    }
}

fn print_assessments_table(summaries: &[AssessmentSummary]) {
    println!(
        "{:<10} {:<18} {:<10} {:<5} {:<12} {:<8} {:<10} {}",
        "ID".dimmed(),
        "STARTED".dimmed(),
        "STATUS".dimmed(),
        "AGE".dimmed(),
        "TRACK".dimmed(),
        "SCORE".dimmed(),
        "LEVEL".dimmed(),
        "PROFESSION".dimmed(),
    );

    for s in summaries {
        let status = match s.status {
            eqlens_db::AssessmentStatus::Completed => s.status.as_str().bright_green().to_string(),
            eqlens_db::AssessmentStatus::Pending => s.status.as_str().bright_cyan().to_string(),
        };
        let score = s
            .overall_score
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "...".to_string());
        let level = s
            .eq_level
            .as_deref()
            .map(level_colored)
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<10} {:<18} {:<10} {:<5} {:<12} {:<8} {:<10} {}",
            truncate(&s.id, 8),
            s.created_at.format("%Y-%m-%d %H:%M"),
            status,
            s.age,
            s.track,
            score,
            level,
            truncate(&s.profession, 40)
        );
    }
}

fn print_assessment_detail(record: &AssessmentRecord) {
    println!("{}", "=== Assessment Detail ===".bright_blue().bold());
    println!("{}  {}", "ID:".dimmed(), record.id);
    println!(
        "{}  {}",
        "Started:".dimmed(),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}  {}", "Age:".dimmed(), record.age);
    println!("{}  {}", "Gender:".dimmed(), record.gender);
    println!("{}  {}", "Profession:".dimmed(), record.profession);
    println!("{}  {}", "Track:".dimmed(), record.track);
    println!();
    println!("{}", "Scenario:".dimmed());
    println!("  {}", record.scenario);

    let Some(completed_at) = record.completed_at else {
        println!();
        println!("{}  {}", "Status:".dimmed(), "PENDING".bright_cyan());
        return;
    };

    println!();
    println!(
        "{}  {} ({} later)",
        "Completed:".dimmed(),
        completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration((completed_at - record.created_at).num_seconds() as f64)
    );

    let report = record
        .report
        .clone()
        .and_then(|value| serde_json::from_value::<AssessmentReport>(value).ok());

    if let Some(report) = report {
        println!(
            "{}  {:.1} ({})",
            "Overall:".dimmed(),
            report.overall_score,
            level_colored(report.eq_level.as_str())
        );
        for (category, score) in report.category_scores.entries() {
            println!("  {:<22} {:>5.1}", category, score);
        }
        println!(
            "{}  positive {:.1}%, negative {:.1}%, neutral {:.1}%",
            "Sentiment:".dimmed(),
            report.sentiment_percent.positive,
            report.sentiment_percent.negative,
            report.sentiment_percent.neutral
        );
        if !report.emotion_percent.is_empty() {
            let emotions: Vec<String> = report
                .emotion_percent
                .iter()
                .take(5)
                .map(|e| format!("{} {:.1}%", e.label, e.percent))
                .collect();
            println!("{}  {}", "Emotions:".dimmed(), emotions.join(", "));
        }
    }

    if let Some(ref responses) = record.responses {
        println!();
        println!(
            "{}",
            format!("--- Responses ({}) ---", responses.len()).dimmed()
        );
        for (i, (question, answer)) in record.questions.iter().zip(responses).enumerate() {
            println!();
            println!("  {} {}", format!("[{}]", i + 1).bright_blue(), question);
            println!("    {}", truncate(answer, 160));
        }
    }
}

fn print_stats(stats: &AssessmentStats) {
    println!("{}", "=== Assessment Statistics ===".bright_blue().bold());
    println!("{}  {}", "Total:".dimmed(), stats.total);
    println!("{}  {}", "Completed:".dimmed(), stats.completed);
    println!("{}  {}", "Pending:".dimmed(), stats.pending);
    println!(
        "{}  {:.1}%",
        "Completion Rate:".dimmed(),
        stats.completion_rate * 100.0
    );
    if let Some(avg) = stats.avg_overall_score {
        println!("{}  {:.1}", "Avg Score:".dimmed(), avg);
    }

    if !stats.by_level.is_empty() {
        println!();
        println!("{}", "By Level:".dimmed());
        for l in &stats.by_level {
            println!("  {:<20} {}", level_colored(&l.eq_level), l.count);
        }
    }

    if !stats.by_track.is_empty() {
        println!();
        println!("{}", "By Track:".dimmed());
        for t in &stats.by_track {
            let avg = t
                .avg_overall_score
                .map(|v| format!("avg {:.1}", v))
                .unwrap_or_else(|| "no scores".to_string());
            println!(
                "  {:<20} {} started, {} completed, {}",
                t.track, t.total, t.completed, avg
            );
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = (secs % 60.0) as u64;
        format!("{}m {}s", mins, remaining_secs)
    }
}
