use anyhow::{Context, Result};
use colored::Colorize;

use eqlens::config::AppConfig;
use eqlens_core::{Analyzer, SentimentLabel};
use eqlens_model::load_classifiers;

pub async fn handle_analyze_command(config: &AppConfig, text: &str, json: bool) -> Result<()> {
    let settings = config.model.clone();
    let classifiers = tokio::task::spawn_blocking(move || load_classifiers(&settings))
        .await
        .context("Classifier loading task panicked")?
        .context("Failed to load classifiers")?;

    let analyzer = Analyzer::from_classifiers(&classifiers);
    let text = text.to_string();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze_detailed(&text))
        .await
        .context("Analysis task panicked")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.analysis)?);
        return Ok(());
    }

    let analysis = &outcome.analysis;
    let label = analysis.sentiment_label.as_str();
    let label_colored = match analysis.sentiment_label {
        SentimentLabel::Positive => label.bright_green(),
        SentimentLabel::Negative => label.bright_red(),
        SentimentLabel::Neutral => label.bright_yellow(),
    };

    println!("{}  {}", "Backend:".dimmed(), classifiers.backend);
    println!(
        "{}  {} ({:.3})",
        "Sentiment:".dimmed(),
        label_colored,
        analysis.sentiment_score
    );

    if let Some(ref error) = outcome.emotion_error {
        println!("{}  {}", "Emotions:".dimmed(), format!("unavailable ({})", error).bright_red());
        return Ok(());
    }

    if let Some(ref primary) = analysis.primary_emotion {
        println!(
            "{}  {} ({:.3})",
            "Primary Emotion:".dimmed(),
            primary.bold(),
            analysis.primary_emotion_score
        );
    }

    let mut emotions: Vec<(&String, &f64)> = analysis.emotion_scores.iter().collect();
    emotions.sort_by(|a, b| b.1.total_cmp(a.1));
    for (label, score) in emotions.into_iter().take(8) {
        println!("  {:<16} {:.3}", label, score);
    }

    Ok(())
}
