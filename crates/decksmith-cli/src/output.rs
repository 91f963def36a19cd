//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use decksmith_core::{CleanOutcome, DeckSummary, MediaOutcome, MediaReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", json);
        Ok(())
    }

    /// Print the result of a cleaning run
    pub fn print_clean(&self, outcome: &CleanOutcome) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Database:      {}", outcome.database);
                println!("Notes seen:    {}", outcome.report.notes_seen);
                println!("Notes updated: {}", outcome.report.notes_updated);
                println!("Newly tagged:  {}", outcome.report.tagged);
                println!();
                self.success(&format!("Written {}", outcome.output.display()));
            }
            OutputFormat::Json => self.print_json(outcome)?,
            OutputFormat::Quiet => println!("{}", outcome.output.display()),
        }
        Ok(())
    }

    /// Print the result of a crop or mask run
    pub fn print_media(&self, outcome: &MediaOutcome) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                print_media_report(outcome.report());
                println!();
                match outcome.output() {
                    Some(path) => self.success(&format!("Written {}", path.display())),
                    None => println!("No image processed; no package written."),
                }
            }
            OutputFormat::Json => self.print_json(outcome)?,
            OutputFormat::Quiet => {
                if let Some(path) = outcome.output() {
                    println!("{}", path.display());
                }
            }
        }
        Ok(())
    }

    /// Print the contents of a package
    pub fn print_summary(&self, summary: &DeckSummary) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Package:  {}", summary.input.display());
                println!(
                    "Database: {}",
                    summary.database.as_deref().unwrap_or("(not found)")
                );
                if let Some(notes) = summary.notes {
                    println!("Notes:    {}", notes);
                }
                println!();

                let images = summary.media.iter().filter(|m| m.codec.is_known()).count();
                println!(
                    "── Media ({} entries, {} images) ──",
                    summary.media.len(),
                    images
                );
                for entry in &summary.media {
                    println!(
                        "{:<12} {:<8} {:>10}{}",
                        truncate(&entry.identifier, 12),
                        entry.codec.as_str(),
                        format_size(entry.size),
                        if entry.compressed { "  (compressed)" } else { "" }
                    );
                }
                println!();
                println!("Other entries: {}", summary.other_entries);
            }
            OutputFormat::Json => self.print_json(summary)?,
            OutputFormat::Quiet => {
                for entry in summary.media.iter().filter(|m| m.codec.is_known()) {
                    println!("{}", entry.identifier);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_media_report(report: &MediaReport) {
    println!("Media entries: {}", report.scanned);
    println!("Images:        {}", report.images);
    println!("Transformed:   {}", report.succeeded);
    println!("Failed:        {}", report.failed());
    for failure in &report.failures {
        println!("  {} - {}", failure.identifier, failure.message);
    }
    if !report.unsupported.is_empty() {
        println!(
            "Unsupported:   {} (AVIF decoding needs the avif-native feature)",
            report.unsupported.len()
        );
        for identifier in &report.unsupported {
            println!("  {} - left untouched", identifier);
        }
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Byte count with a binary unit
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
