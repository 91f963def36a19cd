//! decksmith CLI
//!
//! Command-line interface for decksmith - cleans, tags, crops and masks
//! exported flashcard packages.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use decksmith_core::{Config, Corner, Edge, MaskColor, PackageError, Percent};

mod commands;
mod output;

use commands::clean::TagSource;
use commands::image::MaskArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "decksmith")]
#[command(about = "decksmith - clean, tag, crop and mask exported flashcard packages")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip scraped UI debris from notes and auto-tag them
    Clean {
        /// Package to read (.apkg)
        input: PathBuf,
        /// Output package (default: <input>_cleaned.apkg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Tag rules file (default: configured or discovered tags_config.txt)
        #[arg(long, value_name = "FILE", conflicts_with = "no_tags")]
        tags: Option<PathBuf>,
        /// Skip automatic tagging
        #[arg(long)]
        no_tags: bool,
    },
    /// Crop one edge off every image
    Crop {
        /// Package to read (.apkg)
        input: PathBuf,
        /// Output package (default: <input>_cropped.apkg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Edge to remove: right, left, top, bottom
        #[arg(long, value_name = "EDGE")]
        from: Option<Edge>,
        /// Share of the image to remove (1-90)
        #[arg(long, value_name = "N")]
        percent: Option<Percent>,
    },
    /// Paint over one corner of every image
    Mask {
        /// Package to read (.apkg)
        input: PathBuf,
        /// Output package (default: <input>_masked.apkg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Corner: top-left, top-right, bottom-left, bottom-right
        #[arg(long)]
        corner: Option<Corner>,
        /// Mask width as a share of the image width (1-90)
        #[arg(long, value_name = "N")]
        width: Option<Percent>,
        /// Mask height as a share of the image height (1-90)
        #[arg(long, value_name = "N")]
        height: Option<Percent>,
        /// Fill color: black or white
        #[arg(long)]
        color: Option<MaskColor>,
    },
    /// Show what a package contains
    Inspect {
        /// Package to read (.apkg)
        input: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (work_dir, tags_file, log_level, log_file, image.*)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output) {
        eprintln!("Error: {:#}", e);
        if let Some(hint) = e
            .downcast_ref::<PackageError>()
            .and_then(PackageError::recovery_suggestion)
        {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands must work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Clean {
            input,
            output: output_path,
            tags,
            no_tags,
        } => {
            let source = match (tags, no_tags) {
                (_, true) => TagSource::Disabled,
                (Some(path), false) => TagSource::File(path),
                (None, false) => TagSource::Default,
            };
            commands::clean::run(&input, output_path.as_deref(), source, &config, output)
        }
        Commands::Crop {
            input,
            output: output_path,
            from,
            percent,
        } => commands::image::crop(
            &input,
            output_path.as_deref(),
            from,
            percent,
            &config,
            output,
        ),
        Commands::Mask {
            input,
            output: output_path,
            corner,
            width,
            height,
            color,
        } => {
            let args = MaskArgs {
                corner,
                width,
                height,
                color,
            };
            commands::image::mask(&input, output_path.as_deref(), args, &config, output)
        }
        Commands::Inspect { input } => commands::inspect::run(&input, &config, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the log subscriber
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr unless a log
/// file is configured.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "decksmith_core={level},decksmith_cli={level}",
            level = config.log_level
        ))
    });

    let (writer, ansi) = match &config.log_file {
        Some(path) => match File::create(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", path, e);
                (BoxMakeWriter::new(std::io::stderr), true)
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();
}
