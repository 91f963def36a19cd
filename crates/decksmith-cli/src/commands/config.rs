//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use decksmith_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "work_dir, tags_file, log_level, log_file, image.crop_percent, \
     image.crop_from, image.mask_width_percent, image.mask_height_percent, \
     image.mask_corner, image.mask_color";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.print_json(&config)?,
        OutputFormat::Quiet => {
            println!("{}", config.work_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            let image = &config.image;

            println!("Configuration:");
            println!("  work_dir:   {}", config.work_dir.display());
            println!("  tags_file:  {}", display_optional(&config.tags_file));
            println!("  log_level:  {}", config.log_level);
            println!("  log_file:   {}", display_optional(&config.log_file));
            println!();
            println!("Image defaults:");
            println!("  crop:       {} from the {}", image.crop_percent, image.crop_from);
            println!(
                "  mask:       {} x {} in the {} corner, {}",
                image.mask_width_percent,
                image.mask_height_percent,
                image.mask_corner,
                image.mask_color
            );
            println!();
            println!(
                "Tag rules:   {}",
                display_optional(&config.resolve_tags_file())
            );
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let invalid = || format!("Invalid value for {}: '{}'", key, value);

    match key {
        "work_dir" => {
            if value.is_empty() {
                bail!("work_dir cannot be empty");
            }
            config.work_dir = value.into();
        }
        "tags_file" => config.tags_file = optional_path(value),
        "log_level" => {
            let level = value.to_ascii_lowercase();
            if !["error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
                bail!("{}. Use error, warn, info, debug or trace.", invalid());
            }
            config.log_level = level;
        }
        "log_file" => config.log_file = optional_path(value),
        "image.crop_percent" => config.image.crop_percent = value.parse().with_context(invalid)?,
        "image.crop_from" => config.image.crop_from = value.parse().with_context(invalid)?,
        "image.mask_width_percent" => {
            config.image.mask_width_percent = value.parse().with_context(invalid)?
        }
        "image.mask_height_percent" => {
            config.image.mask_height_percent = value.parse().with_context(invalid)?
        }
        "image.mask_corner" => config.image.mask_corner = value.parse().with_context(invalid)?,
        "image.mask_color" => config.image.mask_color = value.parse().with_context(invalid)?,
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.into())
    }
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksmith_core::{Corner, Edge, MaskColor};

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "tags_file", "/data/tags.txt").unwrap();
        apply(&mut config, "log_level", "DEBUG").unwrap();
        apply(&mut config, "image.crop_percent", "20").unwrap();
        apply(&mut config, "image.crop_from", "top").unwrap();
        apply(&mut config, "image.mask_corner", "top_left").unwrap();
        apply(&mut config, "image.mask_color", "white").unwrap();

        assert_eq!(config.tags_file, Some(PathBuf::from("/data/tags.txt")));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.image.crop_percent.get(), 20);
        assert_eq!(config.image.crop_from, Edge::Top);
        assert_eq!(config.image.mask_corner, Corner::TopLeft);
        assert_eq!(config.image.mask_color, MaskColor::White);

        apply(&mut config, "tags_file", "none").unwrap();
        assert!(config.tags_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "image.crop_percent", "95").is_err());
        assert!(apply(&mut config, "image.crop_from", "middle").is_err());
        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "work_dir", "").is_err());
        assert!(apply(&mut config, "sync_url", "x").is_err());
        assert_eq!(config.image.crop_percent, Config::default().image.crop_percent);
    }
}
