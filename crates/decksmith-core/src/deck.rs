//! End-to-end deck pipelines
//!
//! Each pipeline owns one extracted [`Package`] for its whole run. The
//! staging directory goes away when the package is dropped, whether the run
//! finishes, returns an error, or unwinds.
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::load()?;
//! let detector = TagDetector::new(TagRules::load_default(&config));
//!
//! let cleaned = clean_deck(Path::new("deck.apkg"), None, &detector, &config)?;
//!
//! let crop = MediaTransform::Crop(CropSpec { from: Edge::Right, percent: Percent::DEFAULT });
//! match transform_deck_media(Path::new("deck.apkg"), None, &crop, &config)? {
//!     MediaOutcome::Written { output, .. } => println!("wrote {:?}", output),
//!     MediaOutcome::NothingProcessed { .. } => println!("no images"),
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::media::{self, MediaEntry, MediaReport, MediaTransform};
use crate::notes::{NoteStore, NoteUpdateReport, TagDetector};
use crate::package::{self, Package};

/// Suffix for cleaned packages
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// Result of the note cleaning pipeline
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutcome {
    pub output: PathBuf,
    /// Database filename found in the package
    pub database: String,
    pub report: NoteUpdateReport,
}

/// Result of the media pipeline
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MediaOutcome {
    /// At least one image was transformed and a package was written
    Written { output: PathBuf, report: MediaReport },
    /// No image was transformed; nothing was written
    NothingProcessed { report: MediaReport },
}

impl MediaOutcome {
    pub fn report(&self) -> &MediaReport {
        match self {
            MediaOutcome::Written { report, .. } | MediaOutcome::NothingProcessed { report } => {
                report
            }
        }
    }

    pub fn output(&self) -> Option<&Path> {
        match self {
            MediaOutcome::Written { output, .. } => Some(output),
            MediaOutcome::NothingProcessed { .. } => None,
        }
    }
}

/// What a package contains
#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    pub input: PathBuf,
    pub database: Option<String>,
    pub notes: Option<i64>,
    pub media: Vec<MediaEntry>,
    /// Entries that are neither the database nor media candidates
    pub other_entries: usize,
}

/// Clean every note and write `<stem>_cleaned.apkg` (or `output`)
pub fn clean_deck(
    input: &Path,
    output: Option<&Path>,
    detector: &TagDetector,
    config: &Config,
) -> Result<CleanOutcome> {
    let output = resolve_output(input, output, CLEANED_SUFFIX);
    let package = Package::extract(input, &config.work_dir)
        .with_context(|| format!("Failed to open package {:?}", input))?;

    let database = package.locate_database()?;
    let database_name = file_name(&database);

    let report = {
        let mut store = NoteStore::open(&database)?;
        store.update_notes(detector)?
    };

    package
        .repack(&output)
        .with_context(|| format!("Failed to write package {:?}", output))?;

    info!("Cleaned package written to {:?}", output);
    Ok(CleanOutcome {
        output,
        database: database_name,
        report,
    })
}

/// Crop or mask every image and write `<stem>_cropped.apkg` /
/// `<stem>_masked.apkg` (or `output`)
///
/// When no image is transformed the staging directory is discarded and no
/// package is written.
pub fn transform_deck_media(
    input: &Path,
    output: Option<&Path>,
    transform: &MediaTransform,
    config: &Config,
) -> Result<MediaOutcome> {
    let output = resolve_output(input, output, transform.output_suffix());
    let package = Package::extract(input, &config.work_dir)
        .with_context(|| format!("Failed to open package {:?}", input))?;

    let entries = package.media_entries()?;
    let report = media::process_media(&entries, transform);

    info!(
        "{} image(s) transformed, {} failed",
        report.succeeded,
        report.failed()
    );

    if report.succeeded == 0 {
        info!("No image transformed; no package written");
        return Ok(MediaOutcome::NothingProcessed { report });
    }

    package
        .repack(&output)
        .with_context(|| format!("Failed to write package {:?}", output))?;

    Ok(MediaOutcome::Written { output, report })
}

/// Describe a package without changing it
pub fn inspect_deck(input: &Path, config: &Config) -> Result<DeckSummary> {
    let package = Package::extract(input, &config.work_dir)
        .with_context(|| format!("Failed to open package {:?}", input))?;

    let (database, notes) = match package.locate_database() {
        Ok(path) => {
            let notes = match NoteStore::open_read_only(&path).and_then(|s| s.note_count()) {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Cannot count notes: {:#}", e);
                    None
                }
            };
            (Some(file_name(&path)), notes)
        }
        Err(e) => {
            info!("{}", e);
            (None, None)
        }
    };

    let candidates = package.media_entries()?;
    let media = candidates
        .iter()
        .filter_map(|path| match MediaEntry::probe(path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                info!("Cannot probe {:?}: {}", path, e);
                None
            }
        })
        .collect::<Vec<_>>();

    let total = package.entry_names()?.len();
    let other_entries = total
        .saturating_sub(candidates.len())
        .saturating_sub(usize::from(database.is_some()));

    Ok(DeckSummary {
        input: input.to_path_buf(),
        database,
        notes,
        media,
        other_entries,
    })
}

fn resolve_output(input: &Path, output: Option<&Path>, suffix: &str) -> PathBuf {
    match output {
        Some(path) => package::ensure_extension(path.to_path_buf()),
        None => package::derive_output_path(input, suffix),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
