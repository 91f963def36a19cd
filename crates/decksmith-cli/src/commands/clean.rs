//! Clean command handler

use std::path::{Path, PathBuf};

use anyhow::Result;

use decksmith_core::deck;
use decksmith_core::{Config, TagDetector, TagRules};

use crate::output::Output;

/// Where tag rules come from for one run
pub enum TagSource {
    /// Configured file or the usual search locations
    Default,
    /// A file given on the command line
    File(PathBuf),
    /// No tagging at all
    Disabled,
}

/// Clean every note of a package and auto-tag it
pub fn run(
    input: &Path,
    output_path: Option<&Path>,
    tags: TagSource,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let detector = match tags {
        TagSource::Default => TagDetector::new(TagRules::load_default(config)),
        TagSource::File(path) => TagDetector::new(TagRules::load_strict(&path)?),
        TagSource::Disabled => TagDetector::disabled(),
    };

    let outcome = deck::clean_deck(input, output_path, &detector, config)?;
    output.print_clean(&outcome)
}
