//! Inspect command handler

use std::path::Path;

use anyhow::Result;

use decksmith_core::deck;
use decksmith_core::Config;

use crate::output::Output;

/// Show what a package contains
pub fn run(input: &Path, config: &Config, output: &Output) -> Result<()> {
    let summary = deck::inspect_deck(input, config)?;
    output.print_summary(&summary)
}
