//! decksmith core library
//!
//! This crate rewrites exported flashcard packages (`.apkg`): it strips
//! machine-generated UI debris from note text, auto-tags notes from keyword
//! rules, and crops or masks bundled images while keeping their codec and
//! compression wrapper.
//!
//! # Architecture
//!
//! - **Package**: extracts the ZIP container into a scoped staging directory
//!   and repacks it afterwards. Entries nobody touched go back byte-for-byte.
//! - **Notes**: the text pipeline (cleaner + tag detector) applied to the
//!   SQLite note table in a single transaction.
//! - **Media**: the image pipeline (compression adapter + codec adapter +
//!   geometry engine) applied to every media entry in place.
//!
//! The two pipelines are independent and never run in the same pass.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let detector = TagDetector::new(TagRules::load_default(&config));
//! let outcome = deck::clean_deck(Path::new("deck.apkg"), None, &detector, &config)?;
//! println!("{} notes updated", outcome.report.notes_updated);
//! ```
//!
//! # Modules
//!
//! - `deck`: end-to-end pipelines (main entry point)
//! - `package`: container extraction, inspection and repacking
//! - `media`: compression wrapper, image codecs and geometry
//! - `notes`: note text cleaning, tag detection and the note table updater
//! - `config`: application configuration
//! - `error`: fatal error taxonomy

pub mod config;
pub mod deck;
pub mod error;
pub mod media;
pub mod notes;
pub mod package;

pub use config::{Config, ImageDefaults};
pub use deck::{CleanOutcome, DeckSummary, MediaOutcome};
pub use error::PackageError;
pub use media::{
    Codec, Corner, CropSpec, Edge, MaskColor, MaskSpec, MediaAsset, MediaReport, MediaTransform,
    Percent,
};
pub use notes::{clean_field, NoteStore, NoteUpdateReport, TagDetector, TagRule, TagRules};
pub use package::Package;
