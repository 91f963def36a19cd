//! Note text pipeline
//!
//! - [`cleaner`]: strips scraped UI debris from a note field
//! - [`tags`]: tag rules file parsing and keyword detection
//! - [`store`]: applies both to the note table in one transaction

pub mod cleaner;
pub mod store;
pub mod tags;

pub use cleaner::{clean_field, strip_html};
pub use store::{NoteRow, NoteStore, NoteUpdateReport, FIELD_SEPARATOR};
pub use tags::{dedupe_tags, merge_tags, TagConfigError, TagDetector, TagRule, TagRules};
