//! Package error handling
//!
//! Typed errors for the fatal, pre-flight part of a run: everything that must
//! abort before any archive is written. Per-item media failures live in
//! [`crate::media::MediaError`] and never reach this type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a package run
#[derive(Error, Debug)]
pub enum PackageError {
    /// Input path does not exist
    #[error("Input package not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Input path exists but is a directory or other non-file
    #[error("Input '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// Input does not carry the expected container extension
    #[error("Input '{path}' must be a .{expected} package")]
    InvalidExtension { path: PathBuf, expected: &'static str },

    /// Neither known database filename exists in the package
    #[error("Note database not found in package (tried {tried})")]
    DatabaseNotFound { tried: String },

    /// Failed to create or reset the staging directory
    #[error("Failed to prepare staging directory '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// ZIP container error
    #[error("Archive error in '{path}': {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Walking the staging tree failed
    #[error("Failed to walk staging directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl PackageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind.
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => PackageError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => PackageError::InputNotFound { path },
            _ => PackageError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Whether this error was raised before anything was extracted
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            PackageError::InputNotFound { .. }
                | PackageError::NotAFile { .. }
                | PackageError::InvalidExtension { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            PackageError::InputNotFound { .. } => Some("Check the path to the exported package."),
            PackageError::InvalidExtension { .. } => {
                Some("Export the deck from the flashcard app as a package (.apkg).")
            }
            PackageError::DatabaseNotFound { .. } => Some(
                "The archive does not look like an exported deck. Re-export it with a compatible version.",
            ),
            PackageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions for the input and work directory.")
            }
            PackageError::Staging { .. } => {
                Some("Check that work_dir exists and is writable, or point DECKSMITH_WORK_DIR elsewhere.")
            }
            _ => None,
        }
    }
}

/// Result type for package operations
pub type PackageResult<T> = Result<T, PackageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = PackageError::from_io(io_err, PathBuf::from("/test/deck.apkg"));

        assert!(matches!(err, PackageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_not_found_classification() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = PackageError::from_io(io_err, PathBuf::from("/missing/deck.apkg"));

        assert!(matches!(err, PackageError::InputNotFound { .. }));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_database_not_found_display() {
        let err = PackageError::DatabaseNotFound {
            tried: "collection.anki21, collection.anki2".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("database not found"));
        assert!(msg.contains("collection.anki21"));
        assert!(!err.is_preflight());
    }

    #[test]
    fn test_invalid_extension_display() {
        let err = PackageError::InvalidExtension {
            path: PathBuf::from("notes.zip"),
            expected: "apkg",
        };

        assert!(err.to_string().contains(".apkg"));
        assert!(err.is_preflight());
    }
}
