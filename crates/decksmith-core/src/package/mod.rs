//! Package container handling
//!
//! An exported deck is a ZIP archive holding:
//!
//! - the note database (`collection.anki21`, or `collection.anki2` in older
//!   exports)
//! - an optional media index (`media`) and metadata file (`meta`)
//! - media entries, usually named by number
//!
//! [`Package::extract`] unpacks it into a [`StagingDir`]; transforms edit the
//! staged files in place; [`Package::repack`] writes every staged file into a
//! new archive under its original relative name. Files nobody touched go back
//! byte-for-byte.

pub mod staging;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{PackageError, PackageResult};

pub use staging::StagingDir;

/// Extension of exported packages
pub const PACKAGE_EXTENSION: &str = "apkg";

/// Database filenames, newest first
pub const DATABASE_NAMES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Top-level entries that are never media
pub const RESERVED_NAMES: [&str; 5] = [
    "collection.anki2",
    "collection.anki21",
    "collection.anki21b",
    "media",
    "meta",
];

/// Check that `path` names an existing `.apkg` file
///
/// Runs before anything is extracted.
pub fn validate_input(path: &Path) -> PackageResult<()> {
    if !path.exists() {
        return Err(PackageError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(PackageError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let has_extension = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case(PACKAGE_EXTENSION)
    );
    if !has_extension {
        return Err(PackageError::InvalidExtension {
            path: path.to_path_buf(),
            expected: PACKAGE_EXTENSION,
        });
    }

    Ok(())
}

/// `<dir>/<stem><suffix>.apkg` next to the input
pub fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "deck".to_string());
    input.with_file_name(format!("{}{}.{}", stem, suffix, PACKAGE_EXTENSION))
}

/// Force the package extension onto a path when it is missing or different
///
/// Keeps an existing matching extension (case-insensitive).
pub fn ensure_extension(mut path: PathBuf) -> PathBuf {
    let replace = !matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case(PACKAGE_EXTENSION)
    );

    if replace {
        path.set_extension(PACKAGE_EXTENSION);
    }
    path
}

/// An extracted package
///
/// Owns its staging directory; dropping the package removes it.
#[derive(Debug)]
pub struct Package {
    source: PathBuf,
    staging: StagingDir,
}

impl Package {
    /// Validate and extract a package under `work_dir`
    pub fn extract(input: &Path, work_dir: &Path) -> PackageResult<Self> {
        validate_input(input)?;

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "deck".to_string());
        let staging = StagingDir::create(work_dir, &format!("{}.staging", stem))?;

        info!("Extracting {:?} into {:?}", input, staging.path());

        let file =
            File::open(input).map_err(|e| PackageError::from_io(e, input.to_path_buf()))?;
        let mut archive = ZipArchive::new(file).map_err(|source| PackageError::Archive {
            path: input.to_path_buf(),
            source,
        })?;
        archive
            .extract(staging.path())
            .map_err(|source| PackageError::Archive {
                path: input.to_path_buf(),
                source,
            })?;

        debug!("Extracted {} entries", archive.len());

        Ok(Self {
            source: input.to_path_buf(),
            staging,
        })
    }

    /// The archive this package was extracted from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Root of the staging directory
    pub fn root(&self) -> &Path {
        self.staging.path()
    }

    /// Find the note database, trying the newer filename first
    pub fn locate_database(&self) -> PackageResult<PathBuf> {
        for name in DATABASE_NAMES {
            let path = self.root().join(name);
            if path.is_file() {
                info!("Found note database {}", name);
                return Ok(path);
            }
        }

        Err(PackageError::DatabaseNotFound {
            tried: DATABASE_NAMES.join(", "),
        })
    }

    /// Top-level files that may hold media, sorted by name
    pub fn media_entries(&self) -> PackageResult<Vec<PathBuf>> {
        let read_dir = fs::read_dir(self.root())
            .map_err(|e| PackageError::from_io(e, self.root().to_path_buf()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| PackageError::from_io(e, self.root().to_path_buf()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            if RESERVED_NAMES.iter().any(|r| name.as_os_str() == *r) {
                continue;
            }
            entries.push(path);
        }

        entries.sort();
        Ok(entries)
    }

    /// Archive-relative names of every staged file, sorted
    pub fn entry_names(&self) -> PackageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(self.root()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                names.push(self.archive_name(entry.path()));
            }
        }
        Ok(names)
    }

    /// Write every staged file into a new deflate-compressed archive
    ///
    /// The archive is assembled next to `output` and renamed into place, so
    /// a failed repack never leaves a truncated package behind.
    pub fn repack(&self, output: &Path) -> PackageResult<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| PackageError::WriteError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let temp_path = output.with_extension("apkg.tmp");
        if let Err(e) = self.write_archive(&temp_path) {
            discard_partial(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, output).map_err(|source| PackageError::WriteError {
            path: output.to_path_buf(),
            source,
        })?;

        info!("Wrote package {:?}", output);
        Ok(())
    }

    fn write_archive(&self, path: &Path) -> PackageResult<()> {
        let write_err = |source: io::Error| PackageError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        let archive_err = |source: zip::result::ZipError| PackageError::Archive {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_err)?;
        let mut zip = ZipWriter::new(file);
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut count = 0usize;
        for entry in WalkDir::new(self.root()).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = self.archive_name(entry.path());
            zip.start_file(name, options).map_err(archive_err)?;

            let mut reader = File::open(entry.path()).map_err(|source| PackageError::ReadError {
                path: entry.path().to_path_buf(),
                source,
            })?;
            io::copy(&mut reader, &mut zip).map_err(write_err)?;
            count += 1;
        }

        zip.finish().map_err(archive_err)?;
        debug!("Packed {} entries into {:?}", count, path);
        Ok(())
    }

    /// Relative path with forward slashes
    fn archive_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.root()).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Remove a half-written archive; a file that was never created is fine
fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial archive {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial archive {:?}: {}", path, e),
    }
}
