//! Note table updater
//!
//! Reads every row of the package's `notes` table, cleans the last field,
//! merges detected tags, and writes back only the rows that changed. All
//! writes share one transaction, so a run either updates every changed note
//! or none of them.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info};

use super::cleaner::clean_field;
use super::tags::{dedupe_tags, merge_tags, TagDetector};

/// Separator between the fields of a note
pub const FIELD_SEPARATOR: char = '\x1f';

/// Counts from one pass over the note table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoteUpdateReport {
    pub notes_seen: usize,
    pub notes_updated: usize,
    /// Notes that gained at least one tag
    pub tagged: usize,
}

/// One row of the note table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub id: i64,
    pub fields: String,
    pub tags: String,
}

impl NoteRow {
    /// Clean the last field and merge detected tags
    ///
    /// Returns `None` when neither the fields nor the tags would change.
    /// A rewritten row always carries a deduplicated tag string.
    pub fn rewrite(&self, detector: &TagDetector) -> Option<NoteRow> {
        let first = self.fields.split(FIELD_SEPARATOR).next().unwrap_or_default();
        let (head, last) = match self.fields.rsplit_once(FIELD_SEPARATOR) {
            Some((head, last)) => (Some(head), last),
            None => (None, self.fields.as_str()),
        };

        let cleaned = clean_field(last);
        let detection_input = format!("{} {}", first, cleaned);

        let new_fields = match head {
            Some(head) => format!("{}{}{}", head, FIELD_SEPARATOR, cleaned),
            None => cleaned,
        };

        let detected = detector.detect(&detection_input);
        let new_tags = merge_tags(&self.tags, &detected);

        if new_fields == self.fields && new_tags == self.tags {
            return None;
        }

        Some(NoteRow {
            id: self.id,
            fields: new_fields,
            tags: dedupe_tags(&new_tags),
        })
    }

    /// Whether `updated` carries a tag this row does not have
    fn gained_tags(&self, updated: &NoteRow) -> bool {
        let before: Vec<&str> = self.tags.split_whitespace().collect();
        updated
            .tags
            .split_whitespace()
            .any(|tag| !before.contains(&tag))
    }
}

/// Handle on a package's note database
pub struct NoteStore {
    conn: Connection,
}

impl NoteStore {
    /// Open an existing database for reading and writing
    ///
    /// Never creates a database that is not already there.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .with_context(|| format!("Failed to open note database at {:?}", path))?;
        Ok(Self { conn })
    }

    /// Open an existing database without write access
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open note database at {:?}", path))?;
        Ok(Self { conn })
    }

    /// Wrap an already open connection (for testing)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of rows in the note table
    pub fn note_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .context("Failed to count notes")?;
        Ok(count)
    }

    /// Every note, in table order
    pub fn notes(&self) -> Result<Vec<NoteRow>> {
        read_notes(&self.conn)
    }

    /// Clean and tag every note, committing all changes at once
    pub fn update_notes(&mut self, detector: &TagDetector) -> Result<NoteUpdateReport> {
        let tx = self.conn.transaction()?;
        let notes = read_notes(&tx)?;

        let mut report = NoteUpdateReport {
            notes_seen: notes.len(),
            ..NoteUpdateReport::default()
        };

        {
            let mut update = tx.prepare("UPDATE notes SET flds = ?, tags = ? WHERE id = ?")?;

            for note in &notes {
                let Some(updated) = note.rewrite(detector) else {
                    continue;
                };

                if note.gained_tags(&updated) {
                    report.tagged += 1;
                }

                update
                    .execute(params![updated.fields, updated.tags, updated.id])
                    .with_context(|| format!("Failed to update note {}", note.id))?;
                report.notes_updated += 1;
                debug!("Updated note {}", note.id);
            }
        }

        tx.commit().context("Failed to commit note updates")?;

        info!(
            "{} of {} note(s) updated, {} newly tagged",
            report.notes_updated, report.notes_seen, report.tagged
        );
        Ok(report)
    }
}

fn read_notes(conn: &Connection) -> Result<Vec<NoteRow>> {
    let mut stmt = conn
        .prepare("SELECT id, flds, tags FROM notes")
        .context("Failed to read note table")?;

    let rows = stmt.query_map([], |row| {
        Ok(NoteRow {
            id: row.get(0)?,
            fields: row.get(1)?,
            tags: row.get(2)?,
        })
    })?;

    let mut notes = Vec::new();
    for row in rows {
        notes.push(row?);
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::TagRules;

    fn create_store(rows: &[(i64, &str, &str)]) -> NoteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, mid INTEGER NOT NULL DEFAULT 0,
                                 mod INTEGER NOT NULL DEFAULT 0, flds TEXT NOT NULL,
                                 tags TEXT NOT NULL);",
        )
        .unwrap();
        for (id, flds, tags) in rows {
            conn.execute(
                "INSERT INTO notes (id, mod, flds, tags) VALUES (?, 1234, ?, ?)",
                params![id, flds, tags],
            )
            .unwrap();
        }
        NoteStore::from_connection(conn)
    }

    fn geography() -> TagDetector {
        TagDetector::new(TagRules::parse("[geography]\nparis\nfrance\n"))
    }

    fn row(store: &NoteStore, id: i64) -> (String, String) {
        store
            .connection()
            .query_row("SELECT flds, tags FROM notes WHERE id = ?", [id], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap()
    }

    #[test]
    fn test_only_last_field_cleaned() {
        let note = NoteRow {
            id: 1,
            fields: "♥ 3\x1fmiddle<br>♥ 4\x1fanswer<br>♥ 5".to_string(),
            tags: String::new(),
        };

        let updated = note.rewrite(&TagDetector::disabled()).unwrap();
        assert_eq!(updated.fields, "♥ 3\x1fmiddle<br>♥ 4\x1fanswer");
        assert_eq!(updated.fields.split(FIELD_SEPARATOR).count(), 3);
    }

    #[test]
    fn test_single_field_note() {
        let note = NoteRow {
            id: 1,
            fields: "Paris<br>1 of 3 metas".to_string(),
            tags: String::new(),
        };

        let updated = note.rewrite(&geography()).unwrap();
        assert_eq!(updated.fields, "Paris");
        assert_eq!(updated.tags, "geography");
    }

    #[test]
    fn test_unchanged_note_not_rewritten() {
        let note = NoteRow {
            id: 1,
            fields: "Question\x1fAnswer".to_string(),
            tags: "history".to_string(),
        };
        assert!(note.rewrite(&geography()).is_none());
    }

    #[test]
    fn test_detection_uses_first_and_last_fields() {
        let note = NoteRow {
            id: 1,
            fields: "Capital of France\x1fParis (middle)\x1fSomething".to_string(),
            tags: String::new(),
        };
        assert_eq!(note.rewrite(&geography()).unwrap().tags, "geography");

        // Middle field alone does not count
        let note = NoteRow {
            id: 2,
            fields: "Question\x1fParis\x1fSomething".to_string(),
            tags: String::new(),
        };
        assert!(note.rewrite(&geography()).is_none());
    }

    #[test]
    fn test_update_notes() {
        let mut store = create_store(&[
            (1, "Capital of France\x1fParis<br>♥ 3", "history"),
            (2, "Question\x1fPlain answer", ""),
            (3, "Where?\x1fTokyo<br>2 of 9 metas", ""),
        ]);

        let report = store.update_notes(&geography()).unwrap();
        assert_eq!(
            report,
            NoteUpdateReport {
                notes_seen: 3,
                notes_updated: 2,
                tagged: 1,
            }
        );

        assert_eq!(
            row(&store, 1),
            ("Capital of France\x1fParis".to_string(), "history geography".to_string())
        );
        assert_eq!(
            row(&store, 2),
            ("Question\x1fPlain answer".to_string(), String::new())
        );
        assert_eq!(row(&store, 3), ("Where?\x1fTokyo".to_string(), String::new()));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut store = create_store(&[(1, "France\x1fanswer<br>♥ 1<br><br><br>more", "")]);

        let first = store.update_notes(&geography()).unwrap();
        assert_eq!(first.notes_updated, 1);

        let second = store.update_notes(&geography()).unwrap();
        assert_eq!(second.notes_updated, 0);
        assert_eq!(second.tagged, 0);
    }

    #[test]
    fn test_other_columns_untouched() {
        let mut store = create_store(&[(7, "q\x1fa<br>♥ 2", "")]);
        store.update_notes(&TagDetector::disabled()).unwrap();

        let modified: i64 = store
            .connection()
            .query_row("SELECT mod FROM notes WHERE id = 7", [], |r| r.get(0))
            .unwrap();
        assert_eq!(modified, 1234);
    }

    #[test]
    fn test_rewritten_row_has_deduplicated_tags() {
        let note = NoteRow {
            id: 7,
            fields: "q\x1fa<br>♥ 2".to_string(),
            tags: "x x y".to_string(),
        };

        let updated = note.rewrite(&TagDetector::disabled()).unwrap();
        assert_eq!(updated.fields, "q\x1fa");
        assert_eq!(updated.tags, "x y");
    }

    #[test]
    fn test_duplicate_tags_alone_do_not_trigger_write() {
        let note = NoteRow {
            id: 1,
            fields: "Question\x1fAnswer".to_string(),
            tags: "x x".to_string(),
        };
        assert!(note.rewrite(&TagDetector::disabled()).is_none());
    }

    #[test]
    fn test_update_dedupes_without_counting_as_tagged() {
        let mut store = create_store(&[(1, "q\x1fa<br>♥ 2", " x y x ")]);

        let report = store.update_notes(&TagDetector::disabled()).unwrap();
        assert_eq!(report.notes_updated, 1);
        assert_eq!(report.tagged, 0);
        assert_eq!(row(&store, 1), ("q\x1fa".to_string(), " x y ".to_string()));
    }

    #[test]
    fn test_note_count() {
        let store = create_store(&[(1, "a", ""), (2, "b", "")]);
        assert_eq!(store.note_count().unwrap(), 2);
        assert_eq!(store.notes().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_table_is_error() {
        let mut store = NoteStore::from_connection(Connection::open_in_memory().unwrap());
        assert!(store.update_notes(&geography()).is_err());
    }
}
