//! File-backed persistence: the identifier store and the record sink

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::NormalizedRecord;

/// Durable, mergeable list of discovered product identifiers, persisted
/// as a single JSON array. Insertion order is preserved; duplicates are
/// dropped on merge.
pub struct IdentifierStore {
    path: PathBuf,
}

impl IdentifierStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Clear the store at the start of a fresh discovery run so stale
    /// identifiers from a previous run are not mixed with the new crawl.
    pub fn reset(&self) -> Result<()> {
        self.write_atomic(&[])
    }

    /// Merge new identifiers into the persisted set, keeping previously
    /// stored entries and their order.
    pub fn append(&self, ids: &[i64]) -> Result<()> {
        let mut merged = self.load_all()?;
        let mut seen: HashSet<i64> = merged.iter().copied().collect();
        for &id in ids {
            if seen.insert(id) {
                merged.push(id);
            }
        }
        self.write_atomic(&merged)
    }

    /// Replay the full persisted set in original insertion order. A
    /// missing or corrupt backing file is an empty set, never an error.
    pub fn load_all(&self) -> Result<Vec<i64>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read identifier store {}", self.path.display())
                });
            }
        };

        Ok(serde_json::from_str(&text).unwrap_or_else(|err| {
            warn!(
                "identifier store {} is corrupt ({err}), starting empty",
                self.path.display()
            );
            Vec::new()
        }))
    }

    // Replace-on-write keeps the on-disk document syntactically valid at
    // every point in time.
    fn write_atomic(&self, ids: &[i64]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(ids)?)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Append-only sink: one self-contained JSON record per line. No
/// deduplication; re-running extraction appends duplicate lines.
pub struct RecordSink {
    path: PathBuf,
}

impl RecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Truncate/create the backing file. Destructive; only called at the
    /// start of an extraction run.
    pub fn reset(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        Ok(())
    }

    pub fn append(&self, record: &NormalizedRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn record(id: i64) -> NormalizedRecord {
        NormalizedRecord {
            link: format!("https://example.com/catalog/{id}/detail.aspx"),
            product_id: id,
            title: FieldValue::Present("item".to_string()),
            price: FieldValue::missing(),
            seller_name: FieldValue::missing(),
            seller_link: FieldValue::missing(),
            sizes: FieldValue::missing(),
            quantity: FieldValue::missing(),
            rating: FieldValue::missing(),
            reviews_count: FieldValue::missing(),
            description: FieldValue::missing(),
            options: FieldValue::missing(),
            images: Vec::new(),
        }
    }

    #[test]
    fn append_merges_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentifierStore::new(dir.path().join("ids.json"));

        store.reset().unwrap();
        store.append(&[3, 1]).unwrap();
        store.append(&[2, 1, 4]).unwrap();

        assert_eq!(store.load_all().unwrap(), vec![3, 1, 2, 4]);
    }

    #[test]
    fn corrupt_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        fs::write(&path, "{not json").unwrap();

        let store = IdentifierStore::new(&path);
        assert!(store.load_all().unwrap().is_empty());

        store.append(&[7]).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![7]);
    }

    #[test]
    fn missing_document_is_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentifierStore::new(dir.path().join("absent.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn reset_clears_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentifierStore::new(dir.path().join("ids.json"));

        store.append(&[1, 2]).unwrap();
        store.reset().unwrap();

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("products.jsonl"));

        sink.reset().unwrap();
        sink.append(&record(1)).unwrap();
        sink.append(&record(2)).unwrap();

        let text = fs::read_to_string(dir.path().join("products.jsonl")).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["product_id"], 1);
        assert_eq!(first["price"], "NO_DATA");
    }

    #[test]
    fn sink_reset_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("products.jsonl"));

        sink.append(&record(1)).unwrap();
        sink.reset().unwrap();

        let text = fs::read_to_string(dir.path().join("products.jsonl")).unwrap();
        assert!(text.is_empty());
    }
}
