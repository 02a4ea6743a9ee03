use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::debug;

use crate::{
    dao::storage::{StorageError, StorageResult},
    dto::record::GameRecord,
};

/// Default number of records kept by [`JsonFileRecordSink`].
pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Receives the results of every finished session exactly once.
///
/// Called synchronously from the session at the finish transition, so
/// implementations should be quick.
pub trait RecordSink: Send + Sync {
    /// Persist one finished session.
    fn save_result(&self, record: GameRecord) -> StorageResult<()>;
}

/// Keeps records in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Mutex<Vec<GameRecord>>,
}

impl MemoryRecordSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record saved so far.
    pub fn records(&self) -> Vec<GameRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl RecordSink for MemoryRecordSink {
    fn save_result(&self, record: GameRecord) -> StorageResult<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
        Ok(())
    }
}

/// Stores records in a single JSON file, newest first, capped at `max_records`.
#[derive(Debug)]
pub struct JsonFileRecordSink {
    path: PathBuf,
    max_records: usize,
    write_gate: Mutex<()>,
}

impl JsonFileRecordSink {
    /// Sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records: max_records.max(1),
            write_gate: Mutex::new(()),
        }
    }

    /// File the records live in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored record, newest first. A missing file is an empty history.
    pub fn load_records(&self) -> StorageResult<Vec<GameRecord>> {
        read_records(&self.path)
    }

    /// Remove a record by id. Returns whether it existed.
    pub fn delete_record(&self, id: &str) -> StorageResult<bool> {
        let _gate = self.write_gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = read_records(&self.path)?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(false);
        }
        write_records(&self.path, &records)?;
        Ok(true)
    }

    /// Forget every record.
    pub fn clear(&self) -> StorageResult<()> {
        let _gate = self.write_gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        write_records(&self.path, &[])
    }
}

impl RecordSink for JsonFileRecordSink {
    fn save_result(&self, record: GameRecord) -> StorageResult<()> {
        let _gate = self.write_gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = read_records(&self.path)?;
        debug!(record_id = %record.id, path = %self.path.display(), "appending game record");
        records.insert(0, record);
        records.truncate(self.max_records);
        write_records(&self.path, &records)
    }
}

fn read_records(path: &Path) -> StorageResult<Vec<GameRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("failed to read {}", path.display()),
                err,
            ));
        }
    };

    serde_json::from_slice(&bytes)
        .map_err(|err| StorageError::Malformed(format!("{}: {err}", path.display())))
}

fn write_records(path: &Path, records: &[GameRecord]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            StorageError::unavailable(format!("failed to create {}", parent.display()), err)
        })?;
    }

    let json = serde_json::to_vec_pretty(records)
        .map_err(|err| StorageError::Malformed(err.to_string()))?;
    fs::write(path, json)
        .map_err(|err| StorageError::unavailable(format!("failed to write {}", path.display()), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::record::{RecordDraft, RecordEntry},
        games::GameKind,
    };

    fn record(name: &str) -> GameRecord {
        GameRecord::from_draft(
            GameKind::Taboo,
            RecordDraft {
                results: vec![RecordEntry::new(name, 3u32)],
                winner: Some(name.to_string()),
            },
        )
    }

    #[test]
    fn json_sink_keeps_newest_first_and_caps_history() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileRecordSink::new(dir.path().join("history/records.json"), 2);
        assert!(sink.load_records().unwrap().is_empty());

        sink.save_result(record("first")).unwrap();
        sink.save_result(record("second")).unwrap();
        sink.save_result(record("third")).unwrap();

        let records = sink.load_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].winner.as_deref(), Some("third"));
        assert_eq!(records[1].winner.as_deref(), Some("second"));

        assert!(sink.delete_record(&records[0].id).unwrap());
        assert!(!sink.delete_record("missing").unwrap());
        assert_eq!(sink.load_records().unwrap().len(), 1);

        sink.clear().unwrap();
        assert!(sink.load_records().unwrap().is_empty());
    }

    #[test]
    fn corrupt_history_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "not json").unwrap();

        let sink = JsonFileRecordSink::new(&path, DEFAULT_MAX_RECORDS);
        assert!(matches!(sink.load_records(), Err(StorageError::Malformed(_))));
        assert!(sink.save_result(record("x")).is_err());
    }

    #[test]
    fn memory_sink_collects_records() {
        let sink = MemoryRecordSink::new();
        sink.save_result(record("a")).unwrap();
        assert_eq!(sink.records().len(), 1);
    }
}
