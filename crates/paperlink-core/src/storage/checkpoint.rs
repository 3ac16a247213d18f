use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Record;
use crate::storage::json_file::{load_json_array_if_exists, save_json_array};

/// Suffix appended to the output file name for the in-progress snapshot.
pub const PROGRESS_SUFFIX: &str = "_progress";

/// `data/dump.json` → `data/dump.json_progress`
pub fn progress_path(output: &Path) -> PathBuf {
    let mut raw: OsString = output.as_os_str().to_owned();
    raw.push(PROGRESS_SUFFIX);
    PathBuf::from(raw)
}

/// Records completed so far, in the order they were harvested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    records: Vec<Record>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// ID of the last appended record.
    pub fn last_completed_id(&self) -> Option<u32> {
        self.records.last().map(|r| r.record_id)
    }

    /// Identifiers at or below this value were handled by a previous run.
    pub fn resume_after(&self) -> u32 {
        self.last_completed_id().unwrap_or(0)
    }
}

/// Progress and final output files of one crawl target.
///
/// Writes overwrite in place; a crash during a write can leave a truncated file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    output: PathBuf,
    progress: PathBuf,
}

impl CheckpointStore {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let progress = progress_path(&output);
        Self { output, progress }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress
    }

    /// The saved snapshot, or `None` when no progress file exists.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        Ok(load_json_array_if_exists::<Record>(&self.progress)?.map(Checkpoint::from_records))
    }

    pub fn save_progress(&self, checkpoint: &Checkpoint) -> Result<()> {
        save_json_array(&self.progress, checkpoint.records())
    }

    /// Write the snapshot one last time and promote it to the output path.
    pub fn finalize(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.save_progress(checkpoint)?;
        save_json_array(&self.output, checkpoint.records())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::json_file::load_json_array;

    #[test]
    fn test_progress_path_appends_suffix() {
        let path = progress_path(Path::new("data/uci_datasets_final.json"));
        assert_eq!(path, PathBuf::from("data/uci_datasets_final.json_progress"));
    }

    #[test]
    fn test_load_without_progress_file() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("dump.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_resume_point() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("dump.json"));

        let mut checkpoint = Checkpoint::new();
        checkpoint.push(Record::new(1));
        checkpoint.push(Record::new(2));
        store.save_progress(&checkpoint).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.last_completed_id(), Some(2));
        assert_eq!(loaded.resume_after(), 2);
        assert!(!store.output_path().exists());
    }

    #[test]
    fn test_empty_progress_file_resumes_from_start() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("dump.json"));
        store.save_progress(&Checkpoint::new()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.resume_after(), 0);
    }

    #[test]
    fn test_finalize_promotes_to_output() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("dump.json"));

        let checkpoint = Checkpoint::from_records(vec![Record::new(5)]);
        store.finalize(&checkpoint).unwrap();

        let output: Vec<Record> = load_json_array(store.output_path()).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].record_id, 5);
        assert!(store.progress_path().exists());
    }
}
