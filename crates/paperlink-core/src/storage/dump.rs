use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{KgMatch, Record};
use crate::storage::json_file::{load_json_array, load_json_array_if_exists, save_json_array};

/// Suffix of the knowledge-base match cache written next to a dump.
pub const MATCH_CACHE_SUFFIX: &str = ".kg_entries";

/// `data/dump.json` → `data/dump.json.kg_entries`
pub fn match_cache_path(dump: &Path) -> PathBuf {
    let mut raw: OsString = dump.as_os_str().to_owned();
    raw.push(MATCH_CACHE_SUFFIX);
    PathBuf::from(raw)
}

/// Load a finished crawl output. A missing file is a hard error.
pub fn load_dump(path: &Path) -> Result<Vec<Record>> {
    load_json_array(path)
}

/// IDs from `expected` that have no record in `records`, in input order.
pub fn missing_record_ids(records: &[Record], expected: &[u32]) -> Vec<u32> {
    let present: HashSet<u32> = records.iter().map(|r| r.record_id).collect();
    expected
        .iter()
        .copied()
        .filter(|id| !present.contains(id))
        .collect()
}

/// Previously cached matches; `None` if the cache file does not exist.
pub fn load_match_cache(path: &Path) -> Result<Option<Vec<KgMatch>>> {
    load_json_array_if_exists(path)
}

pub fn save_match_cache(path: &Path, matches: &[KgMatch]) -> Result<()> {
    save_json_array(path, matches)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_match_cache_path() {
        assert_eq!(
            match_cache_path(Path::new("data/dump.json")),
            PathBuf::from("data/dump.json.kg_entries")
        );
    }

    #[test]
    fn test_missing_record_ids() {
        let records = vec![Record::new(1), Record::new(3)];
        assert_eq!(missing_record_ids(&records, &[1, 2, 3, 4]), vec![2, 4]);
        assert!(missing_record_ids(&records, &[3, 1]).is_empty());
    }

    #[test]
    fn test_load_dump_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_dump(&dir.path().join("dump.json"));
        assert!(matches!(result, Err(CoreError::FileNotFound(_))));
    }

    #[test]
    fn test_match_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = match_cache_path(&dir.path().join("dump.json"));
        assert!(load_match_cache(&path).unwrap().is_none());

        let matches = vec![KgMatch {
            record_id: 53,
            record_name: Some("Iris".to_string()),
            record_url: None,
            external_id: "2101.00001".to_string(),
            external_title: None,
            kb_item_id: "Q1".to_string(),
        }];
        save_match_cache(&path, &matches).unwrap();
        assert_eq!(load_match_cache(&path).unwrap(), Some(matches));
    }
}
