use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{CoreError, Result};

const RECORD_ID_COLUMN: &str = "uci_id";
const ITEM_ID_COLUMN: &str = "mardi_qid";

/// External record ID → knowledge-base dataset item ID.
pub type IdentifierMapping = HashMap<u32, String>;

/// Load the dataset mapping CSV.
///
/// Expected header: `dataset_name,uci_id,mardi_qid,mardi_dataset_name`.
/// Rows with a non-integer ID or a missing/empty item ID are skipped.
pub fn load_identifier_mapping(path: &Path) -> Result<IdentifierMapping> {
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let id_idx = column_index(&headers, RECORD_ID_COLUMN);
    let qid_idx = column_index(&headers, ITEM_ID_COLUMN);

    let mut mapping = IdentifierMapping::new();
    let (Some(id_idx), Some(qid_idx)) = (id_idx, qid_idx) else {
        tracing::warn!(
            path = %path.display(),
            "mapping file lacks '{RECORD_ID_COLUMN}' or '{ITEM_ID_COLUMN}' column"
        );
        return Ok(mapping);
    };

    let mut skipped = 0usize;
    for row in reader.records() {
        let Ok(row) = row else {
            skipped += 1;
            continue;
        };
        match parse_row(&row, id_idx, qid_idx) {
            Some((record_id, item_id)) => {
                mapping.insert(record_id, item_id);
            }
            None => skipped += 1,
        }
    }

    tracing::debug!(entries = mapping.len(), skipped, "loaded identifier mapping");
    Ok(mapping)
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn parse_row(row: &StringRecord, id_idx: usize, qid_idx: usize) -> Option<(u32, String)> {
    let record_id = row.get(id_idx)?.parse::<u32>().ok()?;
    let item_id = row.get(qid_idx).filter(|q| !q.is_empty())?;
    Some((record_id, item_id.to_string()))
}
