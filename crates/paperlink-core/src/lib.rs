//! paperlink core: harvested records, configuration, and the JSON/CSV files
//! the pipeline reads and writes.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::{CoreError, ExitCode, Result};
pub use models::*;

pub use storage::checkpoint::{Checkpoint, CheckpointStore, progress_path};
pub use storage::dump::{load_dump, match_cache_path, missing_record_ids};
pub use storage::mapping::{IdentifierMapping, load_identifier_mapping};
