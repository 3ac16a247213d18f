//! Dataset page rendering and citing-work extraction.

pub mod extractor;
pub mod markdown;

pub use extractor::{Extraction, extract};
pub use markdown::{
    CANONICAL_DATASET_BASE, CITING_WORKS_MARKER, canonical_url_marker, render_dataset_page,
};
