use paperlink_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("failed to fetch dataset {record_id}: {reason}")]
    Fetch { record_id: u32, reason: String },

    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("knowledge-base item not found: {0}")]
    ItemNotFound(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl HarvestError {
    /// Non-2xx status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
