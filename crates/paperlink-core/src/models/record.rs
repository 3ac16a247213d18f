use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder name the catalog serves for datasets that are not public yet.
pub const UNAPPROVED_DATASET_NAME: &str = "403 Dataset not approved.";

/// One harvested catalog entry.
///
/// Field names on disk follow the dump format (`dataset_id`, `dataset_name`, ...),
/// absent values are written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "dataset_id")]
    pub record_id: u32,

    pub checked_timestamp: String,

    pub updated_timestamp: String,

    #[serde(rename = "dataset_name", default)]
    pub name: Option<String>,

    #[serde(rename = "dataset_url", default)]
    pub canonical_url: Option<String>,

    #[serde(default)]
    pub intro_paper: Option<IntroPaper>,

    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl Record {
    /// Creates a record stamped with the current time.
    ///
    /// `checked_timestamp` and `updated_timestamp` always carry the same instant.
    pub fn new(record_id: u32) -> Self {
        let now = harvest_timestamp(Utc::now());
        Self {
            record_id,
            checked_timestamp: now.clone(),
            updated_timestamp: now,
            name: None,
            canonical_url: None,
            intro_paper: None,
            citations: Vec::new(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.name.as_deref() != Some(UNAPPROVED_DATASET_NAME)
    }

    pub fn has_arxiv_citation(&self) -> bool {
        self.citations.iter().any(Citation::has_arxiv)
    }
}

/// Formats an instant as ISO-8601 UTC with minute precision, e.g. `2025-03-01T10:42:00Z`.
pub fn harvest_timestamp(at: DateTime<Utc>) -> String {
    let truncated = at
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at);
    truncated.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The paper that introduced a dataset, as reported by the catalog API.
///
/// The API is loose about types (`corpus` often arrives as a number), so scalar
/// values are read as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroPaper {
    #[serde(default, deserialize_with = "scalar_as_text")]
    pub title: Option<String>,

    #[serde(rename = "DOI", default, deserialize_with = "scalar_as_text")]
    pub doi: Option<String>,

    #[serde(rename = "URL", default, deserialize_with = "scalar_as_text")]
    pub external_url: Option<String>,

    #[serde(rename = "corpus", default, deserialize_with = "scalar_as_text")]
    pub corpus_id: Option<String>,

    #[serde(rename = "arxiv", default, deserialize_with = "scalar_as_text")]
    pub arxiv_id: Option<String>,
}

fn scalar_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl IntroPaper {
    pub fn has_doi_or_arxiv(&self) -> bool {
        non_empty(&self.doi) || non_empty(&self.arxiv_id)
    }
}

/// A citing work listed on a record's page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub doi: Option<String>,

    #[serde(default)]
    pub arxiv: Option<String>,
}

impl Citation {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            doi: None,
            arxiv: None,
        }
    }

    pub fn has_arxiv(&self) -> bool {
        non_empty(&self.arxiv)
    }

    /// True when the citation carries at least one usable identifier.
    pub fn is_identifiable(&self) -> bool {
        non_empty(&self.arxiv) || non_empty(&self.url) || non_empty(&self.doi)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn timestamp_is_truncated_to_minutes() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 42, 37).unwrap();
        assert_eq!(harvest_timestamp(at), "2025-03-01T10:42:00Z");
    }

    #[test]
    fn new_record_has_identical_timestamps() {
        let record = Record::new(7);
        assert_eq!(record.checked_timestamp, record.updated_timestamp);
        assert!(record.checked_timestamp.ends_with(":00Z"));
    }

    #[test]
    fn deserializes_dump_entry_with_nulls() {
        let value = json!({
            "dataset_id": 53,
            "checked_timestamp": "2025-03-01T10:42:00Z",
            "updated_timestamp": "2025-03-01T10:42:00Z",
            "dataset_name": "Iris",
            "dataset_url": "https://archive.ics.uci.edu/dataset/53",
            "intro_paper": {"title": "The use of multiple measurements", "DOI": null, "URL": null, "corpus": null, "arxiv": null},
            "citations": [
                {"title": "A paper", "url": "https://www.semanticscholar.org/paper/x", "doi": null, "arxiv": "2101.00001"}
            ]
        });

        let record: Record = serde_json::from_value(value).unwrap();
        assert_eq!(record.record_id, 53);
        assert_eq!(record.name.as_deref(), Some("Iris"));
        assert!(!record.intro_paper.as_ref().unwrap().has_doi_or_arxiv());
        assert!(record.has_arxiv_citation());
    }

    #[test]
    fn serializes_with_dump_field_names() {
        let mut record = Record::new(3);
        record.name = Some("Ünïcode".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["dataset_id"], 3);
        assert_eq!(value["dataset_name"], "Ünïcode");
        assert!(value["dataset_url"].is_null());
        assert!(value["intro_paper"].is_null());
    }

    #[test]
    fn intro_paper_accepts_numeric_fields() {
        let paper: IntroPaper = serde_json::from_value(json!({
            "title": "T",
            "DOI": "10.1/x",
            "corpus": 12345,
            "arxiv": 1706.03762
        }))
        .unwrap();
        assert_eq!(paper.title.as_deref(), Some("T"));
        assert_eq!(paper.doi.as_deref(), Some("10.1/x"));
        assert_eq!(paper.corpus_id.as_deref(), Some("12345"));
        assert_eq!(paper.arxiv_id.as_deref(), Some("1706.03762"));
        assert_eq!(paper.external_url, None);
    }

    #[test]
    fn unapproved_record_is_detected() {
        let mut record = Record::new(1);
        record.name = Some(UNAPPROVED_DATASET_NAME.to_string());
        assert!(!record.is_approved());
    }

    #[test]
    fn citation_identifiability() {
        let blank = Citation {
            title: "t".to_string(),
            url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!blank.is_identifiable());
        assert!(Citation::new("t", "https://example.org").is_identifiable());
    }
}
