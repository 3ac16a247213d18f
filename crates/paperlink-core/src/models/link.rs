use serde::{Deserialize, Serialize};

/// A record/citation pair whose external identifier was found in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KgMatch {
    #[serde(rename = "dataset_id")]
    pub record_id: u32,

    #[serde(rename = "dataset_name", default)]
    pub record_name: Option<String>,

    #[serde(rename = "dataset_url", default)]
    pub record_url: Option<String>,

    #[serde(rename = "arxiv_id")]
    pub external_id: String,

    #[serde(rename = "arxiv_title", default)]
    pub external_title: Option<String>,

    #[serde(rename = "publication_mardi_QID")]
    pub kb_item_id: String,
}

/// A match annotated with the knowledge-base item of the dataset it cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCandidate {
    #[serde(flatten)]
    pub matched: KgMatch,

    #[serde(rename = "dataset_mardi_QID")]
    pub dataset_item_id: String,
}

impl LinkCandidate {
    pub fn to_claim_pair(&self) -> ClaimPair {
        ClaimPair {
            publication_item_id: Some(self.matched.kb_item_id.clone()),
            dataset_item_id: Some(self.dataset_item_id.clone()),
            provenance_url: self.matched.record_url.clone(),
        }
    }
}

/// Input of the claim writer: "publication cites dataset", sourced from `provenance_url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimPair {
    #[serde(default)]
    pub publication_item_id: Option<String>,

    #[serde(default)]
    pub dataset_item_id: Option<String>,

    #[serde(default)]
    pub provenance_url: Option<String>,
}

impl ClaimPair {
    /// Both item IDs present and non-blank.
    pub fn resolved_ids(&self) -> Option<(&str, &str)> {
        let publication = self
            .publication_item_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        let dataset = self
            .dataset_item_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((publication, dataset))
    }
}
