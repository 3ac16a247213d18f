use std::collections::HashMap;

use paperlink_core::Citation;
use paperlink_core::config::{HttpConfig, SemanticScholarConfig};
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Span;

use crate::error::{HarvestError, Result};
use crate::http::RateLimitedClient;
use crate::identifiers::CorpusToken;

const ENRICH_FIELDS: &str = "title,url,externalIds";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct S2Paper {
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub external_ids: HashMap<String, String>,
}

impl S2Paper {
    pub fn from_json(v: &Value) -> Self {
        let text = |key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };

        // CorpusId comes back as a number, DOI/ArXiv as strings.
        let external_ids = v
            .get("externalIds")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k.clone(), s.clone())),
                        Value::Number(n) => Some((k.clone(), n.to_string())),
                        _ => None,
                    })
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        Self {
            paper_id: text("paperId"),
            title: text("title"),
            url: text("url"),
            external_ids,
        }
    }

    pub fn doi(&self) -> Option<&str> {
        self.external_ids.get("DOI").map(String::as_str)
    }

    pub fn arxiv(&self) -> Option<&str> {
        self.external_ids.get("ArXiv").map(String::as_str)
    }
}

/// Bibliographic fields added to a citation after a successful lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enrichment {
    pub title: Option<String>,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub arxiv: Option<String>,
}

impl Enrichment {
    /// Enriched copy of `citation`; fields the lookup did not return keep their extracted values.
    pub fn apply_to(self, citation: &Citation) -> Citation {
        Citation {
            title: self.title.unwrap_or_else(|| citation.title.clone()),
            url: self.url.or_else(|| citation.url.clone()),
            doi: self.doi,
            arxiv: self.arxiv,
        }
    }
}

impl From<S2Paper> for Enrichment {
    fn from(paper: S2Paper) -> Self {
        Self {
            doi: paper.doi().map(ToOwned::to_owned),
            arxiv: paper.arxiv().map(ToOwned::to_owned),
            title: paper.title,
            url: paper.url,
        }
    }
}

pub struct SemanticScholarSource {
    client: RateLimitedClient,
    api_key: Option<String>,
    base_url: String,
    span: Span,
}

impl SemanticScholarSource {
    pub fn new(
        client: RateLimitedClient,
        base_url: impl Into<String>,
        api_key: Option<String>,
        span: Span,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into(),
            span,
        }
    }

    /// Builds the source from config. Lookups never retry, whatever `http.max_retries` says.
    pub fn from_config(
        http: &HttpConfig,
        config: &SemanticScholarConfig,
        api_key: Option<String>,
        span: Span,
    ) -> Result<Self> {
        let http = HttpConfig {
            max_retries: 0,
            ..http.clone()
        };
        Ok(Self::new(
            RateLimitedClient::from_config(&http)?,
            config.base_url.clone(),
            api_key,
            span,
        ))
    }

    /// One lookup, no retries. Errors include non-2xx statuses.
    pub async fn fetch_paper(&self, token: &CorpusToken) -> Result<S2Paper> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| HarvestError::Parse(format!("invalid URL {}: {e}", self.base_url)))?;
        {
            let mut segs = url.path_segments_mut().map_err(|_| {
                HarvestError::Parse("invalid Semantic Scholar base URL".to_string())
            })?;
            segs.push("paper");
            segs.push(token.as_str());
        }
        url.query_pairs_mut().append_pair("fields", ENRICH_FIELDS);

        let body = self
            .client
            .get_with_headers(url.as_str(), self.auth_headers()?)
            .await?;
        let json: Value =
            serde_json::from_str(&body).map_err(|e| HarvestError::Parse(e.to_string()))?;
        Ok(S2Paper::from_json(&json))
    }

    /// Enrichment for `token`, or `None` when the lookup fails for any reason.
    pub async fn enrich(&self, token: &CorpusToken) -> Option<Enrichment> {
        match self.fetch_paper(token).await {
            Ok(paper) => Some(paper.into()),
            Err(e) => {
                tracing::warn!(parent: &self.span, %token, "no enrichment: {e}");
                None
            }
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let value =
                HeaderValue::from_str(key).map_err(|e| HarvestError::Parse(e.to_string()))?;
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
pub(crate) fn test_source(base_url: String) -> SemanticScholarSource {
    let client = RateLimitedClient::new(
        std::time::Duration::from_millis(1),
        0,
        "paperlink-test",
        std::time::Duration::from_secs(5),
    )
    .unwrap();
    SemanticScholarSource::new(client, base_url, None, Span::none())
}
