use paperlink_core::IntroPaper;
use paperlink_core::config::{HttpConfig, UciConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Span;

use crate::citations::render_dataset_page;
use crate::error::{HarvestError, Result};
use crate::http::RateLimitedClient;

const DEFAULT_LIST_FILTER: &str = "python";
const DEFAULT_LIST_ERROR: &str = "Internal Server Error";

/// One row of the catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
}

/// Fetched content for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub markdown: String,
    pub intro_paper: Option<IntroPaper>,
}

/// Client for the UCI ML Repository site and its JSON API.
pub struct UciSource {
    client: RateLimitedClient,
    site_url: String,
    api_url: String,
    span: Span,
}

impl UciSource {
    pub fn new(
        client: RateLimitedClient,
        site_url: impl Into<String>,
        api_url: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            client,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            span,
        }
    }

    pub fn from_config(http: &HttpConfig, config: &UciConfig, span: Span) -> Result<Self> {
        Ok(Self::new(
            RateLimitedClient::from_config(http)?,
            config.site_url.clone(),
            config.api_url.clone(),
            span,
        ))
    }

    /// Detail page rendered as markdown, plus the intro paper from the metadata API.
    pub async fn fetch(&self, record_id: u32) -> Result<FetchedPage> {
        let intro_paper = self.fetch_intro_paper(record_id).await;
        let markdown = self.fetch_page_markdown(record_id).await?;
        Ok(FetchedPage {
            markdown,
            intro_paper,
        })
    }

    pub async fn fetch_page_markdown(&self, record_id: u32) -> Result<String> {
        let url = format!("{}/dataset/{record_id}/", self.site_url);
        let html = self
            .client
            .get(&url)
            .await
            .map_err(|e| HarvestError::Fetch {
                record_id,
                reason: match e.status() {
                    Some(status) => format!("HTTP {status}"),
                    None => e.to_string(),
                },
            })?;
        Ok(render_dataset_page(record_id, &html))
    }

    /// Intro paper reported by the metadata API; any failure degrades to `None`.
    pub async fn fetch_intro_paper(&self, record_id: u32) -> Option<IntroPaper> {
        let url = format!("{}/dataset", self.api_url);
        let id = record_id.to_string();
        let body: Value = match self.client.get_query_json(&url, &[("id", id.as_str())]).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(parent: &self.span, record_id, "intro paper lookup failed: {e}");
                return None;
            }
        };

        let intro = body
            .get("data")
            .and_then(|data| data.get("intro_paper"))
            .filter(|v| !v.is_null())?;
        match serde_json::from_value::<IntroPaper>(intro.clone()) {
            Ok(paper) => Some(paper),
            Err(e) => {
                tracing::warn!(parent: &self.span, record_id, "malformed intro paper: {e}");
                None
            }
        }
    }

    /// Datasets available in the catalog. `filter` defaults to `python`.
    pub async fn list_datasets(
        &self,
        filter: Option<&str>,
        search: Option<&str>,
        area: Option<&str>,
    ) -> Result<Vec<CatalogEntry>> {
        let url = format!("{}/datasets/list", self.api_url);
        let filter = filter
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_LIST_FILTER.to_string());
        let search = search.filter(|s| !s.is_empty()).map(str::to_lowercase);

        let mut query = vec![("filter", filter.as_str())];
        if let Some(search) = search.as_deref() {
            query.push(("search", search));
        }
        if let Some(area) = area.filter(|a| !a.is_empty()) {
            query.push(("area", area));
        }

        let body: Value = self.client.get_query_json(&url, &query).await?;
        if body.get("status").and_then(Value::as_i64) != Some(200) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_LIST_ERROR);
            return Err(HarvestError::ApiError(url, message.to_string()));
        }

        let data = body.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
        let entries: Vec<CatalogEntry> =
            serde_json::from_value(data).map_err(|e| HarvestError::Parse(e.to_string()))?;
        tracing::info!(parent: &self.span, count = entries.len(), "catalog listing fetched");
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) fn test_source(base_url: &str) -> UciSource {
    let client = RateLimitedClient::new(
        std::time::Duration::from_millis(1),
        0,
        "paperlink-test",
        std::time::Duration::from_secs(5),
    )
    .unwrap();
    UciSource::new(client, base_url, format!("{base_url}/api"), Span::none())
}
