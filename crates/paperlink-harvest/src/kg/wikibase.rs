use async_trait::async_trait;
use paperlink_core::config::{HttpConfig, KnowledgeBaseConfig};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::Span;

use crate::error::{HarvestError, Result};
use crate::http::RateLimitedClient;
use crate::kg::KnowledgeBase;
use crate::kg::item::Item;

/// Bot credentials for the MediaWiki login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Reads the user and password from the environment variables named in `config`.
    pub fn from_env(config: &KnowledgeBaseConfig) -> Result<Self> {
        let read = |var: &str| {
            paperlink_core::AppConfig::secret_from_env(var)
                .ok_or_else(|| HarvestError::MissingCredentials(format!("${var} is not set")))
        };
        Ok(Self {
            user: read(&config.user_env)?,
            password: read(&config.password_env)?,
        })
    }
}

/// [`KnowledgeBase`] over the MediaWiki action API of a Wikibase instance.
pub struct WikibaseClient {
    client: RateLimitedClient,
    api_url: String,
    arxiv_property: String,
    csrf_token: Mutex<Option<String>>,
    span: Span,
}

impl WikibaseClient {
    pub fn new(
        client: RateLimitedClient,
        api_url: impl Into<String>,
        arxiv_property: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            arxiv_property: arxiv_property.into(),
            csrf_token: Mutex::new(None),
            span,
        }
    }

    pub fn from_config(http: &HttpConfig, config: &KnowledgeBaseConfig, span: Span) -> Result<Self> {
        Ok(Self::new(
            RateLimitedClient::from_config(http)?,
            config.api_url.clone(),
            config.arxiv_property.clone(),
            span,
        ))
    }

    /// Logs in with a bot password and fetches the edit token. Session cookies
    /// stay in the underlying HTTP client.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let tokens = self
            .query(&[("action", "query"), ("meta", "tokens"), ("type", "login")])
            .await?;
        let login_token = token(&tokens, "logintoken")?;

        let reply: Value = self
            .client
            .post_form_json(
                &self.api_url,
                &[
                    ("action", "login"),
                    ("lgname", credentials.user.as_str()),
                    ("lgpassword", credentials.password.as_str()),
                    ("lgtoken", login_token.as_str()),
                    ("format", "json"),
                ],
            )
            .await?;
        check_api_error(&reply)?;
        let result = reply
            .pointer("/login/result")
            .and_then(Value::as_str)
            .unwrap_or("Failed");
        if result != "Success" {
            let reason = reply
                .pointer("/login/reason")
                .and_then(Value::as_str)
                .unwrap_or(result);
            return Err(HarvestError::KnowledgeBase(format!("login failed: {reason}")));
        }

        let tokens = self
            .query(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")])
            .await?;
        *self.csrf_token.lock().await = Some(token(&tokens, "csrftoken")?);
        tracing::info!(parent: &self.span, user = %credentials.user, "logged in to knowledge base");
        Ok(())
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let mut query = params.to_vec();
        query.push(("format", "json"));
        let reply: Value = self.client.get_query_json(&self.api_url, &query).await?;
        check_api_error(&reply)?;
        Ok(reply)
    }
}

fn token(reply: &Value, name: &str) -> Result<String> {
    reply
        .pointer(&format!("/query/tokens/{name}"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| HarvestError::KnowledgeBase(format!("no {name} in reply")))
}

fn check_api_error(reply: &Value) -> Result<()> {
    match reply.get("error") {
        Some(error) => {
            let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let info = error.get("info").and_then(Value::as_str).unwrap_or("");
            Err(HarvestError::KnowledgeBase(format!("{code}: {info}")))
        }
        None => Ok(()),
    }
}

/// `Item:Q123` or `Q123` → `Q123`.
fn item_id_from_title(title: &str) -> Option<&str> {
    let id = title.rsplit(':').next()?.trim();
    (id.starts_with('Q') && id.len() > 1 && id[1..].bytes().all(|b| b.is_ascii_digit()))
        .then_some(id)
}

#[async_trait]
impl KnowledgeBase for WikibaseClient {
    async fn search_by_arxiv(&self, arxiv_id: &str) -> Result<Vec<String>> {
        let search = format!("haswbstatement:{}={arxiv_id}", self.arxiv_property);
        let reply = self
            .query(&[("action", "query"), ("list", "search"), ("srsearch", search.as_str())])
            .await?;

        let ids = reply
            .pointer("/query/search")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit.get("title").and_then(Value::as_str))
                    .filter_map(item_id_from_title)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn get_item(&self, item_id: &str) -> Result<Item> {
        let reply = self
            .query(&[("action", "wbgetentities"), ("ids", item_id)])
            .await?;
        let entity = reply
            .pointer("/entities")
            .and_then(|entities| entities.get(item_id))
            .ok_or_else(|| HarvestError::ItemNotFound(item_id.to_string()))?;
        Item::from_entity_json(entity)
    }

    async fn write_item(&self, item: &Item) -> Result<()> {
        if !item.has_pending_changes() {
            return Ok(());
        }
        let token = self.csrf_token.lock().await.clone().ok_or_else(|| {
            HarvestError::MissingCredentials("not logged in to the knowledge base".to_string())
        })?;

        let data = item.edit_payload().to_string();
        let reply: Value = self
            .client
            .post_form_json(
                &self.api_url,
                &[
                    ("action", "wbeditentity"),
                    ("id", item.id.as_str()),
                    ("data", data.as_str()),
                    ("token", token.as_str()),
                    ("bot", "1"),
                    ("format", "json"),
                ],
            )
            .await?;
        check_api_error(&reply)?;
        tracing::debug!(parent: &self.span, item = %item.id, "item written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::kg::item::{ActionIfExists, Snak, SnakValue, Statement};

    fn client(api_url: String) -> WikibaseClient {
        let http = RateLimitedClient::new(
            std::time::Duration::from_millis(1),
            0,
            "paperlink-test",
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        WikibaseClient::new(http, api_url, "P21", Span::none())
    }

    #[test]
    fn item_ids_from_search_titles() {
        assert_eq!(item_id_from_title("Item:Q123"), Some("Q123"));
        assert_eq!(item_id_from_title("Q9"), Some("Q9"));
        assert_eq!(item_id_from_title("Property:P21"), None);
        assert_eq!(item_id_from_title("Item:Q"), None);
    }

    #[tokio::test]
    async fn search_returns_item_ids_in_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("list".into(), "search".into()),
                Matcher::UrlEncoded("srsearch".into(), "haswbstatement:P21=1706.03762".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"query": {"search": [
                    {"ns": 120, "title": "Item:Q555"},
                    {"ns": 120, "title": "Item:Q777"}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let kb = client(format!("{}/w/api.php", server.url()));
        let ids = kb.search_by_arxiv("1706.03762").await.unwrap();

        mock.assert_async().await;
        assert_eq!(ids, vec!["Q555".to_string(), "Q777".to_string()]);
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"error": {"code": "badvalue", "info": "nope"}}).to_string())
            .create_async()
            .await;

        let kb = client(format!("{}/w/api.php", server.url()));
        let err = kb.search_by_arxiv("x").await.unwrap_err();
        assert!(matches!(err, HarvestError::KnowledgeBase(msg) if msg.contains("badvalue")));
    }

    #[tokio::test]
    async fn get_item_parses_entity() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "wbgetentities".into()),
                Matcher::UrlEncoded("ids".into(), "Q10".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"entities": {"Q10": {"id": "Q10", "claims": {}}}}).to_string(),
            )
            .create_async()
            .await;

        let kb = client(format!("{}/w/api.php", server.url()));
        let item = kb.get_item("Q10").await.unwrap();
        assert_eq!(item.id, "Q10");
        assert!(item.statements().is_empty());
    }

    #[tokio::test]
    async fn write_requires_login() {
        let kb = client("http://127.0.0.1:9/w/api.php".to_string());
        let mut item = Item::new("Q1");
        item.add_statement(
            Statement::new(Snak::new("P223", SnakValue::Item("Q2".into()))),
            ActionIfExists::AppendOrReplace,
        );
        let err = kb.write_item(&item).await.unwrap_err();
        assert!(matches!(err, HarvestError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn login_then_edit() {
        let mut server = Server::new_async().await;
        let login_token = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("meta".into(), "tokens".into()),
                Matcher::UrlEncoded("type".into(), "login".into()),
            ]))
            .with_status(200)
            .with_body(json!({"query": {"tokens": {"logintoken": "LT+\\"}}}).to_string())
            .create_async()
            .await;
        let login = server
            .mock("POST", "/w/api.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "login".into()),
                Matcher::UrlEncoded("lgname".into(), "bot@paperlink".into()),
                Matcher::UrlEncoded("lgtoken".into(), "LT+\\".into()),
            ]))
            .with_status(200)
            .with_body(json!({"login": {"result": "Success"}}).to_string())
            .create_async()
            .await;
        let csrf = server
            .mock("GET", "/w/api.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("meta".into(), "tokens".into()),
                Matcher::UrlEncoded("type".into(), "csrf".into()),
            ]))
            .with_status(200)
            .with_body(json!({"query": {"tokens": {"csrftoken": "CSRF+\\"}}}).to_string())
            .create_async()
            .await;
        let edit = server
            .mock("POST", "/w/api.php")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "wbeditentity".into()),
                Matcher::UrlEncoded("id".into(), "Q1".into()),
                Matcher::UrlEncoded("token".into(), "CSRF+\\".into()),
                Matcher::UrlEncoded("bot".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(json!({"success": 1}).to_string())
            .create_async()
            .await;

        let kb = client(format!("{}/w/api.php", server.url()));
        kb.login(&Credentials {
            user: "bot@paperlink".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();

        let mut item = Item::new("Q1");
        item.add_statement(
            Statement::new(Snak::new("P223", SnakValue::Item("Q2".into()))),
            ActionIfExists::AppendOrReplace,
        );
        kb.write_item(&item).await.unwrap();

        login_token.assert_async().await;
        login.assert_async().await;
        csrf.assert_async().await;
        edit.assert_async().await;
    }
}
