//! Snowstorm concept lookup over HTTP.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use termgraph_shared::{LookupConfig, Result, TermGraphError};
use tracing::debug;
use url::Url;

use crate::{ConceptLookup, LookupError};

/// User-Agent string for lookup requests.
const USER_AGENT: &str = concat!("termgraph/", env!("CARGO_PKG_VERSION"));

/// The part of Snowstorm's paged response we use.
#[derive(Debug, Deserialize)]
struct ConceptPage {
    items: Vec<Value>,
}

/// Batched `GET /{branch}/concepts` client.
#[derive(Debug, Clone)]
pub struct SnowstormClient {
    client: Client,
    concepts_url: Url,
    form: String,
    include_leaf_flag: bool,
}

impl SnowstormClient {
    /// Build a client for the configured server and branch.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        config.validate()?;

        let concepts_url = concepts_url(&config.base_url, &config.branch)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let language = HeaderValue::from_str(&config.accept_language).map_err(|e| {
            TermGraphError::validation(format!(
                "invalid accept_language '{}': {e}",
                config.accept_language
            ))
        })?;
        headers.insert(ACCEPT_LANGUAGE, language);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TermGraphError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            concepts_url,
            form: config.form.clone(),
            include_leaf_flag: config.include_leaf_flag,
        })
    }

    /// The endpoint all lookups go to.
    pub fn concepts_url(&self) -> &Url {
        &self.concepts_url
    }
}

impl ConceptLookup for SnowstormClient {
    async fn lookup(&self, ids: &[String]) -> std::result::Result<Vec<Value>, LookupError> {
        let limit = ids.len().to_string();
        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("conceptIds", id.as_str())).collect();
        query.push(("form", self.form.as_str()));
        query.push((
            "includeLeafFlag",
            if self.include_leaf_flag { "true" } else { "false" },
        ));
        // Snowstorm pages at 50 by default; ask for the whole batch.
        query.push(("limit", limit.as_str()));

        let url = self.concepts_url.as_str();
        debug!(url, ids = ids.len(), "concept lookup");

        let response = self
            .client
            .get(self.concepts_url.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| TermGraphError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::BadRequest {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(TermGraphError::Network(format!("{url}: HTTP {status}")).into());
        }

        let page: ConceptPage = response.json().await.map_err(|e| {
            TermGraphError::parse(format!("{url}: unexpected concept page: {e}"))
        })?;
        Ok(page.items)
    }
}

/// `{base_url}/{branch}/concepts`, tolerating stray slashes on either side.
fn concepts_url(base_url: &str, branch: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}/concepts",
        base_url.trim_end_matches('/'),
        branch.trim_matches('/')
    );
    Url::parse(&raw)
        .map_err(|e| TermGraphError::validation(format!("invalid concepts URL '{raw}': {e}")))
}
