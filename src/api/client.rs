use serde_json::Value;

use crate::api::Fetch;

const DEFAULT_API_HOST: &str = "api-football-v1.p.rapidapi.com";

/// Client for the football data API. Authentication goes through the
/// RapidAPI key/host header pair on every call.
pub struct ApiClient {
    api_key: String,
    api_host: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_host(api_key, DEFAULT_API_HOST.to_string())
    }

    pub fn with_host(api_key: String, api_host: String) -> Self {
        Self {
            api_key,
            api_host,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from `FOOTBALL_API_KEY` / `FOOTBALL_API_HOST`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("FOOTBALL_API_KEY")
            .map_err(|_| anyhow::anyhow!("FOOTBALL_API_KEY not set in .env file"))?;
        let api_host =
            std::env::var("FOOTBALL_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
        Ok(Self::with_host(api_key, api_host))
    }

    async fn get_response(&self, endpoint: &str, query: &[(&str, String)]) -> Option<Vec<Value>> {
        let url = format!("https://{}/v3/{}", self.api_host, endpoint);

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .query(query)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!(endpoint, status = %response.status(), "API returned error status");
            return None;
        }

        let body: Value = response.json().await.ok()?;
        match body.get("response") {
            Some(Value::Array(items)) => Some(items.clone()),
            _ => {
                tracing::warn!(endpoint, "API payload missing 'response' array");
                None
            }
        }
    }
}

impl Fetch for ApiClient {
    /// Upstream availability is outside our control, so a connection failure
    /// or malformed body degrades to "no data for this call".
    async fn fetch(&self, endpoint: &str, query: &[(&str, String)]) -> Vec<Value> {
        match self.get_response(endpoint, query).await {
            Some(items) => items,
            None => Vec::new(),
        }
    }
}
