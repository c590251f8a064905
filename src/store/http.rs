/*!
HTTP session store.

REST client to the platform backend's session resource:

- `POST   {base}/sessions`      create, returns `{"id": "..."}`
- `GET    {base}/sessions/{id}` fetch (404 means unknown id)
- `PUT    {base}/sessions/{id}` update (last write wins)

This module is focused on transport and status mapping; the wire shapes
live in [`super::record`]. Failures map onto [`StoreError`]:
transport problems become `Network`, non-success statuses become
`Rejected` (except 404 on fetch, which is `Ok(None)`), and malformed
bodies become `Decode`.
*/

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::draft::SessionId;
use crate::store::{SessionRecord, SessionStore, StoreError};

const ENV_API_URL: &str = "PLAYROOM_API_URL";
const ENV_API_TIMEOUT_SECS: &str = "PLAYROOM_API_TIMEOUT_SECS";
const ENV_API_TOKEN: &str = "PLAYROOM_API_TOKEN";

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection configuration for the HTTP store.
#[derive(Clone, Debug)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Optional bearer token attached to every request.
    pub bearer_token: Option<String>,
}

impl HttpStoreConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    /// Resolve configuration from the environment (reading a `.env`
    /// file if present): `PLAYROOM_API_URL`, `PLAYROOM_API_TIMEOUT_SECS`
    /// and `PLAYROOM_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url =
            std::env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var(ENV_API_TIMEOUT_SECS)
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        let bearer_token = std::env::var(ENV_API_TOKEN).ok();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            bearer_token,
        }
    }
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Body of a successful create response.
#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: SessionId,
}

/// [`SessionStore`] backed by the platform's REST API.
pub struct HttpSessionStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpSessionStore {
    /// Build a store from explicit configuration.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    /// Build a store from environment configuration.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::new(HttpStoreConfig::from_env())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn sessions_url(&self) -> String {
        format!("{}/sessions", self.config.base_url)
    }

    fn session_url(&self, id: &SessionId) -> String {
        format!("{}/sessions/{}", self.config.base_url, id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Convert a non-success response into `Rejected`, keeping a short
    /// slice of the body as the human-readable message.
    async fn rejection(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.text().await {
            Ok(body) if !body.trim().is_empty() => truncate(&body, 240),
            _ => "no response body".to_string(),
        };
        StoreError::Rejected { status, message }
    }
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Network {
        message: e.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.trim().to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    #[instrument(skip(self, record), fields(url = %self.sessions_url()), err)]
    async fn create(&self, record: &SessionRecord) -> Result<SessionId, StoreError> {
        let response = self
            .authorize(self.client.post(self.sessions_url()))
            .json(record)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let created: CreatedResponse =
            response.json().await.map_err(|e| StoreError::Decode {
                message: e.to_string(),
            })?;
        Ok(created.id)
    }

    #[instrument(skip(self), err)]
    async fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let response = self
            .authorize(self.client.get(self.session_url(id)))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let record: SessionRecord =
            response.json().await.map_err(|e| StoreError::Decode {
                message: e.to_string(),
            })?;
        Ok(Some(record))
    }

    #[instrument(skip(self, record), err)]
    async fn update(&self, id: &SessionId, record: &SessionRecord) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.put(self.session_url(id)))
            .json(record)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound { id: id.clone() });
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}
