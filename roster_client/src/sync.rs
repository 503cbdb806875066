//! HTTP client for the sync gateway
//!
//! Uses async reqwest. Failures come back as [`RosterError`] kinds: the
//! gateway's error envelope decides the kind when present, the status code
//! otherwise, and anything that never produced a response is a transport error.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use roster_common::{AddChampion, ChampionPatch, ChampionRecord, Result, RosterError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for [`SyncClient`]
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Gateway API root, e.g. `http://localhost:5000/api`
    pub base_url: String,
    pub timeout: Duration,
    /// Bearer token sent with writes
    pub token: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: Duration::from_secs(30),
            token: None,
        }
    }
}

/// Gateway response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: String,
}

/// Gateway client
pub struct SyncClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl SyncClient {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        log::info!("Creating sync client for {}", config.base_url);
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET /champions
    pub async fn list_champions(&self) -> Result<Vec<ChampionRecord>> {
        log::debug!("Fetching champion list");
        let response = self
            .client
            .get(self.url("/champions"))
            .send()
            .await
            .map_err(transport)?;
        let champions: Vec<ChampionRecord> = read_data(response).await?.unwrap_or_default();
        log::info!("Fetched {} champions from gateway", champions.len());
        Ok(champions)
    }

    /// POST /champions, sending the record's id so both tiers agree on it
    pub async fn add_champion(&self, record: &ChampionRecord) -> Result<String> {
        log::debug!("Sending champion {} to gateway", record.id);
        let body = AddChampion::from(record.clone());
        let response = self
            .authorized(self.client.post(self.url("/champions")))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let created: CreatedId = read_data(response)
            .await?
            .ok_or_else(|| RosterError::Transport("add response carried no id".to_string()))?;
        Ok(created.id)
    }

    /// PUT /champions/{id}
    pub async fn update_champion(&self, id: &str, patch: &ChampionPatch) -> Result<()> {
        log::debug!("Sending update for champion {} to gateway", id);
        let response = self
            .authorized(self.client.put(self.url(&format!("/champions/{}", id))))
            .json(patch)
            .send()
            .await
            .map_err(transport)?;

        read_data::<serde_json::Value>(response)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                RosterError::NotFound(_) => RosterError::NotFound(id.to_string()),
                other => other,
            })
    }

    /// GET /health, returning the server's champion count
    pub async fn health(&self) -> Result<i64> {
        #[derive(Deserialize)]
        struct Health {
            champions: i64,
        }

        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(transport)?;
        let health: Option<Health> = read_data(response).await?;
        Ok(health.map(|h| h.champions).unwrap_or(0))
    }
}

fn transport(err: reqwest::Error) -> RosterError {
    RosterError::Transport(err.to_string())
}

/// Read an envelope and return its `data`, or the error it describes
async fn read_data<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if status.is_success() {
        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            RosterError::Transport(format!("unexpected response body: {}", e))
        })?;
        if !envelope.success {
            return Err(envelope_error(status, envelope.code, envelope.error));
        }
        return Ok(envelope.data);
    }

    log::warn!("Gateway returned HTTP {}", status);
    match serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
        Ok(envelope) => Err(envelope_error(status, envelope.code, envelope.error)),
        Err(_) => Err(status_error(status, body)),
    }
}

fn envelope_error(status: StatusCode, code: Option<String>, error: Option<String>) -> RosterError {
    let detail = error.unwrap_or_else(|| status.to_string());
    match code {
        Some(code) => RosterError::from_code(&code, detail),
        None => status_error(status, detail),
    }
}

fn status_error(status: StatusCode, detail: String) -> RosterError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => RosterError::Validation(detail),
        StatusCode::NOT_FOUND => RosterError::NotFound(detail),
        StatusCode::CONFLICT => RosterError::DuplicateId(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RosterError::Unauthorized,
        _ => RosterError::Transport(format!("HTTP {}: {}", status, detail)),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
