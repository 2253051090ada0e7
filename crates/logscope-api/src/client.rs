use logscope_types::{LogRecord, LogUpdate, WireRecord};
use serde_json::Value;

use crate::error::ApiError;

/// Query parameters accepted by `GET /logs`
///
/// These are the backend's own narrowing knobs; the richer client-side
/// filtering lives in `logscope-logs`.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub agent_id: Option<String>,
    pub channel: Option<String>,
    pub level: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl LogQuery {
    /// Build query-string pairs, skipping unset fields
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(agent_id) = &self.agent_id {
            pairs.push(("agent_id", agent_id.clone()));
        }
        if let Some(channel) = &self.channel {
            pairs.push(("channel", channel.clone()));
        }
        if let Some(level) = &self.level {
            pairs.push(("level", level.clone()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Client for the log backend's REST surface
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch records, optionally narrowed by the backend-side filters
    pub async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, ApiError> {
        let response = self
            .http
            .get(format!("{}/logs", self.base_url))
            .query(&query.to_pairs())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        Ok(parse_records(body))
    }

    /// Fetch a single record by id
    pub async fn fetch_log(&self, id: &str) -> Result<LogRecord, ApiError> {
        require_id(id)?;

        let response = self
            .http
            .get(format!("{}/logs/{}", self.base_url, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let wire: WireRecord = response.json().await?;
        Ok(wire.into_record())
    }

    /// Apply a partial update to a record
    ///
    /// An empty id or an empty payload is rejected before any request is
    /// made, so a stray click never turns into a backend call.
    pub async fn update_log(&self, id: &str, update: &LogUpdate) -> Result<(), ApiError> {
        require_id(id)?;
        if update.is_empty() {
            return Err(ApiError::InvalidRequest(
                "update payload has no fields set".to_string(),
            ));
        }

        let response = self
            .http
            .put(format!("{}/logs/{}", self.base_url, id))
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(())
    }

    /// Delete a record by id
    pub async fn delete_log(&self, id: &str) -> Result<(), ApiError> {
        require_id(id)?;

        let response = self
            .http
            .delete(format!("{}/logs/{}", self.base_url, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(())
    }
}

/// Decode a `GET /logs` body
///
/// The backend is expected to return an array; any other JSON shape decodes
/// to an empty result so one malformed response cannot take down a stream.
/// Records that fail to decode individually are skipped, not fatal.
pub fn parse_records(body: Value) -> Vec<LogRecord> {
    let Value::Array(items) = body else {
        tracing::warn!("expected an array of log records, got a different JSON shape");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<WireRecord>(item) {
            Ok(wire) => Some(wire.into_record()),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable record");
                None
            }
        })
        .collect()
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("record id is empty".to_string()));
    }
    Ok(())
}
