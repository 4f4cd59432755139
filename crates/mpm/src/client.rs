//! HTTP client for the process-manager backend.
//!
//! [`Backend`] is the seam the rest of the TUI talks to; [`BackendClient`]
//! implements it over `reqwest`. Tests substitute an in-memory backend.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mpm_core::{ProcessId, Snapshot};
use mpm_protocol::{
    parse_snapshot, ErrorBody, ExecuteRequest, ExecuteResult, ExplainResponse, KillRequest,
    KillResponse, PingResponse, QueryRequest, RecommendResponse, TokenResponse,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, TuiError};

// ============================================================================
// Backend Trait
// ============================================================================

/// Operations offered by the process-manager backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /processes`, normalized.
    async fn fetch_snapshot(&self) -> Result<Snapshot>;

    /// `GET /databases`.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// `GET /ping`.
    async fn ping(&self) -> Result<PingResponse>;

    /// `POST /kill` for every id in one request.
    async fn kill(&self, ids: &[ProcessId]) -> Result<KillResponse>;

    /// `POST /execute`.
    async fn execute(&self, query: &str, db: Option<&str>) -> Result<ExecuteResult>;

    /// `POST /explain`.
    async fn explain(&self, query: &str) -> Result<ExplainResponse>;

    /// `POST /recommend`.
    async fn recommend(&self, query: &str) -> Result<RecommendResponse>;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// `reqwest`-backed [`Backend`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TuiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url(), config.request_timeout())
    }

    /// Sets a pre-issued bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Exchanges credentials for a bearer token and keeps it.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)]);
        let body = send(request).await?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        info!(username, "Logged in to backend");
        self.token = Some(token.access_token);
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = send(self.authorized(self.http.get(self.url(path)))).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.authorized(self.http.post(self.url(path)).json(payload));
        let body = send(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Sends a request and returns the body of a successful response.
async fn send(request: RequestBuilder) -> Result<Vec<u8>> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(rejection(status, &body));
    }
    Ok(body.to_vec())
}

fn rejection(status: StatusCode, body: &[u8]) -> TuiError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.detail_text())
        .ok()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
    TuiError::ServerRejected {
        status: status.as_u16(),
        detail,
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let body = send(self.authorized(self.http.get(self.url("/processes")))).await?;
        let snapshot = parse_snapshot(&body, Utc::now())
            .map_err(|e| TuiError::MalformedSnapshot(e.to_string()))?;
        debug!(count = snapshot.len(), "Fetched process list");
        Ok(snapshot)
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        self.get_json("/databases").await
    }

    async fn ping(&self) -> Result<PingResponse> {
        self.get_json("/ping").await
    }

    async fn kill(&self, ids: &[ProcessId]) -> Result<KillResponse> {
        self.post_json("/kill", &KillRequest::new(ids.to_vec())).await
    }

    async fn execute(&self, query: &str, db: Option<&str>) -> Result<ExecuteResult> {
        let request = ExecuteRequest {
            query: query.to_string(),
            db: db.map(str::to_string),
        };
        self.post_json("/execute", &request).await
    }

    async fn explain(&self, query: &str) -> Result<ExplainResponse> {
        let request = QueryRequest {
            query: query.to_string(),
        };
        self.post_json("/explain", &request).await
    }

    async fn recommend(&self, query: &str) -> Result<RecommendResponse> {
        let request = QueryRequest {
            query: query.to_string(),
        };
        self.post_json("/recommend", &request).await
    }
}

// ============================================================================
// Tests
// ============================================================================
