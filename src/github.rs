// Thin synchronous seam over the GitHub REST and GraphQL endpoints.
//
// Components never talk to octocrab directly; they go through `GitHubApi` and
// interpret status codes themselves, so they can be exercised with an
// in-memory implementation.

use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Runtime;

use crate::error::MirrorError;

/// Every network call is bounded by this many seconds and never retried.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const GRAPHQL_ROUTE: &str = "/graphql";

/// Status code and decoded body of one API exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Decode a raw body. Non-JSON payloads are kept as a string value.
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort human readable reason for a failed exchange.
    pub fn message(&self) -> String {
        match &self.body {
            Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.body.to_string()),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Turn any non-2xx status into an error, 401 being reported as `Auth`.
    pub fn into_success(self) -> Result<Self, MirrorError> {
        if self.status == 401 {
            return Err(MirrorError::Auth);
        }
        if !self.is_success() {
            return Err(MirrorError::Api {
                status: self.status,
                message: self.message(),
            });
        }
        Ok(self)
    }
}

pub trait GitHubApi {
    /// GET `route` (e.g. `/repos/owner/name`) with query parameters.
    fn get(&self, route: &str, query: &[(&str, &str)]) -> Result<ApiResponse, MirrorError>;

    /// POST a JSON body to `route`.
    fn post(&self, route: &str, body: &Value) -> Result<ApiResponse, MirrorError>;
}

/// `GitHubApi` backed by octocrab, driven from a private tokio runtime so
/// callers stay fully synchronous.
pub struct OctocrabApi {
    client: octocrab::Octocrab,
    runtime: Runtime,
    timeout: Duration,
}

impl OctocrabApi {
    pub fn new(token: &str) -> Result<Self, MirrorError> {
        let runtime = Runtime::new()?;
        let client = octocrab::Octocrab::builder()
            .personal_token(token.to_string())
            .build()?;
        Ok(Self {
            client,
            runtime,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        })
    }
}

impl GitHubApi for OctocrabApi {
    fn get(&self, route: &str, query: &[(&str, &str)]) -> Result<ApiResponse, MirrorError> {
        log::debug!("GET {}", route);
        let url = self.client.absolute_url(route)?;
        let exchange = async {
            let response = self.client._get(url, Some(&query)).await?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| MirrorError::Query(e.to_string()))?;
            Ok::<_, MirrorError>(ApiResponse::from_text(status, &text))
        };
        self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, exchange)
                .await
                .map_err(|_| MirrorError::Timeout(REQUEST_TIMEOUT_SECS))?
        })
    }

    fn post(&self, route: &str, body: &Value) -> Result<ApiResponse, MirrorError> {
        log::debug!("POST {}", route);
        let url = self.client.absolute_url(route)?;
        let exchange = async {
            let response = self.client._post(url, Some(body)).await?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| MirrorError::Query(e.to_string()))?;
            Ok::<_, MirrorError>(ApiResponse::from_text(status, &text))
        };
        self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, exchange)
                .await
                .map_err(|_| MirrorError::Timeout(REQUEST_TIMEOUT_SECS))?
        })
    }
}
