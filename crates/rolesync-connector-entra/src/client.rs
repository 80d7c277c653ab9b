//! Microsoft Graph HTTP client with OData pagination and error classification.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use rolesync_connector::error::{ConnectorError, ConnectorResult};

use crate::auth::TokenCache;
use crate::config::EntraConfig;

/// `OData` error response from Microsoft Graph.
#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    code: String,
    message: String,
}

/// Response wrapper for paginated Graph API responses.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Maps a reqwest transport failure to the connector taxonomy.
///
/// Timeouts and connect failures are transient; everything else is a
/// generic network error.
pub(crate) fn map_transport_error(e: reqwest::Error, timeout_secs: u64) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::ConnectionTimeout { timeout_secs }
    } else if e.is_connect() {
        ConnectorError::ConnectionFailed {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    } else {
        ConnectorError::network_with_source("request failed", e)
    }
}

/// Microsoft Graph API client.
///
/// Injects bearer tokens from the [`TokenCache`], honors 429 `Retry-After`
/// inline (the only place the header is visible), and classifies every
/// other failure into the connector taxonomy so retry budgets are owned
/// by callers.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
    timeout_secs: u64,
    max_rate_limit_attempts: u32,
}

impl GraphClient {
    /// Creates a new Graph client sharing the provider's HTTP client.
    pub fn new(
        config: &EntraConfig,
        http_client: reqwest::Client,
        token_cache: Arc<TokenCache>,
    ) -> Self {
        Self {
            http_client,
            token_cache,
            base_url: config.base_url(),
            timeout_secs: config.request_timeout.as_secs(),
            max_rate_limit_attempts: 3,
        }
    }

    /// Returns the versioned base URL for Graph API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a GET request with automatic token injection.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> ConnectorResult<T> {
        let response = self
            .request(reqwest::Method::GET, url, None::<&()>)
            .await?;
        decode_json(response).await
    }

    /// Performs a POST request with automatic token injection.
    #[instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> ConnectorResult<T> {
        let response = self.request(reqwest::Method::POST, url, Some(body)).await?;
        decode_json(response).await
    }

    /// Performs a DELETE request (204 No Content on success).
    #[instrument(skip(self))]
    pub async fn delete(&self, url: &str) -> ConnectorResult<()> {
        self.request(reqwest::Method::DELETE, url, None::<&()>)
            .await?;
        Ok(())
    }

    /// Fetches all pages of a paginated response, feeding each page to the
    /// callback until `@odata.nextLink` runs out.
    #[instrument(skip(self, callback))]
    pub async fn get_paginated<T, F>(&self, initial_url: &str, mut callback: F) -> ConnectorResult<()>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> ConnectorResult<()>,
    {
        let mut url = initial_url.to_string();

        loop {
            debug!("Fetching page: {}", url);
            let response: ODataResponse<T> = self.get(&url).await?;

            callback(response.value)?;

            match response.next_link {
                Some(next) => url = next,
                None => return Ok(()),
            }
        }
    }

    /// Sends the request, waiting out 429s, and classifies error statuses.
    async fn request<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> ConnectorResult<reqwest::Response> {
        let mut rate_limit_attempts = 0u32;

        loop {
            let token = self.token_cache.get_token().await?;

            let mut request = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(&token);

            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_transport_error(e, self.timeout_secs))?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(2u64.saturating_pow(rate_limit_attempts));

                if rate_limit_attempts >= self.max_rate_limit_attempts {
                    return Err(ConnectorError::RateLimited { retry_after_secs });
                }

                warn!(
                    retry_after_secs,
                    attempt = rate_limit_attempts + 1,
                    "Rate limited by Graph, backing off"
                );
                tokio::time::sleep(std::time::Duration::from_secs(retry_after_secs)).await;
                rate_limit_attempts += 1;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            return Err(self.classify_error(&method, url, response).await);
        }
    }

    /// Turns an error response into a typed connector error.
    async fn classify_error(
        &self,
        method: &reqwest::Method,
        url: &str,
        response: reqwest::Response,
    ) -> ConnectorError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let odata = serde_json::from_str::<ODataError>(&body).ok();
        let detail = match &odata {
            Some(e) => format!("{}: {}", e.error.code, e.error.message),
            None => body,
        };

        match status {
            reqwest::StatusCode::UNAUTHORIZED => ConnectorError::AuthenticationFailed,
            reqwest::StatusCode::FORBIDDEN => ConnectorError::AuthorizationFailed {
                operation: format!("{method} {url}"),
            },
            reqwest::StatusCode::NOT_FOUND => ConnectorError::not_found(if detail.is_empty() {
                url.to_string()
            } else {
                detail
            }),
            s if s.is_server_error() => ConnectorError::TargetUnavailable {
                message: format!("Graph returned {status}: {detail}"),
            },
            _ => ConnectorError::operation_failed(format!("Graph returned {status}: {detail}")),
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> ConnectorResult<T> {
    response
        .json()
        .await
        .map_err(|e| ConnectorError::serialization(format!("failed to decode Graph response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odata_error_parsing() {
        let json = r#"{
            "error": {
                "code": "Request_ResourceNotFound",
                "message": "Resource not found",
                "innerError": {"date": "2026-01-15"}
            }
        }"#;

        let error: ODataError = serde_json::from_str(json).unwrap();
        assert_eq!(error.error.code, "Request_ResourceNotFound");
        assert_eq!(error.error.message, "Resource not found");
    }

    #[test]
    fn test_odata_response_parsing() {
        let json = r#"{
            "value": [{"id": "1"}, {"id": "2"}],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users?$skiptoken=xxx"
        }"#;

        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct TestItem {
            id: String,
        }

        let response: ODataResponse<TestItem> = serde_json::from_str(json).unwrap();
        assert_eq!(response.value.len(), 2);
        assert!(response.next_link.is_some());
    }
}
