//! OAuth2 client-credentials authentication for Microsoft Graph.

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use rolesync_connector::error::{ConnectorError, ConnectorResult};

use crate::client::map_transport_error;
use crate::config::{EntraConfig, EntraCredentials};

/// `OAuth2` token response from Azure AD.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

/// Cached `OAuth2` access token.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Token cache managing `OAuth2` access tokens for one credential set.
///
/// Acquired once per run and discarded with the directory handle; there is
/// no process-global token state.
#[derive(Debug)]
pub struct TokenCache {
    credentials: EntraCredentials,
    token_url: String,
    scope: String,
    timeout_secs: u64,
    http_client: reqwest::Client,
    cached_token: RwLock<Option<CachedToken>>,
    /// Grace period before expiry to trigger refresh.
    grace_period: Duration,
}

impl TokenCache {
    /// Creates a new token cache.
    pub fn new(
        config: &EntraConfig,
        credentials: EntraCredentials,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            token_url: config.token_url(),
            scope: config.default_scope(),
            timeout_secs: config.request_timeout.as_secs(),
            http_client,
            cached_token: RwLock::new(None),
            grace_period: Duration::minutes(5),
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> ConnectorResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Refreshing access token");
        let new_token = self.acquire_token().await?;

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Acquires a new access token using the client credentials flow.
    #[instrument(skip(self))]
    async fn acquire_token(&self) -> ConnectorResult<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret().as_str(),
            ),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "Token request rejected");
            // 4xx from the token endpoint is a credential problem;
            // anything else is the identity platform misbehaving.
            if status.is_client_error() {
                return Err(ConnectorError::AuthenticationFailed);
            }
            return Err(ConnectorError::TargetUnavailable {
                message: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            ConnectorError::serialization(format!("failed to parse token response: {e}"))
        })?;

        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in);

        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }

    /// Invalidates the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }
}
