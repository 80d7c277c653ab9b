//! Entra ID provider configuration and credentials.

use std::time::Duration;

use secrecy::SecretString;

use rolesync_connector::error::{ConnectorError, ConnectorResult};

/// Default Azure AD login endpoint (commercial cloud).
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Default Microsoft Graph endpoint (commercial cloud).
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

/// Environment variable holding the client application id.
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_APP_ID";

/// Environment variable holding the client secret.
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_APP_SECRET";

/// Environment variable holding the tenant id.
pub const ENV_TENANT_ID: &str = "AZURE_OWN_TENANT_ID";

/// Optional environment variable naming the application whose service
/// principal is managed, when it differs from the client application.
pub const ENV_TARGET_APP_ID: &str = "AZURE_TARGET_APP_ID";

/// `OAuth2` client credentials for the app registration.
#[derive(Debug, Clone)]
pub struct EntraCredentials {
    /// Application (client) id.
    pub client_id: String,
    /// Client secret. Never logged; `SecretString` redacts Debug output.
    pub client_secret: SecretString,
}

impl EntraCredentials {
    /// Create credentials from raw parts.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into().into(),
        }
    }
}

/// Connection settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    /// Tenant id.
    pub tenant_id: String,
    /// Application whose service principal is managed. Defaults to the
    /// client application itself when `AZURE_TARGET_APP_ID` is unset.
    pub target_app_id: String,
    /// Client credentials.
    pub credentials: EntraCredentials,
}

impl EnvSettings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the first missing variable.
    pub fn from_env() -> ConnectorResult<Self> {
        let client_id = require_env(ENV_CLIENT_ID)?;
        let client_secret = require_env(ENV_CLIENT_SECRET)?;
        let tenant_id = require_env(ENV_TENANT_ID)?;
        let target_app_id = std::env::var(ENV_TARGET_APP_ID)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| client_id.clone());

        Ok(Self {
            tenant_id,
            target_app_id,
            credentials: EntraCredentials::new(client_id, client_secret),
        })
    }
}

fn require_env(name: &str) -> ConnectorResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ConnectorError::invalid_config(format!("environment variable {name} is not set"))
        })
}

/// Configuration for the Entra directory provider.
#[derive(Debug, Clone)]
pub struct EntraConfig {
    /// Tenant id.
    pub tenant_id: String,
    /// Application (client) id whose service principal is managed.
    pub app_id: String,
    /// Login endpoint base URL (overridable for tests).
    pub login_endpoint: String,
    /// Graph endpoint base URL (overridable for tests).
    pub graph_endpoint: String,
    /// Graph API version segment.
    pub api_version: String,
    /// Page size for listing calls.
    pub page_size: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl EntraConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> EntraConfigBuilder {
        EntraConfigBuilder::default()
    }

    /// The `OAuth2` token endpoint for this tenant.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint, self.tenant_id
        )
    }

    /// The versioned Graph base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.graph_endpoint, self.api_version)
    }

    /// The client-credentials scope for the Graph resource.
    #[must_use]
    pub fn default_scope(&self) -> String {
        format!("{}/.default", self.graph_endpoint)
    }
}

/// Builder for [`EntraConfig`].
#[derive(Debug, Default)]
pub struct EntraConfigBuilder {
    tenant_id: Option<String>,
    app_id: Option<String>,
    login_endpoint: Option<String>,
    graph_endpoint: Option<String>,
    api_version: Option<String>,
    page_size: Option<usize>,
    request_timeout: Option<Duration>,
}

impl EntraConfigBuilder {
    /// Set the tenant id (required).
    #[must_use]
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the managed application id (required).
    #[must_use]
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Override the login endpoint.
    #[must_use]
    pub fn login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = Some(endpoint.into());
        self
    }

    /// Override the Graph endpoint.
    #[must_use]
    pub fn graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graph_endpoint = Some(endpoint.into());
        self
    }

    /// Override the Graph API version segment.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the listing page size (1..=999).
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when required fields are missing or
    /// out of range.
    pub fn build(self) -> ConnectorResult<EntraConfig> {
        let tenant_id = self
            .tenant_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConnectorError::invalid_config("tenant_id is required"))?;
        let app_id = self
            .app_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConnectorError::invalid_config("app_id is required"))?;

        let page_size = self.page_size.unwrap_or(100);
        if !(1..=999).contains(&page_size) {
            return Err(ConnectorError::invalid_config(format!(
                "page_size must be between 1 and 999, got {page_size}"
            )));
        }

        let strip = |s: String| s.trim_end_matches('/').to_string();

        Ok(EntraConfig {
            tenant_id,
            app_id,
            login_endpoint: strip(
                self.login_endpoint
                    .unwrap_or_else(|| DEFAULT_LOGIN_ENDPOINT.to_string()),
            ),
            graph_endpoint: strip(
                self.graph_endpoint
                    .unwrap_or_else(|| DEFAULT_GRAPH_ENDPOINT.to_string()),
            ),
            api_version: self.api_version.unwrap_or_else(|| "v1.0".to_string()),
            page_size,
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
        })
    }
}
