//! Connector Framework error types
//!
//! Error definitions with transient/permanent classification for retry logic.

use thiserror::Error;

/// Error that can occur during directory provider operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (transient)
    /// Failed to establish connection to the directory provider.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Directory call timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Directory provider is temporarily unavailable (5xx).
    #[error("directory unavailable: {message}")]
    TargetUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider asked us to back off (429).
    #[error("rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    // Authentication errors (permanent, fatal to the run)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Credentials have expired.
    #[error("authentication failed: credentials expired")]
    CredentialsExpired,

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Configuration errors (permanent)
    /// Provider configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Idempotency signals
    /// Grant target already holds the role (treated as success by the executor).
    #[error("assignment already exists: principal {principal_id} role {role_id}")]
    AlreadyAssigned {
        principal_id: String,
        role_id: String,
    },

    /// Resource absent in the directory (revoke of a missing assignment is a no-op).
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// No service principal registered for the application id.
    #[error("no service principal found for application {app_id}")]
    ServicePrincipalNotFound { app_id: String },

    // Operation errors
    /// Operation failed for a provider-specific reason.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Response body could not be decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and the operation should be retried.
    ///
    /// Transient errors are those caused by temporary conditions that may resolve
    /// themselves, such as network issues or temporary unavailability.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::TargetUnavailable { .. }
                | ConnectorError::NetworkError { .. }
                | ConnectorError::RateLimited { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if this error indicates a credential problem that must abort
    /// the run before any mutation.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ConnectorError::AuthenticationFailed
                | ConnectorError::CredentialsExpired
                | ConnectorError::AuthorizationFailed { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::TargetUnavailable { .. } => "TARGET_UNAVAILABLE",
            ConnectorError::NetworkError { .. } => "NETWORK_ERROR",
            ConnectorError::RateLimited { .. } => "RATE_LIMITED",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::CredentialsExpired => "CREDENTIALS_EXPIRED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::AlreadyAssigned { .. } => "ALREADY_ASSIGNED",
            ConnectorError::NotFound { .. } => "NOT_FOUND",
            ConnectorError::ServicePrincipalNotFound { .. } => "SERVICE_PRINCIPAL_NOT_FOUND",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::NetworkError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        ConnectorError::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        ConnectorError::Serialization {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
