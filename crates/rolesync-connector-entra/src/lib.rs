//! Microsoft Entra ID provider for rolesync
//!
//! Implements the rolesync-connector traits for Microsoft Entra ID
//! (formerly Azure AD) via the Microsoft Graph API.
//!
//! # Features
//!
//! - `OAuth2` client credentials authentication with token caching
//! - Service principal resolution from the application (client) id
//! - App-role assignment listing, grant, and revoke
//! - Group member expansion for group-backed desired state
//! - Endpoint overrides for testing against mock servers
//!
//! # Example
//!
//! ```no_run
//! use rolesync_connector::traits::DirectoryProvider;
//! use rolesync_connector_entra::{EntraConfig, EntraCredentials, EntraDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EntraConfig::builder()
//!     .tenant_id("your-tenant-id")
//!     .app_id("your-app-id")
//!     .build()?;
//!
//! let credentials = EntraCredentials::new("your-client-id", "your-client-secret");
//!
//! let directory = EntraDirectory::new(config, credentials)?;
//! directory.test_connection().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod directory;

// Re-exports
pub use auth::TokenCache;
pub use client::{GraphClient, ODataResponse};
pub use config::{
    EntraConfig, EntraConfigBuilder, EntraCredentials, EnvSettings, ENV_CLIENT_ID,
    ENV_CLIENT_SECRET, ENV_TARGET_APP_ID, ENV_TENANT_ID,
};
pub use directory::EntraDirectory;
