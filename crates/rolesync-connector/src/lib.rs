//! # Connector Framework
//!
//! Core abstractions for talking to directory providers that manage
//! app-role assignments on a service principal.
//!
//! The engine crate never speaks to a concrete directory API; it depends
//! only on the capability traits defined here. Providers (Microsoft Entra
//! ID today) implement them in their own crates.
//!
//! ## Crate Organization
//!
//! - [`types`] - Domain types (`Principal`, `Assignment`, `AppRole`)
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Provider capability traits
//! - [`resilience`] - Retry with exponential backoff
//!
//! ## Example
//!
//! ```ignore
//! use rolesync_connector::prelude::*;
//!
//! let sp = provider.resolve_application("00000000-app-id").await?;
//! let current = provider.list_assignments(&sp).await?;
//! ```

pub mod error;
pub mod resilience;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use rolesync_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::resilience::{RetryConfig, RetryExecutor};
    pub use crate::traits::{DirectoryProvider, GroupExpansion};
    pub use crate::types::{
        AppRole, Assignment, AssignmentSet, DirectoryUser, Principal, PrincipalKind,
        ServicePrincipalRef,
    };
}

// Re-export async_trait for provider implementors
pub use async_trait::async_trait;
