//! Provider construction from environment settings.

use rolesync_connector_entra::{EntraConfig, EntraDirectory, EnvSettings};

use crate::error::CliResult;

/// Settings resolved for one invocation.
pub struct Context {
    pub settings: EnvSettings,
}

impl Context {
    /// Load connection settings from the environment / `.env` file.
    pub fn from_env() -> CliResult<Self> {
        Ok(Self {
            settings: EnvSettings::from_env()?,
        })
    }

    /// The application whose service principal is managed, honoring a
    /// command-line override.
    pub fn app_id(&self, override_app_id: Option<&str>) -> String {
        override_app_id
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.target_app_id.clone())
    }

    /// Build an authenticated directory handle scoped to this invocation.
    pub fn directory(&self, app_id: &str) -> CliResult<EntraDirectory> {
        let config = EntraConfig::builder()
            .tenant_id(self.settings.tenant_id.as_str())
            .app_id(app_id)
            .build()?;

        Ok(EntraDirectory::new(config, self.settings.credentials.clone())?)
    }
}
