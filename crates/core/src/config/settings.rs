use std::collections::HashMap;
use std::env;
use std::path::Path;

use serde::Deserialize;

use crate::config::DatabaseConfig;
use crate::error::{ConfigError, CoreResult};

/// Process-wide project settings.
///
/// `components` is the ordered list of registered component names; order is
/// significant for status reporting and is preserved as declared. The list
/// must be complete before any model is registered and is treated as
/// immutable afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,

    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default)]
    pub testing: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a `mosaic.toml` project file, then apply
    /// environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut settings = Self::from_toml_str(&text)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Apply environment-variable overrides: `MOSAIC_DATABASE_URL` replaces
    /// the `default` database entry, `MOSAIC_TESTING` sets the testing flag.
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("MOSAIC_DATABASE_URL") {
            tracing::debug!("overriding default database from MOSAIC_DATABASE_URL");
            self.databases
                .insert("default".to_string(), DatabaseConfig::Url(url));
        }
        if let Ok(value) = env::var("MOSAIC_TESTING") {
            self.testing = matches!(value.as_str(), "1" | "true" | "yes");
        }
    }

    /// Builder-style database entry, mostly for tests and embedding.
    pub fn with_database(mut self, name: impl Into<String>, config: impl Into<DatabaseConfig>) -> Self {
        self.databases.insert(name.into(), config.into());
        self
    }

    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    /// Look up a named database entry.
    ///
    /// An empty DATABASES map and a missing entry are distinct
    /// configuration errors, surfaced immediately and never retried.
    pub fn database(&self, name: &str) -> Result<&DatabaseConfig, ConfigError> {
        if self.databases.is_empty() {
            return Err(ConfigError::DatabasesMissing);
        }
        self.databases
            .get(name)
            .ok_or_else(|| ConfigError::database_missing(name))
    }

    /// Whether `name` is a registered component.
    pub fn is_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c == name)
    }
}
