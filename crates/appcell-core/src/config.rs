//! Cell configuration

use crate::error::{AppCellError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// App cell configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCellConfig {
    /// Minimum interval between two checkpoint saves, in milliseconds
    pub save_max_frequency_ms: u64,
    /// Offer developer-only settings
    pub developer_mode: bool,
    /// Module used when the app spec names no input widget
    pub default_input_widget: String,
    /// Method catalog endpoint
    pub catalog_url: Option<String>,
    /// Workspace service endpoint
    pub workspace_url: Option<String>,
}

impl AppCellConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent keys keep their default
    ///
    /// # Errors
    ///
    /// [`AppCellError::Config`] when the document does not parse.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| AppCellError::Config(e.to_string()))
    }

    /// Save throttle window
    #[inline]
    #[must_use]
    pub fn save_max_frequency(&self) -> Duration {
        Duration::from_millis(self.save_max_frequency_ms)
    }

    /// With save throttle window
    #[inline]
    #[must_use]
    pub fn with_save_max_frequency(mut self, window: Duration) -> Self {
        self.save_max_frequency_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With developer mode
    #[inline]
    #[must_use]
    pub fn with_developer_mode(mut self, enabled: bool) -> Self {
        self.developer_mode = enabled;
        self
    }

    /// With default input widget
    #[inline]
    #[must_use]
    pub fn with_default_input_widget(mut self, module: impl Into<String>) -> Self {
        self.default_input_widget = module.into();
        self
    }
}

impl Default for AppCellConfig {
    fn default() -> Self {
        Self {
            save_max_frequency_ms: 5000,
            developer_mode: false,
            default_input_widget: "appParamsWidget".to_string(),
            catalog_url: None,
            workspace_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppCellConfig::default();
        assert_eq!(config.save_max_frequency(), Duration::from_secs(5));
        assert!(!config.developer_mode);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppCellConfig::from_toml_str(
            r#"
            developer_mode = true
            catalog_url = "https://catalog.example.org"
            "#,
        )
        .unwrap();
        assert!(config.developer_mode);
        assert_eq!(config.catalog_url.as_deref(), Some("https://catalog.example.org"));
        assert_eq!(config.save_max_frequency_ms, 5000);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = AppCellConfig::from_toml_str("save_max_frequency_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, AppCellError::Config(_)));
    }
}
