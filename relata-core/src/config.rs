//! Configuration types
//!
//! Configuration is an explicit value handed to the components that need it.
//! Nothing reads process-wide state after startup.

use crate::{ConfigError, RelataError, RelataResult};
use serde::{Deserialize, Serialize};

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelataConfig {
    /// Bind every value set on an insert/update command as a `?` parameter
    /// instead of rendering it as a literal.
    pub auto_prepare_statements: bool,
    /// Schema prefix for tables, indexes and relations.
    pub schema: Option<String>,
    /// Log a warning when a generation pass leaves declared parameters unused.
    pub warn_on_unused_params: bool,
}

impl Default for RelataConfig {
    fn default() -> Self {
        Self {
            auto_prepare_statements: false,
            schema: None,
            warn_on_unused_params: true,
        }
    }
}

impl RelataConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(source: &str) -> RelataResult<Self> {
        let config: RelataConfig = toml::from_str(source).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `RELATA_AUTO_PREPARE`: bind set values as parameters (default: false)
    /// - `RELATA_SCHEMA`: schema prefix (default: none)
    /// - `RELATA_WARN_UNUSED_PARAMS`: warn about unused parameters (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            auto_prepare_statements: std::env::var("RELATA_AUTO_PREPARE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.auto_prepare_statements),
            schema: std::env::var("RELATA_SCHEMA")
                .ok()
                .filter(|s| !s.is_empty())
                .or(defaults.schema),
            warn_on_unused_params: std::env::var("RELATA_WARN_UNUSED_PARAMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.warn_on_unused_params),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - schema, when set, is a plain identifier
    pub fn validate(&self) -> RelataResult<()> {
        if let Some(schema) = &self.schema {
            let valid = !schema.is_empty()
                && schema
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !schema.starts_with(|c: char| c.is_ascii_digit());
            if !valid {
                return Err(RelataError::Config(ConfigError::InvalidValue {
                    field: "schema".to_string(),
                    value: schema.clone(),
                    reason: "schema must be a plain SQL identifier".to_string(),
                }));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RelataConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial_document() {
        let config = RelataConfig::from_toml_str("schema = \"HR\"\n").unwrap();
        assert_eq!(config.schema.as_deref(), Some("HR"));
        assert!(!config.auto_prepare_statements);
        assert!(config.warn_on_unused_params);
    }

    #[test]
    fn test_from_toml_rejects_bad_schema() {
        let err = RelataConfig::from_toml_str("schema = \"hr; drop\"").unwrap_err();
        assert!(matches!(
            err,
            RelataError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "schema"
        ));
    }

    #[test]
    fn test_from_toml_rejects_malformed_document() {
        let err = RelataConfig::from_toml_str("auto_prepare_statements = maybe").unwrap_err();
        assert!(matches!(err, RelataError::Config(ConfigError::ParseFailed { .. })));
    }
}
