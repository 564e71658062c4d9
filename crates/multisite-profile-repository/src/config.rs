//! Repository configuration

use crate::error::ProfileRepositoryError;
use serde::{Deserialize, Serialize};

/// Namespace prefix shared by every key the plugin writes
pub const DEFAULT_NAMESPACE_PREFIX: &str = "next_ad_int_";

/// Name reported for ids that have no stored name
pub const DEFAULT_NEW_PROFILE_NAME: &str = "New Profile";

/// Name of the profile created on installation
pub const DEFAULT_PROFILE_NAME: &str = "My ADI profile";

/// Description of the profile created on installation
pub const DEFAULT_PROFILE_DESCRIPTION: &str = concat!(
    "This profile has been created by the plugin installation automatically. ",
    "It can safely be deleted."
);

/// Profile repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRepositoryConfig {
    /// Prefix of every storage key
    pub namespace_prefix: String,
    /// Fallback returned by `find_name` for unnamed ids
    pub new_profile_name: String,
    /// Name of the default profile
    pub default_profile_name: String,
    /// Description of the default profile
    pub default_profile_description: String,
}

impl Default for ProfileRepositoryConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
            new_profile_name: DEFAULT_NEW_PROFILE_NAME.to_string(),
            default_profile_name: DEFAULT_PROFILE_NAME.to_string(),
            default_profile_description: DEFAULT_PROFILE_DESCRIPTION.to_string(),
        }
    }
}

impl ProfileRepositoryConfig {
    /// Create a new configuration with the specified key namespace
    pub fn new(namespace_prefix: impl Into<String>) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
            ..Default::default()
        }
    }

    /// Set the fallback name for unnamed ids
    pub fn with_new_profile_name(mut self, name: impl Into<String>) -> Self {
        self.new_profile_name = name.into();
        self
    }

    /// Set the name and description of the default profile
    pub fn with_default_profile(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.default_profile_name = name.into();
        self.default_profile_description = description.into();
        self
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    ///
    /// # Errors
    ///
    /// Returns [`ProfileRepositoryError::Config`] for malformed JSON or a
    /// configuration rejected by [`ProfileRepositoryConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ProfileRepositoryError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProfileRepositoryError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would break key derivation
    ///
    /// # Errors
    ///
    /// Returns [`ProfileRepositoryError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), ProfileRepositoryError> {
        if self.namespace_prefix.is_empty() {
            return Err(ProfileRepositoryError::Config(
                "namespace_prefix must not be empty".to_string(),
            ));
        }
        if self.new_profile_name.is_empty() {
            return Err(ProfileRepositoryError::Config(
                "new_profile_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProfileRepositoryConfig::default();
        assert_eq!(config.namespace_prefix, "next_ad_int_");
        assert_eq!(config.new_profile_name, "New Profile");
        assert_eq!(config.default_profile_name, "My ADI profile");
        assert_eq!(
            config.default_profile_description,
            "This profile has been created by the plugin installation automatically. \
             It can safely be deleted."
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ProfileRepositoryConfig::new("acme_")
            .with_new_profile_name("Neues Profil")
            .with_default_profile("Standard", "Automatisch angelegt");
        assert_eq!(config.namespace_prefix, "acme_");
        assert_eq!(config.new_profile_name, "Neues Profil");
        assert_eq!(config.default_profile_name, "Standard");
        assert_eq!(config.default_profile_description, "Automatisch angelegt");
    }

    #[test]
    fn test_from_json_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = ProfileRepositoryConfig::from_json_str(r#"{"namespace_prefix": "acme_"}"#)?;
        assert_eq!(config.namespace_prefix, "acme_");
        assert_eq!(config.new_profile_name, DEFAULT_NEW_PROFILE_NAME);
        Ok(())
    }

    #[test]
    fn test_from_json_rejects_empty_prefix() {
        let result = ProfileRepositoryConfig::from_json_str(r#"{"namespace_prefix": ""}"#);
        assert!(matches!(result, Err(ProfileRepositoryError::Config(_))));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = ProfileRepositoryConfig::from_json_str("not json");
        assert!(matches!(result, Err(ProfileRepositoryError::Config(_))));
    }
}
