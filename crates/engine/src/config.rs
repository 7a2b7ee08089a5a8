//! Mediation configuration via `concord.toml`
//!
//! All settings have defaults, so an empty file (or no file) is valid.
//! Registration reads `versioning_policy`; sessions read the rest.

use concord_core::{ConcordError, ConcordResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "concord.toml";

/// What registration does with a lock counter declared without a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningPolicy {
    /// Log a warning and record a diagnostic; the bump stays a no-op
    #[default]
    Warn,
    /// Reject the registration
    Deny,
    /// Accept silently
    Off,
}

/// Mediation configuration
///
/// # Example
///
/// ```toml
/// versioning_policy = "warn"
/// strict_registration = false
/// max_nesting_depth = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationConfig {
    /// Handling of counter-without-timestamp declarations
    #[serde(default)]
    pub versioning_policy: VersioningPolicy,
    /// Reject saves of unregistered entity types
    #[serde(default)]
    pub strict_registration: bool,
    /// Maximum depth of nested saves on one session
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_max_nesting_depth() -> usize {
    64
}

impl Default for MediationConfig {
    fn default() -> Self {
        Self {
            versioning_policy: VersioningPolicy::default(),
            strict_registration: false,
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl MediationConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Concord mediation configuration
#
# Lock counter declared without a timestamp attribute:
#   "warn" (default) = log and record a registration diagnostic
#   "deny"           = fail registration
#   "off"            = accept silently
versioning_policy = "warn"

# Reject saves of entity types that were never registered (default: false).
# When false they are mediated as their own root with no phases.
strict_registration = false

# Maximum depth of nested saves within one session (default: 64)
max_nesting_depth = 64
"#
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on malformed TOML or invalid values.
    pub fn from_toml_str(content: &str) -> ConcordResult<Self> {
        let config: MediationConfig = toml::from_str(content)
            .map_err(|e| ConcordError::invalid_input(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> ConcordResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConcordError::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConcordError::InvalidInput(msg) => {
                ConcordError::invalid_input(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> ConcordResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ConcordError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> ConcordResult<()> {
        if self.max_nesting_depth == 0 {
            return Err(ConcordError::invalid_input(
                "max_nesting_depth must be at least 1",
            ));
        }
        Ok(())
    }
}
