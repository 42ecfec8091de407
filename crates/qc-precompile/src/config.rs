//! Configuration for the precompile engine
//!
//! Sources, lowest precedence first: `Default`, a TOML document, and
//! `QC_PRECOMPILE_*` environment variables.

use crate::algorithms::dependency_resolver::ResolveLimits;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "QC_PRECOMPILE_";

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecompileConfig {
    /// Maximum distinct units reachable from a root (anti-DoS)
    pub max_units: usize,
    /// Maximum nesting depth of child references (anti-DoS)
    pub max_depth: usize,
    /// Chunk size for paged program submission
    pub page_size: usize,
    /// Compile independent units of one level in parallel
    pub parallel: bool,
    /// Stop at the first failing unit instead of collecting all failures
    pub fail_fast: bool,
}

impl Default for PrecompileConfig {
    fn default() -> Self {
        Self {
            max_units: 1024,
            max_depth: 64,
            page_size: 2048,
            parallel: false,
            fail_fast: false,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value outside its allowed range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl PrecompileConfig {
    /// Defaults overridden by `QC_PRECOMPILE_*` environment variables.
    ///
    /// Unparseable values are ignored.
    ///
    /// # Errors
    ///
    /// `Invalid` if an override sets a limit to zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overridden_by(|key| env::var(key).ok())
    }

    /// Applies overrides from any key/value source (keys carry [`ENV_PREFIX`]),
    /// then validates the result.
    ///
    /// # Errors
    ///
    /// `Invalid` if validation fails.
    pub fn overridden_by<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let flag = |v: String| {
            let v = v.to_lowercase();
            v == "true" || v == "1"
        };

        if let Some(v) = var("MAX_UNITS").and_then(|v| v.parse().ok()) {
            self.max_units = v;
        }
        if let Some(v) = var("MAX_DEPTH").and_then(|v| v.parse().ok()) {
            self.max_depth = v;
        }
        if let Some(v) = var("PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.page_size = v;
        }
        if let Some(v) = var("PARALLEL") {
            self.parallel = flag(v);
        }
        if let Some(v) = var("FAIL_FAST") {
            self.fail_fast = flag(v);
        }
        self.validate()?;
        Ok(self)
    }

    /// Parse configuration from a TOML string. Missing fields keep defaults.
    ///
    /// ```toml
    /// max_units = 256
    /// max_depth = 16
    /// parallel = true
    /// ```
    ///
    /// # Errors
    ///
    /// `Parse` on malformed TOML, `Invalid` if validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`parse`](Self::parse).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Rejects zero limits.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_units", self.max_units),
            ("max_depth", self.max_depth),
            ("page_size", self.page_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Traversal limits for the dependency resolver.
    #[must_use]
    pub fn limits(&self) -> ResolveLimits {
        ResolveLimits {
            max_units: self.max_units,
            max_depth: self.max_depth,
        }
    }
}
