//! Tab group configuration
//!
//! Scalar options controlling load strategy, navigation guarding and the
//! Save-All protocol. Parsed from TOML, YAML or JSON; every field has a default.

use crate::descriptor::LoadStrategy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where Save-All sends data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    /// Aggregate every tab's data and hand it to the host
    Parent,
    /// Call each tab's own save, in order
    #[default]
    Internal,
}

/// Which tabs Save-All loads before validating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoLoadPolicy {
    /// Load nothing; unloaded tabs abort the save
    None,
    /// Load every enabled tab not yet loaded
    #[default]
    Missing,
    /// Same target set as `Missing`; loaded tabs are never reloaded
    All,
}

impl AutoLoadPolicy {
    /// Check if the auto-load phase runs at all
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

/// Tab group configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TabGroupConfig {
    /// Group-wide load strategy
    pub load_strategy: LoadStrategy,
    /// Veto leaving a dirty or invalid tab
    pub validate_on_tab_switch: bool,
    /// Save-All mode
    pub save_mode: SaveMode,
    /// Save-All auto-load policy
    pub auto_load: AutoLoadPolicy,
    /// Per-tab auto-load timeout in milliseconds
    pub auto_load_timeout_ms: u64,
    /// Maximum simultaneous auto-loads
    pub auto_load_concurrency: usize,
    /// Emit Save-All progress events
    pub emit_progress: bool,
    /// Interval between rendering-surface checks in milliseconds
    pub surface_retry_ms: u64,
}

impl TabGroupConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With load strategy
    #[inline]
    #[must_use]
    pub fn with_load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.load_strategy = strategy;
        self
    }

    /// With switch validation
    #[inline]
    #[must_use]
    pub fn with_validate_on_tab_switch(mut self, validate: bool) -> Self {
        self.validate_on_tab_switch = validate;
        self
    }

    /// With save mode
    #[inline]
    #[must_use]
    pub fn with_save_mode(mut self, mode: SaveMode) -> Self {
        self.save_mode = mode;
        self
    }

    /// With auto-load policy
    #[inline]
    #[must_use]
    pub fn with_auto_load(mut self, policy: AutoLoadPolicy) -> Self {
        self.auto_load = policy;
        self
    }

    /// With auto-load timeout
    #[inline]
    #[must_use]
    pub fn with_auto_load_timeout(mut self, timeout: Duration) -> Self {
        self.auto_load_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With auto-load concurrency
    #[inline]
    #[must_use]
    pub fn with_auto_load_concurrency(mut self, concurrency: usize) -> Self {
        self.auto_load_concurrency = concurrency;
        self
    }

    /// With progress emission
    #[inline]
    #[must_use]
    pub fn with_emit_progress(mut self, emit: bool) -> Self {
        self.emit_progress = emit;
        self
    }

    /// With surface retry interval
    #[inline]
    #[must_use]
    pub fn with_surface_retry(mut self, interval: Duration) -> Self {
        self.surface_retry_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Auto-load timeout as a duration
    #[inline]
    #[must_use]
    pub fn auto_load_timeout(&self) -> Duration {
        Duration::from_millis(self.auto_load_timeout_ms)
    }

    /// Concurrency limit, never below one
    #[inline]
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.auto_load_concurrency.max(1)
    }

    /// Surface retry interval, never below one millisecond
    #[inline]
    #[must_use]
    pub fn surface_retry(&self) -> Duration {
        Duration::from_millis(self.surface_retry_ms.max(1))
    }

    /// Reject values the engine cannot honor
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for a zero auto-load timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_load.is_enabled() && self.auto_load_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "auto-load-timeout-ms must be positive when auto-load is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid values.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for TabGroupConfig {
    fn default() -> Self {
        Self {
            load_strategy: LoadStrategy::Lazy,
            validate_on_tab_switch: true,
            save_mode: SaveMode::Internal,
            auto_load: AutoLoadPolicy::Missing,
            auto_load_timeout_ms: 10_000,
            auto_load_concurrency: 3,
            emit_progress: true,
            surface_retry_ms: 16,
        }
    }
}
