//! Error types for the tab group engine
//!
//! Provides error handling for:
//! - Tab body and factory failures (save rejections, unavailable views)
//! - Engine failures surfaced to hosts (auto-load timeouts, save failures)
//! - Configuration and manifest parsing

use crate::events::SavePhase;

/// Failure reported by a tab body or a tab factory
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    /// The body refused the operation (e.g. backend rejected a save)
    #[error("rejected: {0}")]
    Rejected(String),

    /// The factory could not construct the body
    #[error("view unavailable: {0}")]
    Unavailable(String),

    /// Any other failure raised by host code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TabError {
    /// Create a rejection error
    #[inline]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Create an unavailable-view error
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum TabGroupError {
    /// Index does not address a descriptor
    #[error("no tab at index {index} (group has {len} tabs)")]
    UnknownTab { index: usize, len: usize },

    /// Descriptor list rejected at initialization
    #[error("invalid tab descriptors: {0}")]
    InvalidDescriptors(String),

    /// A tab did not finish loading within the auto-load timeout
    #[error("tab '{id}' (index {index}) did not load within {timeout_ms}ms")]
    LoadTimeout {
        index: usize,
        id: String,
        timeout_ms: u64,
    },

    /// A tab factory failed while loading
    #[error("tab '{id}' (index {index}) failed to load: {source}")]
    LoadFailed {
        index: usize,
        id: String,
        #[source]
        source: TabError,
    },

    /// A tab body rejected its save
    #[error("tab '{id}' (index {index}) failed to save: {source}")]
    SaveFailed {
        index: usize,
        id: String,
        #[source]
        source: TabError,
    },
}

impl TabGroupError {
    /// Save-All phase this error belongs to, if any
    #[must_use]
    pub fn phase(&self) -> Option<SavePhase> {
        match self {
            Self::LoadTimeout { .. } | Self::LoadFailed { .. } => Some(SavePhase::Autoload),
            Self::SaveFailed { .. } => Some(SavePhase::Saving),
            Self::UnknownTab { .. } | Self::InvalidDescriptors(_) => None,
        }
    }

    /// Index of the tab that caused the error, if any
    #[must_use]
    pub fn tab_index(&self) -> Option<usize> {
        match self {
            Self::UnknownTab { index, .. }
            | Self::LoadTimeout { index, .. }
            | Self::LoadFailed { index, .. }
            | Self::SaveFailed { index, .. } => Some(*index),
            Self::InvalidDescriptors(_) => None,
        }
    }

    /// Id of the tab that caused the error, if any
    #[must_use]
    pub fn tab_id(&self) -> Option<&str> {
        match self {
            Self::LoadTimeout { id, .. }
            | Self::LoadFailed { id, .. }
            | Self::SaveFailed { id, .. } => Some(id),
            Self::UnknownTab { .. } | Self::InvalidDescriptors(_) => None,
        }
    }

    /// Check if error indicates a caller bug rather than a user-facing condition
    #[inline]
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::UnknownTab { .. } | Self::InvalidDescriptors(_))
    }
}

/// Configuration and manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse failure
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse failure
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest names a view with no registered factory
    #[error("tab '{tab}' uses unregistered view '{view}'")]
    UnknownView { tab: String, view: String },

    /// Semantically invalid configuration
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_map_to_autoload_phase() {
        let err = TabGroupError::LoadTimeout {
            index: 2,
            id: "collateral".into(),
            timeout_ms: 50,
        };

        assert_eq!(err.phase(), Some(SavePhase::Autoload));
        assert_eq!(err.tab_index(), Some(2));
        assert_eq!(err.tab_id(), Some("collateral"));
        assert!(!err.is_programmer_error());
    }

    #[test]
    fn save_error_keeps_source() {
        let err = TabGroupError::SaveFailed {
            index: 1,
            id: "loan".into(),
            source: TabError::rejected("backend down"),
        };

        assert_eq!(err.phase(), Some(SavePhase::Saving));
        assert!(err.to_string().contains("backend down"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unknown_tab_is_programmer_error() {
        let err = TabGroupError::UnknownTab { index: 9, len: 3 };
        assert!(err.is_programmer_error());
        assert_eq!(err.phase(), None);
    }
}
