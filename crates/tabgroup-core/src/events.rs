//! Events emitted to the hosting page
//!
//! The engine pushes [`TabGroupEvent`]s into an unbounded channel obtained
//! from [`TabGroup::subscribe`](crate::TabGroup::subscribe).

use crate::contract::TabData;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use ulid::Ulid;

/// Identifier of one Save-All invocation (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Save-All phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SavePhase {
    Autoload,
    Validate,
    Saving,
    Emit,
    Complete,
    Error,
}

impl fmt::Display for SavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Autoload => "autoload",
            Self::Validate => "validate",
            Self::Saving => "saving",
            Self::Emit => "emit",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Progress notification emitted during Save-All
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgress {
    pub run: RunId,
    pub phase: SavePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_to_load: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tab_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tab_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Phase that was running when an error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<SavePhase>,
}

impl SaveProgress {
    pub(crate) fn new(run: RunId, phase: SavePhase) -> Self {
        Self {
            run,
            phase,
            total_to_load: None,
            loaded_count: None,
            current_tab_index: None,
            current_tab_id: None,
            message: None,
            error: None,
            failed_phase: None,
        }
    }

    pub(crate) fn with_counts(mut self, total: usize, loaded: usize) -> Self {
        self.total_to_load = Some(total);
        self.loaded_count = Some(loaded);
        self
    }

    pub(crate) fn with_tab(mut self, index: usize, id: &str) -> Self {
        self.current_tab_index = Some(index);
        self.current_tab_id = Some(id.to_string());
        self
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub(crate) fn with_error(mut self, failed_phase: SavePhase, error: impl Into<String>) -> Self {
        self.failed_phase = Some(failed_phase);
        self.error = Some(error.into());
        self
    }
}

/// Parent-mode aggregate: tab id to that tab's data, in descriptor order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SavePayload(pub IndexMap<String, TabData>);

impl SavePayload {
    /// Data for one tab
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TabData> {
        self.0.get(id)
    }

    /// Tab ids in descriptor order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of tabs in the payload
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no tab contributed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize as a JSON object
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.clone().into_iter().collect())
    }
}

/// Everything the engine tells its host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TabGroupEvent {
    /// Save-All progress
    Progress(SaveProgress),
    /// Parent-mode aggregate, delivered once per successful Save-All
    Payload { run: RunId, payload: SavePayload },
    /// Selection moved
    SelectionChanged {
        previous: Option<usize>,
        current: usize,
    },
    /// A tab body was materialized
    TabLoaded { index: usize, id: String },
    /// A tab body failed to materialize
    LoadFailed {
        index: usize,
        id: String,
        message: String,
    },
    /// Mirrored validity or dirtiness changed
    StatusChanged {
        index: usize,
        valid: bool,
        dirty: bool,
    },
    /// Leaving a dirty or invalid tab was refused
    SwitchVetoed { from: usize, to: usize },
    /// On-click load refused until the listed tabs are valid
    LoadBlocked { index: usize, invalid: Vec<usize> },
}
