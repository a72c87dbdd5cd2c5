//! Per-tab runtime state

use crate::contract::TabContract;
use serde::Serialize;
use std::fmt;

/// Mutable lifecycle state of one tab, owned by the engine
///
/// `loaded()` is derived from the presence of the body instance, so a tab is
/// loaded exactly when it has an instance.
pub struct TabRuntimeState {
    pub(crate) valid: bool,
    pub(crate) dirty: bool,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
    pub(crate) instance: Option<Box<dyn TabContract>>,
}

impl TabRuntimeState {
    /// Whether the body has been constructed
    #[inline]
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.instance.is_some()
    }

    /// Mirrored validity (true while unloaded)
    #[inline]
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Mirrored dirtiness (false while unloaded)
    #[inline]
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a load is in flight
    #[inline]
    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Last load failure
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Copyable view for hosts
    #[must_use]
    pub fn status(&self) -> TabStatus {
        TabStatus {
            loaded: self.loaded(),
            valid: self.valid,
            dirty: self.dirty,
            loading: self.loading,
            error: self.error.clone(),
        }
    }

    /// Attach a freshly built body and capture its state
    pub(crate) fn attach(&mut self, instance: Box<dyn TabContract>) {
        self.valid = instance.is_valid();
        self.dirty = instance.is_dirty();
        self.loading = false;
        self.error = None;
        self.instance = Some(instance);
    }

    /// Re-read validity and dirtiness from the live body
    ///
    /// Returns true when the mirrored values changed.
    pub(crate) fn refresh(&mut self) -> bool {
        let Some(instance) = self.instance.as_ref() else {
            return false;
        };
        let (valid, dirty) = (instance.is_valid(), instance.is_dirty());
        self.record(valid, dirty)
    }

    /// Store new mirrored values, returning true when they differ
    pub(crate) fn record(&mut self, valid: bool, dirty: bool) -> bool {
        let changed = valid != self.valid || dirty != self.dirty;
        self.valid = valid;
        self.dirty = dirty;
        changed
    }
}

impl Default for TabRuntimeState {
    fn default() -> Self {
        Self {
            valid: true,
            dirty: false,
            loading: false,
            error: None,
            instance: None,
        }
    }
}

impl fmt::Debug for TabRuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabRuntimeState")
            .field("loaded", &self.loaded())
            .field("valid", &self.valid)
            .field("dirty", &self.dirty)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Snapshot of a tab's runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabStatus {
    pub loaded: bool,
    pub valid: bool,
    pub dirty: bool,
    pub loading: bool,
    pub error: Option<String>,
}
