//! Tab descriptors
//!
//! Immutable per-tab configuration supplied by the host. Hosts change tabs by
//! replacing the whole descriptor list, never by mutating descriptors in place.

use crate::contract::{TabData, TabFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// When a tab body gets materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    /// Load immediately at initialization
    Eager,
    /// Load the first tab now, the rest on the next tick
    #[default]
    Lazy,
    /// Load only when selected or explicitly requested
    #[serde(alias = "on-click", alias = "onClickOnly")]
    OnClickOnly,
}

impl LoadStrategy {
    /// Check if tabs with this mode only load on demand
    #[inline]
    #[must_use]
    pub fn is_on_click_only(self) -> bool {
        self == Self::OnClickOnly
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
            Self::OnClickOnly => "on-click-only",
        };
        f.write_str(name)
    }
}

/// Static configuration of one tab
#[derive(Clone)]
pub struct TabDescriptor {
    /// Unique key; also the aggregate payload key
    pub id: String,
    /// Display label
    pub label: String,
    /// Icon name
    pub icon: Option<String>,
    /// Tooltip attached to the icon
    pub icon_tooltip: Option<String>,
    /// Reason shown while the tab is disabled
    pub disabled_tooltip: Option<String>,
    /// Body constructor
    pub factory: Arc<dyn TabFactory>,
    /// Per-tab override of the group load strategy
    pub mode: Option<LoadStrategy>,
    /// Disabled tabs never load and take part in no operation
    pub enabled: bool,
    /// Read-only tabs never gate validation or run internal saves
    pub read_only: bool,
    /// Whether this tab's data goes into the parent-mode aggregate
    pub include_in_global_payload: bool,
    /// On-click tabs with this flag wait until loaded tabs are valid
    pub requires_validation: bool,
    /// Informational
    pub required: bool,
    /// Display order hint for hosts
    pub order: Option<i32>,
    /// Initial data handed to the body's seed hook
    pub seed: Option<TabData>,
}

impl TabDescriptor {
    /// Create a descriptor with defaults for everything but identity and factory
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, factory: Arc<dyn TabFactory>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: None,
            icon_tooltip: None,
            disabled_tooltip: None,
            factory,
            mode: None,
            enabled: true,
            read_only: false,
            include_in_global_payload: true,
            requires_validation: false,
            required: false,
            order: None,
            seed: None,
        }
    }

    /// With load strategy override
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: LoadStrategy) -> Self {
        self.mode = Some(mode);
        self
    }

    /// With enablement
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With read-only flag
    #[inline]
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// With inclusion in the parent-mode aggregate
    #[inline]
    #[must_use]
    pub fn with_global_payload(mut self, include: bool) -> Self {
        self.include_in_global_payload = include;
        self
    }

    /// With validation gate for on-click loading
    #[inline]
    #[must_use]
    pub fn with_requires_validation(mut self, requires: bool) -> Self {
        self.requires_validation = requires;
        self
    }

    /// With required marker
    #[inline]
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// With display order
    #[inline]
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// With icon and its tooltip
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>, tooltip: Option<String>) -> Self {
        self.icon = Some(icon.into());
        self.icon_tooltip = tooltip;
        self
    }

    /// With reason shown while disabled
    #[must_use]
    pub fn with_disabled_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.disabled_tooltip = Some(tooltip.into());
        self
    }

    /// With initial data seed
    #[must_use]
    pub fn with_seed(mut self, seed: TabData) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Own override if set, else the group strategy
    #[inline]
    #[must_use]
    pub fn effective_mode(&self, global: LoadStrategy) -> LoadStrategy {
        self.mode.unwrap_or(global)
    }
}

impl fmt::Debug for TabDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabDescriptor")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("mode", &self.mode)
            .field("enabled", &self.enabled)
            .field("read_only", &self.read_only)
            .field("include_in_global_payload", &self.include_in_global_payload)
            .field("requires_validation", &self.requires_validation)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
