//! Tab affordances
//!
//! Pure queries over engine state that hosts use to decorate tab headers:
//! tooltip text, status icon and tone, the click-to-load indicator, and the
//! list of tabs gating an on-click load.

use crate::engine::TabGroup;
use serde::Serialize;

const SEPARATOR: &str = " • ";

/// Status icon for a tab header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffordanceIcon {
    Disabled,
    Loading,
    LoadFailed,
    Blocked,
    ClickToLoad,
    Pending,
    ReadOnly,
    Invalid,
    Dirty,
    Valid,
}

/// Color hint for a tab header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffordanceTone {
    Muted,
    Info,
    Success,
    Warning,
    Danger,
}

/// Everything a host needs to render a tab header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabAffordance {
    pub tooltip: String,
    pub icon: AffordanceIcon,
    pub tone: AffordanceTone,
    /// Show the click-to-load indicator
    pub click_to_load: bool,
    /// Labels of the tabs gating an on-click load; empty when not gated
    pub blocked_by: Vec<String>,
}

impl TabAffordance {
    /// Check if the tab is gated by invalid tabs
    #[inline]
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.blocked_by.is_empty()
    }
}

impl TabGroup {
    /// Affordance for the tab at `index`
    #[must_use]
    pub fn affordance(&self, index: usize) -> Option<TabAffordance> {
        let tab = self.tab(index)?;
        let state = self.state(index)?;

        if !tab.enabled {
            let reason = tab
                .disabled_tooltip
                .clone()
                .unwrap_or_else(|| "This tab is currently disabled".to_string());
            return Some(TabAffordance {
                tooltip: reason,
                icon: AffordanceIcon::Disabled,
                tone: AffordanceTone::Muted,
                click_to_load: false,
                blocked_by: Vec::new(),
            });
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(hint) = &tab.icon_tooltip {
            parts.push(hint.clone());
        }
        if tab.read_only {
            parts.push("Read-only".to_string());
        }

        let on_click = self.effective_mode(index).is_some_and(|m| m.is_on_click_only());
        let blocked_by = if !state.loaded() && on_click {
            self.load_gate(index)
                .into_iter()
                .filter_map(|i| self.tab(i).map(|t| t.label.clone()))
                .collect()
        } else {
            Vec::new()
        };

        let (icon, tone) = if state.loaded() {
            parts.push(if state.valid() { "Valid" } else { "Invalid: fix errors" }.to_string());
            parts.push(if state.dirty() { "Unsaved changes" } else { "No changes" }.to_string());
            match (tab.read_only, state.valid(), state.dirty()) {
                (true, ..) => (AffordanceIcon::ReadOnly, AffordanceTone::Info),
                (false, false, _) => (AffordanceIcon::Invalid, AffordanceTone::Danger),
                (false, true, true) => (AffordanceIcon::Dirty, AffordanceTone::Warning),
                (false, true, false) => (AffordanceIcon::Valid, AffordanceTone::Success),
            }
        } else if state.loading() {
            parts.push("Loading…".to_string());
            (AffordanceIcon::Loading, AffordanceTone::Info)
        } else if !blocked_by.is_empty() {
            parts.push(format!(
                "Blocked: fix validation in other tabs ({})",
                blocked_by.join(", ")
            ));
            (AffordanceIcon::Blocked, AffordanceTone::Danger)
        } else if let Some(error) = state.error() {
            parts.push(format!("Failed to load: {error}"));
            (AffordanceIcon::LoadFailed, AffordanceTone::Danger)
        } else if on_click {
            parts.push("Click to load".to_string());
            (AffordanceIcon::ClickToLoad, AffordanceTone::Info)
        } else {
            parts.push("Not loaded yet".to_string());
            (AffordanceIcon::Pending, AffordanceTone::Muted)
        };

        Some(TabAffordance {
            tooltip: parts.join(SEPARATOR),
            icon,
            tone,
            click_to_load: self.shows_click_to_load(index),
            blocked_by,
        })
    }

    /// Click-to-load indicator visibility
    ///
    /// Only enabled, editable, unloaded, idle, on-click tabs show it.
    #[must_use]
    pub fn shows_click_to_load(&self, index: usize) -> bool {
        let (Some(tab), Some(state)) = (self.tab(index), self.state(index)) else {
            return false;
        };
        tab.enabled
            && !tab.read_only
            && !state.loaded()
            && !state.loading()
            && tab.effective_mode(self.config().load_strategy).is_on_click_only()
    }

    /// Labels of loaded, editable tabs that are currently invalid
    #[must_use]
    pub fn invalid_tab_labels(&self) -> Vec<String> {
        self.invalid_tabs()
            .into_iter()
            .filter_map(|i| self.tab(i).map(|t| t.label.clone()))
            .collect()
    }
}
