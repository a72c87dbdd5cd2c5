//! View registry and tab manifests
//!
//! A manifest describes a tab group declaratively: group configuration plus
//! one entry per tab naming a registered view. Resolving it against a
//! [`ViewRegistry`] yields the descriptor list the engine consumes.

use crate::config::TabGroupConfig;
use crate::contract::{TabData, TabFactory};
use crate::descriptor::{LoadStrategy, TabDescriptor};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Named tab factories
#[derive(Debug, Default, Clone)]
pub struct ViewRegistry {
    views: HashMap<String, Arc<dyn TabFactory>>,
}

impl ViewRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a view
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn TabFactory>) -> &mut Self {
        self.views.insert(name.into(), factory);
        self
    }

    /// Look up a view
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TabFactory>> {
        self.views.get(name)
    }

    /// Check if a view is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Registered view names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Serializable description of one tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TabSpec {
    pub id: String,
    pub label: String,
    /// Registered view name
    pub view: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_tooltip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<LoadStrategy>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub include_in_global_payload: bool,
    #[serde(default)]
    pub requires_validation: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<TabData>,
}

fn default_true() -> bool {
    true
}

impl TabSpec {
    fn into_descriptor(self, factory: Arc<dyn TabFactory>) -> TabDescriptor {
        TabDescriptor {
            id: self.id,
            label: self.label,
            icon: self.icon,
            icon_tooltip: self.icon_tooltip,
            disabled_tooltip: self.disabled_tooltip,
            factory,
            mode: self.mode,
            enabled: self.enabled,
            read_only: self.read_only,
            include_in_global_payload: self.include_in_global_payload,
            requires_validation: self.requires_validation,
            required: self.required,
            order: self.order,
            seed: self.seed,
        }
    }
}

/// Declarative tab group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TabManifest {
    #[serde(default)]
    pub group: TabGroupConfig,
    #[serde(default)]
    pub tabs: Vec<TabSpec>,
}

impl TabManifest {
    /// Parse from TOML
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid group settings.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let manifest: Self = toml::from_str(input)?;
        manifest.group.validate()?;
        Ok(manifest)
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid group settings.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let manifest: Self = serde_yaml::from_str(input)?;
        manifest.group.validate()?;
        Ok(manifest)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed input or invalid group settings.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let manifest: Self = serde_json::from_str(input)?;
        manifest.group.validate()?;
        Ok(manifest)
    }

    /// Build the configuration and descriptor list
    ///
    /// Tabs are stable-sorted by `order`; tabs without an order keep their
    /// position after all ordered tabs.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownView` when a tab names an unregistered view.
    pub fn resolve(
        self,
        registry: &ViewRegistry,
    ) -> Result<(TabGroupConfig, Vec<TabDescriptor>), ConfigError> {
        let mut specs = self.tabs;
        specs.sort_by_key(|spec| (spec.order.is_none(), spec.order));

        let tabs = specs
            .into_iter()
            .map(|spec| {
                let factory = registry
                    .get(&spec.view)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownView {
                        tab: spec.id.clone(),
                        view: spec.view.clone(),
                    })?;
                Ok(spec.into_descriptor(factory))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        tracing::debug!(tabs = tabs.len(), "manifest resolved");
        Ok((self.group, tabs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaveMode;
    use crate::contract::factory_fn;
    use crate::error::TabError;

    fn registry() -> ViewRegistry {
        let mut registry = ViewRegistry::new();
        registry
            .register("form", factory_fn(|_| Err(TabError::unavailable("unused"))))
            .register("summary", factory_fn(|_| Err(TabError::unavailable("unused"))));
        registry
    }

    const MANIFEST: &str = r#"
[group]
save-mode = "parent"

[[tabs]]
id = "review"
label = "Review"
view = "summary"
read-only = true
include-in-global-payload = false

[[tabs]]
id = "loan"
label = "Loan"
view = "form"
order = 2

[[tabs]]
id = "customer"
label = "Customer"
view = "form"
order = 1
seed = { name = "Ada" }
"#;

    #[test]
    fn resolves_sorted_descriptors() {
        let manifest = TabManifest::from_toml_str(MANIFEST).unwrap();
        let (config, tabs) = manifest.resolve(&registry()).unwrap();

        assert_eq!(config.save_mode, SaveMode::Parent);
        let ids: Vec<&str> = tabs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["customer", "loan", "review"]);
        assert!(tabs[2].read_only);
        assert!(!tabs[2].include_in_global_payload);
        assert!(tabs[0].enabled);
        assert_eq!(tabs[0].seed.as_ref().unwrap()["name"], "Ada");
    }

    #[test]
    fn unknown_view_is_rejected() {
        let manifest = TabManifest::from_yaml_str(
            "tabs:\n  - id: docs\n    label: Documents\n    view: uploader\n",
        )
        .unwrap();

        let err = manifest.resolve(&registry()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownView { ref view, .. } if view == "uploader"));
    }

    #[test]
    fn registry_names_are_sorted() {
        assert_eq!(registry().names(), vec!["form", "summary"]);
        assert!(registry().contains("form"));
        assert!(!registry().contains("grid"));
    }
}
