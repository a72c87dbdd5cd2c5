//! Manifest sources: the bundled booking screen or a file on disk

use anyhow::Context;
use std::path::Path;
use tabgroup_core::TabManifest;

/// Booking screen shipped with the demo
pub(crate) const BOOKING_MANIFEST: &str = include_str!("../manifests/booking.yaml");

/// Load a manifest, picking the format from the file extension
///
/// Without a path the bundled booking manifest is used.
///
/// # Errors
/// Fails when the file cannot be read, has an unknown extension, or does not parse.
pub(crate) fn load_manifest(path: Option<&Path>) -> anyhow::Result<TabManifest> {
    let Some(path) = path else {
        return TabManifest::from_yaml_str(BOOKING_MANIFEST).context("parsing bundled manifest");
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => TabManifest::from_toml_str(&text),
        Some("json") => TabManifest::from_json_str(&text),
        Some("yaml" | "yml") | None => TabManifest::from_yaml_str(&text),
        Some(other) => anyhow::bail!("unsupported manifest extension '.{other}'"),
    };
    let manifest = parsed.with_context(|| format!("parsing manifest {}", path.display()))?;

    tracing::info!(path = %path.display(), tabs = manifest.tabs.len(), "manifest loaded");
    Ok(manifest)
}
