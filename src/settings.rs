//! 视图配置（以 JSON 持久化）

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::SettingsError;

const SETTINGS_DIR: &str = "boxview";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Size used for runs whose props never set one.
    pub default_font_size: i32,
    /// Line height as a percentage of the tallest run on the line.
    pub line_spacing_percent: i32,
    pub table_cell_spacing: i32,
    /// Items per lazy box when a sequence is displayed lazily.
    pub lazy_chunk_size: usize,
    /// Fallback per-item height estimate for lazy boxes.
    pub estimated_item_height: i32,
    pub max_layout_width: i32,
    pub max_build_depth: usize,
    /// Run the notifier consistency check after every rebuild batch.
    pub verify_after_rebuild: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_font_size: 16,
            line_spacing_percent: 100,
            table_cell_spacing: 2,
            lazy_chunk_size: 20,
            estimated_item_height: 24,
            max_layout_width: 1 << 20,
            max_build_depth: 64,
            verify_after_rebuild: cfg!(debug_assertions),
        }
    }
}

pub fn load_settings(path: &Path) -> Result<ViewSettings, SettingsError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn save_settings(path: &Path, settings: &ViewSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// `$XDG_CONFIG_HOME/boxview/settings.json`, falling back to `~/.config`.
pub fn default_settings_path() -> Option<PathBuf> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
    };
    Some(base.join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Settings from `path` when given, else from the default location when it
/// exists, else defaults.
pub fn resolve_settings(path: Option<&Path>) -> Result<ViewSettings, SettingsError> {
    if let Some(path) = path {
        return load_settings(path);
    }
    match default_settings_path() {
        Some(path) if path.exists() => load_settings(&path),
        _ => Ok(ViewSettings::default()),
    }
}

#[cfg(test)]
#[path = "../tests/unit/settings.rs"]
mod tests;
