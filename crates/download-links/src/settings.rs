use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settings group the renderer options are stored under.
pub const GROUP: &str = "basic";

pub const DEFAULT_LIGHT_MODE_SELECTOR: &str = "html:not(.dark)";
pub const DEFAULT_DARK_MODE_SELECTOR: &str = "html.dark";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadSettings {
    /// Selector the light theme variables are scoped to.
    pub light_mode_selector: String,
    pub dark_mode_selector: String,
    #[serde(rename = "downloadSourceList")]
    pub download_sources: Vec<DownloadSource>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            light_mode_selector: DEFAULT_LIGHT_MODE_SELECTOR.to_string(),
            dark_mode_selector: DEFAULT_DARK_MODE_SELECTOR.to_string(),
            download_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSource {
    pub name: String,
    pub icon: String,
}

impl DownloadSettings {
    /// Parse settings JSON. Accepts either the bare settings object or a
    /// document holding it under the `basic` group.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(json).context("settings are not valid JSON")?;
        let value = match value.get(GROUP) {
            Some(group) if group.is_object() => group.clone(),
            _ => value,
        };
        let mut settings: Self =
            serde_json::from_value(value).context("settings have an unexpected shape")?;
        settings.fill_blank_selectors();
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("failed to parse settings from {}", path.display()))
    }

    /// Like [`DownloadSettings::load`], but falls back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "using default download settings"
                );
                Self::default()
            }
        }
    }

    /// Configured icon of the source named `name`, compared without case.
    pub fn icon_for_source(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.download_sources
            .iter()
            .find(|source| source.name.trim().eq_ignore_ascii_case(name))
            .map(|source| source.icon.as_str())
            .filter(|icon| !icon.trim().is_empty())
    }

    fn fill_blank_selectors(&mut self) {
        if self.light_mode_selector.trim().is_empty() {
            self.light_mode_selector = DEFAULT_LIGHT_MODE_SELECTOR.to_string();
        }
        if self.dark_mode_selector.trim().is_empty() {
            self.dark_mode_selector = DEFAULT_DARK_MODE_SELECTOR.to_string();
        }
    }
}
