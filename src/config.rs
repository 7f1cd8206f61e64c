//! Application settings persisted as `settings.json`.

use crate::editor::EditorStyle;
use crate::realtime::ReconnectPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub api_base_url: String,
    pub ws_url: String,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub refresh_interval_secs: u64,
    pub history_max_records: usize,
    pub last_module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_dir: Option<PathBuf>,
    pub style: EditorStyle,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            ws_url: "ws://localhost:8000/ws".into(),
            reconnect_attempts: 5,
            reconnect_delay_ms: 3000,
            refresh_interval_secs: 30,
            history_max_records: 1000,
            last_module: None,
            draft_dir: None,
            style: EditorStyle::default(),
        }
    }
}

impl AppSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings)
    }

    /// Settings from `path`, or defaults when the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                if path.exists() {
                    log::warn!("[System] {:#}; using default settings", e);
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// `<data dir>/vision-dashboard/drafts` unless overridden.
    pub fn draft_dir(&self) -> Option<PathBuf> {
        self.draft_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("vision-dashboard").join("drafts")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_contract() {
        let settings = AppSettings::default();
        let policy = settings.reconnect_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(3));
        assert_eq!(settings.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "api_base_url": "http://10.0.0.5:9000", "last_module": "school" }"#)
            .unwrap();

        let settings = AppSettings::load_or_default(&path);
        assert_eq!(settings.api_base_url, "http://10.0.0.5:9000");
        assert_eq!(settings.last_module.as_deref(), Some("school"));
        assert_eq!(settings.reconnect_attempts, 5);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppSettings::load_or_default(&path), AppSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = AppSettings {
            refresh_interval_secs: 10,
            last_module: Some("traffic".into()),
            ..AppSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(AppSettings::load(&path).unwrap(), settings);
    }
}
