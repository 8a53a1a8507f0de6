use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::position::MismatchPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    /// Origins the embedded surface may message from. Load-bearing security
    /// boundary, not a tuning knob.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://app.scrivo.dev".into(),
                "https://scrivo.dev".into(),
                // The shell page itself.
                "tauri://localhost".into(),
                "http://tauri.localhost".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotCornerSettings {
    pub enabled: bool,
    /// Side length in pixels of the bottom-right activation square.
    pub size_px: i32,
}

impl Default for HotCornerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            size_px: 32,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlaySettings {
    pub gateway: GatewaySettings,
    pub hot_corner: HotCornerSettings,
    pub on_application_mismatch: MismatchPolicy,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<OverlaySettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            OverlaySettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> OverlaySettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: OverlaySettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &OverlaySettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
