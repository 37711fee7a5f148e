//! Preset Catalog - Named Partial Configurations
//!
//! A preset is a partial dial document merged over the current state by
//! `ConfigStore::load_preset`. Built-ins ship with the engine; more can be
//! loaded from a directory of JSON files.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::ConfigError;
use crate::ENGINE_VERSION;

pub type PresetId = String;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Preset {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Failed to read presets: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse preset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to apply preset: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    /// Partial dial configuration, keyed by section
    pub config: Value,
}

fn default_engine_min_version() -> String {
    crate::MIN_PRESET_ENGINE_VERSION.to_string()
}

impl Preset {
    fn builtin(id: &str, name: &str, description: &str, config: Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            engine_min_version: default_engine_min_version(),
            config,
        }
    }

    /// Reject presets written for a newer engine.
    pub fn check_engine_version(&self) -> Result<(), PresetError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| PresetError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let min_ver = semver::Version::parse(&self.engine_min_version)
            .map_err(|_| PresetError::InvalidVersion(self.engine_min_version.clone()))?;

        if engine_ver < min_ver {
            return Err(PresetError::EngineVersionMismatch(
                self.id.clone(),
                self.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }
}

/// Preset registry - built-ins plus anything loaded from disk
pub struct PresetRegistry {
    presets: HashMap<PresetId, Preset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self { presets: HashMap::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for preset in builtin_presets() {
            registry.register(preset);
        }
        registry
    }

    /// Add every parsable `*.json` preset in `dir`. Files that fail to parse
    /// are skipped with a warning.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<usize, PresetError> {
        let mut loaded = 0;
        if !dir.exists() {
            return Ok(loaded);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                match load_file(&path) {
                    Ok(preset) => {
                        self.register(preset);
                        loaded += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping preset file"),
                }
            }
        }
        info!(dir = %dir.display(), loaded, "presets loaded");
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    /// All presets, ordered by id
    pub fn list(&self) -> Vec<&Preset> {
        let mut presets: Vec<_> = self.presets.values().collect();
        presets.sort_by(|a, b| a.id.cmp(&b.id));
        presets
    }

    pub fn register(&mut self, preset: Preset) {
        self.presets.insert(preset.id.clone(), preset);
    }
}

/// Read a single preset document.
pub fn load_file(path: &Path) -> Result<Preset, PresetError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::builtin(
            "classic",
            "Classic",
            "Warm cream face with roman numerals",
            json!({
                "background": { "kind": "solid", "color": "#fef3c7" },
                "majorScales": { "color": "#92400e", "shape": "line", "length": 40.0 },
                "numbers": { "style": "roman", "fontFamily": "Times New Roman", "color": "#92400e" },
                "center": { "color": "#92400e", "size": 12.0 }
            }),
        ),
        Preset::builtin(
            "modern",
            "Modern",
            "Dark linear gradient with triangular markers",
            json!({
                "background": {
                    "kind": "gradient",
                    "gradient": { "kind": "linear", "colors": ["#0f172a", "#1e293b"], "angle": 45.0 }
                },
                "majorScales": { "color": "#e2e8f0", "shape": "triangle", "placement": "inside" },
                "minorScales": { "color": "#475569" },
                "numbers": { "color": "#e2e8f0", "style": "arabic", "fontSize": 32.0 },
                "center": { "color": "#3b82f6" }
            }),
        ),
        Preset::builtin(
            "minimal",
            "Minimal",
            "Numerals only on white",
            json!({
                "background": { "kind": "solid", "color": "#ffffff" },
                "majorScales": { "visible": false },
                "minorScales": { "visible": false },
                "numbers": { "fontSize": 48.0, "color": "#000000", "radiusRatio": 0.85 },
                "center": { "style": "none" }
            }),
        ),
        Preset::builtin(
            "vintage",
            "Vintage",
            "Grid pattern with rectangular markers and chinese numerals",
            json!({
                "background": {
                    "kind": "pattern",
                    "pattern": { "kind": "grid", "color": "#d6d3d1", "size": 8.0 }
                },
                "majorScales": { "shape": "rectangle", "color": "#57534e" },
                "numbers": { "style": "chinese", "fontFamily": "SimSun, serif", "color": "#57534e" }
            }),
        ),
    ]
}
