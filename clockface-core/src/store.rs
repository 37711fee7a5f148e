//! Config Store - Sole Owner of Dial State
//!
//! Patches are JSON objects merged into the serialized section and then
//! deserialized back, so a patch either applies completely or not at all.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::{DialConfiguration, Section};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Invalid patch for {0}: expected a JSON object")]
    InvalidPatch(String),

    #[error("Patch does not match the configuration schema: {0}")]
    TypeMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Receives every committed configuration change.
pub trait ConfigObserver {
    fn config_changed(&mut self, config: &DialConfiguration, version: u64);
}

impl<F> ConfigObserver for F
where
    F: FnMut(&DialConfiguration, u64),
{
    fn config_changed(&mut self, config: &DialConfiguration, version: u64) {
        (self)(config, version)
    }
}

pub struct ConfigStore {
    config: DialConfiguration,
    version: u64,
    observers: Vec<Box<dyn ConfigObserver>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::with_config(DialConfiguration::default())
    }

    pub fn with_config(config: DialConfiguration) -> Self {
        Self {
            config,
            version: 0,
            observers: vec![],
        }
    }

    /// Current configuration snapshot
    pub fn get(&self) -> &DialConfiguration {
        &self.config
    }

    /// Incremented on every committed mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, observer: Box<dyn ConfigObserver>) {
        self.observers.push(observer);
    }

    /// Merge `patch` field-by-field into one section.
    pub fn update(&mut self, section: Section, patch: &Value) -> Result<u64, ConfigError> {
        let patch = patch
            .as_object()
            .ok_or_else(|| ConfigError::InvalidPatch(section.key().to_string()))?;

        let mut document = serde_json::to_value(&self.config)?;
        merge_section(&mut document, section.key(), patch);
        let next = decode(document)?;

        debug!(section = section.key(), fields = patch.len(), "section updated");
        Ok(self.commit(next))
    }

    /// Same as [`ConfigStore::update`], addressing the section by its JSON key.
    pub fn update_by_name(&mut self, section: &str, patch: &Value) -> Result<u64, ConfigError> {
        let section =
            Section::from_key(section).ok_or_else(|| ConfigError::UnknownSection(section.to_string()))?;
        self.update(section, patch)
    }

    /// Merge a partial configuration at the top level.
    ///
    /// Sections absent from `preset` keep their current values; present ones
    /// merge exactly like [`ConfigStore::update`].
    pub fn load_preset(&mut self, preset: &Value) -> Result<u64, ConfigError> {
        let sections = preset
            .as_object()
            .ok_or_else(|| ConfigError::InvalidPatch("preset".to_string()))?;

        let mut document = serde_json::to_value(&self.config)?;
        for (key, patch) in sections {
            let section =
                Section::from_key(key).ok_or_else(|| ConfigError::UnknownSection(key.clone()))?;
            let patch = patch
                .as_object()
                .ok_or_else(|| ConfigError::InvalidPatch(section.key().to_string()))?;
            merge_section(&mut document, section.key(), patch);
        }
        let next = decode(document)?;

        debug!(sections = sections.len(), "preset merged");
        Ok(self.commit(next))
    }

    /// Restore the built-in default exactly.
    pub fn reset_to_default(&mut self) -> u64 {
        self.commit(DialConfiguration::default())
    }

    fn commit(&mut self, next: DialConfiguration) -> u64 {
        self.config = next;
        self.version += 1;
        for observer in &mut self.observers {
            observer.config_changed(&self.config, self.version);
        }
        self.version
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(document: Value) -> Result<DialConfiguration, ConfigError> {
    serde_json::from_value(document).map_err(|e| ConfigError::TypeMismatch(e.to_string()))
}

/// Shallow-merge `patch` into `document[key]`.
///
/// Object-valued fields merge one level deeper; everything else, arrays
/// included, is replaced wholesale.
fn merge_section(document: &mut Value, key: &str, patch: &Map<String, Value>) {
    let Some(root) = document.as_object_mut() else {
        return;
    };
    let target = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(target) = target.as_object_mut() else {
        return;
    };

    for (field, value) in patch {
        let slot = target.entry(field.clone()).or_insert(Value::Null);
        match (slot, value) {
            (Value::Object(existing), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
            }
            (slot, _) => *slot = value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackgroundKind, GradientKind, MajorShape};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_update_touches_only_named_fields() {
        let mut store = ConfigStore::new();
        store
            .update(Section::MajorScales, &json!({"count": 6, "shape": "triangle"}))
            .unwrap();

        let major = &store.get().major_scales;
        assert_eq!(major.count, 6);
        assert_eq!(major.shape, MajorShape::Triangle);
        assert_eq!(major.length, 30.0);
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_nested_objects_merge_one_level() {
        let mut store = ConfigStore::new();
        store
            .update(
                Section::Background,
                &json!({"kind": "gradient", "gradient": {"kind": "linear"}}),
            )
            .unwrap();

        let bg = &store.get().background;
        assert_eq!(bg.kind, BackgroundKind::Gradient);
        assert_eq!(bg.gradient.kind, GradientKind::Linear);
        // untouched sibling inside the nested object survives
        assert_eq!(bg.gradient.colors, vec!["#ffffff", "#e2e8f0"]);
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let mut store = ConfigStore::new();
        store
            .update(Section::Numbers, &json!({"customTexts": ["XII", ""]}))
            .unwrap();
        assert_eq!(store.get().numbers.custom_texts, vec!["XII", ""]);
    }

    #[test]
    fn test_type_mismatch_leaves_state_unchanged() {
        let mut store = ConfigStore::new();
        let err = store
            .update(Section::MajorScales, &json!({"count": "twelve"}))
            .unwrap_err();

        assert!(matches!(err, ConfigError::TypeMismatch(_)));
        assert_eq!(store.get(), &DialConfiguration::default());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_non_object_patch_rejected() {
        let mut store = ConfigStore::new();
        let err = store.update(Section::Center, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPatch(_)));
    }

    #[test]
    fn test_unknown_section_name() {
        let mut store = ConfigStore::new();
        let err = store.update_by_name("hands", &json!({})).unwrap_err();
        assert!(err.to_string().contains("Unknown section"));
    }

    #[test]
    fn test_preset_leaves_missing_sections_untouched() {
        let mut store = ConfigStore::new();
        store.update(Section::Center, &json!({"size": 25.0})).unwrap();
        store
            .load_preset(&json!({"majorScales": {"color": "#92400e"}}))
            .unwrap();

        assert_eq!(store.get().center.size, 25.0);
        assert_eq!(store.get().major_scales.color, "#92400e");
        assert_eq!(store.get().major_scales.count, 12);
    }

    #[test]
    fn test_preset_with_unknown_section_is_atomic() {
        let mut store = ConfigStore::new();
        let err = store
            .load_preset(&json!({"center": {"size": 3.0}, "hands": {}}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSection(_)));
        assert_eq!(store.get().center.size, 10.0);
    }

    #[test]
    fn test_observers_see_each_commit() {
        let seen = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&seen);

        let mut store = ConfigStore::new();
        store.subscribe(Box::new(move |config: &DialConfiguration, version: u64| {
            sink.borrow_mut().push((version, config.major_scales.count));
        }));

        store.update(Section::MajorScales, &json!({"count": 4})).unwrap();
        store.reset_to_default();

        assert_eq!(*seen.borrow(), vec![(1, 4), (2, 12)]);
    }
}
