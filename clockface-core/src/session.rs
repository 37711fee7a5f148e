//! Dial Session - Single Entry Point
//!
//! Owns the configuration, the background image loader and the current
//! scene. Every mutation goes through here so the scene is never stale:
//! change the config, sync the image request, re-render.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{BackgroundKind, DialConfiguration, Section};
use crate::export::{ExportError, ExportService, ExportedFile};
use crate::hashing::config_hash;
use crate::images::{self, ImageError, ImageLoader, ImageStatus, LoadTicket, LoadedImage};
use crate::presets::{PresetError, PresetRegistry};
use crate::print::PrintSpec;
use crate::render::RenderPipeline;
use crate::scene::Scene;
use crate::store::{ConfigError, ConfigObserver, ConfigStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Invalid DPI: {0}")]
    InvalidDpi(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct Session {
    store: ConfigStore,
    images: ImageLoader,
    renderer: RenderPipeline,
    exporter: ExportService,
    scene: Scene,
    pending: Option<LoadTicket>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(DialConfiguration::default())
    }

    pub fn with_config(config: DialConfiguration) -> Self {
        let renderer = RenderPipeline::new();
        let scene = renderer.render(&config, ImageStatus::Idle);
        let mut session = Self {
            store: ConfigStore::with_config(config),
            images: ImageLoader::new(),
            renderer,
            exporter: ExportService::new(),
            scene,
            pending: None,
        };
        session.refresh();
        session
    }

    pub fn config(&self) -> &DialConfiguration {
        self.store.get()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Scene for the current configuration and image state
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn image_status(&self) -> ImageStatus {
        background_status(self.store.get(), &self.images)
    }

    pub fn subscribe(&mut self, observer: Box<dyn ConfigObserver>) {
        self.store.subscribe(observer);
    }

    pub fn update(&mut self, section: Section, patch: &serde_json::Value) -> Result<u64, SessionError> {
        let version = self.store.update(section, patch)?;
        self.refresh();
        Ok(version)
    }

    pub fn update_by_name(&mut self, section: &str, patch: &serde_json::Value) -> Result<u64, SessionError> {
        let version = self.store.update_by_name(section, patch)?;
        self.refresh();
        Ok(version)
    }

    pub fn load_preset(&mut self, preset: &serde_json::Value) -> Result<u64, SessionError> {
        let version = self.store.load_preset(preset)?;
        self.refresh();
        Ok(version)
    }

    /// Look up `id` in `registry` and merge it over the current state.
    pub fn apply_preset(&mut self, registry: &PresetRegistry, id: &str) -> Result<u64, SessionError> {
        let preset = registry
            .get(id)
            .ok_or_else(|| PresetError::NotFound(id.to_string()))?;
        preset.check_engine_version()?;

        let version = self.load_preset(&preset.config)?;
        info!(preset = %preset.id, version, "preset applied");
        Ok(version)
    }

    pub fn reset_to_default(&mut self) -> u64 {
        let version = self.store.reset_to_default();
        self.refresh();
        version
    }

    /// Background image load the caller should perform, if any.
    pub fn take_pending_image_load(&mut self) -> Option<LoadTicket> {
        self.pending.take()
    }

    /// Apply a finished load. Stale tokens are ignored and return `false`.
    pub fn complete_image_load(&mut self, token: u64, result: Result<LoadedImage, ImageError>) -> bool {
        if !self.images.complete(token, result) {
            return false;
        }
        self.render();
        true
    }

    /// Perform any pending load on the current thread.
    pub fn load_background_image_blocking(&mut self) -> ImageStatus {
        while let Some(ticket) = self.take_pending_image_load() {
            let result = images::fetch(&ticket.url);
            self.complete_image_load(ticket.token, result);
        }
        self.image_status()
    }

    /// Export PNG. `None` uses `canvas.dpi`.
    pub fn export_raster(&self, dpi: Option<u32>) -> Result<ExportedFile, SessionError> {
        let spec = match dpi {
            Some(dpi) => PrintSpec::from_user(dpi).map_err(SessionError::InvalidDpi)?,
            None => PrintSpec::from_canvas(self.config().canvas.dpi),
        };
        let mut file = self.exporter.export_raster(&self.scene, &self.images, &spec)?;
        file.config_hash = Some(config_hash(self.config())?);
        Ok(file)
    }

    pub fn export_vector(&self) -> Result<ExportedFile, SessionError> {
        let mut file = self.exporter.export_vector(&self.scene, &self.images)?;
        file.config_hash = Some(config_hash(self.config())?);
        Ok(file)
    }

    fn refresh(&mut self) {
        let config = self.store.get();
        if config.background.kind == BackgroundKind::Image {
            if let Some(ticket) = self.images.request(&config.background.image.url) {
                self.pending = Some(ticket);
            } else if self.images.current_url().is_empty() {
                self.pending = None;
            }
        }
        self.render();
    }

    fn render(&mut self) {
        let config = self.store.get();
        let status = background_status(config, &self.images);
        self.scene = self.renderer.render(config, status);
        debug!(version = self.store.version(), ?status, elements = self.scene.elements.len(), "scene rendered");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn background_status(config: &DialConfiguration, images: &ImageLoader) -> ImageStatus {
    if config.background.kind == BackgroundKind::Image {
        images.status_for(&config.background.image.url)
    } else {
        ImageStatus::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::png_bytes;
    use crate::scene::{Layer, Primitive};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn image_session(url: &str) -> Session {
        let mut session = Session::new();
        session
            .update(Section::Background, &json!({"kind": "image", "image": {"url": url}}))
            .unwrap();
        session
    }

    #[test]
    fn test_update_rerenders() {
        let mut session = Session::new();
        assert_eq!(session.scene().count(Layer::MajorScales), 12);

        session.update(Section::MajorScales, &json!({"count": 4})).unwrap();
        assert_eq!(session.scene().count(Layer::MajorScales), 4);
        assert_eq!(session.version(), 1);
    }

    #[test]
    fn test_failed_update_keeps_scene() {
        let mut session = Session::new();
        let before = session.scene().clone();
        assert!(session.update_by_name("hands", &json!({})).is_err());
        assert_eq!(session.scene(), &before);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn test_apply_preset_then_reset() {
        let registry = PresetRegistry::with_builtins();
        let mut session = Session::new();

        session.apply_preset(&registry, "minimal").unwrap();
        assert_ne!(session.config(), &DialConfiguration::default());

        session.reset_to_default();
        assert_eq!(session.config(), &DialConfiguration::default());
    }

    #[test]
    fn test_unknown_preset() {
        let mut session = Session::new();
        let err = session
            .apply_preset(&PresetRegistry::with_builtins(), "nope")
            .unwrap_err();
        assert!(matches!(err, SessionError::Preset(PresetError::NotFound(_))));
    }

    #[test]
    fn test_image_load_lifecycle() {
        let mut session = image_session("face.png");
        assert_eq!(session.image_status(), ImageStatus::Loading);
        // placeholder rect plus loading label
        assert_eq!(session.scene().count(Layer::Background), 2);

        let ticket = session.take_pending_image_load().unwrap();
        let image = images::decode(png_bytes(4, 4, [0, 0, 255, 255])).unwrap();
        assert!(session.complete_image_load(ticket.token, Ok(image)));

        assert_eq!(session.image_status(), ImageStatus::Loaded);
        assert!(session
            .scene()
            .layer(Layer::Background)
            .any(|p| matches!(p, Primitive::Image { .. })));
    }

    #[test]
    fn test_stale_image_load_ignored() {
        let mut session = image_session("first.png");
        let first = session.take_pending_image_load().unwrap();

        session
            .update(Section::Background, &json!({"image": {"url": "second.png"}}))
            .unwrap();
        let second = session.take_pending_image_load().unwrap();

        let image = images::decode(png_bytes(2, 2, [255, 0, 0, 255])).unwrap();
        assert!(!session.complete_image_load(first.token, Ok(image.clone())));
        assert_eq!(session.image_status(), ImageStatus::Loading);

        assert!(session.complete_image_load(second.token, Ok(image)));
        assert_eq!(session.image_status(), ImageStatus::Loaded);
    }

    #[test]
    fn test_failed_image_load() {
        let mut session = image_session("https://example.com/face.png");
        assert_eq!(session.load_background_image_blocking(), ImageStatus::Failed);
        assert_eq!(session.scene().count(Layer::Background), 1);
    }

    #[test]
    fn test_blocking_load_from_data_uri() {
        let image = images::decode(png_bytes(3, 3, [0, 255, 0, 255])).unwrap();
        let mut session = image_session(&image.data_uri());
        assert_eq!(session.load_background_image_blocking(), ImageStatus::Loaded);

        let svg = String::from_utf8(session.export_vector().unwrap().data).unwrap();
        assert!(svg.contains("data:image/png;base64,"));
    }

    #[test]
    fn test_export_dpi_selection() {
        let mut session = Session::new();
        session.update(Section::Numbers, &json!({"visible": false})).unwrap();
        session
            .update(Section::Canvas, &json!({"width": 144, "height": 72, "dpi": 144}))
            .unwrap();

        let canvas = session.export_raster(None).unwrap();
        assert_eq!(canvas.size, [288, 144]);
        assert_eq!(canvas.dpi, Some(144));

        let user = session.export_raster(Some(72)).unwrap();
        assert_eq!(user.size, [144, 72]);

        assert!(matches!(session.export_raster(Some(0)), Err(SessionError::InvalidDpi(_))));
    }

    #[test]
    fn test_export_carries_config_hash() {
        let session = Session::new();
        let file = session.export_vector().unwrap();
        assert_eq!(file.config_hash, Some(config_hash(session.config()).unwrap()));
    }

    #[test]
    fn test_observers_see_session_changes() {
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = Arc::clone(&seen);

        let mut session = Session::new();
        session.subscribe(Box::new(move |_: &DialConfiguration, version: u64| {
            sink.lock().unwrap().push(version);
        }));
        session.update(Section::Center, &json!({"size": 4})).unwrap();
        session.reset_to_default();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
