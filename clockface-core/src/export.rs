//! Export Service - Scene to Files
//!
//! Both formats are produced from the same scene. An export either yields a
//! complete file or an error; nothing partial is ever written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::hashing::{canonical_json, sha256_hex};
use crate::images::ImageStore;
use crate::print::PrintSpec;
use crate::raster::{self, RasterError};
use crate::scene::Scene;
use crate::svg;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Another export is already in progress")]
    InProgress,

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RasterError> for ExportError {
    fn from(e: RasterError) -> Self {
        ExportError::SurfaceUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Svg => "image/svg+xml",
        }
    }
}

/// `clock-face-<timestamp>.<ext>`, the ISO-8601 time with colons replaced
pub fn generate_filename(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!("clock-face-{}.{}", at.format("%Y-%m-%dT%H-%M-%S"), format.extension())
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub id: String,
    pub filename: String,
    pub format: ExportFormat,
    /// Pixel size for rasters, logical size for vectors
    pub size: [u32; 2],
    pub dpi: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
    pub scene_hash: String,
    /// Set when the export was produced from a known configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ExportedFile {
    /// Write into `dir` atomically: a temporary file in the same directory is
    /// renamed into place only once every byte is on disk.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let target = dir.join(&self.filename);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;

        info!(path = %target.display(), bytes = self.data.len(), "export written");
        Ok(target)
    }
}

/// Export service - one export at a time
#[derive(Debug, Default)]
pub struct ExportService {
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExportService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<InFlight<'_>, ExportError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::InProgress)?;
        Ok(InFlight(&self.in_flight))
    }

    /// PNG at `spec.dpi`, scaled by `dpi / 72`.
    pub fn export_raster(
        &self,
        scene: &Scene,
        images: &dyn ImageStore,
        spec: &PrintSpec,
    ) -> Result<ExportedFile, ExportError> {
        let _guard = self.begin()?;

        let pixmap = raster::rasterize(scene, images, spec)?;
        let data = pixmap
            .encode_png()
            .map_err(|e| ExportError::Serialization(e.to_string()))?;

        let file = self.record(
            ExportFormat::Png,
            [pixmap.width(), pixmap.height()],
            Some(spec.dpi),
            data,
            scene,
        )?;
        info!(filename = %file.filename, dpi = spec.dpi, width = file.size[0], height = file.size[1], "raster exported");
        Ok(file)
    }

    /// SVG at the logical canvas size.
    pub fn export_vector(&self, scene: &Scene, images: &dyn ImageStore) -> Result<ExportedFile, ExportError> {
        let _guard = self.begin()?;

        let document =
            svg::write_svg(scene, images).map_err(|e| ExportError::Serialization(e.to_string()))?;
        let size = [scene.width.round() as u32, scene.height.round() as u32];

        let file = self.record(ExportFormat::Svg, size, None, document.into_bytes(), scene)?;
        info!(filename = %file.filename, bytes = file.data.len(), "vector exported");
        Ok(file)
    }

    fn record(
        &self,
        format: ExportFormat,
        size: [u32; 2],
        dpi: Option<u32>,
        data: Vec<u8>,
        scene: &Scene,
    ) -> Result<ExportedFile, ExportError> {
        let scene_json = canonical_json(scene).map_err(|e| ExportError::Serialization(e.to_string()))?;
        let created_at = Utc::now();

        Ok(ExportedFile {
            id: Uuid::new_v4().to_string(),
            filename: generate_filename(format, created_at),
            format,
            size,
            dpi,
            created_at,
            content_hash: sha256_hex(&data),
            scene_hash: sha256_hex(scene_json.as_bytes()),
            config_hash: None,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialConfiguration;
    use crate::images::{ImageLoader, ImageStatus};
    use crate::render::RenderPipeline;
    use chrono::TimeZone;

    fn scene() -> Scene {
        let mut config = DialConfiguration::default();
        config.numbers.visible = false;
        RenderPipeline::new().render(&config, ImageStatus::Idle)
    }

    #[test]
    fn test_filename_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            generate_filename(ExportFormat::Png, at),
            "clock-face-2024-03-09T14-05-07.png"
        );
        assert!(!generate_filename(ExportFormat::Svg, at).contains(':'));
    }

    #[test]
    fn test_format_media_types() {
        assert_eq!(ExportFormat::Png.mime_type(), "image/png");
        assert_eq!(ExportFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!(ExportFormat::Svg.extension(), "svg");
    }

    #[test]
    fn test_vector_export_is_idempotent() {
        let service = ExportService::new();
        let images = ImageLoader::new();
        let scene = scene();

        let a = service.export_vector(&scene, &images).unwrap();
        let b = service.export_vector(&scene, &images).unwrap();
        assert_eq!(a.data, b.data);
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.scene_hash, b.scene_hash);
        assert_ne!(a.id, b.id);
        assert_eq!(a.size, [800, 800]);
    }

    #[test]
    fn test_raster_export_is_png() {
        let service = ExportService::new();
        let file = service
            .export_raster(&scene(), &ImageLoader::new(), &PrintSpec::default())
            .unwrap();
        assert_eq!(&file.data[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(file.size, [800, 800]);
        assert_eq!(file.dpi, Some(72));
        assert!(file.filename.ends_with(".png"));
    }

    #[test]
    fn test_concurrent_export_rejected() {
        let service = ExportService::new();
        let guard = service.begin().unwrap();
        assert!(service.is_busy());

        let err = service.export_vector(&scene(), &ImageLoader::new()).unwrap_err();
        assert!(matches!(err, ExportError::InProgress));

        drop(guard);
        assert!(!service.is_busy());
        assert!(service.export_vector(&scene(), &ImageLoader::new()).is_ok());
    }

    #[test]
    fn test_failed_export_releases_guard() {
        let mut config = DialConfiguration::default();
        config.canvas.width = 0.0;
        let empty = RenderPipeline::new().render(&config, ImageStatus::Idle);

        let service = ExportService::new();
        let err = service
            .export_raster(&empty, &ImageLoader::new(), &PrintSpec::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::SurfaceUnavailable(_)));
        assert!(!service.is_busy());
    }

    #[test]
    fn test_write_to_dir_leaves_only_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportService::new()
            .export_vector(&scene(), &ImageLoader::new())
            .unwrap();

        let path = file.write_to_dir(dir.path()).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), file.data);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_to_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let file = ExportService::new()
            .export_vector(&scene(), &ImageLoader::new())
            .unwrap();

        assert!(matches!(file.write_to_dir(&missing), Err(ExportError::Io(_))));
        assert!(!missing.exists());
    }
}
