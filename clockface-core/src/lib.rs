//! ClockFace Core - Dial Configuration, Render and Export Engine
//!
//! # Rules
//! 1. The configuration is the single source of truth
//! 2. A scene is a pure function of configuration and image state
//! 3. Raster and vector exports come from the same scene
//! 4. Exports are all-or-nothing

pub mod color;
pub mod config;
pub mod export;
pub mod fonts;
pub mod geometry;
pub mod hashing;
pub mod images;
pub mod presets;
pub mod print;
pub mod raster;
pub mod render;
pub mod scene;
pub mod session;
pub mod store;
pub mod svg;

pub use config::{DialConfiguration, Section};
pub use export::{ExportError, ExportFormat, ExportService, ExportedFile};
pub use geometry::{polar_to_point, Point};
pub use hashing::{canonical_json, config_hash};
pub use images::{ImageError, ImageLoader, ImageStatus};
pub use presets::{Preset, PresetError, PresetRegistry};
pub use print::{DpiAuthority, PrintSpec};
pub use render::RenderPipeline;
pub use scene::{Element, Layer, Primitive, Scene};
pub use session::{Session, SessionError};
pub use store::{ConfigError, ConfigObserver, ConfigStore};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_PRESET_ENGINE_VERSION: &str = "1.0.0";
