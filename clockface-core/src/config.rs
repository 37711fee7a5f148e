//! Dial Configuration - The Declarative Clock Face
//!
//! Every section is always present. Sections are merged, never replaced,
//! so a partial document deserializes onto the defaults below.

use serde::{Deserialize, Serialize};

/// Section names accepted by the store's patch interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Canvas,
    Background,
    MajorScales,
    MinorScales,
    Numbers,
    Center,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Canvas,
        Section::Background,
        Section::MajorScales,
        Section::MinorScales,
        Section::Numbers,
        Section::Center,
    ];

    /// JSON key of the section inside a configuration document
    pub fn key(self) -> &'static str {
        match self {
            Section::Canvas => "canvas",
            Section::Background => "background",
            Section::MajorScales => "majorScales",
            Section::MinorScales => "minorScales",
            Section::Numbers => "numbers",
            Section::Center => "center",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialConfiguration {
    pub canvas: CanvasConfig,
    pub background: BackgroundConfig,
    pub major_scales: MajorScalesConfig,
    pub minor_scales: MinorScalesConfig,
    pub numbers: NumbersConfig,
    pub center: CenterConfig,
}

// --- Canvas ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub dpi: u32,
    pub background_color: String,
    pub transparent: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 800.0,
            dpi: 72,
            background_color: "#ffffff".to_string(),
            transparent: false,
        }
    }
}

// --- Background ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    #[default]
    Solid,
    Gradient,
    Image,
    Pattern,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    Linear,
    #[default]
    Radial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    None,
    Grid,
    Dots,
    Lines,
}

/// Background section.
///
/// Inactive variants keep their last values so toggling `kind` back restores
/// them. Rendering must go through [`BackgroundConfig::active`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundConfig {
    pub kind: BackgroundKind,
    pub color: String,
    pub gradient: GradientConfig,
    pub image: ImageConfig,
    pub pattern: PatternConfig,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Solid,
            color: "#f8fafc".to_string(),
            gradient: GradientConfig::default(),
            image: ImageConfig::default(),
            pattern: PatternConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradientConfig {
    pub kind: GradientKind,
    pub colors: Vec<String>,
    pub angle: f64,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            kind: GradientKind::Radial,
            colors: vec!["#ffffff".to_string(), "#e2e8f0".to_string()],
            angle: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfig {
    pub url: String,
    pub opacity: f64,
    pub scale: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            opacity: 1.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatternConfig {
    pub kind: PatternKind,
    pub color: String,
    pub size: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            kind: PatternKind::None,
            color: "#cbd5e1".to_string(),
            size: 10.0,
        }
    }
}

/// Borrowed view of the one background variant that is in effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveBackground<'a> {
    Solid { color: &'a str },
    Gradient { fallback: &'a str, gradient: &'a GradientConfig },
    Image { fallback: &'a str, image: &'a ImageConfig },
    Pattern { fallback: &'a str, pattern: &'a PatternConfig },
}

impl BackgroundConfig {
    pub fn active(&self) -> ActiveBackground<'_> {
        let fallback = self.color.as_str();
        match self.kind {
            BackgroundKind::Solid => ActiveBackground::Solid { color: fallback },
            BackgroundKind::Gradient => ActiveBackground::Gradient {
                fallback,
                gradient: &self.gradient,
            },
            BackgroundKind::Image => ActiveBackground::Image {
                fallback,
                image: &self.image,
            },
            BackgroundKind::Pattern => ActiveBackground::Pattern {
                fallback,
                pattern: &self.pattern,
            },
        }
    }
}

// --- Scales ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MajorShape {
    #[default]
    Line,
    Triangle,
    Circle,
    Rectangle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Inside,
    #[default]
    Outside,
    Center,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinorShape {
    #[default]
    Line,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MajorScalesConfig {
    pub visible: bool,
    /// Angular period shared by major ticks and numerals
    pub count: i64,
    pub length: f64,
    pub stroke_width: f64,
    pub color: String,
    pub shape: MajorShape,
    pub placement: Placement,
    /// Degrees, clockwise
    pub rotation_offset: f64,
}

impl Default for MajorScalesConfig {
    fn default() -> Self {
        Self {
            visible: true,
            count: 12,
            length: 30.0,
            stroke_width: 3.0,
            color: "#334155".to_string(),
            shape: MajorShape::Line,
            placement: Placement::Outside,
            rotation_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinorScalesConfig {
    pub visible: bool,
    /// Ticks per full revolution
    pub count: i64,
    pub length: f64,
    pub stroke_width: f64,
    pub color: String,
    pub shape: MinorShape,
}

impl Default for MinorScalesConfig {
    fn default() -> Self {
        Self {
            visible: true,
            count: 60,
            length: 15.0,
            stroke_width: 1.0,
            color: "#94a3b8".to_string(),
            shape: MinorShape::Line,
        }
    }
}

// --- Numbers ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumeralStyle {
    #[default]
    Arabic,
    Roman,
    Chinese,
    None,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    #[default]
    Radial,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumbersConfig {
    pub visible: bool,
    pub style: NumeralStyle,
    pub font_family: String,
    pub font_size: f64,
    pub color: String,
    pub rotation_mode: RotationMode,
    /// Fraction of the dial radius, 0..=1
    pub radius_ratio: f64,
    pub custom_texts: Vec<String>,
}

impl Default for NumbersConfig {
    fn default() -> Self {
        Self {
            visible: true,
            style: NumeralStyle::Arabic,
            font_family: "Arial, sans-serif".to_string(),
            font_size: 36.0,
            color: "#1e293b".to_string(),
            rotation_mode: RotationMode::Radial,
            radius_ratio: 0.75,
            custom_texts: (1..=12).map(|i| i.to_string()).collect(),
        }
    }
}

// --- Center ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterStyle {
    #[default]
    Circle,
    Decorative,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CenterConfig {
    pub visible: bool,
    pub size: f64,
    pub color: String,
    pub style: CenterStyle,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            visible: true,
            size: 10.0,
            color: "#dc2626".to_string(),
            style: CenterStyle::Circle,
        }
    }
}
