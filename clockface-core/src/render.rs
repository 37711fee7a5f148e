//! Render Pipeline - Configuration to Scene
//!
//! Paint order is fixed: background, minor scales, major scales, numerals,
//! center mark, frame ring. Minor ticks never cover major ticks or numerals.
//!
//! Rendering never fails. Degenerate values (negative lengths, zero counts,
//! non-finite numbers) are clamped so that some valid scene always comes out.

use tracing::{debug, warn};

use crate::config::{
    ActiveBackground, CenterConfig, CenterStyle, DialConfiguration, GradientConfig, GradientKind,
    MajorScalesConfig, MajorShape, MinorScalesConfig, MinorShape, NumbersConfig, NumeralStyle,
    Placement, RotationMode,
};
use crate::geometry::{dial_radius, normalize_degrees, polar_to_point, rotate_about, tick_angles, Point};
use crate::images::ImageStatus;
use crate::scene::{GradientStop, Layer, Paint, Primitive, Scene, StrokeStyle};

/// Gap between the dial radius and the decorative frame ring
pub const FRAME_GAP: f64 = 10.0;
pub const FRAME_COLOR: &str = "#e2e8f0";
pub const FRAME_WIDTH: f64 = 2.0;
pub const FRAME_DASH: [f64; 2] = [5.0, 5.0];

pub const LOADING_LABEL: &str = "Loading image...";
const LOADING_FONT_SIZE: f64 = 20.0;
const LOADING_COLOR: &str = "#666666";
const LOADING_FONT: &str = "sans-serif";

/// Direction of the canvas diagonal at gradient angle 0: top-left to bottom-right
const GRADIENT_BASE_BEARING: f64 = 135.0;

const ROMAN_NUMERALS: [&str; 12] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];
const CHINESE_NUMERALS: [&str; 12] = [
    "一", "二", "三", "四", "五", "六", "七", "八", "九", "十", "十一", "十二",
];

/// Center and radius of the dial on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dial {
    pub center: Point,
    pub radius: f64,
}

impl Dial {
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            center: Point::new(width / 2.0, height / 2.0),
            radius: dial_radius(width, height),
        }
    }

    pub fn point(&self, radius: f64, angle: f64) -> Point {
        polar_to_point(self.center.x, self.center.y, radius, angle)
    }
}

/// Text for the numeral at 0-based `index`. Empty means "draw nothing".
pub fn numeral_text(index: usize, style: NumeralStyle, custom_texts: &[String]) -> String {
    let ordinal = || (index + 1).to_string();
    match style {
        NumeralStyle::None => String::new(),
        NumeralStyle::Arabic => ordinal(),
        NumeralStyle::Roman => ROMAN_NUMERALS
            .get(index)
            .map_or_else(ordinal, |s| s.to_string()),
        NumeralStyle::Chinese => CHINESE_NUMERALS
            .get(index)
            .map_or_else(ordinal, |s| s.to_string()),
        NumeralStyle::Custom => custom_texts
            .get(index)
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(ordinal),
    }
}

/// Glyph rotation for a numeral placed at `angle`.
///
/// Radial text past 6 o'clock is turned half a revolution back. Angles a full
/// turn or more past 12 o'clock are first reduced into `[0, 360)`; anything
/// below 360 is used as given.
pub fn numeral_rotation(angle: f64, mode: RotationMode) -> f64 {
    match mode {
        RotationMode::Horizontal => 0.0,
        RotationMode::Radial => {
            let angle = if angle >= 360.0 { normalize_degrees(angle) } else { angle };
            if angle <= 180.0 {
                angle
            } else {
                angle - 180.0
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderPipeline;

impl RenderPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Build the scene for `config`.
    ///
    /// `image` is the load status of `background.image.url`; it only matters
    /// while the image background is active.
    pub fn render(&self, config: &DialConfiguration, image: ImageStatus) -> Scene {
        let width = extent(config.canvas.width);
        let height = extent(config.canvas.height);
        if width != config.canvas.width || height != config.canvas.height {
            warn!(
                width = config.canvas.width,
                height = config.canvas.height,
                "canvas size clamped"
            );
        }
        let dial = Dial::for_canvas(width, height);

        let backdrop = (!config.canvas.transparent).then(|| config.canvas.background_color.clone());
        let mut scene = Scene::new(width, height, backdrop);

        self.render_background(&mut scene, config, image);
        self.render_minor_scales(&mut scene, &config.minor_scales, &dial);
        self.render_major_scales(&mut scene, &config.major_scales, &dial);
        self.render_numerals(&mut scene, &config.numbers, &config.major_scales, &dial);
        self.render_center(&mut scene, &config.center, &dial);
        self.render_frame(&mut scene, &dial);

        debug!(
            elements = scene.elements.len(),
            width, height, "scene rendered"
        );
        scene
    }

    fn render_background(&self, scene: &mut Scene, config: &DialConfiguration, image: ImageStatus) {
        let (w, h) = (scene.width, scene.height);
        let fill_rect = |fill: Paint| Primitive::Rect {
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
            fill,
        };

        match config.background.active() {
            ActiveBackground::Solid { color } => {
                scene.push(Layer::Background, fill_rect(Paint::solid(color)));
            }
            ActiveBackground::Gradient { fallback, gradient } => {
                scene.push(Layer::Background, fill_rect(gradient_paint(gradient, fallback, w, h)));
            }
            ActiveBackground::Pattern { fallback, .. } => {
                scene.push(Layer::Background, fill_rect(Paint::solid(fallback)));
            }
            ActiveBackground::Image { fallback, image: source } => match image {
                ImageStatus::Loaded if !source.url.is_empty() => {
                    scene.push(
                        Layer::Background,
                        Primitive::Image {
                            href: source.url.clone(),
                            x: 0.0,
                            y: 0.0,
                            width: w,
                            height: h,
                            opacity: unit(source.opacity),
                        },
                    );
                }
                ImageStatus::Loading if !source.url.is_empty() => {
                    scene.push(Layer::Background, fill_rect(Paint::solid(fallback)));
                    scene.push(
                        Layer::Background,
                        Primitive::Text {
                            position: Point::new(w / 2.0, h / 2.0),
                            text: LOADING_LABEL.to_string(),
                            font_family: LOADING_FONT.to_string(),
                            font_size: LOADING_FONT_SIZE,
                            color: LOADING_COLOR.to_string(),
                            rotation: 0.0,
                        },
                    );
                }
                _ => {
                    scene.push(Layer::Background, fill_rect(Paint::solid(fallback)));
                }
            },
        }
    }

    fn render_minor_scales(&self, scene: &mut Scene, cfg: &MinorScalesConfig, dial: &Dial) {
        if !cfg.visible {
            return;
        }
        let length = non_negative(cfg.length);
        let width = non_negative(cfg.stroke_width);

        // Minor ticks ignore the major rotation offset
        for angle in tick_angles(cfg.count, 0.0) {
            let outer = dial.point(dial.radius, angle);
            let inner = dial.point(dial.radius - length, angle);
            let primitive = match cfg.shape {
                MinorShape::Dot => Primitive::Circle {
                    center: inner,
                    radius: width,
                    fill: Some(Paint::solid(&cfg.color)),
                    stroke: None,
                },
                MinorShape::Line => Primitive::Line {
                    from: outer,
                    to: inner,
                    stroke: stroke(&cfg.color, width),
                },
            };
            scene.push(Layer::MinorScales, primitive);
        }
    }

    fn render_major_scales(&self, scene: &mut Scene, cfg: &MajorScalesConfig, dial: &Dial) {
        if !cfg.visible {
            return;
        }
        let length = non_negative(cfg.length);
        let width = non_negative(cfg.stroke_width);
        let offset = finite(cfg.rotation_offset);

        let placement_radius = match cfg.placement {
            Placement::Inside => dial.radius - length,
            Placement::Outside => dial.radius + length,
            Placement::Center => dial.radius,
        };

        for angle in tick_angles(cfg.count, offset) {
            let outer = dial.point(dial.radius, angle);
            let anchor = dial.point(placement_radius, angle);
            let primitive = match cfg.shape {
                MajorShape::Line => Primitive::Line {
                    from: outer,
                    to: anchor,
                    stroke: stroke(&cfg.color, width),
                },
                MajorShape::Circle => Primitive::Circle {
                    center: anchor,
                    radius: length / 2.0,
                    fill: Some(Paint::solid(&cfg.color)),
                    stroke: None,
                },
                MajorShape::Triangle => Primitive::Polygon {
                    // first vertex points along the tangent
                    points: (0..3)
                        .map(|k| {
                            polar_to_point(anchor.x, anchor.y, length / 2.0, angle + 90.0 + 120.0 * k as f64)
                        })
                        .collect(),
                    fill: Paint::solid(&cfg.color),
                },
                MajorShape::Rectangle => Primitive::Polygon {
                    points: rectangle_corners(anchor, length / 2.0, length, angle),
                    fill: Paint::solid(&cfg.color),
                },
            };
            scene.push(Layer::MajorScales, primitive);
        }
    }

    fn render_numerals(
        &self,
        scene: &mut Scene,
        cfg: &NumbersConfig,
        major: &MajorScalesConfig,
        dial: &Dial,
    ) {
        if !cfg.visible || cfg.style == NumeralStyle::None {
            return;
        }
        if !(cfg.font_size > 0.0 && cfg.font_size.is_finite()) {
            warn!(font_size = cfg.font_size, "non-positive font size, numerals skipped");
            return;
        }

        let radius = dial.radius * unit(cfg.radius_ratio);
        let offset = finite(major.rotation_offset);

        for (i, angle) in tick_angles(major.count, offset).enumerate() {
            let text = numeral_text(i, cfg.style, &cfg.custom_texts);
            if text.is_empty() {
                continue;
            }
            scene.push(
                Layer::Numerals,
                Primitive::Text {
                    position: dial.point(radius, angle),
                    text,
                    font_family: cfg.font_family.clone(),
                    font_size: cfg.font_size,
                    color: cfg.color.clone(),
                    rotation: numeral_rotation(angle, cfg.rotation_mode),
                },
            );
        }
    }

    fn render_center(&self, scene: &mut Scene, cfg: &CenterConfig, dial: &Dial) {
        if !cfg.visible || cfg.style == CenterStyle::None {
            return;
        }
        scene.push(
            Layer::Center,
            Primitive::Circle {
                center: dial.center,
                radius: non_negative(cfg.size),
                fill: Some(Paint::solid(&cfg.color)),
                stroke: None,
            },
        );
    }

    fn render_frame(&self, scene: &mut Scene, dial: &Dial) {
        scene.push(
            Layer::Frame,
            Primitive::Circle {
                center: dial.center,
                radius: dial.radius + FRAME_GAP,
                fill: None,
                stroke: Some(StrokeStyle {
                    color: FRAME_COLOR.to_string(),
                    width: FRAME_WIDTH,
                    dash: FRAME_DASH.to_vec(),
                }),
            },
        );
    }
}

fn gradient_paint(gradient: &GradientConfig, fallback: &str, width: f64, height: f64) -> Paint {
    let first = gradient.colors.first().map_or(fallback, String::as_str);
    let second = gradient.colors.get(1).map_or(first, String::as_str);
    let stops = vec![
        GradientStop {
            offset: 0.0,
            color: first.to_string(),
        },
        GradientStop {
            offset: 1.0,
            color: second.to_string(),
        },
    ];
    let (cx, cy) = (width / 2.0, height / 2.0);

    match gradient.kind {
        GradientKind::Linear => {
            let half = width.hypot(height) / 2.0;
            let bearing = GRADIENT_BASE_BEARING + finite(gradient.angle);
            Paint::LinearGradient {
                start: polar_to_point(cx, cy, half, bearing + 180.0),
                end: polar_to_point(cx, cy, half, bearing),
                stops,
            }
        }
        GradientKind::Radial => Paint::RadialGradient {
            center: Point::new(cx, cy),
            radius: width.min(height) / 2.0,
            stops,
        },
    }
}

/// Corners of a `width` × `height` rectangle centered on `center`, its long
/// axis along the tick bearing.
fn rectangle_corners(center: Point, width: f64, height: f64, angle: f64) -> Vec<Point> {
    let (hw, hh) = (width / 2.0, height / 2.0);
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
        .into_iter()
        .map(|(dx, dy)| rotate_about(Point::new(center.x + dx, center.y + dy), center, angle))
        .collect()
}

fn stroke(color: &str, width: f64) -> StrokeStyle {
    StrokeStyle {
        color: color.to_string(),
        width,
        dash: vec![],
    }
}

fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn non_negative(v: f64) -> f64 {
    finite(v).max(0.0)
}

fn extent(v: f64) -> f64 {
    non_negative(v)
}

fn unit(v: f64) -> f64 {
    finite(v).clamp(0.0, 1.0)
}
