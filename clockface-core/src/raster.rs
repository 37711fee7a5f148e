//! Raster Writer - Scene to Pixels
//!
//! Draws a scene into a tiny-skia pixmap scaled by the print resolution.
//! Text is outlined with rusttype and filled as paths so it rotates and
//! scales with everything else.

use rusttype::{point as rt_point, OutlineBuilder, Scale};
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, GradientStop as SkStop, LinearGradient, Paint as SkPaint,
    Path, PathBuilder, Pixmap, PixmapPaint, Point as SkPoint, RadialGradient, Rect, SpreadMode, Stroke,
    StrokeDash, Transform,
};
use thiserror::Error;
use tracing::warn;

use crate::color::{self, Rgba};
use crate::fonts;
use crate::geometry::Point;
use crate::images::{ImageStore, LoadedImage};
use crate::print::PrintSpec;
use crate::scene::{GradientStop, Paint, Primitive, Scene, StrokeStyle};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Requested surface is empty or too large to allocate
    #[error("Cannot allocate a {0}x{1} surface")]
    Surface(u32, u32),
}

/// Rasterize `scene` at the resolution in `spec`.
pub fn rasterize(scene: &Scene, images: &dyn ImageStore, spec: &PrintSpec) -> Result<Pixmap, RasterError> {
    let (width, height) = spec.pixel_size(scene.width, scene.height);
    if !PrintSpec::fits(width, height) {
        return Err(RasterError::Surface(width, height));
    }
    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Surface(width, height))?;

    let scale = spec.scale() as f32;
    let base = Transform::from_scale(scale, scale);

    if let Some(backdrop) = &scene.backdrop {
        pixmap.fill(sk_color(color::parse_or(backdrop, Rgba::TRANSPARENT)));
    }

    for primitive in scene.primitives() {
        draw(&mut pixmap, primitive, images, base);
    }
    Ok(pixmap)
}

fn draw(pixmap: &mut Pixmap, primitive: &Primitive, images: &dyn ImageStore, base: Transform) {
    match primitive {
        Primitive::Rect { x, y, width, height, fill } => {
            let Some(rect) = Rect::from_xywh(*x as f32, *y as f32, *width as f32, *height as f32) else {
                return;
            };
            let path = PathBuilder::from_rect(rect);
            fill_path(pixmap, &path, fill, base);
        }
        Primitive::Line { from, to, stroke } => {
            let mut pb = PathBuilder::new();
            pb.move_to(from.x as f32, from.y as f32);
            pb.line_to(to.x as f32, to.y as f32);
            if let Some(path) = pb.finish() {
                stroke_path(pixmap, &path, stroke, base);
            }
        }
        Primitive::Circle { center, radius, fill, stroke } => {
            let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, *radius as f32) else {
                return;
            };
            if let Some(fill) = fill {
                fill_path(pixmap, &path, fill, base);
            }
            if let Some(stroke) = stroke {
                stroke_path(pixmap, &path, stroke, base);
            }
        }
        Primitive::Polygon { points, fill } => {
            let mut pb = PathBuilder::new();
            for (i, p) in points.iter().enumerate() {
                if i == 0 {
                    pb.move_to(p.x as f32, p.y as f32);
                } else {
                    pb.line_to(p.x as f32, p.y as f32);
                }
            }
            pb.close();
            if let Some(path) = pb.finish() {
                fill_path(pixmap, &path, fill, base);
            }
        }
        Primitive::Text {
            position,
            text,
            font_family,
            font_size,
            color,
            rotation,
        } => {
            let Some(font) = fonts::font_for(font_family) else {
                warn!(font_family = %font_family, text = %text, "bundled font unusable, text skipped");
                return;
            };
            let Some(path) = text_path(font, text, *font_size as f32) else {
                return;
            };
            let transform = base
                .pre_translate(position.x as f32, position.y as f32)
                .pre_rotate(*rotation as f32);
            fill_path(pixmap, &path, &Paint::solid(color.as_str()), transform);
        }
        Primitive::Image {
            href,
            x,
            y,
            width,
            height,
            opacity,
        } => {
            let Some(image) = images.resolve(href) else {
                warn!(href = %href, "image not loaded, skipped");
                return;
            };
            draw_image(pixmap, image, (*x, *y, *width, *height), *opacity, base);
        }
    }
}

fn fill_path(pixmap: &mut Pixmap, path: &Path, fill: &Paint, transform: Transform) {
    let Some(paint) = sk_paint(fill) else {
        return;
    };
    pixmap.fill_path(path, &paint, FillRule::Winding, transform, None);
}

fn stroke_path(pixmap: &mut Pixmap, path: &Path, style: &StrokeStyle, transform: Transform) {
    if style.width <= 0.0 {
        return;
    }
    let mut paint = SkPaint::default();
    paint.set_color(sk_color(color::parse_or(&style.color, Rgba::BLACK)));
    paint.anti_alias = true;

    let dash = if style.dash.is_empty() {
        None
    } else {
        StrokeDash::new(style.dash.iter().map(|d| *d as f32).collect(), 0.0)
    };
    let stroke = Stroke {
        width: style.width as f32,
        dash,
        ..Default::default()
    };
    pixmap.stroke_path(path, &paint, &stroke, transform, None);
}

fn sk_paint(fill: &Paint) -> Option<SkPaint<'static>> {
    let mut paint = SkPaint::default();
    paint.anti_alias = true;
    match fill {
        Paint::Solid { color: css } => {
            paint.set_color(sk_color(color::parse_or(css, Rgba::BLACK)));
        }
        Paint::LinearGradient { start, end, stops } => {
            paint.shader = LinearGradient::new(
                sk_point(start),
                sk_point(end),
                sk_stops(stops),
                SpreadMode::Pad,
                Transform::identity(),
            )?;
        }
        Paint::RadialGradient { center, radius, stops } => {
            paint.shader = RadialGradient::new(
                sk_point(center),
                sk_point(center),
                *radius as f32,
                sk_stops(stops),
                SpreadMode::Pad,
                Transform::identity(),
            )?;
        }
    }
    Some(paint)
}

fn draw_image(
    pixmap: &mut Pixmap,
    image: &LoadedImage,
    (x, y, width, height): (f64, f64, f64, f64),
    opacity: f64,
    base: Transform,
) {
    let Some(source) = to_pixmap(image) else {
        return;
    };
    let sx = width as f32 / source.width() as f32;
    let sy = height as f32 / source.height() as f32;
    let transform = base.pre_translate(x as f32, y as f32).pre_scale(sx, sy);
    let paint = PixmapPaint {
        opacity: opacity as f32,
        quality: FilterQuality::Bicubic,
        ..Default::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
}

fn to_pixmap(image: &LoadedImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Glyph outlines of `text` centered on the origin.
fn text_path(font: &rusttype::Font<'static>, text: &str, size: f32) -> Option<Path> {
    let scale = Scale::uniform(size);
    let v_metrics = font.v_metrics(scale);

    let width = font
        .layout(text, scale, rt_point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);
    // descent is negative; this puts the middle of the line box on y = 0
    let baseline = (v_metrics.ascent + v_metrics.descent) / 2.0;

    let mut builder = GlyphPathBuilder(PathBuilder::new());
    for glyph in font.layout(text, scale, rt_point(-width / 2.0, baseline)) {
        glyph.build_outline(&mut builder);
    }
    builder.0.finish()
}

struct GlyphPathBuilder(PathBuilder);

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

fn sk_color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn sk_point(p: &Point) -> SkPoint {
    SkPoint::from_xy(p.x as f32, p.y as f32)
}

fn sk_stops(stops: &[GradientStop]) -> Vec<SkStop> {
    stops
        .iter()
        .map(|s| SkStop::new(s.offset as f32, sk_color(color::parse_or(&s.color, Rgba::BLACK))))
        .collect()
}
