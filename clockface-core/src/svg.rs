//! Vector Writer - Scene to SVG
//!
//! Output is a pure function of the scene: numbers are printed with fixed
//! precision and gradient ids are numbered in paint order, so an unchanged
//! scene always produces identical bytes.

use std::fmt::{self, Write};

use crate::color::{self, Rgba};
use crate::images::ImageStore;
use crate::scene::{GradientStop, Paint, Primitive, Scene, StrokeStyle};

/// Serialize `scene` as a standalone SVG document at its logical size.
pub fn write_svg(scene: &Scene, images: &dyn ImageStore) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let (w, h) = (num(scene.width), num(scene.height));

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    )?;

    let gradients = write_defs(&mut out, scene)?;
    let mut next_gradient = gradients.iter();

    if let Some(backdrop) = &scene.backdrop {
        writeln!(
            out,
            r#"  <rect x="0" y="0" width="{w}" height="{h}"{}/>"#,
            fill_attr(backdrop)
        )?;
    }

    for primitive in scene.primitives() {
        match primitive {
            Primitive::Rect { x, y, width, height, fill } => {
                let fill = paint_attr(fill, &mut next_gradient);
                writeln!(
                    out,
                    r#"  <rect x="{}" y="{}" width="{}" height="{}"{}/>"#,
                    num(*x),
                    num(*y),
                    num(*width),
                    num(*height),
                    fill
                )?;
            }
            Primitive::Line { from, to, stroke } => {
                writeln!(
                    out,
                    r#"  <line x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
                    num(from.x),
                    num(from.y),
                    num(to.x),
                    num(to.y),
                    stroke_attr(stroke)
                )?;
            }
            Primitive::Circle { center, radius, fill, stroke } => {
                let fill = match fill {
                    Some(fill) => paint_attr(fill, &mut next_gradient),
                    None => r#" fill="none""#.to_string(),
                };
                let stroke = stroke.as_ref().map(stroke_attr).unwrap_or_default();
                writeln!(
                    out,
                    r#"  <circle cx="{}" cy="{}" r="{}"{}{}/>"#,
                    num(center.x),
                    num(center.y),
                    num(*radius),
                    fill,
                    stroke
                )?;
            }
            Primitive::Polygon { points, fill } => {
                let points: Vec<String> = points
                    .iter()
                    .map(|p| format!("{},{}", num(p.x), num(p.y)))
                    .collect();
                let fill = paint_attr(fill, &mut next_gradient);
                writeln!(out, r#"  <polygon points="{}"{}/>"#, points.join(" "), fill)?;
            }
            Primitive::Text {
                position,
                text,
                font_family,
                font_size,
                color: css,
                rotation,
            } => {
                let (x, y) = (num(position.x), num(position.y));
                let transform = if *rotation == 0.0 {
                    String::new()
                } else {
                    format!(r#" transform="rotate({} {} {})""#, num(*rotation), x, y)
                };
                writeln!(
                    out,
                    r#"  <text x="{x}" y="{y}" font-family="{}" font-size="{}"{} text-anchor="middle" dominant-baseline="central"{}>{}</text>"#,
                    escape(font_family),
                    num(*font_size),
                    fill_attr(css),
                    transform,
                    escape(text)
                )?;
            }
            Primitive::Image {
                href,
                x,
                y,
                width,
                height,
                opacity,
            } => {
                // Embed loaded bytes so the file stands alone
                let source = images
                    .resolve(href)
                    .map(|image| image.data_uri())
                    .unwrap_or_else(|| href.clone());
                writeln!(
                    out,
                    r#"  <image href="{}" x="{}" y="{}" width="{}" height="{}" opacity="{}" preserveAspectRatio="none"/>"#,
                    escape(&source),
                    num(*x),
                    num(*y),
                    num(*width),
                    num(*height),
                    num(*opacity)
                )?;
            }
        }
    }

    writeln!(out, "</svg>")?;
    Ok(out)
}

/// Emit `<defs>` for every gradient in paint order; returns their ids.
fn write_defs(out: &mut String, scene: &Scene) -> Result<Vec<String>, fmt::Error> {
    let gradients: Vec<&Paint> = scene
        .primitives()
        .filter_map(|p| match p {
            Primitive::Rect { fill, .. } | Primitive::Polygon { fill, .. } => Some(fill),
            Primitive::Circle { fill: Some(fill), .. } => Some(fill),
            _ => None,
        })
        .filter(|fill| !matches!(fill, Paint::Solid { .. }))
        .collect();

    if gradients.is_empty() {
        return Ok(vec![]);
    }

    let mut ids = vec![];
    writeln!(out, "  <defs>")?;
    for (i, paint) in gradients.into_iter().enumerate() {
        let id = format!("gradient-{}", i);
        match paint {
            Paint::LinearGradient { start, end, stops } => {
                writeln!(
                    out,
                    r#"    <linearGradient id="{id}" gradientUnits="userSpaceOnUse" x1="{}" y1="{}" x2="{}" y2="{}">"#,
                    num(start.x),
                    num(start.y),
                    num(end.x),
                    num(end.y)
                )?;
                write_stops(out, stops)?;
                writeln!(out, "    </linearGradient>")?;
            }
            Paint::RadialGradient { center, radius, stops } => {
                writeln!(
                    out,
                    r#"    <radialGradient id="{id}" gradientUnits="userSpaceOnUse" cx="{}" cy="{}" r="{}">"#,
                    num(center.x),
                    num(center.y),
                    num(*radius)
                )?;
                write_stops(out, stops)?;
                writeln!(out, "    </radialGradient>")?;
            }
            Paint::Solid { .. } => continue,
        }
        ids.push(id);
    }
    writeln!(out, "  </defs>")?;
    Ok(ids)
}

fn write_stops(out: &mut String, stops: &[GradientStop]) -> fmt::Result {
    for stop in stops {
        let c = color::parse_or(&stop.color, Rgba::BLACK);
        let opacity = if c.a < 255 {
            format!(r#" stop-opacity="{}""#, num(c.opacity()))
        } else {
            String::new()
        };
        writeln!(
            out,
            r#"      <stop offset="{}" stop-color="{}"{}/>"#,
            num(stop.offset),
            c.hex(),
            opacity
        )?;
    }
    Ok(())
}

/// Fill attribute for a paint; gradients take the next id in paint order.
fn paint_attr<'a>(paint: &Paint, ids: &mut impl Iterator<Item = &'a String>) -> String {
    match paint {
        Paint::Solid { color: css } => fill_attr(css),
        _ => match ids.next() {
            Some(id) => format!(r#" fill="url(#{})""#, id),
            None => r#" fill="none""#.to_string(),
        },
    }
}

fn fill_attr(css: &str) -> String {
    let c = color::parse_or(css, Rgba::BLACK);
    if c.a < 255 {
        format!(r#" fill="{}" fill-opacity="{}""#, c.hex(), num(c.opacity()))
    } else {
        format!(r#" fill="{}""#, c.hex())
    }
}

fn stroke_attr(stroke: &StrokeStyle) -> String {
    let c = color::parse_or(&stroke.color, Rgba::BLACK);
    let mut attr = format!(r#" stroke="{}" stroke-width="{}""#, c.hex(), num(stroke.width));
    if c.a < 255 {
        attr.push_str(&format!(r#" stroke-opacity="{}""#, num(c.opacity())));
    }
    if !stroke.dash.is_empty() {
        let dash: Vec<String> = stroke.dash.iter().map(|d| num(*d)).collect();
        attr.push_str(&format!(r#" stroke-dasharray="{}""#, dash.join(" ")));
    }
    attr
}

/// Fixed three-decimal formatting with trailing zeros trimmed.
fn num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
