//! Scene - Ordered Drawing Primitives
//!
//! A scene is everything a presentation layer or exporter needs: all geometry
//! is resolved to canvas coordinates and all style is explicit.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Draw layer of a primitive. Declaration order is paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layer {
    Background,
    MinorScales,
    MajorScales,
    Numerals,
    Center,
    Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Paint {
    Solid {
        color: String,
    },
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
    },
    RadialGradient {
        center: Point,
        radius: f64,
        stops: Vec<GradientStop>,
    },
}

impl Paint {
    pub fn solid(color: impl Into<String>) -> Self {
        Paint::Solid {
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dash: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum Primitive {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Paint,
    },
    Line {
        from: Point,
        to: Point,
        stroke: StrokeStyle,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Paint>,
        stroke: Option<StrokeStyle>,
    },
    Polygon {
        points: Vec<Point>,
        fill: Paint,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        /// Center of the text box
        position: Point,
        text: String,
        font_family: String,
        font_size: f64,
        color: String,
        /// Degrees clockwise around `position`
        rotation: f64,
    },
    Image {
        /// Source reference, resolved through an image store at export time
        href: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        opacity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub layer: Layer,
    pub primitive: Primitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    /// Painted under everything unless the canvas is transparent
    pub backdrop: Option<String>,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn new(width: f64, height: f64, backdrop: Option<String>) -> Self {
        Self {
            width,
            height,
            backdrop,
            elements: vec![],
        }
    }

    pub fn push(&mut self, layer: Layer, primitive: Primitive) {
        self.elements.push(Element { layer, primitive });
    }

    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Primitive> {
        self.elements
            .iter()
            .filter(move |e| e.layer == layer)
            .map(|e| &e.primitive)
    }

    pub fn count(&self, layer: Layer) -> usize {
        self.layer(layer).count()
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.elements.iter().map(|e| &e.primitive)
    }
}
