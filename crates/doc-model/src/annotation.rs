//! Annotation data model
//!
//! Annotations are user-added marks (text, images, shapes, freehand ink,
//! whiteout covers, links, form symbols). Every variant carries only the
//! fields it needs; geometry is stored in page-local PDF-space.

use crate::geometry::{PdfPoint, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unique identifier for an annotation
///
/// Generated using UUID v4 for guaranteed uniqueness.
pub type AnnotationId = uuid::Uuid;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized RGBA values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 128, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const NAVY: Color = Color { r: 0, g: 0, b: 128, a: 255 };
    pub const GRAY: Color = Color { r: 128, g: 128, b: 128, a: 255 };

    /// Fixed palette offered by the style toolbar
    pub const PALETTE: [Color; 8] = [
        Color::BLACK,
        Color::GRAY,
        Color::RED,
        Color::GREEN,
        Color::BLUE,
        Color::NAVY,
        Color::YELLOW,
        Color::WHITE,
    ];
}

/// Styling for text-bearing elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Requested family keyword ("Helvetica", "Times", "Courier", ...)
    pub font_family: String,
    /// Font size in points
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    pub color: Color,
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_size: f32, color: Color) -> Self {
        Self { font_family: font_family.into(), font_size, bold: false, italic: false, color }
    }

    /// Infer a style from an embedded font base name such as "ABCDEF+Times-BoldItalic"
    pub fn infer_from_font_name(name: Option<&str>, font_size: f32) -> Self {
        let lower = name.unwrap_or_default().to_lowercase();
        let family = if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            "Times"
        } else if lower.contains("courier") || lower.contains("mono") {
            "Courier"
        } else {
            "Helvetica"
        };

        Self {
            font_family: family.to_string(),
            font_size,
            bold: lower.contains("bold") || lower.contains("black") || lower.contains("heavy"),
            italic: lower.contains("italic") || lower.contains("oblique"),
            color: Color::BLACK,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new("Helvetica", 12.0, Color::BLACK)
    }
}

/// Stroke for shapes, lines and freehand ink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    /// Stroke width in points
    pub width: f32,
}

impl Stroke {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new(Color::BLACK, 2.0)
    }
}

/// Variant-specific annotation content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnnotationKind {
    /// Free text placed by the user
    Text { content: String, style: TextStyle },

    /// Embedded raster image
    Image {
        /// `data:<mime>;base64,<payload>` URL
        data_url: Arc<str>,
        pixel_width: u32,
        pixel_height: u32,
    },

    /// Opaque white cover rectangle
    Whiteout,

    /// Freehand ink (pen and signature tools)
    FreehandPath { points: Vec<PdfPoint>, stroke: Stroke },

    /// Translucent freehand marker
    Highlight { points: Vec<PdfPoint>, stroke: Stroke, opacity: f32 },

    /// Clickable region with a visible label
    Link { url: String, label: String, style: TextStyle },

    /// Stroked rectangle, no fill
    Rectangle { stroke: Stroke },

    /// Stroked ellipse inscribed in the annotation rectangle, no fill
    Circle { stroke: Stroke },

    /// Straight line between the first and last point
    Line { points: Vec<PdfPoint>, stroke: Stroke },

    /// Form check mark symbol
    Checkmark { color: Color },

    /// Form cross symbol
    Cross { color: Color },
}

impl AnnotationKind {
    /// Short stable name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Text { .. } => "text",
            AnnotationKind::Image { .. } => "image",
            AnnotationKind::Whiteout => "whiteout",
            AnnotationKind::FreehandPath { .. } => "freehandPath",
            AnnotationKind::Highlight { .. } => "highlight",
            AnnotationKind::Link { .. } => "link",
            AnnotationKind::Rectangle { .. } => "rectangle",
            AnnotationKind::Circle { .. } => "circle",
            AnnotationKind::Line { .. } => "line",
            AnnotationKind::Checkmark { .. } => "checkmark",
            AnnotationKind::Cross { .. } => "cross",
        }
    }
}

/// A user-added mark on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Bounding rectangle in PDF-space
    pub rect: Rect,
    /// Clockwise rotation in degrees about the rectangle center
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    pub kind: AnnotationKind,
}

impl Annotation {
    /// Create a new annotation with a generated ID
    pub fn new(rect: Rect, kind: AnnotationKind) -> Self {
        Self { id: AnnotationId::new_v4(), rect, rotation: None, kind }
    }

    /// Create an ink-style annotation whose rectangle is the bounding box of its points
    pub fn from_points(kind: AnnotationKind) -> Self {
        let rect = kind.points().and_then(Rect::bounding).unwrap_or_default();
        Self::new(rect, kind)
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the annotation carries editable text
    pub fn is_text(&self) -> bool {
        matches!(self.kind, AnnotationKind::Text { .. } | AnnotationKind::Link { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Text { content, .. } => Some(content),
            AnnotationKind::Link { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Replace the text content; returns false for variants without text
    pub fn set_text(&mut self, text: &str) -> bool {
        match &mut self.kind {
            AnnotationKind::Text { content, .. } => *content = text.to_string(),
            AnnotationKind::Link { label, .. } => *label = text.to_string(),
            _ => return false,
        }
        true
    }

    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.kind {
            AnnotationKind::Text { style, .. } | AnnotationKind::Link { style, .. } => Some(style),
            _ => None,
        }
    }

    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match &mut self.kind {
            AnnotationKind::Text { style, .. } | AnnotationKind::Link { style, .. } => Some(style),
            _ => None,
        }
    }

    pub fn stroke_mut(&mut self) -> Option<&mut Stroke> {
        match &mut self.kind {
            AnnotationKind::FreehandPath { stroke, .. }
            | AnnotationKind::Highlight { stroke, .. }
            | AnnotationKind::Rectangle { stroke }
            | AnnotationKind::Circle { stroke }
            | AnnotationKind::Line { stroke, .. } => Some(stroke),
            _ => None,
        }
    }

    /// Apply a color to whichever color field the variant has
    pub fn set_color(&mut self, color: Color) -> bool {
        if let Some(style) = self.text_style_mut() {
            style.color = color;
            return true;
        }
        if let Some(stroke) = self.stroke_mut() {
            stroke.color = color;
            return true;
        }
        match &mut self.kind {
            AnnotationKind::Checkmark { color: symbol } | AnnotationKind::Cross { color: symbol } => {
                *symbol = color;
                true
            }
            _ => false,
        }
    }

    /// Move the annotation and all of its points
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.rect = self.rect.translate(dx, dy);
        if let Some(points) = self.kind.points_mut() {
            for point in points.iter_mut() {
                point.x += dx;
                point.y += dy;
            }
        }
    }

    /// Copy of this annotation with a fresh ID, offset by `(dx, dy)`
    pub fn duplicate(&self, dx: f32, dy: f32) -> Self {
        let mut copy = self.clone();
        copy.id = AnnotationId::new_v4();
        copy.translate(dx, dy);
        copy
    }

    /// Check if a point hits this annotation (for selection)
    pub fn hit_test(&self, point: &PdfPoint, tolerance: f32) -> bool {
        match &self.kind {
            AnnotationKind::FreehandPath { points, stroke }
            | AnnotationKind::Highlight { points, stroke, .. }
            | AnnotationKind::Line { points, stroke } => {
                let reach = tolerance + stroke.width / 2.0;
                if points.len() == 1 {
                    return point.distance_to(&points[0]) <= reach;
                }
                points
                    .windows(2)
                    .any(|segment| point_near_line_segment(point, &segment[0], &segment[1], reach))
            }
            _ => self.rect.contains(point, tolerance),
        }
    }
}

impl AnnotationKind {
    pub fn points(&self) -> Option<&[PdfPoint]> {
        match self {
            AnnotationKind::FreehandPath { points, .. }
            | AnnotationKind::Highlight { points, .. }
            | AnnotationKind::Line { points, .. } => Some(points),
            _ => None,
        }
    }

    fn points_mut(&mut self) -> Option<&mut Vec<PdfPoint>> {
        match self {
            AnnotationKind::FreehandPath { points, .. }
            | AnnotationKind::Highlight { points, .. }
            | AnnotationKind::Line { points, .. } => Some(points),
            _ => None,
        }
    }
}

/// Helper function for point-to-line-segment distance check
fn point_near_line_segment(
    point: &PdfPoint,
    start: &PdfPoint,
    end: &PdfPoint,
    tolerance: f32,
) -> bool {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-6 {
        return point.distance_to(start) <= tolerance;
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let t = t.clamp(0.0, 1.0);

    let closest = PdfPoint::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest) <= tolerance
}
