//! Page coordinate spaces and the transforms between them
//!
//! Two spaces are used throughout the editor:
//! - PDF-space: origin at the bottom-left of the unrotated page box, y up,
//!   units in points (1/72 inch). Everything stored in the model uses it.
//! - View-space: origin at the top-left of the displayed page, y down,
//!   units in pixels (points multiplied by the page zoom), page rotation
//!   already applied.

use serde::{Deserialize, Serialize};

/// Width of a synthetic blank page in points (US Letter)
pub const BLANK_PAGE_WIDTH: f32 = 612.0;

/// Height of a synthetic blank page in points (US Letter)
pub const BLANK_PAGE_HEIGHT: f32 = 792.0;

/// Point in PDF-space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f32,
    pub y: f32,
}

impl PdfPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &PdfPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Point in view-space, relative to the displayed page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

impl ViewPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in PDF-space, anchored at its bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two arbitrary corners
    pub fn from_corners(a: PdfPoint, b: PdfPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Bounding box of a point list, `None` when the list is empty
    pub fn bounding(points: &[PdfPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in points.iter().skip(1) {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> PdfPoint {
        PdfPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point lies inside the rectangle grown by `tolerance`
    pub fn contains(&self, point: &PdfPoint, tolerance: f32) -> bool {
        point.x >= self.x - tolerance
            && point.x <= self.right() + tolerance
            && point.y >= self.y - tolerance
            && point.y <= self.top() + tolerance
    }

    /// Check if `other` lies entirely inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }

    /// Grow the rectangle by `dx` on the left/right and `dy` on the bottom/top
    pub fn expand(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x - dx, self.y - dy, self.width + 2.0 * dx, self.height + 2.0 * dy)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Rectangle in view-space, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Page rotation, always one of 0, 90, 180 or 270 degrees clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);
    pub const CLOCKWISE_90: Rotation = Rotation(90);
    pub const HALF: Rotation = Rotation(180);
    pub const CLOCKWISE_270: Rotation = Rotation(270);

    /// Normalize any angle to the nearest quarter turn in `[0, 360)`
    pub fn from_degrees(degrees: i32) -> Self {
        let quarters = (degrees as f32 / 90.0).round() as i32;
        Self((quarters.rem_euclid(4) * 90) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Compose two rotations
    pub fn add(self, other: Rotation) -> Self {
        Self::from_degrees(self.0 as i32 + other.0 as i32)
    }

    /// Whether width and height swap when displayed
    pub fn is_quarter_turn(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl From<i32> for Rotation {
    fn from(value: i32) -> Self {
        Self::from_degrees(value)
    }
}

impl From<Rotation> for i32 {
    fn from(value: Rotation) -> Self {
        value.0 as i32
    }
}

/// Unrotated page box captured from the source document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Width of the media box in points
    pub width: f32,
    /// Height of the media box in points
    pub height: f32,
    /// Lower-left corner of the media box in document units
    #[serde(default)]
    pub origin_x: f32,
    #[serde(default)]
    pub origin_y: f32,
    /// Rotation the source page already carries
    #[serde(default)]
    pub rotation: Rotation,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height, origin_x: 0.0, origin_y: 0.0, rotation: Rotation::NONE }
    }

    /// Geometry of a synthetic blank page
    pub fn blank() -> Self {
        Self::new(BLANK_PAGE_WIDTH, BLANK_PAGE_HEIGHT)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::blank()
    }
}

/// Conversion between PDF-space and view-space for one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    width: f32,
    height: f32,
    rotation: Rotation,
    zoom: f32,
}

impl PageTransform {
    /// Create a transform for an unrotated page box of `width` x `height`
    ///
    /// A zoom that is not a positive finite number is treated as 1.0.
    pub fn new(width: f32, height: f32, rotation: Rotation, zoom: f32) -> Self {
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        Self { width, height, rotation, zoom }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Displayed page size in view pixels
    pub fn view_size(&self) -> (f32, f32) {
        if self.rotation.is_quarter_turn() {
            (self.height * self.zoom, self.width * self.zoom)
        } else {
            (self.width * self.zoom, self.height * self.zoom)
        }
    }

    pub fn pdf_to_view(&self, point: PdfPoint) -> ViewPoint {
        let (w, h) = (self.width, self.height);
        let (dx, dy) = match self.rotation.degrees() {
            90 => (point.y, point.x),
            180 => (w - point.x, point.y),
            270 => (h - point.y, w - point.x),
            _ => (point.x, h - point.y),
        };
        ViewPoint::new(dx * self.zoom, dy * self.zoom)
    }

    pub fn view_to_pdf(&self, point: ViewPoint) -> PdfPoint {
        let (w, h) = (self.width, self.height);
        let dx = point.x / self.zoom;
        let dy = point.y / self.zoom;
        match self.rotation.degrees() {
            90 => PdfPoint::new(dy, dx),
            180 => PdfPoint::new(w - dx, dy),
            270 => PdfPoint::new(w - dy, h - dx),
            _ => PdfPoint::new(dx, h - dy),
        }
    }

    /// Convert a stored rectangle to its on-screen box
    ///
    /// For an unrotated page this is `viewY = (pageHeight - y - height) * zoom`.
    pub fn pdf_rect_to_view(&self, rect: Rect) -> ViewRect {
        let a = self.pdf_to_view(PdfPoint::new(rect.x, rect.y));
        let b = self.pdf_to_view(PdfPoint::new(rect.right(), rect.top()));
        ViewRect {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn view_rect_to_pdf(&self, rect: ViewRect) -> Rect {
        let a = self.view_to_pdf(ViewPoint::new(rect.x, rect.y));
        let b = self.view_to_pdf(ViewPoint::new(rect.x + rect.width, rect.y + rect.height));
        Rect::from_corners(a, b)
    }

    /// Convert a view-space length (e.g. a stroke width) to points
    pub fn view_length_to_pdf(&self, length: f32) -> f32 {
        length / self.zoom
    }
}
