//! Source text fragments and the edits that replace them

use crate::annotation::TextStyle;
use crate::geometry::{PdfPoint, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a text fragment extracted from a source page
///
/// Keyed by the source page (not the output position), so it survives page
/// reordering. Serialized as `p<page>-f<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FragmentId {
    pub source_page: u32,
    pub index: u32,
}

impl FragmentId {
    pub fn new(source_page: u32, index: u32) -> Self {
        Self { source_page, index }
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}-f{}", self.source_page, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fragment id {0:?}, expected p<page>-f<index>")]
pub struct ParseFragmentIdError(String);

impl FromStr for FragmentId {
    type Err = ParseFragmentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseFragmentIdError(s.to_string());
        let (page, index) = s
            .strip_prefix('p')
            .and_then(|rest| rest.split_once("-f"))
            .ok_or_else(invalid)?;

        Ok(Self {
            source_page: page.parse().map_err(|_| invalid())?,
            index: index.parse().map_err(|_| invalid())?,
        })
    }
}

impl From<FragmentId> for String {
    fn from(value: FragmentId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for FragmentId {
    type Error = ParseFragmentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Text rendering matrix `[a b c d e f]` of a fragment, font size included
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextTransform(pub [f32; 6]);

impl TextTransform {
    /// Upright transform for `font_size` text with its baseline origin at `origin`
    pub fn upright(origin: PdfPoint, font_size: f32) -> Self {
        Self([font_size, 0.0, 0.0, font_size, origin.x, origin.y])
    }

    /// Baseline origin
    pub fn origin(&self) -> PdfPoint {
        PdfPoint::new(self.0[4], self.0[5])
    }

    /// Approximate font size: the vertical scale, falling back to the horizontal one
    pub fn font_size(&self) -> f32 {
        let [a, b, c, d, _, _] = self.0;
        let vertical = c.hypot(d);
        if vertical > f32::EPSILON {
            vertical
        } else {
            a.hypot(b)
        }
    }

    /// Unit-scale orientation `[a b c d]` with the font size divided out
    pub fn orientation(&self) -> [f32; 4] {
        let [a, b, c, d, _, _] = self.0;
        let horizontal = a.hypot(b);
        let vertical = c.hypot(d);
        if horizontal <= f32::EPSILON || vertical <= f32::EPSILON {
            return [1.0, 0.0, 0.0, 1.0];
        }
        [a / horizontal, b / horizontal, c / vertical, d / vertical]
    }

    /// PDF-space position `advance` along the baseline and `rise` above it
    pub fn point_at(&self, advance: f32, rise: f32) -> PdfPoint {
        let [ux, uy, vx, vy] = self.orientation();
        let origin = self.origin();
        PdfPoint::new(origin.x + advance * ux + rise * vx, origin.y + advance * uy + rise * vy)
    }

    /// Corners of a `width` x `height` box laid along the baseline, in PDF-space
    ///
    /// Order: origin, end of baseline, top of the end, top of the origin.
    pub fn quad(&self, width: f32, height: f32) -> [PdfPoint; 4] {
        [self.point_at(0.0, 0.0), self.point_at(width, 0.0), self.point_at(width, height), self.point_at(0.0, height)]
    }

    /// Express `point` as (advance along the baseline, rise above it)
    pub fn to_text_space(&self, point: &PdfPoint) -> (f32, f32) {
        let [ux, uy, vx, vy] = self.orientation();
        let origin = self.origin();
        let (dx, dy) = (point.x - origin.x, point.y - origin.y);
        let det = ux * vy - vx * uy;
        if det.abs() <= f32::EPSILON {
            return (dx, dy);
        }
        ((dx * vy - dy * vx) / det, (ux * dy - uy * dx) / det)
    }

    /// Whether `point` falls on a `width` x `height` box laid along the baseline
    pub fn box_contains(&self, width: f32, height: f32, point: &PdfPoint, tolerance: f32) -> bool {
        let (advance, rise) = self.to_text_space(point);
        (-tolerance..=width + tolerance).contains(&advance) && (-tolerance..=height + tolerance).contains(&rise)
    }

    /// Axis-aligned bounds of a box laid along the baseline
    pub fn bounds(&self, width: f32, height: f32) -> Rect {
        self.span_bounds(0.0, width, height)
    }

    /// Axis-aligned bounds of the part of the baseline box between two advances
    pub fn span_bounds(&self, start: f32, end: f32, height: f32) -> Rect {
        let corners = [
            self.point_at(start, 0.0),
            self.point_at(end, 0.0),
            self.point_at(end, height),
            self.point_at(start, height),
        ];
        Rect::bounding(&corners).unwrap_or_default()
    }
}

/// One unit of pre-existing text on a source page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub id: FragmentId,
    pub text: String,
    pub transform: TextTransform,
    /// Advance width in points
    pub width: f32,
    /// Glyph height in points (derived font size)
    pub height: f32,
    /// Base font name from the page resources, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
}

impl TextFragment {
    pub fn new(id: FragmentId, text: impl Into<String>, transform: TextTransform, width: f32) -> Self {
        Self {
            id,
            text: text.into(),
            height: transform.font_size(),
            transform,
            width,
            font_name: None,
        }
    }

    /// Baseline origin in PDF-space
    pub fn position(&self) -> PdfPoint {
        self.transform.origin()
    }

    /// Axis-aligned bounds of the glyphs, from the baseline up to the glyph height
    pub fn bbox(&self) -> Rect {
        self.transform.bounds(self.width, self.height)
    }

    /// Hit test in the fragment's own text frame, so rotated text is hit where it is drawn
    pub fn contains(&self, point: &PdfPoint, tolerance: f32) -> bool {
        self.transform.box_contains(self.width, self.height, point, tolerance)
    }
}

/// A user substitution for one source text fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEdit {
    /// Originating fragment
    pub id: FragmentId,
    pub original_text: String,
    /// Replacement text; empty means the fragment is deleted
    pub new_text: String,
    pub transform: TextTransform,
    pub width: f32,
    pub height: f32,
    /// Requested style for the replacement
    pub style: TextStyle,
    /// Style inferred from the source fragment when the edit was created
    pub original_style: TextStyle,
    /// Freshly created and not yet committed to history
    #[serde(default)]
    pub is_new: bool,
}

impl TextEdit {
    /// Start an edit that initially reproduces `fragment` unchanged
    pub fn from_fragment(fragment: &TextFragment) -> Self {
        let style = TextStyle::infer_from_font_name(fragment.font_name.as_deref(), fragment.height);
        Self {
            id: fragment.id,
            original_text: fragment.text.clone(),
            new_text: fragment.text.clone(),
            transform: fragment.transform,
            width: fragment.width,
            height: fragment.height,
            original_style: style.clone(),
            style,
            is_new: true,
        }
    }

    pub fn position(&self) -> PdfPoint {
        self.transform.origin()
    }

    /// Axis-aligned bounds of the region occupied by the original fragment
    pub fn bbox(&self) -> Rect {
        self.transform.bounds(self.width, self.height)
    }

    pub fn contains(&self, point: &PdfPoint, tolerance: f32) -> bool {
        self.transform.box_contains(self.width, self.height, point, tolerance)
    }

    pub fn has_text_change(&self) -> bool {
        self.new_text != self.original_text
    }

    pub fn has_style_change(&self) -> bool {
        self.style != self.original_style
    }

    /// Whether saving has to repaint this fragment
    pub fn is_modified(&self) -> bool {
        self.has_text_change() || self.has_style_change()
    }

    pub fn is_deleted(&self) -> bool {
        self.new_text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> TextFragment {
        let mut fragment = TextFragment::new(
            FragmentId::new(2, 7),
            "Hello",
            TextTransform([12.0, 0.0, 0.0, 12.0, 72.0, 700.0]),
            30.0,
        );
        fragment.font_name = Some("Helvetica-Bold".to_string());
        fragment
    }

    #[test]
    fn fragment_id_round_trips_through_string() {
        let id = FragmentId::new(3, 14);
        assert_eq!(id.to_string(), "p3-f14");
        assert_eq!("p3-f14".parse::<FragmentId>(), Ok(id));
        assert!("3-14".parse::<FragmentId>().is_err());
        assert!("p3-fx".parse::<FragmentId>().is_err());
    }

    #[test]
    fn fragment_id_works_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(FragmentId::new(0, 1), 5);
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, r#"{"p0-f1":5}"#);
    }

    #[test]
    fn transform_font_size_and_orientation() {
        let rotated = TextTransform([0.0, 10.0, -10.0, 0.0, 5.0, 5.0]);
        assert!((rotated.font_size() - 10.0).abs() < 1e-5);
        assert_eq!(rotated.orientation(), [0.0, 1.0, -1.0, 0.0]);

        let degenerate = TextTransform([0.0; 6]);
        assert_eq!(degenerate.orientation(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn vertical_text_box_follows_its_orientation() {
        let vertical = TextFragment::new(
            FragmentId::new(0, 0),
            "Vertical",
            TextTransform([0.0, 12.0, -12.0, 0.0, 100.0, 100.0]),
            48.0,
        );

        assert_eq!(vertical.bbox(), Rect::new(88.0, 100.0, 12.0, 48.0));
        assert!(vertical.contains(&PdfPoint::new(94.0, 130.0), 0.0));
        assert!(!vertical.contains(&PdfPoint::new(120.0, 105.0), 0.0));

        let edit = TextEdit::from_fragment(&vertical);
        assert_eq!(edit.bbox(), vertical.bbox());
        assert!(edit.contains(&PdfPoint::new(94.0, 130.0), 0.0));
    }

    #[test]
    fn text_space_round_trips_through_the_quad() {
        let slanted = TextTransform([7.0, 7.0, -7.0, 7.0, 20.0, 30.0]);
        let [_, end, top, _] = slanted.quad(10.0, 4.0);

        let (advance, rise) = slanted.to_text_space(&end);
        assert!((advance - 10.0).abs() < 1e-4 && rise.abs() < 1e-4);
        let (advance, rise) = slanted.to_text_space(&top);
        assert!((advance - 10.0).abs() < 1e-4 && (rise - 4.0).abs() < 1e-4);
    }

    #[test]
    fn new_edit_is_unmodified_copy_of_fragment() {
        let edit = TextEdit::from_fragment(&fragment());

        assert!(edit.is_new);
        assert_eq!(edit.new_text, "Hello");
        assert!(!edit.is_modified());
        assert!(edit.style.bold);
        assert_eq!(edit.style.font_size, 12.0);
        assert_eq!(edit.bbox(), Rect::new(72.0, 700.0, 30.0, 12.0));
    }

    #[test]
    fn style_only_change_counts_as_modification() {
        let mut edit = TextEdit::from_fragment(&fragment());
        edit.style.italic = true;

        assert!(!edit.has_text_change());
        assert!(edit.is_modified());
    }

    #[test]
    fn typing_original_text_back_is_not_a_change() {
        let mut edit = TextEdit::from_fragment(&fragment());
        edit.new_text = "Hello world".to_string();
        edit.new_text = "Hello".to_string();

        assert!(!edit.is_modified());
        edit.new_text.clear();
        assert!(edit.is_deleted());
        assert!(edit.is_modified());
    }
}
