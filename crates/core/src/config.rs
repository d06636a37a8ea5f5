//! Editor configuration
//!
//! Defaults applied to newly created elements plus the thresholds that
//! decide whether a gesture is kept.

use doc_model::{Color, Stroke, TextStyle};
use serde::{Deserialize, Serialize};

/// Configuration for an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Style of text boxes placed with the text tool
    pub text_style: TextStyle,
    /// Width of a newly placed text box, in points
    pub text_box_width: f32,
    /// Style of link labels
    pub link_style: TextStyle,
    /// URL given to link regions when no pending URL is set
    pub default_link_url: String,
    /// Stroke of rectangles, circles and lines
    pub shape_stroke: Stroke,
    /// Stroke of pen paths
    pub pen_stroke: Stroke,
    /// Stroke of signature paths
    pub signature_stroke: Stroke,
    /// Stroke of highlighter paths
    pub highlight_stroke: Stroke,
    /// Opacity of highlighter paths, 0.0 to 1.0
    pub highlight_opacity: f32,
    /// Size of a click-placed whiteout box, in points
    pub whiteout_size: (f32, f32),
    /// Edge length of click-placed check and cross marks, in points
    pub mark_size: f32,
    pub mark_color: Color,
    /// Width of a click-placed image; height follows the aspect ratio
    pub image_width: f32,
    /// A drag is kept only if its box is wider or taller than this
    pub min_drag_extent: f32,
    /// A freehand path is kept only with at least this many points
    pub min_path_points: usize,
    /// Hit-test tolerance around annotations, in points
    pub hit_tolerance: f32,
    /// Offset applied to duplicated elements
    pub duplicate_offset: (f32, f32),
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub font_size_step: f32,
    /// Extra margin of the whiteout placed over replaced search matches
    pub replace_padding: f32,
    /// Maximum number of undo snapshots; `None` keeps all of them
    pub history_capacity: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            text_style: TextStyle::new("Helvetica", 16.0, Color::BLACK),
            text_box_width: 200.0,
            link_style: TextStyle::new("Helvetica", 12.0, Color::BLUE),
            default_link_url: "https://".to_string(),
            shape_stroke: Stroke::new(Color::RED, 2.0),
            pen_stroke: Stroke::new(Color::BLACK, 2.0),
            signature_stroke: Stroke::new(Color::NAVY, 2.0),
            highlight_stroke: Stroke::new(Color::YELLOW, 14.0),
            highlight_opacity: 0.4,
            whiteout_size: (100.0, 30.0),
            mark_size: 20.0,
            mark_color: Color::BLACK,
            image_width: 150.0,
            min_drag_extent: 5.0,
            min_path_points: 3,
            hit_tolerance: 4.0,
            duplicate_offset: (10.0, -10.0),
            min_font_size: 4.0,
            max_font_size: 100.0,
            font_size_step: 1.0,
            replace_padding: 1.5,
            history_capacity: None,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the style of new text boxes.
    pub fn with_text_style(mut self, style: TextStyle) -> Self {
        self.text_style = style;
        self
    }

    /// Sets the stroke of rectangles, circles and lines.
    pub fn with_shape_stroke(mut self, stroke: Stroke) -> Self {
        self.shape_stroke = stroke;
        self
    }

    /// Sets the stroke of pen paths.
    pub fn with_pen_stroke(mut self, stroke: Stroke) -> Self {
        self.pen_stroke = stroke;
        self
    }

    /// Sets the highlighter stroke and opacity.
    pub fn with_highlight(mut self, stroke: Stroke, opacity: f32) -> Self {
        self.highlight_stroke = stroke;
        self.highlight_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Sets the minimum drag extent for drawn shapes.
    pub fn with_min_drag_extent(mut self, extent: f32) -> Self {
        self.min_drag_extent = extent;
        self
    }

    /// Sets the allowed font size range.
    pub fn with_font_size_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_font_size = min.min(max);
        self.max_font_size = max.max(min);
        self
    }

    /// Bounds the undo history.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity.max(1));
        self
    }

    pub fn clamp_font_size(&self, size: f32) -> f32 {
        size.clamp(self.min_font_size, self.max_font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gesture_contract() {
        let config = EditorConfig::default();
        assert_eq!(config.min_drag_extent, 5.0);
        assert_eq!(config.min_path_points, 3);
        assert_eq!(config.duplicate_offset, (10.0, -10.0));
        assert_eq!((config.min_font_size, config.max_font_size), (4.0, 100.0));
        assert_eq!(config.history_capacity, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"min_drag_extent": 8.0, "history_capacity": 20}"#)
            .expect("valid config");

        assert_eq!(config.min_drag_extent, 8.0);
        assert_eq!(config.history_capacity, Some(20));
        assert_eq!(config.text_style, EditorConfig::default().text_style);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(EditorConfig::from_json("{\"min_drag_extent\": \"wide\"}").is_err());
    }

    #[test]
    fn builder_setters_normalize_their_input() {
        let config = EditorConfig::default()
            .with_font_size_bounds(50.0, 10.0)
            .with_highlight(Stroke::new(Color::GREEN, 10.0), 3.0)
            .with_history_capacity(0);

        assert_eq!((config.min_font_size, config.max_font_size), (10.0, 50.0));
        assert_eq!(config.highlight_opacity, 1.0);
        assert_eq!(config.history_capacity, Some(1));
        assert_eq!(config.clamp_font_size(200.0), 50.0);
    }
}
