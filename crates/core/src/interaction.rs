//! Pointer gestures and the annotations they produce
//!
//! Raw pointer positions are converted to PDF-space as soon as they arrive.
//! The builders here are pure: they take the gesture's PDF-space points and
//! the configuration, and return the annotation to commit, if any.

use crate::config::EditorConfig;
use crate::selection::ElementId;
use crate::tool::Tool;
use doc_model::{Annotation, AnnotationKind, PdfPoint, Rect, ViewPoint};
use std::sync::Arc;

/// Position in scrolled-viewport (screen) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One pointer event over a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub page: usize,
    /// Position within the page's view-space
    pub position: ViewPoint,
    /// Position on screen, used for panning
    pub screen: ScreenPoint,
}

impl PointerEvent {
    pub fn new(page: usize, position: ViewPoint) -> Self {
        Self { page, position, screen: ScreenPoint::new(position.x, position.y) }
    }

    pub fn with_screen(mut self, screen: ScreenPoint) -> Self {
        self.screen = screen;
        self
    }
}

/// Raster payload waiting to be placed with the image tool
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub data_url: Arc<str>,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging { page: usize, anchor: PdfPoint, current: PdfPoint },
    Pathing { page: usize, points: Vec<PdfPoint> },
    Panning { origin: ScreenPoint, scroll_at_start: (f32, f32) },
    EditingText { page: usize, element: ElementId },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Element being edited inline, if any
    pub fn editing(&self) -> Option<(usize, ElementId)> {
        match self {
            Self::EditingText { page, element } => Some((*page, *element)),
            _ => None,
        }
    }
}

/// Box of a drag, or `None` when it is too small to keep
pub fn drag_box(anchor: PdfPoint, current: PdfPoint, min_extent: f32) -> Option<Rect> {
    let rect = Rect::from_corners(anchor, current);
    (rect.width > min_extent || rect.height > min_extent).then_some(rect)
}

/// Element created by a click-to-place tool with its top-left corner at `at`
pub fn placed_annotation(
    tool: Tool,
    at: PdfPoint,
    config: &EditorConfig,
    pending_image: Option<&PendingImage>,
) -> Option<Annotation> {
    let top_left = |width: f32, height: f32| Rect::new(at.x, at.y - height, width, height);

    let annotation = match tool {
        Tool::Text => {
            let height = config.text_style.font_size * 1.4;
            Annotation::new(
                top_left(config.text_box_width, height),
                AnnotationKind::Text { content: String::new(), style: config.text_style.clone() },
            )
        }
        Tool::Whiteout => {
            let (width, height) = config.whiteout_size;
            Annotation::new(top_left(width, height), AnnotationKind::Whiteout)
        }
        Tool::Checkmark => Annotation::new(
            top_left(config.mark_size, config.mark_size),
            AnnotationKind::Checkmark { color: config.mark_color },
        ),
        Tool::Cross => Annotation::new(
            top_left(config.mark_size, config.mark_size),
            AnnotationKind::Cross { color: config.mark_color },
        ),
        Tool::Image => {
            let image = pending_image?;
            let width = config.image_width;
            let height = if image.pixel_width == 0 {
                width
            } else {
                width * image.pixel_height as f32 / image.pixel_width as f32
            };
            Annotation::new(
                top_left(width, height),
                AnnotationKind::Image {
                    data_url: Arc::clone(&image.data_url),
                    pixel_width: image.pixel_width,
                    pixel_height: image.pixel_height,
                },
            )
        }
        _ => return None,
    };
    Some(annotation)
}

/// Element created by a drag tool, if the drag cleared the threshold
pub fn dragged_annotation(
    tool: Tool,
    anchor: PdfPoint,
    current: PdfPoint,
    config: &EditorConfig,
    link_url: Option<&str>,
) -> Option<Annotation> {
    let rect = drag_box(anchor, current, config.min_drag_extent)?;
    let kind = match tool {
        Tool::Rectangle => AnnotationKind::Rectangle { stroke: config.shape_stroke },
        Tool::Circle => AnnotationKind::Circle { stroke: config.shape_stroke },
        Tool::Line => AnnotationKind::Line { points: vec![anchor, current], stroke: config.shape_stroke },
        Tool::Link => AnnotationKind::Link {
            url: link_url.unwrap_or(&config.default_link_url).to_string(),
            label: String::new(),
            style: config.link_style.clone(),
        },
        _ => return None,
    };
    Some(Annotation::new(rect, kind))
}

/// Element created by a freehand tool, if the path has enough points
pub fn path_annotation(tool: Tool, points: Vec<PdfPoint>, config: &EditorConfig) -> Option<Annotation> {
    if points.len() < config.min_path_points {
        return None;
    }
    let kind = match tool {
        Tool::Pen => AnnotationKind::FreehandPath { points, stroke: config.pen_stroke },
        Tool::Signature => AnnotationKind::FreehandPath { points, stroke: config.signature_stroke },
        Tool::Highlight => AnnotationKind::Highlight {
            points,
            stroke: config.highlight_stroke,
            opacity: config.highlight_opacity,
        },
        _ => return None,
    };
    Some(Annotation::from_points(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> PdfPoint {
        PdfPoint::new(x, y)
    }

    #[test]
    fn drag_threshold_is_strict_on_either_axis() {
        assert!(drag_box(pt(0.0, 0.0), pt(3.0, 3.0), 5.0).is_none());
        assert!(drag_box(pt(0.0, 0.0), pt(5.0, 5.0), 5.0).is_none());
        assert_eq!(drag_box(pt(0.0, 0.0), pt(6.0, 0.0), 5.0), Some(Rect::new(0.0, 0.0, 6.0, 0.0)));
        assert_eq!(drag_box(pt(10.0, 20.0), pt(4.0, 2.0), 5.0), Some(Rect::new(4.0, 2.0, 6.0, 18.0)));
    }

    #[test]
    fn placement_puts_click_at_top_left() {
        let config = EditorConfig::default();
        let whiteout = placed_annotation(Tool::Whiteout, pt(100.0, 500.0), &config, None).expect("whiteout");
        assert_eq!(whiteout.rect, Rect::new(100.0, 470.0, 100.0, 30.0));

        let check = placed_annotation(Tool::Checkmark, pt(0.0, 20.0), &config, None).expect("check");
        assert_eq!(check.rect, Rect::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn image_placement_needs_a_pending_payload() {
        let config = EditorConfig::default();
        assert!(placed_annotation(Tool::Image, pt(0.0, 300.0), &config, None).is_none());

        let pending = PendingImage { data_url: Arc::from("data:image/png;base64,AA=="), pixel_width: 300, pixel_height: 150 };
        let image = placed_annotation(Tool::Image, pt(0.0, 300.0), &config, Some(&pending)).expect("image");
        assert_eq!(image.rect, Rect::new(0.0, 225.0, 150.0, 75.0));
    }

    #[test]
    fn drag_tools_build_their_variants() {
        let config = EditorConfig::default();
        let line = dragged_annotation(Tool::Line, pt(0.0, 0.0), pt(50.0, 10.0), &config, None).expect("line");
        assert_eq!(line.kind.points().map(<[PdfPoint]>::len), Some(2));

        let link = dragged_annotation(Tool::Link, pt(0.0, 0.0), pt(50.0, 10.0), &config, Some("https://a.b"))
            .expect("link");
        assert!(matches!(link.kind, AnnotationKind::Link { ref url, .. } if url == "https://a.b"));

        assert!(dragged_annotation(Tool::Pen, pt(0.0, 0.0), pt(50.0, 10.0), &config, None).is_none());
    }

    #[test]
    fn paths_need_more_than_two_points() {
        let config = EditorConfig::default();
        assert!(path_annotation(Tool::Pen, vec![pt(0.0, 0.0), pt(1.0, 1.0)], &config).is_none());

        let highlight = path_annotation(Tool::Highlight, vec![pt(0.0, 0.0), pt(5.0, 1.0), pt(10.0, 0.0)], &config)
            .expect("highlight");
        assert_eq!(highlight.kind_name(), "highlight");
        assert_eq!(highlight.rect, Rect::new(0.0, 0.0, 10.0, 1.0));
    }
}
