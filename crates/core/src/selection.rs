//! Selection and the style actions applied to the selected element

use crate::config::EditorConfig;
use crate::error::EditorError;
use doc_model::{Annotation, AnnotationId, AnnotationKind, Color, FragmentId, Page, TextStyle};
use pdf_engine::FONT_FAMILIES;
use serde::{Deserialize, Serialize};

/// An editable element of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementId {
    Annotation(AnnotationId),
    TextEdit(FragmentId),
}

/// The single selected element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub page: usize,
    pub element: ElementId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleAction {
    ToggleBold,
    ToggleItalic,
    /// Step the font size by this many configured increments
    StepFontSize(i32),
    SetFontSize(f32),
    /// One of [`FONT_FAMILIES`]; other names are ignored
    SetFontFamily(String),
    SetColor(Color),
    SetStrokeWidth(f32),
}

fn canonical_family(name: &str) -> Option<&'static str> {
    FONT_FAMILIES.iter().copied().find(|family| family.eq_ignore_ascii_case(name.trim()))
}

fn apply_text_style(style: &mut TextStyle, action: &StyleAction, config: &EditorConfig) -> bool {
    let before = style.clone();
    match action {
        StyleAction::ToggleBold => style.bold = !style.bold,
        StyleAction::ToggleItalic => style.italic = !style.italic,
        StyleAction::StepFontSize(steps) => {
            let stepped = style.font_size + *steps as f32 * config.font_size_step;
            style.font_size = config.clamp_font_size(stepped);
        }
        StyleAction::SetFontSize(size) => style.font_size = config.clamp_font_size(*size),
        StyleAction::SetFontFamily(name) => {
            if let Some(family) = canonical_family(name) {
                style.font_family = family.to_string();
            }
        }
        StyleAction::SetColor(color) => style.color = *color,
        StyleAction::SetStrokeWidth(_) => {}
    }
    *style != before
}

/// Apply `action` to `element`; returns whether anything changed
pub fn apply_style(
    page: &mut Page,
    element: ElementId,
    action: &StyleAction,
    config: &EditorConfig,
) -> Result<bool, EditorError> {
    match element {
        ElementId::TextEdit(id) => {
            let edit = page.text_edits.get_mut(&id).ok_or(EditorError::UnknownFragment(id))?;
            Ok(apply_text_style(&mut edit.style, action, config))
        }
        ElementId::Annotation(id) => {
            let annotation = page.annotation_mut(id).ok_or(EditorError::UnknownAnnotation(id))?;
            if let Some(style) = annotation.text_style_mut() {
                return Ok(apply_text_style(style, action, config));
            }
            let changed = match action {
                StyleAction::SetColor(color) => annotation.set_color(*color),
                StyleAction::SetStrokeWidth(width) => match annotation.stroke_mut() {
                    Some(stroke) if *width > 0.0 && stroke.width != *width => {
                        stroke.width = *width;
                        true
                    }
                    _ => false,
                },
                _ => false,
            };
            Ok(changed)
        }
    }
}

/// Clear a text edit's content or remove an annotation
pub fn delete_element(page: &mut Page, element: ElementId) -> Result<(), EditorError> {
    match element {
        ElementId::TextEdit(id) => {
            let edit = page.text_edits.get_mut(&id).ok_or(EditorError::UnknownFragment(id))?;
            edit.new_text.clear();
            edit.is_new = false;
        }
        ElementId::Annotation(id) => {
            page.remove_annotation(id).ok_or(EditorError::UnknownAnnotation(id))?;
        }
    }
    Ok(())
}

/// Append an offset copy of `element`; text edits are copied as text annotations
pub fn duplicate_element(
    page: &mut Page,
    element: ElementId,
    (dx, dy): (f32, f32),
) -> Result<AnnotationId, EditorError> {
    let copy = match element {
        ElementId::Annotation(id) => page.annotation(id).ok_or(EditorError::UnknownAnnotation(id))?.duplicate(dx, dy),
        ElementId::TextEdit(id) => {
            let edit = page.text_edits.get(&id).ok_or(EditorError::UnknownFragment(id))?;
            Annotation::new(
                edit.bbox().translate(dx, dy),
                AnnotationKind::Text { content: edit.new_text.clone(), style: edit.style.clone() },
            )
        }
    };
    let copy_id = copy.id;
    page.annotations.push(copy);
    Ok(copy_id)
}

/// Translate an annotation; text edits stay anchored to their fragment
pub fn move_element(page: &mut Page, element: ElementId, dx: f32, dy: f32) -> Result<bool, EditorError> {
    match element {
        ElementId::TextEdit(id) => {
            page.text_edits.get(&id).ok_or(EditorError::UnknownFragment(id))?;
            Ok(false)
        }
        ElementId::Annotation(id) => {
            let annotation = page.annotation_mut(id).ok_or(EditorError::UnknownAnnotation(id))?;
            annotation.translate(dx, dy);
            Ok(dx != 0.0 || dy != 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{PdfPoint, Rect, Stroke, TextEdit, TextFragment, TextTransform};

    fn page_with_text() -> (Page, AnnotationId) {
        let mut page = Page::blank();
        let annotation = Annotation::new(
            Rect::new(10.0, 10.0, 100.0, 20.0),
            AnnotationKind::Text { content: "hi".to_string(), style: TextStyle::default() },
        );
        let id = annotation.id;
        page.annotations.push(annotation);
        (page, id)
    }

    fn page_with_edit() -> (Page, FragmentId) {
        let mut page = Page::blank();
        let fragment = TextFragment::new(
            FragmentId::new(0, 3),
            "original",
            TextTransform::upright(PdfPoint::new(50.0, 60.0), 10.0),
            40.0,
        );
        page.text_edits.insert(fragment.id, TextEdit::from_fragment(&fragment));
        (page, fragment.id)
    }

    #[test]
    fn toggles_and_font_size_bounds() {
        let config = EditorConfig::default();
        let (mut page, id) = page_with_text();
        let element = ElementId::Annotation(id);

        assert!(apply_style(&mut page, element, &StyleAction::ToggleBold, &config).expect("style"));
        assert!(apply_style(&mut page, element, &StyleAction::SetFontSize(500.0), &config).expect("style"));
        assert!(!apply_style(&mut page, element, &StyleAction::StepFontSize(3), &config).expect("style"));

        let style = page.annotation(id).and_then(Annotation::text_style).expect("style");
        assert!(style.bold);
        assert_eq!(style.font_size, 100.0);

        apply_style(&mut page, element, &StyleAction::SetFontSize(1.0), &config).expect("style");
        let style = page.annotation(id).and_then(Annotation::text_style).expect("style");
        assert_eq!(style.font_size, 4.0);
    }

    #[test]
    fn font_family_is_limited_to_the_fixed_set() {
        let config = EditorConfig::default();
        let (mut page, fragment) = page_with_edit();
        let element = ElementId::TextEdit(fragment);

        assert!(apply_style(&mut page, element, &StyleAction::SetFontFamily("times".into()), &config)
            .expect("style"));
        assert!(!apply_style(&mut page, element, &StyleAction::SetFontFamily("Papyrus".into()), &config)
            .expect("style"));
        assert_eq!(page.text_edits[&fragment].style.font_family, "Times");
        assert!(page.text_edits[&fragment].has_style_change());
    }

    #[test]
    fn stroke_width_applies_to_shapes_only() {
        let config = EditorConfig::default();
        let mut page = Page::blank();
        let shape = Annotation::new(Rect::new(0.0, 0.0, 10.0, 10.0), AnnotationKind::Circle { stroke: Stroke::default() });
        let shape_id = shape.id;
        page.annotations.push(shape);

        let element = ElementId::Annotation(shape_id);
        assert!(apply_style(&mut page, element, &StyleAction::SetStrokeWidth(5.0), &config).expect("style"));
        assert!(!apply_style(&mut page, element, &StyleAction::ToggleBold, &config).expect("style"));
        assert!(apply_style(&mut page, element, &StyleAction::SetColor(Color::BLUE), &config).expect("style"));
        assert!(matches!(
            page.annotation(shape_id).map(|a| &a.kind),
            Some(AnnotationKind::Circle { stroke }) if stroke.width == 5.0 && stroke.color == Color::BLUE
        ));
    }

    #[test]
    fn delete_clears_text_edit_and_removes_annotation() {
        let (mut page, fragment) = page_with_edit();
        delete_element(&mut page, ElementId::TextEdit(fragment)).expect("delete");
        assert!(page.text_edits[&fragment].is_deleted());

        let (mut page, id) = page_with_text();
        delete_element(&mut page, ElementId::Annotation(id)).expect("delete");
        assert!(page.annotations.is_empty());
        assert_eq!(
            delete_element(&mut page, ElementId::Annotation(id)),
            Err(EditorError::UnknownAnnotation(id))
        );
    }

    #[test]
    fn duplicate_offsets_copy_and_converts_text_edits() {
        let (mut page, fragment) = page_with_edit();
        let copy_id = duplicate_element(&mut page, ElementId::TextEdit(fragment), (10.0, -10.0)).expect("duplicate");

        let copy = page.annotation(copy_id).expect("copy");
        assert_eq!(copy.text(), Some("original"));
        assert_eq!(copy.rect, Rect::new(60.0, 50.0, 40.0, 10.0));

        let again = duplicate_element(&mut page, ElementId::Annotation(copy_id), (10.0, -10.0)).expect("duplicate");
        assert_ne!(again, copy_id);
        assert_eq!(page.annotation(again).map(|a| a.rect.x), Some(70.0));
    }

    #[test]
    fn text_edits_do_not_move() {
        let (mut page, fragment) = page_with_edit();
        assert!(!move_element(&mut page, ElementId::TextEdit(fragment), 5.0, 5.0).expect("move"));
    }
}
