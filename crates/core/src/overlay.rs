//! Source text as clickable regions, and the edits that replace it
//!
//! A fragment with an entry in `Page::text_edits` is never shown from the
//! original content again; every query here returns the edit in its place.

use crate::error::EditorError;
use doc_model::{FragmentId, Page, PdfPoint, Rect, TextEdit, TextFragment};

/// What is shown for one source fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayItem<'a> {
    Original(&'a TextFragment),
    Edited(&'a TextEdit),
}

impl<'a> OverlayItem<'a> {
    pub fn id(&self) -> FragmentId {
        match self {
            Self::Original(fragment) => fragment.id,
            Self::Edited(edit) => edit.id,
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            Self::Original(fragment) => &fragment.text,
            Self::Edited(edit) => &edit.new_text,
        }
    }

    pub fn bbox(&self) -> Rect {
        match self {
            Self::Original(fragment) => fragment.bbox(),
            Self::Edited(edit) => edit.bbox(),
        }
    }

    /// Bounds of the characters `start..start + len`, assuming every character has the same width
    pub fn span_bbox(&self, start: usize, len: usize) -> Rect {
        let (transform, width, height, text) = match self {
            Self::Original(fragment) => (fragment.transform, fragment.width, fragment.height, fragment.text.as_str()),
            Self::Edited(edit) => (edit.transform, edit.width, edit.height, edit.new_text.as_str()),
        };
        let char_width = width / text.chars().count().max(1) as f32;
        transform.span_bounds(start as f32 * char_width, (start + len) as f32 * char_width, height)
    }

    pub fn is_edited(&self) -> bool {
        matches!(self, Self::Edited(_))
    }
}

/// Overlay for every fragment of the page, in content order
pub fn overlay_items<'a>(page: &'a Page, fragments: &'a [TextFragment]) -> Vec<OverlayItem<'a>> {
    fragments
        .iter()
        .map(|fragment| match page.text_edits.get(&fragment.id) {
            Some(edit) => OverlayItem::Edited(edit),
            None => OverlayItem::Original(fragment),
        })
        .collect()
}

/// Topmost fragment whose box contains `point`
pub fn fragment_at<'a>(fragments: &'a [TextFragment], point: &PdfPoint, tolerance: f32) -> Option<&'a TextFragment> {
    fragments.iter().rev().find(|fragment| fragment.contains(point, tolerance))
}

/// Open `fragment` for editing, creating its edit on first use
///
/// Returns true when a new edit was created.
pub fn open_edit(page: &mut Page, fragment: &TextFragment) -> bool {
    if page.text_edits.contains_key(&fragment.id) {
        return false;
    }
    page.text_edits.insert(fragment.id, TextEdit::from_fragment(fragment));
    true
}

/// Replace the live text of an open edit
pub fn set_edit_text(page: &mut Page, id: FragmentId, text: &str) -> Result<(), EditorError> {
    let edit = page.text_edits.get_mut(&id).ok_or(EditorError::UnknownFragment(id))?;
    edit.new_text = text.to_string();
    Ok(())
}

/// End an edit session; the edit is kept and no longer counts as new
pub fn close_edit(page: &mut Page, id: FragmentId) -> Result<(), EditorError> {
    let edit = page.text_edits.get_mut(&id).ok_or(EditorError::UnknownFragment(id))?;
    edit.is_new = false;
    Ok(())
}
