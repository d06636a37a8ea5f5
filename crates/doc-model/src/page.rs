//! Output page entries

use crate::annotation::{Annotation, AnnotationId};
use crate::geometry::{PageGeometry, PageTransform, Rotation};
use crate::text_edit::{FragmentId, TextEdit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an output page's base content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageSource {
    /// Page at this index of the source document
    Source(usize),
    /// Synthetic blank page
    Blank,
}

fn default_zoom() -> f32 {
    1.0
}

/// One entry per output page, in final order
///
/// Equality ignores `view_zoom`: two pages that differ only in display
/// scale describe the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub source: PageSource,
    /// Rotation applied on top of the source page's own rotation
    #[serde(default)]
    pub rotation_delta: Rotation,
    /// Display scale; view-only and never persisted
    #[serde(skip, default = "default_zoom")]
    pub view_zoom: f32,
    pub geometry: PageGeometry,
    /// Paint order: later entries are drawn on top
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub text_edits: BTreeMap<FragmentId, TextEdit>,
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.rotation_delta == other.rotation_delta
            && self.geometry == other.geometry
            && self.annotations == other.annotations
            && self.text_edits == other.text_edits
    }
}

impl Page {
    pub fn from_source(index: usize, geometry: PageGeometry) -> Self {
        Self {
            source: PageSource::Source(index),
            rotation_delta: Rotation::NONE,
            view_zoom: default_zoom(),
            geometry,
            annotations: Vec::new(),
            text_edits: BTreeMap::new(),
        }
    }

    pub fn blank() -> Self {
        Self {
            source: PageSource::Blank,
            rotation_delta: Rotation::NONE,
            view_zoom: default_zoom(),
            geometry: PageGeometry::blank(),
            annotations: Vec::new(),
            text_edits: BTreeMap::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.source == PageSource::Blank
    }

    /// Source rotation composed with the user's rotation
    pub fn effective_rotation(&self) -> Rotation {
        self.geometry.rotation.add(self.rotation_delta)
    }

    pub fn rotate(&mut self, delta: Rotation) {
        self.rotation_delta = self.rotation_delta.add(delta);
    }

    /// PDF-space/view-space transform at the current zoom and rotation
    pub fn transform(&self) -> PageTransform {
        PageTransform::new(
            self.geometry.width,
            self.geometry.height,
            self.effective_rotation(),
            self.view_zoom,
        )
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotation_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(index))
    }

    /// Whether saving needs to draw anything over the base content
    pub fn has_overlay(&self) -> bool {
        !self.annotations.is_empty() || self.text_edits.values().any(TextEdit::is_modified)
    }
}
