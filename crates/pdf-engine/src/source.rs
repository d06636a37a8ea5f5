//! Loaded source documents

use crate::error::LoadError;
use doc_model::{PageGeometry, Rotation, BLANK_PAGE_HEIGHT, BLANK_PAGE_WIDTH};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Parent chains deeper than this are treated as malformed
const MAX_TREE_DEPTH: usize = 64;

/// One page of the source document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePage {
    pub object_id: ObjectId,
    pub geometry: PageGeometry,
}

/// An opened, read-only source PDF
///
/// Shared by the editing session and save jobs; it is never mutated after load.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    document: Document,
    pages: Vec<SourcePage>,
}

impl SourceDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(LoadError::PasswordProtected);
        }

        let document = Document::load_mem(bytes)?;
        if document.trailer.has(b"Encrypt") {
            return Err(LoadError::PasswordProtected);
        }

        let pages: Vec<SourcePage> = document
            .get_pages()
            .into_values()
            .map(|object_id| SourcePage { object_id, geometry: page_geometry(&document, object_id) })
            .collect();

        if pages.is_empty() {
            return Err(LoadError::NoPages);
        }

        log::debug!("loaded source document with {} pages", pages.len());
        Ok(Self { document, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&SourcePage> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[SourcePage] {
        &self.pages
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

fn page_geometry(document: &Document, page_id: ObjectId) -> PageGeometry {
    let mut geometry = inherited_attribute(document, page_id, b"MediaBox")
        .and_then(|object| resolve(document, object).as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let mut values = [0.0f32; 4];
            for (value, object) in values.iter_mut().zip(array) {
                *value = resolve(document, object).as_float().ok()?;
            }
            let [x0, y0, x1, y1] = values;
            let mut geometry = PageGeometry::new((x1 - x0).abs(), (y1 - y0).abs());
            geometry.origin_x = x0.min(x1);
            geometry.origin_y = y0.min(y1);
            Some(geometry)
        })
        .unwrap_or_else(|| PageGeometry::new(BLANK_PAGE_WIDTH, BLANK_PAGE_HEIGHT));

    if let Some(degrees) = inherited_attribute(document, page_id, b"Rotate")
        .and_then(|object| resolve(document, object).as_i64().ok())
    {
        geometry.rotation = Rotation::from_degrees(degrees as i32);
    }

    geometry
}

/// Look up a page attribute, walking up the page tree for inherited values
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow references until a direct object is reached
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    document.dereference(object).map(|(_, target)| target).unwrap_or(object)
}

/// The page's effective resource dictionary
pub(crate) fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(document, page_id, b"Resources")
        .and_then(|object| resolve(document, object).as_dict().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn reads_page_geometry_and_rotation() {
        let bytes = fixtures::PdfBuilder::new()
            .page(fixtures::FixturePage::new(600.0, 800.0).rotated(90))
            .page(fixtures::FixturePage::new(300.0, 200.0).with_origin(10.0, 20.0))
            .build()
            .expect("fixture");

        let source = SourceDocument::load(&bytes).expect("load");
        assert_eq!(source.page_count(), 2);

        let first = source.page(0).expect("first page").geometry;
        assert_eq!((first.width, first.height), (600.0, 800.0));
        assert_eq!(first.rotation, Rotation::CLOCKWISE_90);

        let second = source.page(1).expect("second page").geometry;
        assert_eq!((second.origin_x, second.origin_y), (10.0, 20.0));
        assert_eq!((second.width, second.height), (300.0, 200.0));
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let bytes = fixtures::PdfBuilder::new()
            .inherit_media_box(500.0, 700.0)
            .page(fixtures::FixturePage::inheriting())
            .build()
            .expect("fixture");

        let source = SourceDocument::load(&bytes).expect("load");
        let geometry = source.page(0).expect("page").geometry;
        assert_eq!((geometry.width, geometry.height), (500.0, 700.0));
    }

    #[test]
    fn garbage_cannot_be_opened() {
        let err = SourceDocument::load(b"definitely not a pdf").expect_err("should fail");
        assert!(matches!(err, LoadError::CannotOpen(_)));
    }

    #[test]
    fn encrypted_marker_is_reported_as_password_protected() {
        let bytes = b"%PDF-1.7\n1 0 obj\n<< /Encrypt 2 0 R >>\nendobj\n%%EOF\n";
        let err = SourceDocument::load(bytes).expect_err("should fail");
        assert!(matches!(err, LoadError::PasswordProtected));
    }
}
