//! Document model shared by the editor core and the PDF engine
//!
//! Pages, annotations, text edits and the coordinate transforms between
//! PDF-space and view-space. Everything here is plain data: cloneable,
//! serializable, and free of any rendering or document backend.

pub mod annotation;
pub mod geometry;
pub mod page;
pub mod text_edit;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, Color, Stroke, TextStyle};
pub use geometry::{
    PageGeometry, PageTransform, PdfPoint, Rect, Rotation, ViewPoint, ViewRect, BLANK_PAGE_HEIGHT,
    BLANK_PAGE_WIDTH,
};
pub use page::{Page, PageSource};
pub use text_edit::{FragmentId, ParseFragmentIdError, TextEdit, TextFragment, TextTransform};
