//! PDF backend for the editor: loading, text extraction and serialization
//!
//! Built on `lopdf`. The source document is parsed once and never mutated;
//! saving clones it and rewrites only the page tree and the pages that carry
//! edits.

mod error;
pub mod export;
pub mod extract;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod fonts;
pub mod raster;
mod source;

pub use error::{ExportError, LoadError};
pub use export::export_document;
pub use extract::{ContentStreamExtractor, PrecomputedFragments, TextExtractor};
pub use fonts::{StandardFont, FONT_FAMILIES};
pub use source::{SourceDocument, SourcePage};
