use doc_model::{AnnotationId, FragmentId};
use pdf_engine::ExportError;

/// Rejected editing operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("no annotation {0} on this page")]
    UnknownAnnotation(AnnotationId),
    #[error("no text fragment {0} on this page")]
    UnknownFragment(FragmentId),
    #[error("search match {index} out of range ({len} matches)")]
    MatchOutOfRange { index: usize, len: usize },
    #[error("nothing is selected")]
    NothingSelected,
    #[error("the last remaining page cannot be deleted")]
    LastPage,
    #[error("operation was cancelled")]
    Cancelled,
}

/// Failure to produce output bytes
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save failed: {0}")]
    Failed(#[from] ExportError),
    #[error("a save is already in progress")]
    InProgress,
}
