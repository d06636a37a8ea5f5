/// Failure to open a source document
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open PDF: {0}")]
    CannotOpen(#[from] lopdf::Error),
    #[error("PDF is password protected")]
    PasswordProtected,
    #[error("document has no pages")]
    NoPages,
    #[error("loading was cancelled")]
    Cancelled,
}

/// Failure to serialize the edited document
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("nothing to export: the page list is empty")]
    NoPages,
    #[error("source page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("unsupported image format {0:?}")]
    UnsupportedImage(String),
    #[error("invalid image payload: {0}")]
    InvalidImage(String),
}
