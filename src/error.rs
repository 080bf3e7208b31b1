use thiserror::Error;

/// Conditions that callers are expected to tell apart from plain I/O failures.
///
/// Every fallible function in this crate returns `anyhow::Result`; these variants travel inside it
/// and can be recovered with `downcast_ref::<ViewerError>()`.
#[derive(Error, Debug, PartialEq)]
pub enum ViewerError {
    #[error("gallery sample with id '{0}' does not exist")]
    GalleryIdNotFound(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("query samples have no attribute '{0}'")]
    UnknownAttribute(String),

    #[error("query sample '{id}' has {ids} top-k ids but {scores} top-k scores")]
    MismatchedTopK { id: String, ids: usize, scores: usize },

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("dataset '{0}' is not configured")]
    UnknownDataset(String),

    #[error("query set is empty")]
    EmptyQuerySet,
}
