use thiserror::Error;

/// Error taxonomy for store and binning operations.
///
/// Every variant is a caller-visible condition surfaced synchronously;
/// none is retried. Persistence failures are deliberately absent: the
/// core never touches IO, and the adapter that does logs them without
/// rolling back in-memory state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("subset \"{0}\" not found")]
    SubsetNotFound(String),

    #[error("image \"{image}\" not found in subset \"{subset}\"")]
    ImageNotFound { subset: String, image: String },

    #[error("{0}")]
    Validation(String),

    #[error("not enough rated images to form a pair")]
    InsufficientCandidates,
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
