use crate::model::CastError;

/// Failure of a store operation. Callers see a single generic failure;
/// the variants only matter for logs.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("malformed record id: {0}")]
    MalformedId(String),
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
