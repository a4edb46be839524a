use pathwise_store::StoreError;
use thiserror::Error;

/// Failure reported by an external collaborator (course progress, identity).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0} is unavailable")]
    Unavailable(String),

    #[error("{0} timed out")]
    TimedOut(String),
}

/// Errors surfaced by engine operations.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Rejected before any write; never worth retrying.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Lock contention or timeout in the store; the caller may retry.
    #[error("Store temporarily unavailable: {0}")]
    Transient(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl DiscoveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiscoveryError::Transient(_) | DiscoveryError::Provider(_))
    }
}

impl From<StoreError> for DiscoveryError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            return DiscoveryError::Transient(err.to_string());
        }
        match err {
            StoreError::Validation(msg) => DiscoveryError::Validation(msg),
            StoreError::NotFound => DiscoveryError::NotFound("record".into()),
            other => DiscoveryError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
