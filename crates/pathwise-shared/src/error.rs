use thiserror::Error;

/// Failure to parse one of the shared domain enums from its wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown strategy: {0}")]
    Strategy(String),

    #[error("Unknown visibility: {0}")]
    Visibility(String),

    #[error("Unknown activity type: {0}")]
    ActivityType(String),

    #[error("Unknown rarity: {0}")]
    Rarity(String),

    #[error("Invalid identifier: {0}")]
    Id(#[from] uuid::Error),
}
