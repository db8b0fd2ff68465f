use crate::types::{AssetClass, Timeframe};
use thiserror::Error;

/// Failure fetching an indicator snapshot for one symbol.
///
/// Always transient from the scan's point of view: the pair is dropped
/// from the batch and the rest of the scan continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited by indicator provider")]
    RateLimited,

    #[error("Indicator provider timed out")]
    Timeout,

    #[error("No indicator data for {0}")]
    NotFound(String),

    #[error("Malformed indicator data: {0}")]
    Malformed(String),

    #[error("Scan cancelled")]
    Cancelled,
}

/// Invalid or incomplete configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Unknown asset class: {0}")]
    UnknownAssetClass(String),

    #[error("No ATR multipliers configured for {timeframe} on {asset_class}")]
    MissingMultiplier {
        asset_class: AssetClass,
        timeframe: Timeframe,
    },

    #[error("No profile configured for asset class {0}")]
    MissingProfile(AssetClass),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Completion store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error("Completion record is locked by another writer")]
    Conflict,

    #[error("Completion store lock poisoned")]
    Poisoned,

    #[error("Corrupt completion record: {0}")]
    Corrupt(String),

    #[error("Completion store task panicked: {0}")]
    TaskPanicked(String),
}

/// Failure evaluating a single snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

/// Why one `(symbol, timeframe)` pair dropped out of a scan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl From<ConfigError> for PairError {
    fn from(err: ConfigError) -> Self {
        PairError::Evaluation(EvaluationError::Config(err))
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
