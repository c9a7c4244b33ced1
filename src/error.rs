use thiserror::Error;

/// Problems detected while building an indicator or its parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown qualifier '{0}' (expected uniform/linear, recency/time or magnitude/volume)")]
    UnknownQualifier(String),
    #[error("unknown indicator '{0}'")]
    UnknownIndicator(String),
    #[error("precision must be positive")]
    NonPositivePrecision,
    #[error("threshold ratio {0} outside [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("at least one pivot window length is required")]
    NoLengths,
    #[error("pivot window length must be positive")]
    ZeroLength,
    #[error("zone tolerance {0} must be non-negative")]
    NegativeTolerance(f64),
    #[error("peak scale {0} must be at least 2")]
    ScaleTooSmall(usize),
    #[error("pivot highs and lows are both excluded")]
    NoPivotKinds,
    #[error("invalid parameters: {0}")]
    Parameters(String),
}

/// Failures at the persistence boundary. Surfaced as-is, never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("zone {0} not found")]
    ZoneNotFound(u64),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot format: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SrZoneError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
