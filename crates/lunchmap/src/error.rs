use thiserror::Error;

#[derive(Error, Debug)]
pub enum LunchmapError {
    #[error("Search error: {0}")]
    SearchError(#[from] crate::coordinator::SearchError),
    #[error("Aggregation error: {0}")]
    AggregateError(#[from] crate::aggregate::AggregateError),
    #[error("Radius error: {0}")]
    RadiusError(#[from] crate::radius::RadiusError),
    #[error("Marker pool error: {0}")]
    MarkerPoolError(#[from] crate::marker::MarkerPoolError),
    #[error("Provider error: {0}")]
    ProviderError(#[from] lunchmap_provider::ProviderError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LunchmapError>;
