use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndicatorError>;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("unsupported ranking system: {0}")]
    UnsupportedRankingSystem(String),

    #[error("indicator `{0}` has no publication category")]
    MissingCategory(String),

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("unknown organization: {0}")]
    UnknownOrganization(u32),

    #[error("data source failed: {0}")]
    Source(#[source] SourceError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("cache: {0}")]
    Cache(#[from] bincode::Error),
}

impl IndicatorError {
    pub fn from_source<E>(e: E) -> Self
    where
        E: Into<SourceError>,
    {
        Self::Source(e.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedRankingSystem(_) | Self::MissingCategory(_) | Self::UnknownIndicator(_)
        )
    }
}
