use thiserror::Error;

use crate::db::DbError;
use crate::forecast::{ForecastError, InputError};
use crate::mail::TransportError;

/// Fatal errors for a run. None of them are recovered from; the first one
/// ends the batch and the process exits non-zero.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Recipient refers to unknown location `{0}`")]
    UnknownLocation(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Invalid forecast data: {0}")]
    Input(#[from] InputError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Mail transport failed: {0}")]
    Transport(#[from] TransportError),
}

impl RunError {
    /// Short machine-readable code for log filtering
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::UnknownLocation(_) => "UNKNOWN_LOCATION",
            Self::Forecast(ForecastError::Network(_)) => "NETWORK_ERROR",
            Self::Forecast(ForecastError::Input(_)) | Self::Input(_) => "INPUT_ERROR",
            Self::Forecast(ForecastError::Persistence(_)) | Self::Database(_) => {
                "PERSISTENCE_ERROR"
            }
            Self::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}
