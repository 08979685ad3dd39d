use thiserror::Error;
use windowing::WindowError;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Realized standard deviation is zero; returns cannot be normalized")]
    UndefinedNormalization,

    #[error("Invalid threshold grid: {0}")]
    InvalidThresholds(String),

    #[error("Invalid analytics parameter: {0}")]
    InvalidParameter(String),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),
}
