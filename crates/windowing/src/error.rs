use chrono::NaiveDate;
use core_types::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Invalid window parameter: {0}")]
    InvalidParameter(String),

    #[error("Date arithmetic left the supported calendar range near {0}")]
    DateOutOfRange(NaiveDate),

    #[error("Malformed window definition JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Return store error: {0}")]
    Store(#[from] StoreError),
}
