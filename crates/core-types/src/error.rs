use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown resolution label: {0}")]
    UnknownResolution(String),
}

/// Errors a `ReturnStore` implementation may surface while serving a query.
///
/// Missing data is never an error: an empty series is a valid answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Market {0} is not registered with the return store")]
    UnknownMarket(i64),

    #[error("Market {0} is not flagged as a benchmark")]
    NotABenchmark(i64),

    #[error("Return store query failed: {0}")]
    Query(String),
}
