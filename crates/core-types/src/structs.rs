use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type ProgramId = i64;
pub type MarketId = i64;

/// A single `(date, value)` point of a return series, as served by a `ReturnStore`.
///
/// `value` is a decimal fraction: 0.01 is a 1% return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedReturn {
    pub date: NaiveDate,
    pub value: f64,
}

impl DatedReturn {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A traded market or benchmark index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub name: String,
    /// Benchmark markets are reference series and never part of a manager aggregate.
    pub is_benchmark: bool,
}

impl Market {
    pub fn traded(id: MarketId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), is_benchmark: false }
    }

    pub fn benchmark(id: MarketId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), is_benchmark: true }
    }
}
