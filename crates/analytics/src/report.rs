use serde::{Deserialize, Serialize};
use std::fmt;

/// Which data the figures in a `Statistics` record were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    /// Daily returns: volatility from daily data, everything else from months
    /// compounded out of those days.
    DailyFirst,
    /// No daily data; every figure, volatility included, comes from monthly
    /// returns. The volatility is a weaker estimate.
    MonthlyFallback,
    /// Nothing in the window for this entity.
    NoData,
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DailyFirst => "daily",
            Self::MonthlyFallback => "monthly (fallback)",
            Self::NoData => "no data",
        };
        f.write_str(label)
    }
}

/// Performance statistics for one entity over one window.
///
/// Monthly figures (mean, median, cumulative returns, drawdowns, CAGR) are
/// always computed from monthly returns, either compounded from daily data or
/// taken from the monthly fallback series. `None` marks a figure that is
/// undefined for the data at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub methodology: Methodology,

    // I. Counts
    /// Number of monthly returns.
    pub count: usize,
    /// Number of daily returns; zero on the monthly fallback path.
    pub daily_count: usize,

    // II. Return
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub cagr: Option<f64>,
    pub cumulative_return_compounded: Option<f64>,
    pub cumulative_return_simple: Option<f64>,

    // III. Risk
    /// Annualized standard deviation.
    pub std_dev: Option<f64>,
    /// Unannualized daily standard deviation; `None` without daily data.
    pub daily_std_dev_raw: Option<f64>,
    pub max_drawdown_compounded: Option<f64>,
    pub max_drawdown_simple: Option<f64>,

    // IV. Risk-adjusted
    pub sharpe: Option<f64>, // None when std_dev is zero
    pub sortino: Option<f64>, // None without downside months
}

impl Statistics {
    /// The record for an entity with no observations in the window.
    pub fn empty() -> Self {
        Self {
            methodology: Methodology::NoData,
            count: 0,
            daily_count: 0,
            mean: None,
            median: None,
            cagr: None,
            cumulative_return_compounded: None,
            cumulative_return_simple: None,
            std_dev: None,
            daily_std_dev_raw: None,
            max_drawdown_compounded: None,
            max_drawdown_simple: None,
            sharpe: None,
            sortino: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.methodology != Methodology::NoData
    }

    /// True when volatility was estimated from monthly returns.
    pub fn std_dev_is_approximate(&self) -> bool {
        self.methodology == Methodology::MonthlyFallback
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::empty()
    }
}
