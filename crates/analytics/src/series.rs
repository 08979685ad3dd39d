//! Pure numeric helpers over return series.
//!
//! Returns are decimal fractions (0.01 is 1%). Nothing here allocates more
//! than one output vector or touches a store.

use chrono::{Datelike, NaiveDate};
use core_types::DatedReturn;

/// Trading days used to annualize a daily standard deviation.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Months used to annualize monthly figures.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Average year length used to turn a calendar-day span into years.
pub const DAYS_PER_YEAR: f64 = 365.25;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (N - 1 denominator).
///
/// A single observation has no dispersion and yields `Some(0.0)`; an empty
/// slice yields `None`.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    let n = values.len();
    let avg = mean(values)?;
    if n < 2 {
        return Some(0.0);
    }
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Some((sum_sq / (n - 1) as f64).sqrt())
}

/// `daily_std * sqrt(trading_days_per_year)`.
pub fn annualize_daily_std(daily_std: f64, trading_days_per_year: u32) -> f64 {
    daily_std * f64::from(trading_days_per_year).sqrt()
}

/// Compounds daily returns into one return per calendar month.
///
/// Each month's value is `prod(1 + r) - 1` over its days, dated at the last
/// observed day of that month. Input must be ordered by date.
pub fn aggregate_daily_to_monthly(daily: &[DatedReturn]) -> Vec<DatedReturn> {
    let mut monthly: Vec<DatedReturn> = Vec::new();
    let mut current: Option<((i32, u32), NaiveDate, f64)> = None;

    for point in daily {
        let key = (point.date.year(), point.date.month());
        if let Some((month, last_date, growth)) = current.as_mut() {
            if *month == key {
                *growth *= 1.0 + point.value;
                *last_date = point.date;
                continue;
            }
        }
        if let Some((_, last_date, growth)) = current.take() {
            monthly.push(DatedReturn::new(last_date, growth - 1.0));
        }
        current = Some((key, point.date, 1.0 + point.value));
    }
    if let Some((_, last_date, growth)) = current {
        monthly.push(DatedReturn::new(last_date, growth - 1.0));
    }
    monthly
}

/// `prod(1 + r) - 1`. Zero for an empty slice.
pub fn compounded_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |nav, r| nav * (1.0 + r)) - 1.0
}

/// `sum(r)`. Zero for an empty slice.
pub fn simple_return(returns: &[f64]) -> f64 {
    returns.iter().sum()
}

/// Compound annual growth rate of `total_return` earned over `[start, end]`.
///
/// Years are `(end - start).days / 365.25`. `None` when the span is not
/// positive or the total loss exceeds 100% (no real root).
pub fn cagr(total_return: f64, start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let days = (end - start).num_days();
    let growth = 1.0 + total_return;
    if days <= 0 || growth < 0.0 {
        return None;
    }
    let years = days as f64 / DAYS_PER_YEAR;
    Some(growth.powf(1.0 / years) - 1.0)
}

/// Largest peak-to-trough decline of a compounded NAV, as a positive fraction of the peak.
///
/// The NAV starts at 1.0 and that starting value counts as the first peak, so a
/// loss in the very first period is a drawdown.
pub fn max_drawdown_compounded(returns: &[f64]) -> f64 {
    let mut nav = 1.0_f64;
    let mut peak = nav;
    let mut max_drawdown = 0.0_f64;
    for r in returns {
        nav *= 1.0 + r;
        peak = peak.max(nav);
        max_drawdown = max_drawdown.max((peak - nav) / peak);
    }
    max_drawdown
}

/// Same as [`max_drawdown_compounded`] over an additive NAV (`1 + sum(r)`).
pub fn max_drawdown_simple(returns: &[f64]) -> f64 {
    let mut nav = 1.0_f64;
    let mut peak = nav;
    let mut max_drawdown = 0.0_f64;
    for r in returns {
        nav += r;
        peak = peak.max(nav);
        max_drawdown = max_drawdown.max((peak - nav) / peak);
    }
    max_drawdown
}

/// Root-mean-square of the negative part of each return, over all observations.
///
/// Positive periods contribute zero rather than being dropped.
pub fn downside_deviation(returns: &[f64]) -> Option<f64> {
    let n = returns.len();
    if n == 0 {
        return None;
    }
    let sum_sq: f64 = returns.iter().map(|r| r.min(0.0).powi(2)).sum();
    Some((sum_sq / n as f64).sqrt())
}

/// Evenly spaced thresholds from `start` to `end`, both included.
///
/// A single point yields `[start]`; zero points yield an empty grid.
pub fn threshold_grid(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

pub fn values(points: &[DatedReturn]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn sample_std_dev_uses_n_minus_one() {
        let std = sample_std_dev(&[0.01, -0.005, 0.02]).unwrap();
        let avg = 0.025 / 3.0;
        let expected = (((0.01_f64 - avg).powi(2) + (-0.005_f64 - avg).powi(2) + (0.02_f64 - avg).powi(2))
            / 2.0)
            .sqrt();
        assert_close(std, expected);
        assert_eq!(sample_std_dev(&[0.03]), Some(0.0));
        assert_eq!(sample_std_dev(&[]), None);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn daily_returns_compound_into_calendar_months() {
        let daily = vec![
            DatedReturn::new(d(2020, 1, 2), 0.01),
            DatedReturn::new(d(2020, 1, 3), -0.005),
            DatedReturn::new(d(2020, 1, 6), 0.02),
            DatedReturn::new(d(2020, 2, 3), 0.01),
        ];
        let monthly = aggregate_daily_to_monthly(&daily);

        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].date, d(2020, 1, 6));
        assert_close(monthly[0].value, 1.01 * 0.995 * 1.02 - 1.0);
        assert_eq!(monthly[1].date, d(2020, 2, 3));
        assert_close(monthly[1].value, 0.01);
        assert!(aggregate_daily_to_monthly(&[]).is_empty());
    }

    #[test]
    fn same_month_in_different_years_is_not_merged() {
        let daily = vec![
            DatedReturn::new(d(2019, 3, 29), 0.01),
            DatedReturn::new(d(2020, 3, 2), 0.02),
        ];
        assert_eq!(aggregate_daily_to_monthly(&daily).len(), 2);
    }

    #[test]
    fn drawdown_counts_base_as_first_peak() {
        assert_close(max_drawdown_compounded(&[-0.1]), 0.1);
        assert_close(max_drawdown_compounded(&[0.1, -0.1, 0.05]), 0.1);
        assert_close(max_drawdown_compounded(&[0.01, 0.02]), 0.0);

        // 1.0 -> 1.2 -> 0.9 -> 1.0
        assert_close(max_drawdown_simple(&[0.2, -0.3, 0.1]), 0.3 / 1.2);
    }

    #[test]
    fn cagr_over_one_year_equals_total_return() {
        let value = cagr(0.10, d(2021, 1, 1), d(2022, 1, 1)).unwrap();
        assert_close(value, 1.10_f64.powf(365.25 / 365.0) - 1.0);
        assert_eq!(cagr(0.10, d(2021, 1, 1), d(2021, 1, 1)), None);
        assert_eq!(cagr(-1.5, d(2021, 1, 1), d(2022, 1, 1)), None);
    }

    #[test]
    fn downside_deviation_averages_over_all_periods() {
        let value = downside_deviation(&[0.02, -0.02, 0.01, -0.04]).unwrap();
        assert_close(value, ((0.0004 + 0.0016) / 4.0_f64).sqrt());
        assert_eq!(downside_deviation(&[0.01, 0.02]), Some(0.0));
    }

    #[test]
    fn threshold_grid_is_inclusive_and_evenly_spaced() {
        let grid = threshold_grid(0.0, 2.0, 20);
        assert_eq!(grid.len(), 20);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[19], 2.0);
        assert_close(grid[1] - grid[0], 2.0 / 19.0);
        assert_eq!(threshold_grid(1.0, 3.0, 1), vec![1.0]);
        assert!(threshold_grid(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn annualization_scales_by_root_of_trading_days() {
        assert_close(annualize_daily_std(0.01, 252), 0.01 * 252.0_f64.sqrt());
    }
}
