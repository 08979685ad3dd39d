use crate::error::AnalyticsError;
use crate::report::{Methodology, Statistics};
use crate::series::{self, MONTHS_PER_YEAR, TRADING_DAYS_PER_YEAR};
use chrono::NaiveDate;
use core_types::{DatedReturn, EntityRef, ReturnStore};
use tracing::{debug, warn};
use windowing::{SeriesResolution, Window};

/// A stateless calculator for deriving performance statistics from a window's returns.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    trading_days_per_year: u32,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different daily annualization factor than the standard 252.
    pub fn with_trading_days_per_year(trading_days_per_year: u32) -> Result<Self, AnalyticsError> {
        if trading_days_per_year == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        Ok(Self { trading_days_per_year })
    }

    pub fn trading_days_per_year(&self) -> u32 {
        self.trading_days_per_year
    }

    /// The main entry point for calculating statistics.
    ///
    /// # Arguments
    ///
    /// * `window` - The window to read from. Series fetched here stay cached in it.
    /// * `entity` - The manager (aggregated over its traded markets) or benchmark.
    ///
    /// # Returns
    ///
    /// The `Statistics` record. An entity without data in the window gets an
    /// empty record (`Methodology::NoData`), not an error; callers that need
    /// full coverage should check `Window::data_is_complete` first.
    pub fn compute_statistics<S: ReturnStore + ?Sized>(
        &self,
        window: &mut Window<'_, S>,
        entity: EntityRef,
    ) -> Result<Statistics, AnalyticsError> {
        let (start, end) = (window.start_date(), window.end_date());

        let stats = match window.resolve_series(entity)? {
            SeriesResolution::Daily(daily) => self.daily_first(daily, start, end),
            SeriesResolution::MonthlyFallback(monthly) => {
                warn!(
                    %entity,
                    %start,
                    %end,
                    "No daily data; standard deviation estimated from monthly returns"
                );
                self.monthly_fallback(monthly, start, end)
            }
            SeriesResolution::Empty => Statistics::empty(),
        };

        debug!(
            %entity,
            methodology = %stats.methodology,
            months = stats.count,
            days = stats.daily_count,
            "Computed statistics"
        );
        Ok(stats)
    }

    /// Volatility from daily returns, everything else from months compounded out of them.
    fn daily_first(&self, daily: &[DatedReturn], start: NaiveDate, end: NaiveDate) -> Statistics {
        let daily_values = series::values(daily);
        let daily_std = series::sample_std_dev(&daily_values);
        let annualized =
            daily_std.map(|std| series::annualize_daily_std(std, self.trading_days_per_year));

        let monthly = series::aggregate_daily_to_monthly(daily);
        let mut stats = monthly_figures(&series::values(&monthly), start, end, annualized);
        stats.methodology = Methodology::DailyFirst;
        stats.daily_count = daily.len();
        stats.daily_std_dev_raw = daily_std;
        stats
    }

    fn monthly_fallback(&self, monthly: &[DatedReturn], start: NaiveDate, end: NaiveDate) -> Statistics {
        let monthly_values = series::values(monthly);
        let annualized =
            series::sample_std_dev(&monthly_values).map(|std| std * MONTHS_PER_YEAR.sqrt());

        let mut stats = monthly_figures(&monthly_values, start, end, annualized);
        stats.methodology = Methodology::MonthlyFallback;
        stats
    }
}

/// Convenience wrapper for `AnalyticsEngine::default().compute_statistics(..)`.
pub fn compute_statistics<S: ReturnStore + ?Sized>(
    window: &mut Window<'_, S>,
    entity: EntityRef,
) -> Result<Statistics, AnalyticsError> {
    AnalyticsEngine::default().compute_statistics(window, entity)
}

/// Fills every field derived from the monthly series plus the ratios that
/// depend on the annualized `std_dev`.
fn monthly_figures(
    monthly: &[f64],
    start: NaiveDate,
    end: NaiveDate,
    std_dev: Option<f64>,
) -> Statistics {
    let mut stats = Statistics::empty();
    if monthly.is_empty() {
        return stats;
    }

    stats.count = monthly.len();
    stats.mean = series::mean(monthly);
    stats.median = series::median(monthly);
    stats.std_dev = std_dev;

    let compounded = series::compounded_return(monthly);
    stats.cumulative_return_compounded = Some(compounded);
    stats.cumulative_return_simple = Some(series::simple_return(monthly));
    stats.cagr = series::cagr(compounded, start, end);

    stats.max_drawdown_compounded = Some(series::max_drawdown_compounded(monthly));
    stats.max_drawdown_simple = Some(series::max_drawdown_simple(monthly));

    // --- Ratios ---
    if let Some(mean) = stats.mean {
        let annual_return = mean * MONTHS_PER_YEAR;
        stats.sharpe = std_dev
            .filter(|std| *std > 0.0)
            .map(|std| annual_return / std);
        stats.sortino = series::downside_deviation(monthly)
            .map(|downside| downside * MONTHS_PER_YEAR.sqrt())
            .filter(|downside| *downside > 0.0)
            .map(|downside| annual_return / downside);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{InMemoryReturnStore, Market, Resolution};
    use windowing::WindowDefinition;

    const PROGRAM: i64 = 1;
    const BENCHMARK: i64 = 50;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-10,
            "expected {expected}, got {actual}"
        );
    }

    fn store() -> InMemoryReturnStore {
        let mut store = InMemoryReturnStore::new();
        store.register_market(Market::traded(1, "Bonds"));
        store.register_market(Market::traded(2, "Equities"));
        store.register_market(Market::benchmark(BENCHMARK, "SP500"));
        store
    }

    fn january() -> WindowDefinition {
        WindowDefinition::new(d(2020, 1, 1), d(2020, 1, 31), vec![PROGRAM], vec![BENCHMARK]).unwrap()
    }

    #[test]
    fn single_month_of_daily_returns() {
        let mut store = store();
        for (day, value) in [(2, 0.01), (3, -0.005), (6, 0.02)] {
            store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 1, day), value).unwrap();
        }
        let mut window = Window::new(january(), &store);

        let stats = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();

        let monthly = 1.01 * 0.995 * 1.02 - 1.0;
        let daily_std = series::sample_std_dev(&[0.01, -0.005, 0.02]).unwrap();
        assert_eq!(stats.methodology, Methodology::DailyFirst);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.daily_count, 3);
        assert_close(stats.mean.unwrap(), monthly);
        assert_close(stats.median.unwrap(), monthly);
        assert_close(stats.cumulative_return_compounded.unwrap(), monthly);
        assert_close(stats.daily_std_dev_raw.unwrap(), daily_std);
        assert_close(stats.std_dev.unwrap(), daily_std * 252.0_f64.sqrt());
        assert_close(stats.max_drawdown_compounded.unwrap(), 0.0);
        assert_close(
            stats.cagr.unwrap(),
            (1.0 + monthly).powf(365.25 / 30.0) - 1.0,
        );
        assert_close(stats.sharpe.unwrap(), monthly * 12.0 / stats.std_dev.unwrap());
        assert_eq!(stats.sortino, None);
    }

    #[test]
    fn manager_statistics_ignore_benchmark_markets() {
        let mut store = store();
        store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 1, 2), 0.01).unwrap();
        store.insert(PROGRAM, 2, Resolution::Daily, d(2020, 1, 2), 0.01).unwrap();
        store.insert(PROGRAM, BENCHMARK, Resolution::Daily, d(2020, 1, 2), 0.30).unwrap();
        let mut window = Window::new(january(), &store);

        let manager = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        assert_close(manager.cumulative_return_compounded.unwrap(), 0.02);

        let benchmark = compute_statistics(&mut window, EntityRef::benchmark(BENCHMARK)).unwrap();
        assert_close(benchmark.cumulative_return_compounded.unwrap(), 0.30);
    }

    #[test]
    fn single_observation_has_zero_std_and_no_ratios() {
        let mut store = store();
        store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 1, 2), 0.01).unwrap();
        let mut window = Window::new(january(), &store);

        let stats = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        assert_eq!(stats.std_dev, Some(0.0));
        assert_eq!(stats.daily_std_dev_raw, Some(0.0));
        assert_eq!(stats.sharpe, None);
        assert_eq!(stats.sortino, None);
    }

    #[test]
    fn monthly_only_entity_falls_back_and_flags_std_dev() {
        let mut store = store();
        let returns = [0.02, -0.01, 0.03, -0.02];
        for (i, value) in returns.iter().enumerate() {
            let month_end = d(2020, i as u32 + 2, 1).pred_opt().unwrap();
            store.insert(PROGRAM, 1, Resolution::Monthly, month_end, *value).unwrap();
        }
        let definition =
            WindowDefinition::new(d(2020, 1, 1), d(2020, 4, 30), vec![PROGRAM], vec![]).unwrap();
        let mut window = Window::new(definition, &store);

        let stats = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();

        assert_eq!(stats.methodology, Methodology::MonthlyFallback);
        assert!(stats.std_dev_is_approximate());
        assert_eq!(stats.count, 4);
        assert_eq!(stats.daily_count, 0);
        assert_eq!(stats.daily_std_dev_raw, None);
        assert_close(
            stats.std_dev.unwrap(),
            series::sample_std_dev(&returns).unwrap() * 12.0_f64.sqrt(),
        );
        assert_close(stats.cumulative_return_simple.unwrap(), 0.02);

        // 1.0 -> 1.02 -> 1.0098 -> 1.040094 -> 1.01929212
        assert_close(stats.max_drawdown_compounded.unwrap(), 0.02);
        let downside = ((0.0001 + 0.0004) / 4.0_f64).sqrt() * 12.0_f64.sqrt();
        assert_close(stats.sortino.unwrap(), stats.mean.unwrap() * 12.0 / downside);
    }

    #[test]
    fn absent_data_yields_empty_record() {
        let store = store();
        let mut window = Window::new(january(), &store);
        let stats = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        assert_eq!(stats, Statistics::empty());
        assert!(!stats.has_data());
    }

    #[test]
    fn recomputing_on_the_same_window_is_idempotent_and_cached() {
        let mut store = store();
        for day in 1..=28 {
            let value = if day % 3 == 0 { -0.004 } else { 0.003 };
            store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 2, day), value).unwrap();
        }
        let definition =
            WindowDefinition::new(d(2020, 2, 1), d(2020, 2, 29), vec![PROGRAM], vec![]).unwrap();
        let mut window = Window::new(definition, &store);

        let first = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        let second = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        assert_eq!(first, second);
        assert_eq!(window.fetch_count(), 1);
    }

    #[test]
    fn custom_annualization_factor() {
        assert!(AnalyticsEngine::with_trading_days_per_year(0).is_err());

        let mut store = store();
        store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 1, 2), 0.01).unwrap();
        store.insert(PROGRAM, 1, Resolution::Daily, d(2020, 1, 3), -0.01).unwrap();
        let mut window = Window::new(january(), &store);

        let engine = AnalyticsEngine::with_trading_days_per_year(260).unwrap();
        let stats = engine
            .compute_statistics(&mut window, EntityRef::manager(PROGRAM))
            .unwrap();
        assert_close(
            stats.std_dev.unwrap(),
            stats.daily_std_dev_raw.unwrap() * 260.0_f64.sqrt(),
        );
    }

    #[test]
    fn daily_history_starting_mid_window_is_flagged_incomplete() {
        let mut store = store();
        for year in 2010..=2016 {
            for month in 1..=12 {
                store.insert(PROGRAM, 1, Resolution::Monthly, d(year, month, 28), 0.01).unwrap();
            }
        }
        let mut date = d(2016, 7, 1);
        while date <= d(2016, 12, 30) {
            store.insert(PROGRAM, 1, Resolution::Daily, date, 0.001).unwrap();
            date = date.succ_opt().unwrap();
        }
        let definition =
            WindowDefinition::new(d(2016, 1, 1), d(2016, 12, 31), vec![PROGRAM], vec![]).unwrap();
        let mut window = Window::new(definition, &store);

        let stats = compute_statistics(&mut window, EntityRef::manager(PROGRAM)).unwrap();
        assert_eq!(stats.methodology, Methodology::DailyFirst);
        assert_eq!(stats.count, 6);
        assert!(!window.data_is_complete().unwrap());
    }
}
