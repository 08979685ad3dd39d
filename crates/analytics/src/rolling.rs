use crate::series;
use chrono::NaiveDate;
use core_types::DatedReturn;
use serde::{Deserialize, Serialize};
use windowing::WindowDefinition;

/// One point of a rolling CAGR curve, dated at the end of its window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingCagrPoint {
    pub date: NaiveDate,
    /// `None` when the window holds no returns or its CAGR is undefined.
    pub cagr: Option<f64>,
}

/// CAGR of each window, sliced in memory out of one pre-fetched daily series.
///
/// `daily` must be ordered by date. Intended for dense window sets such as
/// `overlapping_by_days` output, where querying the store per window would
/// dominate the run time.
pub fn rolling_cagr_series(daily: &[DatedReturn], windows: &[WindowDefinition]) -> Vec<RollingCagrPoint> {
    windows
        .iter()
        .map(|window| {
            let slice = slice_between(daily, window.start_date, window.end_date);
            let cagr = if slice.is_empty() {
                None
            } else {
                let total = series::compounded_return(&series::values(slice));
                series::cagr(total, window.start_date, window.end_date)
            };
            RollingCagrPoint {
                date: window.end_date,
                cagr,
            }
        })
        .collect()
}

/// The sub-slice of a date-ordered series inside `[start, end]`.
pub fn slice_between(points: &[DatedReturn], start: NaiveDate, end: NaiveDate) -> &[DatedReturn] {
    let from = points.partition_point(|p| p.date < start);
    let to = points.partition_point(|p| p.date <= end);
    if from >= to { &[] } else { &points[from..to] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windowing::{WindowTemplate, overlapping_by_days};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily_from(start: NaiveDate, days: usize, value: f64) -> Vec<DatedReturn> {
        start
            .iter_days()
            .take(days)
            .map(|date| DatedReturn::new(date, value))
            .collect()
    }

    #[test]
    fn slicing_is_inclusive() {
        let daily = daily_from(d(2020, 1, 1), 10, 0.001);
        let slice = slice_between(&daily, d(2020, 1, 3), d(2020, 1, 5));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].date, d(2020, 1, 3));
        assert!(slice_between(&daily, d(2021, 1, 1), d(2021, 2, 1)).is_empty());
    }

    #[test]
    fn rolling_cagr_matches_per_window_computation() {
        let daily = daily_from(d(2020, 1, 1), 800, 0.0004);
        let windows = overlapping_by_days(
            d(2020, 1, 1),
            d(2022, 3, 10),
            12,
            30,
            &WindowTemplate::new(vec![1], vec![]),
        )
        .unwrap();

        let curve = rolling_cagr_series(&daily, &windows);
        assert_eq!(curve.len(), windows.len());

        for (point, window) in curve.iter().zip(&windows) {
            assert_eq!(point.date, window.end_date);
            let days = window.span_days() as usize;
            let total = 1.0004_f64.powi(days as i32) - 1.0;
            let expected = series::cagr(total, window.start_date, window.end_date).unwrap();
            assert!((point.cagr.unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn windows_without_data_have_no_value() {
        let daily = daily_from(d(2020, 1, 1), 5, 0.01);
        let windows = vec![
            WindowDefinition::new(d(2019, 1, 1), d(2019, 12, 31), vec![1], vec![]).unwrap(),
        ];
        let curve = rolling_cagr_series(&daily, &windows);
        assert_eq!(curve[0].cagr, None);
        assert_eq!(curve[0].date, d(2019, 12, 31));
    }
}
