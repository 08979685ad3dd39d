//! Window generation policies.
//!
//! Every generator is pure and deterministic, and returns its windows in
//! chronological order with `index` set to the position in that order.

use crate::definition::{BespokeWindow, WindowDefinition, WindowTemplate};
use crate::error::WindowError;
use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

/// Non-overlapping windows of `window_length_years` aligned to calendar years.
///
/// Windows start on 1 January of years that are multiples of the window length
/// (5-year windows align to 1970, 1975, ...) regardless of where the data starts.
/// Only windows fully contained in `[start_date, end_date]` are emitted.
pub fn non_overlapping_snapped(
    start_date: NaiveDate,
    end_date: NaiveDate,
    window_length_years: u32,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(start_date, end_date)?;
    let length = i32::try_from(validate_length(window_length_years, "window_length_years")?)
        .map_err(|_| WindowError::InvalidParameter("window_length_years is too large".to_string()))?;

    let mut windows = Vec::new();
    let mut current_year = start_date.year().div_euclid(length) * length;

    loop {
        let win_start = ymd(current_year, 1, 1, start_date)?;
        if win_start > end_date {
            break;
        }
        let last_year = current_year + length - 1;
        let win_end = ymd(last_year, 12, 31, start_date)?;

        if win_start >= start_date && win_end <= end_date {
            let name = format!("{current_year}-{last_year}");
            windows.push(template.stamp(win_start, win_end, name, windows.len()));
        }
        current_year += length;
    }

    debug!(count = windows.len(), window_length_years, "Generated snapped windows");
    Ok(windows)
}

/// Non-overlapping windows of `window_length_months` starting exactly at `start_date`.
///
/// Each window ends the day before the same day-of-month `window_length_months`
/// later. The remainder after the last full window is emitted clipped to
/// `end_date` and flagged `is_partial`; a zero-day remainder emits nothing.
pub fn non_overlapping_not_snapped(
    start_date: NaiveDate,
    end_date: NaiveDate,
    window_length_months: u32,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(start_date, end_date)?;
    let months = validate_length(window_length_months, "window_length_months")?;

    let mut windows = Vec::new();
    let mut current_start = start_date;

    while current_start <= end_date {
        let nominal_end = pred(add_months(current_start, months)?)?;
        let (win_end, is_partial) = if nominal_end > end_date {
            (end_date, true)
        } else {
            (nominal_end, false)
        };

        let index = windows.len();
        let name = format!(
            "Period {} ({} to {})",
            index + 1,
            current_start.format("%Y-%m"),
            win_end.format("%Y-%m")
        );
        let mut window = template.stamp(current_start, win_end, name, index);
        window.is_partial = is_partial;
        windows.push(window);

        match win_end.succ_opt() {
            Some(next) => current_start = next,
            None => break,
        }
    }

    debug!(count = windows.len(), window_length_months, "Generated unsnapped windows");
    Ok(windows)
}

/// Non-overlapping windows of `window_length_years`, tiled backwards from `latest_date`.
///
/// The most recent window always ends at `latest_date` and has full length. The
/// earliest window absorbs whatever remains and may be shorter; it is flagged
/// `is_partial`.
///
/// With `borrow_mode`, a short earliest window (that has a successor) has its end
/// pushed forward by exactly its shortfall in days, so its span equals a full
/// window. The extension duplicates the start of the next window and is recorded
/// in the borrowed-range fields. No other window moves.
pub fn non_overlapping_reverse(
    earliest_date: NaiveDate,
    latest_date: NaiveDate,
    window_length_years: u32,
    borrow_mode: bool,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(earliest_date, latest_date)?;
    let months = validate_length(window_length_years, "window_length_years")?
        .checked_mul(12)
        .ok_or_else(|| WindowError::InvalidParameter("window_length_years is too large".to_string()))?;

    // (start, end, is_partial), newest first.
    let mut spans: Vec<(NaiveDate, NaiveDate, bool)> = Vec::new();
    let mut current_end = Some(latest_date);

    while let Some(end) = current_end {
        let Some(win_start) = full_window_start(end, months) else {
            break;
        };
        if win_start < earliest_date {
            break;
        }
        spans.push((win_start, end, false));
        current_end = win_start.pred_opt();
    }

    if let Some(end) = current_end {
        if end >= earliest_date {
            spans.push((earliest_date, end, true));
        }
    }

    spans.reverse();
    let mut windows: Vec<WindowDefinition> = spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end, is_partial))| {
            let mut window = template.stamp(start, end, period_ending_name(end), index);
            window.is_partial = is_partial;
            window
        })
        .collect();

    if borrow_mode && windows.len() > 1 && windows[0].is_partial {
        let earliest = &mut windows[0];
        let ideal_start = full_window_start(earliest.end_date, months)
            .ok_or(WindowError::DateOutOfRange(earliest.end_date))?;
        let shortfall = (earliest.start_date - ideal_start).num_days();

        if shortfall > 0 {
            let borrowed_start = earliest
                .end_date
                .succ_opt()
                .ok_or(WindowError::DateOutOfRange(earliest.end_date))?;
            let new_end = earliest
                .end_date
                .checked_add_days(Days::new(shortfall as u64))
                .ok_or(WindowError::DateOutOfRange(earliest.end_date))?;

            debug!(
                shortfall_days = shortfall,
                %borrowed_start,
                borrowed_end = %new_end,
                "Extending earliest reverse window in borrow mode"
            );

            earliest.end_date = new_end;
            earliest.borrowed_data_start_date = Some(borrowed_start);
            earliest.borrowed_data_end_date = Some(new_end);
            earliest.is_partial = false;
            earliest.name = Some(period_ending_name(new_end));
        }
    }

    debug!(count = windows.len(), window_length_years, borrow_mode, "Generated reverse windows");
    Ok(windows)
}

/// Overlapping rolling windows of `window_length_months`, sliding forward `slide_months`.
///
/// Window `k` starts `k * slide_months` after `start_date`; generation stops at
/// the first window that would end after `end_date`.
pub fn overlapping(
    start_date: NaiveDate,
    end_date: NaiveDate,
    window_length_months: u32,
    slide_months: u32,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(start_date, end_date)?;
    let months = validate_length(window_length_months, "window_length_months")?;
    let slide = validate_length(slide_months, "slide_months")?;

    let mut windows = Vec::new();
    for k in 0u32.. {
        let Some(offset) = k.checked_mul(slide) else { break };
        let win_start = add_months(start_date, offset)?;
        let win_end = pred(add_months(win_start, months)?)?;
        if win_end > end_date {
            break;
        }
        let name = format!("Rolling {months}M ({})", win_start.format("%Y-%m"));
        windows.push(template.stamp(win_start, win_end, name, windows.len()));
    }

    debug!(count = windows.len(), window_length_months, slide_months, "Generated rolling windows");
    Ok(windows)
}

/// Trailing windows of `window_length_months`: the most recent ends exactly at
/// `end_date` and each earlier one ends `slide_months` before the next.
///
/// Generation stops at the first window that would start before `earliest_date`.
/// The result is returned oldest first.
pub fn overlapping_reverse(
    earliest_date: NaiveDate,
    end_date: NaiveDate,
    window_length_months: u32,
    slide_months: u32,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(earliest_date, end_date)?;
    let months = validate_length(window_length_months, "window_length_months")?;
    let slide = validate_length(slide_months, "slide_months")?;

    let mut spans = Vec::new();
    for k in 0u32.. {
        let Some(offset) = k.checked_mul(slide) else { break };
        let Some(win_end) = end_date.checked_sub_months(Months::new(offset)) else {
            break;
        };
        let Some(win_start) = full_window_start(win_end, months) else {
            break;
        };
        if win_start < earliest_date {
            break;
        }
        spans.push((win_start, win_end));
    }

    spans.reverse();
    let windows: Vec<WindowDefinition> = spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| {
            let name = format!("Trailing {months}M (as of {})", end.format("%Y-%m"));
            template.stamp(start, end, name, index)
        })
        .collect();

    debug!(count = windows.len(), window_length_months, slide_months, "Generated trailing windows");
    Ok(windows)
}

/// Overlapping windows of `window_length_months` sliding forward by `slide_days`.
///
/// Same stopping rule as [`overlapping`], but the step is counted in days so
/// curves such as rolling CAGR can be sampled daily.
pub fn overlapping_by_days(
    start_date: NaiveDate,
    end_date: NaiveDate,
    window_length_months: u32,
    slide_days: u32,
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    validate_range(start_date, end_date)?;
    let months = validate_length(window_length_months, "window_length_months")?;
    let slide = validate_length(slide_days, "slide_days")?;

    let mut windows = Vec::new();
    let mut win_start = start_date;
    loop {
        let win_end = pred(add_months(win_start, months)?)?;
        if win_end > end_date {
            break;
        }
        let name = format!("Rolling {months}M ({})", win_start.format("%Y-%m-%d"));
        windows.push(template.stamp(win_start, win_end, name, windows.len()));

        match win_start.checked_add_days(Days::new(u64::from(slide))) {
            Some(next) => win_start = next,
            None => break,
        }
    }

    debug!(count = windows.len(), window_length_months, slide_days, "Generated day-sliced windows");
    Ok(windows)
}

/// Wraps explicit `(name, start, end)` periods as definitions, in the given order.
pub fn bespoke(
    periods: &[BespokeWindow],
    template: &WindowTemplate,
) -> Result<Vec<WindowDefinition>, WindowError> {
    periods
        .iter()
        .enumerate()
        .map(|(index, period)| {
            validate_range(period.start_date, period.end_date)?;
            Ok(template.stamp(period.start_date, period.end_date, period.name.clone(), index))
        })
        .collect()
}

fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), WindowError> {
    if start > end {
        return Err(WindowError::InvalidParameter(format!(
            "start date {start} is after end date {end}"
        )));
    }
    Ok(())
}

fn validate_length(value: u32, what: &str) -> Result<u32, WindowError> {
    if value == 0 {
        return Err(WindowError::InvalidParameter(format!("{what} must be positive")));
    }
    Ok(value)
}

fn ymd(year: i32, month: u32, day: u32, near: NaiveDate) -> Result<NaiveDate, WindowError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(WindowError::DateOutOfRange(near))
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, WindowError> {
    date.checked_add_months(Months::new(months))
        .ok_or(WindowError::DateOutOfRange(date))
}

fn pred(date: NaiveDate) -> Result<NaiveDate, WindowError> {
    date.pred_opt().ok_or(WindowError::DateOutOfRange(date))
}

/// Start of the full-length window of `months` that ends on `end` (inclusive).
fn full_window_start(end: NaiveDate, months: u32) -> Option<NaiveDate> {
    end.checked_sub_months(Months::new(months))?.succ_opt()
}

fn period_ending_name(end: NaiveDate) -> String {
    format!("Period ending {}", end.format("%Y-%m-%d"))
}
