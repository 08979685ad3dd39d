//! Terminal tables for the report commands.

use crate::{RollingCagrCurve, WindowNavCurve, WindowStatistics};
use analytics::EventProbabilityData;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;
use windowing::WindowDefinition;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn money(value: Decimal) -> String {
    format!("${}", value.round_dp(0))
}

fn dollars(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("${v:.0}"))
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn windows_table(windows: &[WindowDefinition]) -> Table {
    let mut table = new_table(vec!["#", "Name", "Start", "End", "Days", "Partial", "Borrowed"]);
    for window in windows {
        let borrowed = window
            .borrowed_range()
            .map_or_else(|| "-".to_string(), |(start, end)| format!("{start} to {end}"));
        table.add_row(vec![
            Cell::new(window.index.map_or_else(String::new, |i| i.to_string())),
            Cell::new(window.name.clone().unwrap_or_default()),
            Cell::new(window.start_date),
            Cell::new(window.end_date),
            right(window.span_days().to_string()),
            Cell::new(if window.is_partial { "yes" } else { "" }),
            Cell::new(borrowed),
        ]);
    }
    table
}

pub fn statistics_table(rows: &[WindowStatistics]) -> Table {
    let mut table = new_table(vec![
        "Window", "Entity", "Months", "Mean", "Std Dev", "CAGR", "Cum. (comp.)", "Max DD", "Sharpe",
        "Sortino", "Basis",
    ]);
    for row in rows {
        let stats = &row.statistics;
        let mut window = row.window.name.clone().unwrap_or_default();
        if !row.data_is_complete {
            window.push_str(" *");
        }
        table.add_row(vec![
            Cell::new(window),
            Cell::new(row.entity),
            right(stats.count.to_string()),
            right(pct(stats.mean)),
            right(pct(stats.std_dev)),
            right(pct(stats.cagr)),
            right(pct(stats.cumulative_return_compounded)),
            right(pct(stats.max_drawdown_compounded)),
            right(ratio(stats.sharpe)),
            right(ratio(stats.sortino)),
            Cell::new(stats.methodology),
        ]);
    }
    table
}

pub fn event_probability_summary(data: &EventProbabilityData) -> String {
    let target = data
        .target_std_dev
        .map_or_else(|| "none".to_string(), |t| format!("{:.2}%", t * 100.0));
    format!(
        "Thresholds 0..{:.0} std: {} days ({} up, {} down), realized std {:.2}% annualized, target daily std {}, fund {}",
        data.x_values.last().copied().unwrap_or_default(),
        data.total_days,
        data.gain_days,
        data.loss_days,
        data.realized_std_dev * 100.0,
        target,
        money(data.fund_size),
    )
}

pub fn event_probability_table(data: &EventProbabilityData) -> Table {
    let mut table = new_table(vec!["X (std)", "P[Gain > X]", "P[Loss < -X]", "P[Normal]"]);
    for (i, x) in data.x_values.iter().enumerate() {
        table.add_row(vec![
            right(format!("{x:.2}")),
            right(format!("{:.4}%", data.p_gains[i] * 100.0)),
            right(format!("{:.4}%", data.p_losses[i] * 100.0)),
            right(format!("{:.6}%", data.p_normal[i] * 100.0)),
        ]);
    }
    table
}

pub fn rolling_cagr_table(curves: &[RollingCagrCurve]) -> Table {
    let mut table = new_table(vec!["Entity", "Windows", "Min", "Max", "Latest", "As of"]);
    for curve in curves {
        let values: Vec<f64> = curve.points.iter().filter_map(|p| p.cagr).collect();
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);
        let latest = curve.points.last();
        table.add_row(vec![
            Cell::new(curve.entity),
            right(values.len().to_string()),
            right(pct(min)),
            right(pct(max)),
            right(pct(latest.and_then(|p| p.cagr))),
            Cell::new(latest.map_or_else(String::new, |p| p.date.to_string())),
        ]);
    }
    table
}

pub fn nav_table(rows: &[WindowNavCurve]) -> Table {
    let mut table = new_table(vec![
        "Window", "Entity", "Start NAV", "Points", "End (comp.)", "End (add.)", "Borrowed from", "Basis",
    ]);
    for row in rows {
        let curve = &row.curve;
        let last = curve.last();
        let borrowed_from = curve
            .borrowed()
            .get(1)
            .map_or_else(|| "-".to_string(), |point| point.date.to_string());
        table.add_row(vec![
            Cell::new(row.window.name.clone().unwrap_or_default()),
            Cell::new(curve.entity),
            right(money(curve.starting_nav)),
            right(curve.points.len().to_string()),
            right(dollars(last.map(|p| p.compounded))),
            right(dollars(last.map(|p| p.additive))),
            Cell::new(borrowed_from),
            Cell::new(curve.methodology),
        ]);
    }
    table
}
