//! Cumulative NAV curves for a single window, as plotted when several windows
//! are overlaid from a common starting NAV.

use crate::error::AnalyticsError;
use crate::report::Methodology;
use chrono::NaiveDate;
use core_types::{DatedReturn, EntityRef, ReturnStore};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;
use windowing::{SeriesResolution, Window, WindowDefinition};

/// NAV after one period's return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    /// Every return compounded on the running NAV.
    pub compounded: f64,
    /// Every return applied to the starting NAV only, so gains are never reinvested.
    pub additive: f64,
    /// Set when `date` lies in the window's borrowed range.
    pub borrowed: bool,
}

/// A window's NAV path for one entity, starting from `starting_nav` on the
/// day before the first return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavCurve {
    pub entity: EntityRef,
    pub methodology: Methodology,
    pub starting_nav: Decimal,
    pub points: Vec<NavPoint>,
}

impl NavCurve {
    /// Points backed by the window's own data.
    pub fn actual(&self) -> &[NavPoint] {
        &self.points[..self.borrowed_from()]
    }

    /// Points on borrowed data, led by the last actual point so the two
    /// segments join up. Empty when nothing is borrowed.
    pub fn borrowed(&self) -> &[NavPoint] {
        let from = self.borrowed_from();
        if from == self.points.len() {
            &[]
        } else {
            &self.points[from.saturating_sub(1)..]
        }
    }

    pub fn last(&self) -> Option<&NavPoint> {
        self.points.last()
    }

    // The borrowed range is always the tail of a window.
    fn borrowed_from(&self) -> usize {
        self.points.partition_point(|point| !point.borrowed)
    }
}

/// Builds NAV points from a date-ordered return series.
pub fn nav_points(returns: &[DatedReturn], starting_nav: f64, definition: &WindowDefinition) -> Vec<NavPoint> {
    let mut compounded = starting_nav;
    let mut additive = starting_nav;
    returns
        .iter()
        .map(|point| {
            compounded *= 1.0 + point.value;
            additive += starting_nav * point.value;
            NavPoint {
                date: point.date,
                compounded,
                additive,
                borrowed: definition.is_borrowed(point.date),
            }
        })
        .collect()
}

/// The cumulative NAV curve of `entity` over `window`.
///
/// Runs on daily returns when the window has any, otherwise on the monthly
/// series; an entity without data yields an empty curve marked `NoData`.
pub fn cumulative_nav_curve<S: ReturnStore + ?Sized>(
    window: &mut Window<'_, S>,
    entity: EntityRef,
    starting_nav: Decimal,
) -> Result<NavCurve, AnalyticsError> {
    if starting_nav <= Decimal::ZERO {
        return Err(AnalyticsError::InvalidParameter(format!(
            "starting NAV must be positive, got {starting_nav}"
        )));
    }
    let start = starting_nav.to_f64().ok_or_else(|| {
        AnalyticsError::InvalidParameter(format!("starting NAV {starting_nav} is not representable"))
    })?;

    let definition = window.definition().clone();
    let (methodology, points) = match window.resolve_series(entity)? {
        SeriesResolution::Daily(returns) => (Methodology::DailyFirst, nav_points(returns, start, &definition)),
        SeriesResolution::MonthlyFallback(returns) => {
            (Methodology::MonthlyFallback, nav_points(returns, start, &definition))
        }
        SeriesResolution::Empty => (Methodology::NoData, Vec::new()),
    };

    let curve = NavCurve {
        entity,
        methodology,
        starting_nav,
        points,
    };
    debug!(
        %entity,
        window = ?definition.name,
        points = curve.points.len(),
        borrowed = curve.borrowed().len().saturating_sub(1),
        "Built NAV curve"
    );
    Ok(curve)
}
