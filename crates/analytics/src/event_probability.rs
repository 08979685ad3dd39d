//! Tail-risk analysis: how often a program's daily P&L exceeds `x` realized
//! standard deviations, against what a normal distribution predicts.

use crate::engine::AnalyticsEngine;
use crate::error::AnalyticsError;
use crate::series;
use core_types::{EntityRef, ReturnStore};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};
use windowing::Window;

/// Empirical and theoretical exceedance probabilities over a threshold grid.
///
/// `p_gains`, `p_losses` and `p_normal` are positionally aligned with
/// `x_values` and non-increasing in `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProbabilityData {
    pub x_values: Vec<f64>,
    /// `P[X > x]` over all days.
    pub p_gains: Vec<f64>,
    /// `P[X < -x]` over all days.
    pub p_losses: Vec<f64>,
    /// Standard normal survival `1 - Phi(x)`.
    pub p_normal: Vec<f64>,

    pub total_days: usize,
    pub gain_days: usize,
    pub loss_days: usize,

    /// Realized daily standard deviation used for normalization.
    pub realized_daily_std_dev: f64,
    /// Realized standard deviation, annualized. Reporting only.
    pub realized_std_dev: f64,
    /// The program's target standard deviation, if one is configured. Never
    /// used for normalization.
    pub target_std_dev: Option<f64>,
    pub fund_size: Decimal,
}

/// One day's return expressed in dollars and in realized standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPnl {
    pub pnl: f64,
    pub std_dollars: f64,
    pub x: f64,
}

/// `pnl = r * fund_size`, `std_dollars = daily_std * fund_size`, `x = pnl / std_dollars`.
///
/// The mean is deliberately not subtracted: a profitable program keeps its drift,
/// which shows up as fatter gain tails than loss tails.
pub fn normalize_pnl(daily_return: f64, fund_size: f64, daily_std: f64) -> NormalizedPnl {
    let pnl = daily_return * fund_size;
    let std_dollars = daily_std * fund_size;
    NormalizedPnl {
        pnl,
        std_dollars,
        x: pnl / std_dollars,
    }
}

/// Counts days beyond each threshold on either side, divided by the total day count.
///
/// Returns `(p_gains, p_losses)` aligned with `x_values`. Empty input yields zeros.
pub fn tail_probabilities(normalized: &[f64], x_values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total = normalized.len();
    if total == 0 {
        return (vec![0.0; x_values.len()], vec![0.0; x_values.len()]);
    }
    let total = total as f64;

    x_values
        .iter()
        .map(|x| {
            let gains = normalized.iter().filter(|v| **v > *x).count() as f64;
            let losses = normalized.iter().filter(|v| **v < -*x).count() as f64;
            (gains / total, losses / total)
        })
        .unzip()
}

/// `1 - Phi(x)` for each threshold.
pub fn normal_survival(x_values: &[f64]) -> Result<Vec<f64>, AnalyticsError> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AnalyticsError::InvalidParameter(format!("standard normal: {e}")))?;
    Ok(x_values.iter().map(|x| normal.sf(*x)).collect())
}

impl AnalyticsEngine {
    /// Computes the event probability analysis for `entity` over `window`.
    ///
    /// # Arguments
    ///
    /// * `x_values` - Non-negative threshold multiples in ascending order. Repeats
    ///   are allowed and produce repeated rows.
    /// * `fund_size` - The dollar base P&L is expressed against; must be positive.
    /// * `target_std_dev` - Recorded on the result for reference only.
    ///
    /// # Errors
    ///
    /// `NotEnoughData` without daily returns, `UndefinedNormalization` when the
    /// realized standard deviation is zero (including a single observation),
    /// `InvalidThresholds` / `InvalidParameter` for malformed inputs.
    pub fn compute_event_probability_analysis<S: ReturnStore + ?Sized>(
        &self,
        window: &mut Window<'_, S>,
        entity: EntityRef,
        x_values: &[f64],
        fund_size: Decimal,
        target_std_dev: Option<f64>,
    ) -> Result<EventProbabilityData, AnalyticsError> {
        validate_thresholds(x_values)?;
        let fund = validate_fund_size(fund_size)?;
        if let Some(target) = target_std_dev {
            if !(target.is_finite() && target > 0.0) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "target standard deviation must be positive, got {target}"
                )));
            }
        }

        let daily = window.daily_series(entity)?;
        if daily.is_empty() {
            return Err(AnalyticsError::NotEnoughData(format!(
                "no daily returns for {entity} in window"
            )));
        }
        let returns = series::values(daily);

        let daily_std = series::sample_std_dev(&returns).unwrap_or(0.0);
        if !(daily_std.is_finite() && daily_std > 0.0) {
            return Err(AnalyticsError::UndefinedNormalization);
        }

        let normalized: Vec<f64> = returns
            .iter()
            .map(|r| normalize_pnl(*r, fund, daily_std).x)
            .collect();

        let gain_days = normalized.iter().filter(|x| **x > 0.0).count();
        let loss_days = normalized.iter().filter(|x| **x < 0.0).count();
        let (p_gains, p_losses) = tail_probabilities(&normalized, x_values);
        let p_normal = normal_survival(x_values)?;

        let realized_std_dev = series::annualize_daily_std(daily_std, self.trading_days_per_year());
        info!(
            %entity,
            total_days = normalized.len(),
            gain_days,
            loss_days,
            realized_std_dev,
            "Computed event probabilities"
        );
        debug!(thresholds = x_values.len(), daily_std, "Event probability normalization");

        Ok(EventProbabilityData {
            x_values: x_values.to_vec(),
            p_gains,
            p_losses,
            p_normal,
            total_days: normalized.len(),
            gain_days,
            loss_days,
            realized_daily_std_dev: daily_std,
            realized_std_dev,
            target_std_dev,
            fund_size,
        })
    }
}

/// Convenience wrapper for `AnalyticsEngine::default().compute_event_probability_analysis(..)`.
pub fn compute_event_probability_analysis<S: ReturnStore + ?Sized>(
    window: &mut Window<'_, S>,
    entity: EntityRef,
    x_values: &[f64],
    fund_size: Decimal,
    target_std_dev: Option<f64>,
) -> Result<EventProbabilityData, AnalyticsError> {
    AnalyticsEngine::default().compute_event_probability_analysis(
        window,
        entity,
        x_values,
        fund_size,
        target_std_dev,
    )
}

fn validate_thresholds(x_values: &[f64]) -> Result<(), AnalyticsError> {
    if x_values.is_empty() {
        return Err(AnalyticsError::InvalidThresholds("no thresholds given".to_string()));
    }
    if let Some(bad) = x_values.iter().find(|x| !(x.is_finite() && **x >= 0.0)) {
        return Err(AnalyticsError::InvalidThresholds(format!(
            "thresholds must be finite and non-negative, got {bad}"
        )));
    }
    if let Some(pair) = x_values.windows(2).find(|pair| pair[0] > pair[1]) {
        return Err(AnalyticsError::InvalidThresholds(format!(
            "thresholds must be ascending, got {} then {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

fn validate_fund_size(fund_size: Decimal) -> Result<f64, AnalyticsError> {
    if fund_size <= Decimal::ZERO {
        return Err(AnalyticsError::InvalidParameter(format!(
            "fund size must be positive, got {fund_size}"
        )));
    }
    fund_size.to_f64().ok_or_else(|| {
        AnalyticsError::InvalidParameter(format!("fund size {fund_size} is not representable"))
    })
}
