//! # Analytics Engine
//!
//! This crate turns a window's return series into performance statistics and
//! tail-risk measurements.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It reads data only through a
//!   `windowing::Window`, which in turn reads through the `ReturnStore` trait
//!   from `core-types` (Layer 0).
//! - **Daily First:** Volatility is always measured on daily returns when they
//!   exist; every other figure comes from calendar months compounded out of
//!   those days. Monthly-only entities fall back to monthly data, and the
//!   resulting record says so.
//! - **Stateless Calculation:** The `AnalyticsEngine` holds only its annualization
//!   factor. The same window and entity always produce the same output.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`, `compute_statistics`: the statistics pipeline.
//! - `Statistics`, `Methodology`: the resulting record and its provenance.
//! - `compute_event_probability_analysis`, `EventProbabilityData`: empirical vs
//!   normal exceedance probabilities of normalized daily P&L.
//! - `rolling_cagr_series`: rolling CAGR from one pre-fetched series.
//! - `cumulative_nav_curve`: a window's compounded and additive NAV path, with
//!   borrowed data flagged.
//! - `series`: the numeric building blocks (aggregation, drawdown, CAGR, grids).
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod event_probability;
pub mod nav;
pub mod report;
pub mod rolling;
pub mod series;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, compute_statistics};
pub use error::AnalyticsError;
pub use event_probability::{EventProbabilityData, compute_event_probability_analysis};
pub use nav::{NavCurve, NavPoint, cumulative_nav_curve};
pub use report::{Methodology, Statistics};
pub use rolling::{RollingCagrPoint, rolling_cagr_series};
pub use series::{aggregate_daily_to_monthly, annualize_daily_std, threshold_grid};
