//! # Windowing
//!
//! Turns a continuous return history into named analysis periods and binds
//! those periods to data.
//!
//! ## Architectural Principles
//!
//! - **Definitions are values:** a `WindowDefinition` is a cheap, serializable
//!   description of *when* and *who* to analyze. Generators are pure functions
//!   returning a `Vec` of them; no I/O happens at generation time.
//! - **Windows own their cache:** a `Window` borrows a `ReturnStore` and fetches each
//!   (entity, resolution) series at most once for its own lifetime. Nothing is
//!   cached process-wide.
//!
//! ## Public API
//!
//! - `generator`: the non-overlapping (snapped, not snapped, reverse with borrow
//!   mode), overlapping (rolling, trailing, day-sliced) and bespoke generators.
//! - `WindowPolicy`: a serializable policy that dispatches to the generators.
//! - `Window`: the materialized view with `daily_series`, `monthly_series` and
//!   `data_is_complete`.
//! - `WindowError`: the specific error types that can be returned from this crate.

pub mod definition;
pub mod error;
pub mod generator;
pub mod policy;
pub mod window;

pub use definition::{BespokeWindow, WindowDefinition, WindowTemplate};
pub use error::WindowError;
pub use generator::{
    bespoke, non_overlapping_not_snapped, non_overlapping_reverse, non_overlapping_snapped,
    overlapping, overlapping_by_days, overlapping_reverse,
};
pub use policy::WindowPolicy;
pub use window::{SeriesResolution, Window};
