use crate::error::WindowError;
use chrono::NaiveDate;
use core_types::{EntityRef, MarketId, ProgramId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// A lightweight specification of a time window and its participants.
///
/// Says what to analyze (programs and benchmarks) and when (an inclusive date
/// range) without holding any data. Borrowed-range fields mark the tail of a
/// window whose data duplicates the adjacent window's, so downstream consumers
/// can tell "actual" from "borrowed" segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDefinition {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub program_ids: Vec<ProgramId>,
    pub benchmark_ids: Vec<MarketId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub window_set: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub borrowed_data_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub borrowed_data_end_date: Option<NaiveDate>,
    /// Set when the window was clipped by the end of the data range and is shorter
    /// than its generator's nominal length.
    #[serde(default)]
    pub is_partial: bool,
}

/// The participant lists and set label stamped onto every definition a generator emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTemplate {
    pub program_ids: Vec<ProgramId>,
    pub benchmark_ids: Vec<MarketId>,
    #[serde(default)]
    pub window_set: Option<String>,
}

impl WindowTemplate {
    /// Repeated ids are dropped, keeping first-seen order.
    pub fn new(program_ids: Vec<ProgramId>, benchmark_ids: Vec<MarketId>) -> Self {
        Self {
            program_ids: unique_ids(program_ids),
            benchmark_ids: unique_ids(benchmark_ids),
            window_set: None,
        }
    }

    pub fn with_window_set(mut self, name: impl Into<String>) -> Self {
        self.window_set = Some(name.into());
        self
    }

    pub(crate) fn stamp(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        name: String,
        index: usize,
    ) -> WindowDefinition {
        WindowDefinition {
            start_date,
            end_date,
            program_ids: self.program_ids.clone(),
            benchmark_ids: self.benchmark_ids.clone(),
            name: Some(name),
            window_set: self.window_set.clone(),
            index: Some(index),
            borrowed_data_start_date: None,
            borrowed_data_end_date: None,
            is_partial: false,
        }
    }
}

/// One hand-picked analysis period, e.g. a crisis or a market regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BespokeWindow {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl WindowDefinition {
    /// Creates an unnamed definition, validating its bounds. Repeated ids are dropped.
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        program_ids: Vec<ProgramId>,
        benchmark_ids: Vec<MarketId>,
    ) -> Result<Self, WindowError> {
        let definition = Self {
            start_date,
            end_date,
            program_ids: unique_ids(program_ids),
            benchmark_ids: unique_ids(benchmark_ids),
            name: None,
            window_set: None,
            index: None,
            borrowed_data_start_date: None,
            borrowed_data_end_date: None,
            is_partial: false,
        };
        definition.validate()?;
        Ok(definition)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checks `start <= end` and that any borrowed range is complete and lies inside the window.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.start_date > self.end_date {
            return Err(WindowError::InvalidParameter(format!(
                "window start {} is after window end {}",
                self.start_date, self.end_date
            )));
        }

        match (self.borrowed_data_start_date, self.borrowed_data_end_date) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) => {
                if start > end || start < self.start_date || end > self.end_date {
                    Err(WindowError::InvalidParameter(format!(
                        "borrowed range {start}..={end} is not inside window {}..={}",
                        self.start_date, self.end_date
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Err(WindowError::InvalidParameter(
                "borrowed range must set both start and end".to_string(),
            )),
        }
    }

    /// Number of calendar days covered, both ends inclusive.
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn borrowed_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.borrowed_data_start_date.zip(self.borrowed_data_end_date)
    }

    /// True if `date` falls in the part of the window whose data belongs to the next window.
    pub fn is_borrowed(&self, date: NaiveDate) -> bool {
        self.borrowed_range()
            .is_some_and(|(start, end)| start <= date && date <= end)
    }

    /// Every requested entity: programs first, then benchmarks.
    pub fn entities(&self) -> Vec<EntityRef> {
        self.program_ids
            .iter()
            .map(|id| EntityRef::manager(*id))
            .chain(self.benchmark_ids.iter().map(|id| EntityRef::benchmark(*id)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, WindowError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a definition previously produced by `to_json`.
    pub fn from_json(json: &str) -> Result<Self, WindowError> {
        let definition: Self = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }
}

fn unique_ids<T: Copy + Eq + Hash>(mut ids: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(*id));
    ids
}
