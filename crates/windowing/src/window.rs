use crate::definition::WindowDefinition;
use crate::error::WindowError;
use chrono::{Datelike, NaiveDate};
use core_types::{DatedReturn, EntityRef, Resolution, ReturnStore};
use std::collections::HashMap;
use tracing::debug;

/// Which series an analysis of one (window, entity) pair runs on.
///
/// Decided once: daily data is always preferred, monthly data is a legacy
/// fallback for entities that only ever reported month-end returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesResolution<'w> {
    Daily(&'w [DatedReturn]),
    MonthlyFallback(&'w [DatedReturn]),
    Empty,
}

impl SeriesResolution<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A window definition bound to a return store.
///
/// Each (entity, resolution) series is fetched at most once and kept for the
/// lifetime of the instance. The store is only ever read.
pub struct Window<'s, S: ReturnStore + ?Sized> {
    definition: WindowDefinition,
    store: &'s S,
    cache: HashMap<(EntityRef, Resolution), Vec<DatedReturn>>,
    data_is_complete: Option<bool>,
    fetches: usize,
}

impl<'s, S: ReturnStore + ?Sized> Window<'s, S> {
    pub fn new(definition: WindowDefinition, store: &'s S) -> Self {
        Self {
            definition,
            store,
            cache: HashMap::new(),
            data_is_complete: None,
            fetches: 0,
        }
    }

    pub fn definition(&self) -> &WindowDefinition {
        &self.definition
    }

    pub fn start_date(&self) -> NaiveDate {
        self.definition.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.definition.end_date
    }

    /// Number of store queries issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Daily returns for `entity` inside the window, oldest first.
    ///
    /// For a manager this is the per-date sum across the program's traded markets.
    pub fn daily_series(&mut self, entity: EntityRef) -> Result<&[DatedReturn], WindowError> {
        self.series(entity, Resolution::Daily)
    }

    /// Monthly-resolution returns for `entity` inside the window, oldest first.
    pub fn monthly_series(&mut self, entity: EntityRef) -> Result<&[DatedReturn], WindowError> {
        self.series(entity, Resolution::Monthly)
    }

    /// Picks the series to analyze: daily if any exists, else monthly, else nothing.
    ///
    /// The monthly series is only fetched when the daily one is empty.
    pub fn resolve_series(&mut self, entity: EntityRef) -> Result<SeriesResolution<'_>, WindowError> {
        self.series(entity, Resolution::Daily)?;
        let has_daily = self
            .cache
            .get(&(entity, Resolution::Daily))
            .is_some_and(|points| !points.is_empty());

        if has_daily {
            return Ok(SeriesResolution::Daily(self.series(entity, Resolution::Daily)?));
        }

        let monthly = self.series(entity, Resolution::Monthly)?;
        if monthly.is_empty() {
            Ok(SeriesResolution::Empty)
        } else {
            Ok(SeriesResolution::MonthlyFallback(monthly))
        }
    }

    /// True when every requested program and benchmark has data from on or before
    /// the window's start month through on or after its end month.
    ///
    /// Coverage is judged on the series `resolve_series` picks for the entity, so
    /// a monthly history does not vouch for daily data that starts mid-window.
    /// Vacuously true for a window without entities. Computed once per instance.
    pub fn data_is_complete(&mut self) -> Result<bool, WindowError> {
        if let Some(complete) = self.data_is_complete {
            return Ok(complete);
        }

        let start = month_key(self.definition.start_date);
        let end = month_key(self.definition.end_date);
        let mut complete = true;

        for entity in self.definition.entities() {
            let covered = match self.resolve_series(entity)? {
                SeriesResolution::Daily(points) | SeriesResolution::MonthlyFallback(points) => {
                    covers(points, start, end)
                }
                SeriesResolution::Empty => false,
            };
            if !covered {
                debug!(%entity, window = ?self.definition.name, "Entity does not cover window");
                complete = false;
                break;
            }
        }

        self.data_is_complete = Some(complete);
        Ok(complete)
    }

    fn series(
        &mut self,
        entity: EntityRef,
        resolution: Resolution,
    ) -> Result<&[DatedReturn], WindowError> {
        let key = (entity, resolution);
        if !self.cache.contains_key(&key) {
            let (start, end) = (self.definition.start_date, self.definition.end_date);
            let points = match resolution {
                Resolution::Daily => self.store.fetch_daily(entity, start, end)?,
                Resolution::Monthly => self.store.fetch_monthly(entity, start, end)?,
            };
            self.fetches += 1;
            debug!(
                %entity,
                %resolution,
                points = points.len(),
                %start,
                %end,
                "Fetched series for window"
            );
            self.cache.insert(key, points);
        }
        Ok(self.cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn covers(points: &[DatedReturn], start: (i32, u32), end: (i32, u32)) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => month_key(first.date) <= start && month_key(last.date) >= end,
        _ => false,
    }
}
