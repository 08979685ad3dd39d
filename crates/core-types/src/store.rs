use crate::enums::{EntityRef, Resolution};
use crate::error::StoreError;
use crate::structs::{DatedReturn, Market, MarketId, ProgramId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Read-only query interface over stored return observations.
///
/// Every fetch returns points ordered by date, restricted to `[start, end]`
/// inclusive. For `EntityRef::Manager` the series is the per-date sum across the
/// program's constituent markets, excluding any market flagged as a benchmark.
/// An entity without data yields an empty series, not an error.
pub trait ReturnStore {
    fn fetch_daily(
        &self,
        entity: EntityRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DatedReturn>, StoreError>;

    /// Monthly-resolution observations. Only used when an entity has no daily data.
    fn fetch_monthly(
        &self,
        entity: EntityRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DatedReturn>, StoreError>;

    /// Earliest and latest observation date for the entity across all resolutions,
    /// or `None` if the store holds nothing for it.
    fn entity_date_range(
        &self,
        entity: EntityRef,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError>;
}

/// An in-memory `ReturnStore`.
///
/// Records are aggregated at insertion time: observations on traded markets are
/// summed into the owning program's series, observations on benchmark markets
/// are stored once under the benchmark itself.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReturnStore {
    markets: HashMap<MarketId, Market>,
    series: HashMap<(EntityRef, Resolution), BTreeMap<NaiveDate, f64>>,
}

impl InMemoryReturnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a market's metadata. Must happen before records on it are inserted.
    pub fn register_market(&mut self, market: Market) {
        self.markets.insert(market.id, market);
    }

    /// Inserts one raw `pnl_records`-style row.
    pub fn insert(
        &mut self,
        program_id: ProgramId,
        market_id: MarketId,
        resolution: Resolution,
        date: NaiveDate,
        value: f64,
    ) -> Result<(), StoreError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(StoreError::UnknownMarket(market_id))?;

        if market.is_benchmark {
            // The same benchmark is typically carried by several programs with identical values.
            let previous = self
                .series
                .entry((EntityRef::benchmark(market_id), resolution))
                .or_default()
                .insert(date, value);
            if previous.is_some() {
                debug!(market_id, %date, %resolution, "Benchmark observation replaced");
            }
        } else {
            *self
                .series
                .entry((EntityRef::manager(program_id), resolution))
                .or_default()
                .entry(date)
                .or_insert(0.0) += value;
        }
        Ok(())
    }

    fn fetch(
        &self,
        entity: EntityRef,
        resolution: Resolution,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DatedReturn>, StoreError> {
        if let EntityRef::Benchmark { market_id } = entity {
            if let Some(market) = self.markets.get(&market_id) {
                if !market.is_benchmark {
                    return Err(StoreError::NotABenchmark(market_id));
                }
            }
        }

        if start > end {
            return Ok(Vec::new());
        }

        Ok(self
            .series
            .get(&(entity, resolution))
            .map(|points| {
                points
                    .range(start..=end)
                    .map(|(date, value)| DatedReturn::new(*date, *value))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ReturnStore for InMemoryReturnStore {
    fn fetch_daily(
        &self,
        entity: EntityRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DatedReturn>, StoreError> {
        self.fetch(entity, Resolution::Daily, start, end)
    }

    fn fetch_monthly(
        &self,
        entity: EntityRef,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DatedReturn>, StoreError> {
        self.fetch(entity, Resolution::Monthly, start, end)
    }

    fn entity_date_range(
        &self,
        entity: EntityRef,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
        let range = [Resolution::Daily, Resolution::Monthly]
            .iter()
            .filter_map(|resolution| self.series.get(&(entity, *resolution)))
            .filter_map(|points| {
                let first = points.keys().next()?;
                let last = points.keys().next_back()?;
                Some((*first, *last))
            })
            .reduce(|(a_start, a_end), (b_start, b_end)| (a_start.min(b_start), a_end.max(b_end)));
        Ok(range)
    }
}
