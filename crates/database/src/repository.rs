use crate::DbError;
use chrono::NaiveDate;
use core_types::{InMemoryReturnStore, Market, MarketId, ProgramId, Resolution};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::postgres::PgPool;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// The `DbRepository` provides a high-level, application-specific interface
/// to the return database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// A row from the `programs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DbProgram {
    pub id: ProgramId,
    pub program_name: String,
    pub fund_size: Decimal,
    pub target_daily_std_dev: Option<f64>,
}

/// A row from the `markets` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DbMarket {
    pub id: MarketId,
    pub name: String,
    pub is_benchmark: bool,
}

impl From<DbMarket> for Market {
    fn from(row: DbMarket) -> Self {
        Market {
            id: row.id,
            name: row.name,
            is_benchmark: row.is_benchmark,
        }
    }
}

/// A row from the `pnl_records` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DbPnlRecord {
    pub program_id: ProgramId,
    pub market_id: MarketId,
    pub date: NaiveDate,
    pub resolution: String,
    #[sqlx(rename = "return")]
    pub value: f64,
}

/// Optional inclusive date bounds for a load. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateBounds {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches one program's metadata (fund size and optional target volatility).
    pub async fn get_program(&self, program_id: ProgramId) -> Result<DbProgram, DbError> {
        sqlx::query_as::<_, DbProgram>(
            "SELECT id, program_name, fund_size, target_daily_std_dev FROM programs WHERE id = $1",
        )
        .bind(program_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| if let sqlx::Error::RowNotFound = e { DbError::NotFound } else { e.into() })
    }

    /// Fetches the markets with the given ids.
    pub async fn get_markets(&self, market_ids: &[MarketId]) -> Result<Vec<DbMarket>, DbError> {
        let markets = sqlx::query_as::<_, DbMarket>(
            "SELECT id, name, is_benchmark FROM markets WHERE id = ANY($1) ORDER BY id",
        )
        .bind(market_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(markets)
    }

    /// Earliest and latest date a program has records for at the given resolution.
    pub async fn program_date_range(
        &self,
        program_id: ProgramId,
        resolution: Resolution,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, DbError> {
        let (first, last): (Option<NaiveDate>, Option<NaiveDate>) = sqlx::query_as(
            r#"
            SELECT MIN(r.date), MAX(r.date)
            FROM pnl_records AS r
            JOIN markets AS m ON m.id = r.market_id
            WHERE r.program_id = $1 AND r.resolution = $2 AND NOT m.is_benchmark
            "#,
        )
        .bind(program_id)
        .bind(resolution.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(first.zip(last))
    }

    /// Fetches every record of one program (all its markets) inside `bounds`.
    pub async fn get_program_records(
        &self,
        program_id: ProgramId,
        bounds: DateBounds,
    ) -> Result<Vec<DbPnlRecord>, DbError> {
        let records = sqlx::query_as::<_, DbPnlRecord>(
            r#"
            SELECT program_id, market_id, date, resolution, "return"
            FROM pnl_records
            WHERE program_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date ASC
            "#,
        )
        .bind(program_id)
        .bind(bounds.start)
        .bind(bounds.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Fetches every record on the given benchmark markets, whichever program carries them.
    pub async fn get_benchmark_records(
        &self,
        benchmark_ids: &[MarketId],
        bounds: DateBounds,
    ) -> Result<Vec<DbPnlRecord>, DbError> {
        if benchmark_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, DbPnlRecord>(
            r#"
            SELECT r.program_id, r.market_id, r.date, r.resolution, r."return"
            FROM pnl_records AS r
            JOIN markets AS m ON m.id = r.market_id
            WHERE r.market_id = ANY($1) AND m.is_benchmark
              AND ($2::date IS NULL OR r.date >= $2)
              AND ($3::date IS NULL OR r.date <= $3)
            ORDER BY r.date ASC
            "#,
        )
        .bind(benchmark_ids)
        .bind(bounds.start)
        .bind(bounds.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Fetches all records needed for the given programs and benchmarks.
    ///
    /// The per-program queries and the benchmark query run concurrently.
    pub async fn fetch_records(
        &self,
        program_ids: &[ProgramId],
        benchmark_ids: &[MarketId],
        bounds: DateBounds,
    ) -> Result<Vec<DbPnlRecord>, DbError> {
        let program_futures = program_ids
            .iter()
            .map(|id| self.get_program_records(*id, bounds));

        let (program_results, benchmark_result) = futures::join!(
            join_all(program_futures),
            self.get_benchmark_records(benchmark_ids, bounds)
        );

        let mut records = Vec::new();
        for result in program_results {
            records.extend(result?); // Propagate any DB errors
        }
        records.extend(benchmark_result?);
        Ok(records)
    }

    /// Loads a read-only snapshot of the requested programs and benchmarks.
    ///
    /// The synchronous analytics core runs against the returned store; nothing
    /// in it touches the database again.
    pub async fn load_return_store(
        &self,
        program_ids: &[ProgramId],
        benchmark_ids: &[MarketId],
        bounds: DateBounds,
    ) -> Result<InMemoryReturnStore, DbError> {
        let records = self.fetch_records(program_ids, benchmark_ids, bounds).await?;

        let market_ids: Vec<MarketId> = records
            .iter()
            .map(|r| r.market_id)
            .chain(benchmark_ids.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let markets = self.get_markets(&market_ids).await?;

        let store = build_return_store(markets, records)?;
        info!(
            programs = program_ids.len(),
            benchmarks = benchmark_ids.len(),
            markets = market_ids.len(),
            "Loaded return store snapshot"
        );
        Ok(store)
    }
}

/// Assembles an `InMemoryReturnStore` from raw market and record rows.
///
/// Rows at a resolution other than daily or monthly are skipped.
pub fn build_return_store(
    markets: Vec<DbMarket>,
    records: Vec<DbPnlRecord>,
) -> Result<InMemoryReturnStore, DbError> {
    let mut store = InMemoryReturnStore::new();
    for market in markets {
        store.register_market(market.into());
    }

    let mut skipped = 0usize;
    let mut seen = BTreeSet::new();
    for record in records {
        // Program and benchmark queries can both return the same benchmark row.
        if !seen.insert((record.program_id, record.market_id, record.date, record.resolution.clone())) {
            continue;
        }
        let resolution: Resolution = match record.resolution.parse() {
            Ok(resolution) => resolution,
            Err(e) => {
                debug!(error = %e, market_id = record.market_id, "Skipping record");
                skipped += 1;
                continue;
            }
        };
        store.insert(record.program_id, record.market_id, resolution, record.date, record.value)?;
    }

    if skipped > 0 {
        warn!(skipped, "Skipped records with unsupported resolution");
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{EntityRef, ReturnStore};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn market(id: MarketId, name: &str, is_benchmark: bool) -> DbMarket {
        DbMarket {
            id,
            name: name.to_string(),
            is_benchmark,
        }
    }

    fn record(program_id: ProgramId, market_id: MarketId, date: NaiveDate, resolution: &str, value: f64) -> DbPnlRecord {
        DbPnlRecord {
            program_id,
            market_id,
            date,
            resolution: resolution.to_string(),
            value,
        }
    }

    #[test]
    fn rows_are_aggregated_per_program_and_benchmark() {
        let markets = vec![
            market(1, "Bonds", false),
            market(2, "Equities", false),
            market(9, "SP500", true),
        ];
        let records = vec![
            record(4, 1, d(2021, 5, 3), "daily", 0.002),
            record(4, 2, d(2021, 5, 3), "daily", 0.001),
            record(4, 9, d(2021, 5, 3), "daily", 0.010),
            // The benchmark query returns the same row again.
            record(4, 9, d(2021, 5, 3), "daily", 0.010),
            record(4, 1, d(2021, 5, 31), "Monthly", 0.02),
        ];

        let store = build_return_store(markets, records).unwrap();

        let manager = store
            .fetch_daily(EntityRef::manager(4), d(2021, 5, 1), d(2021, 5, 31))
            .unwrap();
        assert_eq!(manager.len(), 1);
        assert!((manager[0].value - 0.003).abs() < 1e-12);

        let benchmark = store
            .fetch_daily(EntityRef::benchmark(9), d(2021, 5, 1), d(2021, 5, 31))
            .unwrap();
        assert!((benchmark[0].value - 0.010).abs() < 1e-12);

        let monthly = store
            .fetch_monthly(EntityRef::manager(4), d(2021, 5, 1), d(2021, 5, 31))
            .unwrap();
        assert_eq!(monthly.len(), 1);
    }

    #[test]
    fn unsupported_resolutions_are_skipped() {
        let markets = vec![market(1, "Bonds", false)];
        let records = vec![
            record(4, 1, d(2021, 5, 3), "weekly", 0.01),
            record(4, 1, d(2021, 5, 4), "daily", 0.02),
        ];
        let store = build_return_store(markets, records).unwrap();
        let range = store.entity_date_range(EntityRef::manager(4)).unwrap();
        assert_eq!(range, Some((d(2021, 5, 4), d(2021, 5, 4))));
    }

    #[test]
    fn records_on_unknown_markets_fail() {
        let records = vec![record(4, 77, d(2021, 5, 3), "daily", 0.01)];
        let err = build_return_store(Vec::new(), records).unwrap_err();
        assert!(matches!(err, DbError::Store(_)));
    }
}
