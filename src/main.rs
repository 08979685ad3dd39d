use analytics::{
    AnalyticsEngine, EventProbabilityData, NavCurve, RollingCagrPoint, Statistics, cumulative_nav_curve,
    rolling_cagr_series, threshold_grid,
};
use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use configuration::{Config, init_logging, load_config_from};
use core_types::{EntityRef, InMemoryReturnStore, MarketId, ProgramId, Resolution, ReturnStore};
use database::{DateBounds, DbRepository, connect, run_migrations};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use windowing::{Window, WindowDefinition, WindowTemplate, overlapping_by_days};

mod render;

/// The main entry point for the P&L reporting application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Held for the lifetime of the process so buffered log lines are flushed on exit.
    let _log_guard = init_logging(&config.logging)?;

    // Initialize the database connection and run migrations
    let db_pool = connect().await.context("Failed to connect to the database")?;
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    let repo = DbRepository::new(db_pool);

    // Execute the appropriate command
    match cli.command {
        Commands::Windows(args) => handle_windows(args, &config, &repo).await,
        Commands::Stats(args) => handle_stats(args, &config, &repo).await,
        Commands::EventProbability(args) => handle_event_probability(args, &config, &repo).await,
        Commands::RollingCagr(args) => handle_rolling_cagr(args, &repo).await,
        Commands::Nav(args) => handle_nav(args, &config, &repo).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Windowed return statistics and tail-risk reports for trading programs.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the windows a configured window set produces for a program's history.
    Windows(WindowSetArgs),
    /// Compute statistics for a program and its benchmarks over every window of a set.
    Stats(WindowSetArgs),
    /// Compare a program's daily P&L tails with the normal distribution.
    EventProbability(EventProbabilityArgs),
    /// Compute the rolling CAGR curve with a day-level slide.
    RollingCagr(RollingCagrArgs),
    /// Cumulative NAV curves for every window of a set, with borrowed data marked.
    Nav(NavArgs),
}

/// Which entities and which part of their history to analyze.
#[derive(Args)]
struct Selection {
    /// The program to analyze.
    #[arg(long)]
    program: ProgramId,

    /// Benchmark market ids to analyze alongside the program (repeatable).
    #[arg(long = "benchmark")]
    benchmarks: Vec<MarketId>,

    /// Ignore data before this date (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Ignore data after this date (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args)]
struct WindowSetArgs {
    #[command(flatten)]
    selection: Selection,

    /// Name of a `[[window_sets]]` entry in the configuration.
    #[arg(long)]
    window_set: String,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EventProbabilityArgs {
    #[command(flatten)]
    selection: Selection,

    /// Emit JSON instead of tables.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RollingCagrArgs {
    #[command(flatten)]
    selection: Selection,

    /// Window length in months.
    #[arg(long, default_value_t = 12)]
    months: u32,

    /// Slide between consecutive windows, in days.
    #[arg(long, default_value_t = 1)]
    slide_days: u32,

    /// Emit the full curves as JSON instead of a summary table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct NavArgs {
    #[command(flatten)]
    windows: WindowSetArgs,

    /// NAV every window starts from.
    #[arg(long, default_value = "10000000")]
    starting_nav: Decimal,
}

/// Statistics for one entity in one window.
#[derive(Debug, Serialize)]
pub struct WindowStatistics {
    pub window: WindowDefinition,
    pub entity: EntityRef,
    pub data_is_complete: bool,
    pub statistics: Statistics,
}

#[derive(Debug, Serialize)]
pub struct WindowNavCurve {
    pub window: WindowDefinition,
    pub curve: NavCurve,
}

#[derive(Debug, Serialize)]
pub struct RollingCagrCurve {
    pub entity: EntityRef,
    pub points: Vec<RollingCagrPoint>,
}

// ==============================================================================
// Shared Loading
// ==============================================================================

/// A loaded snapshot plus the program's available date range (clipped to `--from`/`--to`).
struct Snapshot {
    store: InMemoryReturnStore,
    start: NaiveDate,
    end: NaiveDate,
}

async fn load_snapshot(repo: &DbRepository, selection: &Selection) -> anyhow::Result<Snapshot> {
    let bounds = DateBounds::new(selection.from, selection.to);
    let store = repo
        .load_return_store(&[selection.program], &selection.benchmarks, bounds)
        .await
        .context("Failed to load return data")?;

    let Some((first, last)) = store.entity_date_range(EntityRef::manager(selection.program))? else {
        bail!("No return data for program {} in the requested range", selection.program);
    };
    let (start, end) = clip(selection, first, last)?;

    info!(program = selection.program, %start, %end, "Program history loaded");
    Ok(Snapshot { store, start, end })
}

/// Narrows `[first, last]` to the `--from`/`--to` bounds.
fn clip(selection: &Selection, first: NaiveDate, last: NaiveDate) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let start = selection.from.map_or(first, |from| from.max(first));
    let end = selection.to.map_or(last, |to| to.min(last));
    if start > end {
        bail!("Requested range {start}..{end} is empty");
    }
    Ok((start, end))
}

fn engine_for(config: &Config) -> anyhow::Result<AnalyticsEngine> {
    Ok(AnalyticsEngine::with_trading_days_per_year(config.report.trading_days_per_year)?)
}

fn generate_windows(
    config: &Config,
    args: &WindowSetArgs,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<WindowDefinition>> {
    let Some(set) = config.window_set(&args.window_set) else {
        bail!("Unknown window set '{}'", args.window_set);
    };
    let template = WindowTemplate::new(vec![args.selection.program], args.selection.benchmarks.clone())
        .with_window_set(set.name.clone());
    let windows = set.policy.generate(start, end, &template)?;
    info!(window_set = %set.name, policy = %set.policy.label(), count = windows.len(), "Generated windows");
    Ok(windows)
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_windows(args: WindowSetArgs, config: &Config, repo: &DbRepository) -> anyhow::Result<()> {
    let snapshot = load_snapshot(repo, &args.selection).await?;
    let windows = generate_windows(config, &args, snapshot.start, snapshot.end)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
    } else {
        println!("{}", render::windows_table(&windows));
    }
    Ok(())
}

/// Computes every (window, entity) pair. Windows are independent, so each runs
/// on the blocking pool against the shared read-only snapshot.
async fn handle_stats(args: WindowSetArgs, config: &Config, repo: &DbRepository) -> anyhow::Result<()> {
    let snapshot = load_snapshot(repo, &args.selection).await?;
    let windows = generate_windows(config, &args, snapshot.start, snapshot.end)?;
    let engine = engine_for(config)?;
    let store = Arc::new(snapshot.store);

    // Set up the progress bar
    let progress_bar = ProgressBar::new(windows.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let tasks: Vec<_> = windows
        .into_iter()
        .map(|definition| {
            let store = Arc::clone(&store);
            let pb = progress_bar.clone();
            tokio::task::spawn_blocking(move || {
                let rows = window_statistics(&engine, definition, store.as_ref());
                pb.inc(1);
                rows
            })
        })
        .collect();

    let results = join_all(tasks).await;
    progress_bar.finish_and_clear();

    let mut rows = Vec::new();
    for result in results {
        rows.extend(result.context("Statistics task panicked")??);
    }

    let incomplete = rows.iter().filter(|row| !row.data_is_complete).count();
    if incomplete > 0 {
        warn!(incomplete, "Some entities do not cover their whole window");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render::statistics_table(&rows));
    }
    Ok(())
}

fn window_statistics<S: ReturnStore + ?Sized>(
    engine: &AnalyticsEngine,
    definition: WindowDefinition,
    store: &S,
) -> anyhow::Result<Vec<WindowStatistics>> {
    let entities = definition.entities();
    let mut window = Window::new(definition, store);
    let data_is_complete = window.data_is_complete()?;

    let mut rows = Vec::with_capacity(entities.len());
    for entity in entities {
        let statistics = engine.compute_statistics(&mut window, entity)?;
        rows.push(WindowStatistics {
            window: window.definition().clone(),
            entity,
            data_is_complete,
            statistics,
        });
    }
    Ok(rows)
}

async fn handle_event_probability(
    args: EventProbabilityArgs,
    config: &Config,
    repo: &DbRepository,
) -> anyhow::Result<()> {
    let program_id = args.selection.program;
    let program = repo
        .get_program(program_id)
        .await
        .with_context(|| format!("Program {program_id} not found"))?;
    let fund_size = config.report.fund_size.unwrap_or(program.fund_size);
    let target_std_dev = config.report.target_daily_std_dev.or(program.target_daily_std_dev);

    // The analysis is daily-only, so the history is the program's daily span.
    let Some((first, last)) = repo
        .program_date_range(program_id, Resolution::Daily)
        .await
        .context("Failed to query the program's daily date range")?
    else {
        bail!("Program {program_id} has no daily returns");
    };
    let (start, end) = clip(&args.selection, first, last)?;
    let store = repo
        .load_return_store(&[program_id], &[], DateBounds::new(Some(start), Some(end)))
        .await
        .context("Failed to load return data")?;

    let definition = WindowDefinition::new(start, end, vec![program_id], vec![])?.with_name("Full history");
    let mut window = Window::new(definition, &store);
    let engine = engine_for(config)?;

    let mut results: Vec<EventProbabilityData> = Vec::new();
    for grid in &config.event_probability.grids {
        let x_values = threshold_grid(grid.start, grid.end, grid.points);
        let data = engine.compute_event_probability_analysis(
            &mut window,
            EntityRef::manager(program_id),
            &x_values,
            fund_size,
            target_std_dev,
        )?;
        results.push(data);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{} ({start} to {end})", program.program_name);
        for data in &results {
            println!("{}", render::event_probability_summary(data));
            println!("{}", render::event_probability_table(data));
        }
    }
    Ok(())
}

async fn handle_rolling_cagr(args: RollingCagrArgs, repo: &DbRepository) -> anyhow::Result<()> {
    let snapshot = load_snapshot(repo, &args.selection).await?;
    let template = WindowTemplate::new(vec![args.selection.program], args.selection.benchmarks.clone())
        .with_window_set(format!("rolling_{}m_{}d", args.months, args.slide_days));
    let windows = overlapping_by_days(snapshot.start, snapshot.end, args.months, args.slide_days, &template)?;
    if windows.is_empty() {
        bail!(
            "History {}..{} is shorter than one {}-month window",
            snapshot.start,
            snapshot.end,
            args.months
        );
    }

    let mut curves = Vec::new();
    for entity in windows[0].entities() {
        // One fetch for the whole history; windows are sliced out of it in memory.
        let daily = snapshot.store.fetch_daily(entity, snapshot.start, snapshot.end)?;
        curves.push(RollingCagrCurve {
            entity,
            points: rolling_cagr_series(&daily, &windows),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&curves)?);
    } else {
        println!("{}", render::rolling_cagr_table(&curves));
    }
    Ok(())
}

async fn handle_nav(args: NavArgs, config: &Config, repo: &DbRepository) -> anyhow::Result<()> {
    let snapshot = load_snapshot(repo, &args.windows.selection).await?;
    let windows = generate_windows(config, &args.windows, snapshot.start, snapshot.end)?;

    let mut rows = Vec::new();
    for definition in windows {
        let entities = definition.entities();
        let mut window = Window::new(definition, &snapshot.store);
        for entity in entities {
            let curve = cumulative_nav_curve(&mut window, entity, args.starting_nav)?;
            rows.push(WindowNavCurve {
                window: window.definition().clone(),
                curve,
            });
        }
    }

    if args.windows.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render::nav_table(&rows));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn selection(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Selection {
        Selection {
            program: 1,
            benchmarks: vec![],
            from,
            to,
        }
    }

    #[test]
    fn history_is_clipped_to_requested_bounds() {
        let (first, last) = (d(2016, 7, 1), d(2020, 12, 31));

        assert_eq!(clip(&selection(None, None), first, last).unwrap(), (first, last));
        assert_eq!(
            clip(&selection(Some(d(2010, 1, 1)), Some(d(2018, 6, 30))), first, last).unwrap(),
            (first, d(2018, 6, 30))
        );
        assert!(clip(&selection(Some(d(2021, 1, 1)), None), first, last).is_err());
    }
}
