use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use windowing::WindowPolicy;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub window_sets: Vec<WindowSetConfig>,
    #[serde(default)]
    pub event_probability: EventProbabilitySettings,
}

/// Parameters shared by every report run.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    /// Overrides the program's stored fund size for P&L normalization.
    pub fund_size: Option<Decimal>,
    /// Overrides the program's stored target daily standard deviation. Reported
    /// alongside the realized value, never used in its place.
    pub target_daily_std_dev: Option<f64>,
    /// Daily annualization factor.
    #[serde(default = "default_trading_days_per_year")]
    pub trading_days_per_year: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            fund_size: None,
            target_daily_std_dev: None,
            trading_days_per_year: default_trading_days_per_year(),
        }
    }
}

fn default_trading_days_per_year() -> u32 {
    252
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rotated file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A named window set, e.g. `five_year_reverse`.
///
/// ```toml
/// [[window_sets]]
/// name = "rolling_12m"
/// policy = "rolling"
/// window_length_months = 12
/// slide_months = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WindowSetConfig {
    pub name: String,
    #[serde(flatten)]
    pub policy: WindowPolicy,
}

/// An inclusive, evenly spaced threshold grid in standard deviations.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThresholdGridConfig {
    pub start: f64,
    pub end: f64,
    pub points: usize,
}

/// Threshold grids for the event probability analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventProbabilitySettings {
    #[serde(default = "default_grids")]
    pub grids: Vec<ThresholdGridConfig>,
}

impl Default for EventProbabilitySettings {
    fn default() -> Self {
        Self {
            grids: default_grids(),
        }
    }
}

/// The short (typical events) and long (extreme tails) views.
fn default_grids() -> Vec<ThresholdGridConfig> {
    vec![
        ThresholdGridConfig {
            start: 0.0,
            end: 2.0,
            points: 20,
        },
        ThresholdGridConfig {
            start: 0.0,
            end: 8.0,
            points: 80,
        },
    ]
}

impl Config {
    /// Checks the cross-field rules the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(fund_size) = self.report.fund_size {
            if fund_size <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "report.fund_size must be positive, got {fund_size}"
                )));
            }
        }
        if let Some(target) = self.report.target_daily_std_dev {
            if !(target.is_finite() && target > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "report.target_daily_std_dev must be positive, got {target}"
                )));
            }
        }
        if self.report.trading_days_per_year == 0 {
            return Err(ConfigError::ValidationError(
                "report.trading_days_per_year must be positive".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for set in &self.window_sets {
            if set.name.trim().is_empty() {
                return Err(ConfigError::ValidationError("window set with empty name".to_string()));
            }
            if !names.insert(set.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate window set name '{}'",
                    set.name
                )));
            }
        }

        for grid in &self.event_probability.grids {
            if grid.points == 0 || !(grid.start >= 0.0 && grid.end > grid.start) {
                return Err(ConfigError::ValidationError(format!(
                    "invalid threshold grid {}..{} with {} points",
                    grid.start, grid.end, grid.points
                )));
            }
        }
        Ok(())
    }

    pub fn window_set(&self, name: &str) -> Option<&WindowSetConfig> {
        self.window_sets.iter().find(|set| set.name == name)
    }
}
