use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_logging;
pub use settings::{
    Config, EventProbabilitySettings, LoggingSettings, ReportSettings, ThresholdGridConfig, WindowSetConfig,
};

/// Prefix for environment overrides, e.g. `PNL_REPORT__TRADING_DAYS_PER_YEAR=260`.
const ENV_PREFIX: &str = "PNL";

/// Loads the application configuration from a TOML file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// layers `PNL_`-prefixed environment variables on top, deserializes the result into our
/// strongly-typed `Config` struct, validates it, and returns it.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    finish(builder)
}

/// Parses and validates configuration held in a TOML string.
pub fn config_from_toml_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(builder)
}

fn finish(builder: config::Config) -> Result<Config, ConfigError> {
    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use windowing::WindowPolicy;

    const SAMPLE: &str = r#"
        [report]
        fund_size = "25000000"
        target_daily_std_dev = 0.0075

        [logging]
        level = "debug"

        [[window_sets]]
        name = "five_year_reverse"
        policy = "reverse"
        window_length_years = 5
        borrow_mode = true

        [[window_sets]]
        name = "rolling_12m"
        policy = "rolling"
        window_length_months = 12

        [[window_sets]]
        name = "crises"
        policy = "bespoke"

        [[window_sets.windows]]
        name = "2008 Financial Crisis"
        start_date = "2007-06-01"
        end_date = "2009-03-31"
    "#;

    #[test]
    fn sample_config_parses_with_defaults() {
        let config = config_from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.report.fund_size, Some(dec!(25000000)));
        assert_eq!(config.report.trading_days_per_year, 252);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.event_probability.grids.len(), 2);
        assert_eq!(config.event_probability.grids[1].points, 80);

        assert_eq!(config.window_sets.len(), 3);
        assert_eq!(
            config.window_set("five_year_reverse").unwrap().policy,
            WindowPolicy::Reverse {
                window_length_years: 5,
                borrow_mode: true
            }
        );
        assert_eq!(
            config.window_set("rolling_12m").unwrap().policy,
            WindowPolicy::Rolling {
                window_length_months: 12,
                slide_months: 1
            }
        );
        match &config.window_set("crises").unwrap().policy {
            WindowPolicy::Bespoke { windows } => assert_eq!(windows[0].name, "2008 Financial Crisis"),
            other => panic!("unexpected policy {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = config_from_toml_str("").unwrap();
        assert!(config.window_sets.is_empty());
        assert_eq!(config.report.fund_size, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from_toml_str("[report]\nfund_size = \"-5\""),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            config_from_toml_str("[report]\ntrading_days_per_year = 0"),
            Err(ConfigError::ValidationError(_))
        ));

        let duplicate = r#"
            [[window_sets]]
            name = "a"
            policy = "snapped"
            window_length_years = 5

            [[window_sets]]
            name = "a"
            policy = "snapped"
            window_length_years = 10
        "#;
        assert!(matches!(config_from_toml_str(duplicate), Err(ConfigError::ValidationError(_))));

        let bad_grid = "[[event_probability.grids]]\nstart = 2.0\nend = 1.0\npoints = 10";
        assert!(matches!(config_from_toml_str(bad_grid), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn unknown_policy_fails_to_load() {
        let bad = "[[window_sets]]\nname = \"x\"\npolicy = \"sideways\"";
        assert!(matches!(config_from_toml_str(bad), Err(ConfigError::LoadError(_))));
    }
}
