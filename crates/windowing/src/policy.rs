use crate::definition::{BespokeWindow, WindowDefinition, WindowTemplate};
use crate::error::WindowError;
use crate::generator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A window generation policy, as it appears in configuration.
///
/// ```toml
/// [[window_sets]]
/// name = "five_year_reverse"
/// policy = "reverse"
/// window_length_years = 5
/// borrow_mode = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WindowPolicy {
    Snapped {
        window_length_years: u32,
    },
    NotSnapped {
        window_length_months: u32,
    },
    Reverse {
        window_length_years: u32,
        #[serde(default)]
        borrow_mode: bool,
    },
    Rolling {
        window_length_months: u32,
        #[serde(default = "default_slide_months")]
        slide_months: u32,
    },
    Trailing {
        window_length_months: u32,
        #[serde(default = "default_slide_months")]
        slide_months: u32,
    },
    RollingDays {
        window_length_months: u32,
        slide_days: u32,
    },
    Bespoke {
        windows: Vec<BespokeWindow>,
    },
}

fn default_slide_months() -> u32 {
    1
}

impl WindowPolicy {
    /// Runs the matching generator over `[start, end]`. Bespoke windows ignore the range.
    pub fn generate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        template: &WindowTemplate,
    ) -> Result<Vec<WindowDefinition>, WindowError> {
        match self {
            Self::Snapped { window_length_years } => {
                generator::non_overlapping_snapped(start, end, *window_length_years, template)
            }
            Self::NotSnapped { window_length_months } => {
                generator::non_overlapping_not_snapped(start, end, *window_length_months, template)
            }
            Self::Reverse {
                window_length_years,
                borrow_mode,
            } => generator::non_overlapping_reverse(
                start,
                end,
                *window_length_years,
                *borrow_mode,
                template,
            ),
            Self::Rolling {
                window_length_months,
                slide_months,
            } => generator::overlapping(start, end, *window_length_months, *slide_months, template),
            Self::Trailing {
                window_length_months,
                slide_months,
            } => generator::overlapping_reverse(
                start,
                end,
                *window_length_months,
                *slide_months,
                template,
            ),
            Self::RollingDays {
                window_length_months,
                slide_days,
            } => generator::overlapping_by_days(
                start,
                end,
                *window_length_months,
                *slide_days,
                template,
            ),
            Self::Bespoke { windows } => generator::bespoke(windows, template),
        }
    }

    /// Short human-readable description used in logs and report headers.
    pub fn label(&self) -> String {
        match self {
            Self::Snapped { window_length_years } => format!("{window_length_years}Y snapped"),
            Self::NotSnapped { window_length_months } => format!("{window_length_months}M from first date"),
            Self::Reverse {
                window_length_years,
                borrow_mode: true,
            } => format!("{window_length_years}Y reverse (borrowing)"),
            Self::Reverse {
                window_length_years, ..
            } => format!("{window_length_years}Y reverse"),
            Self::Rolling {
                window_length_months,
                slide_months,
            } => format!("{window_length_months}M rolling, {slide_months}M step"),
            Self::Trailing {
                window_length_months,
                slide_months,
            } => format!("{window_length_months}M trailing, {slide_months}M step"),
            Self::RollingDays {
                window_length_months,
                slide_days,
            } => format!("{window_length_months}M rolling, {slide_days}D step"),
            Self::Bespoke { windows } => format!("{} bespoke periods", windows.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn policy_deserializes_from_tagged_json() {
        let policy: WindowPolicy =
            serde_json::from_str(r#"{"policy":"reverse","window_length_years":5}"#).unwrap();
        assert_eq!(
            policy,
            WindowPolicy::Reverse {
                window_length_years: 5,
                borrow_mode: false
            }
        );

        let rolling: WindowPolicy =
            serde_json::from_str(r#"{"policy":"rolling","window_length_months":12}"#).unwrap();
        assert_eq!(
            rolling,
            WindowPolicy::Rolling {
                window_length_months: 12,
                slide_months: 1
            }
        );
    }

    #[test]
    fn generate_dispatches_to_the_matching_generator() {
        let template = WindowTemplate::new(vec![1], vec![]);
        let policy = WindowPolicy::Reverse {
            window_length_years: 5,
            borrow_mode: true,
        };
        let via_policy = policy.generate(d(2007, 3, 1), d(2020, 12, 31), &template).unwrap();
        let direct =
            generator::non_overlapping_reverse(d(2007, 3, 1), d(2020, 12, 31), 5, true, &template).unwrap();
        assert_eq!(via_policy, direct);
        assert_eq!(policy.label(), "5Y reverse (borrowing)");
    }

    #[test]
    fn bespoke_policy_ignores_range() {
        let policy = WindowPolicy::Bespoke {
            windows: vec![BespokeWindow {
                name: "Dot-com".to_string(),
                start_date: d(2000, 3, 1),
                end_date: d(2002, 10, 31),
            }],
        };
        let windows = policy
            .generate(d(2010, 1, 1), d(2011, 1, 1), &WindowTemplate::default())
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].name.as_deref(), Some("Dot-com"));
    }
}
