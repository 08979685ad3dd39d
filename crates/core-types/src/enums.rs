use crate::error::CoreError;
use crate::structs::{MarketId, ProgramId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The entity a return series belongs to.
///
/// A manager's series is an aggregate over every non-benchmark market the
/// program trades; a benchmark's series is a single market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    Manager { program_id: ProgramId },
    Benchmark { market_id: MarketId },
}

impl EntityRef {
    pub fn manager(program_id: ProgramId) -> Self {
        EntityRef::Manager { program_id }
    }

    pub fn benchmark(market_id: MarketId) -> Self {
        EntityRef::Benchmark { market_id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Manager { program_id } => write!(f, "program {program_id}"),
            EntityRef::Benchmark { market_id } => write!(f, "benchmark {market_id}"),
        }
    }
}

/// Granularity of a return observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Daily,
    Monthly,
}

impl Resolution {
    /// The label used for this resolution in the `pnl_records.resolution` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Daily => "daily",
            Resolution::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Resolution::Daily),
            "monthly" => Ok(Resolution::Monthly),
            other => Err(CoreError::UnknownResolution(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_parses_database_labels() {
        assert_eq!("daily".parse::<Resolution>().unwrap(), Resolution::Daily);
        assert_eq!(" Monthly ".parse::<Resolution>().unwrap(), Resolution::Monthly);
        assert!("weekly".parse::<Resolution>().is_err());
    }

    #[test]
    fn entity_ref_serializes_as_tagged_variant() {
        let json = serde_json::to_string(&EntityRef::manager(7)).unwrap();
        assert_eq!(json, r#"{"kind":"manager","program_id":7}"#);

        let back: EntityRef = serde_json::from_str(r#"{"kind":"benchmark","market_id":3}"#).unwrap();
        assert_eq!(back, EntityRef::benchmark(3));
    }
}
