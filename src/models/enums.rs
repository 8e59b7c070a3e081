use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// What a service's price is charged per. Informational only; it never
/// affects cart arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PriceUnit {
    #[default]
    PerItem,
    PerLb,
    PerSet,
    PerStain,
    /// Any label the catalog sends that we don't know about, kept verbatim.
    Other(String),
}

impl PriceUnit {
    pub fn as_str(&self) -> &str {
        match self {
            PriceUnit::PerItem => "per item",
            PriceUnit::PerLb => "per lb",
            PriceUnit::PerSet => "per set",
            PriceUnit::PerStain => "per stain",
            PriceUnit::Other(label) => label,
        }
    }
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        let unit = match normalized.as_str() {
            "" | "per item" | "item" => PriceUnit::PerItem,
            "per lb" | "lb" | "per pound" => PriceUnit::PerLb,
            "per set" | "set" => PriceUnit::PerSet,
            "per stain" | "stain" => PriceUnit::PerStain,
            _ => PriceUnit::Other(s.trim().to_string()),
        };
        Ok(unit)
    }
}

impl Serialize for PriceUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PriceUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .map(|l| l.parse::<PriceUnit>().unwrap_or_default())
            .unwrap_or_default())
    }
}
