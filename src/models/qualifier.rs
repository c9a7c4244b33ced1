use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// How each pivot contributes to the price histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingScheme {
    /// Every pivot counts 1.
    #[serde(alias = "linear")]
    Uniform,
    /// Newer pivots count more.
    #[serde(alias = "time")]
    Recency,
    /// Pivots count by traded volume.
    #[serde(alias = "volume")]
    Magnitude,
}

impl WeightingScheme {
    pub const ALL: [WeightingScheme; 3] = [
        WeightingScheme::Recency,
        WeightingScheme::Uniform,
        WeightingScheme::Magnitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingScheme::Uniform => "uniform",
            WeightingScheme::Recency => "recency",
            WeightingScheme::Magnitude => "magnitude",
        }
    }
}

impl fmt::Display for WeightingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WeightingScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" | "linear" => Ok(WeightingScheme::Uniform),
            "recency" | "time" => Ok(WeightingScheme::Recency),
            "magnitude" | "volume" => Ok(WeightingScheme::Magnitude),
            _ => Err(ConfigError::UnknownQualifier(s.to_string())),
        }
    }
}
