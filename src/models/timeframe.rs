use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Some(Timeframe::M1),
            "3m" => Some(Timeframe::M3),
            "15m" => Some(Timeframe::M15),
            "1h" => Some(Timeframe::H1),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }

    /// Infers the timeframe from the spacing of two consecutive bars.
    /// Anything without a usable spacing is treated as daily.
    pub fn from_spacing(first: DateTime<Utc>, second: Option<DateTime<Utc>>) -> Timeframe {
        let Some(second) = second else {
            return Timeframe::D1;
        };
        let minutes = (second - first).num_seconds() as f64 / 60.0;
        if minutes < 2.0 {
            Timeframe::M1
        } else if minutes < 5.0 {
            Timeframe::M3
        } else if minutes < 30.0 {
            Timeframe::M15
        } else if minutes < 120.0 {
            Timeframe::H1
        } else {
            Timeframe::D1
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
