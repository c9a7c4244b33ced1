use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{PivotKind, Timeframe, WeightingScheme};

pub type ZoneId = u64;

/// A persisted support/resistance level.
///
/// `active` is always the negation of `invalidated_at.is_some()` and
/// `last_confirmed` never precedes `first_detected`; the store maintains both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub value: f64,
    pub qualifier: WeightingScheme,
    pub timeframe: Timeframe,
    pub strength: f64,
    pub first_detected: DateTime<Utc>,
    pub last_confirmed: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub invalidation_reason: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub crossover_count: u32,
    pub source_parameters: serde_json::Value,
}

impl Zone {
    pub fn distance_to(&self, price: f64) -> f64 {
        (self.value - price).abs()
    }

    /// Output row for the batch caller.
    pub fn to_record(&self) -> ZoneRecord {
        ZoneRecord {
            zone_id: self.id,
            timestamp_start: self.first_detected,
            timestamp_end: self.invalidated_at,
            value: self.value,
            strength: self.strength,
            qualifier: self.qualifier,
            timeframe: self.timeframe,
            parameters_json: self.source_parameters.to_string(),
        }
    }
}

/// A level proposed by one pipeline run, not yet merged into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCandidate {
    pub value: f64,
    pub strength: f64,
    pub qualifier: WeightingScheme,
    pub timeframe: Timeframe,
    pub first_detected: DateTime<Utc>,
    pub last_confirmed: DateTime<Utc>,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub zone_id: ZoneId,
    pub timestamp_start: DateTime<Utc>,
    pub timestamp_end: Option<DateTime<Utc>>,
    pub value: f64,
    pub strength: f64,
    pub qualifier: WeightingScheme,
    pub timeframe: Timeframe,
    pub parameters_json: String,
}

/// Provenance row: a pivot that contributed to a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePivot {
    pub id: u64,
    pub zone_id: ZoneId,
    pub pivot_value: f64,
    pub pivot_timestamp: DateTime<Utc>,
    pub pivot_type: PivotKind,
    pub weight: f64,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Touch,
    CrossoverUp,
    CrossoverDown,
    BounceUp,
    BounceDown,
}

impl InteractionType {
    /// Strength change applied to the zone for this event.
    pub fn strength_delta(&self) -> f64 {
        match self {
            InteractionType::Touch => 2.0,
            InteractionType::CrossoverUp | InteractionType::CrossoverDown => -5.0,
            InteractionType::BounceUp | InteractionType::BounceDown => 10.0,
        }
    }

    pub fn is_crossover(&self) -> bool {
        matches!(self, InteractionType::CrossoverUp | InteractionType::CrossoverDown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Touch => "touch",
            InteractionType::CrossoverUp => "crossover_up",
            InteractionType::CrossoverDown => "crossover_down",
            InteractionType::BounceUp => "bounce_up",
            InteractionType::BounceDown => "bounce_down",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An interaction before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub zone_id: ZoneId,
    pub bar_id: String,
    pub timeframe: Timeframe,
    pub kind: InteractionType,
    /// Strength delta applied to the zone.
    pub strength: f64,
    pub timestamp: DateTime<Utc>,
    /// Zone value at the time of the event.
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInteraction {
    pub id: u64,
    #[serde(flatten)]
    pub event: InteractionEvent,
}

/// Optional bounds for interaction queries. Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct InteractionFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub kind: Option<InteractionType>,
}

impl InteractionFilter {
    pub fn matches(&self, event: &InteractionEvent) -> bool {
        self.start.map_or(true, |s| event.timestamp >= s)
            && self.end.map_or(true, |e| event.timestamp <= e)
            && self.kind.map_or(true, |k| event.kind == k)
    }
}

/// Bar identifier used on interaction rows: `%Y%m%d%H%M%S_{symbol}`.
pub fn bar_id(timestamp: DateTime<Utc>, symbol: &str) -> String {
    format!("{}_{}", timestamp.format("%Y%m%d%H%M%S"), symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_id_format() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(bar_id(ts, "SPX"), "20240305093000_SPX");
    }

    #[test]
    fn deltas() {
        assert!((InteractionType::Touch.strength_delta() - 2.0).abs() < 1e-9);
        assert!((InteractionType::CrossoverDown.strength_delta() + 5.0).abs() < 1e-9);
        assert!((InteractionType::BounceUp.strength_delta() - 10.0).abs() < 1e-9);
        assert!(InteractionType::CrossoverUp.is_crossover());
        assert!(!InteractionType::Touch.is_crossover());
    }
}
