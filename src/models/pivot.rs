use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

impl fmt::Display for PivotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotKind::High => write!(f, "high"),
            PivotKind::Low => write!(f, "low"),
        }
    }
}

/// A local extreme found by one window length. `weight` is filled in by
/// the weighting stage and starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub index: usize,
    pub level: f64,
    pub kind: PivotKind,
    pub timestamp: DateTime<Utc>,
    pub weight: f64,
    pub length: usize,
}
