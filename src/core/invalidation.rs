use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, StoreResult};
use crate::models::{CandleSeries, Zone, ZoneId};
use crate::store::ZoneStore;

/// Price-action retirement rule: a zone is broken once a bar trades fully
/// beyond it by several ATRs, or when the latest close has drifted too far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutRule {
    pub atr_period: usize,
    pub atr_multiple: f64,
    /// Fraction of the latest close, e.g. 0.2 for 20%.
    pub max_distance_pct: f64,
}

impl Default for BreakoutRule {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_multiple: 2.0,
            max_distance_pct: 0.20,
        }
    }
}

/// When zones are retired. Both rules are off by default, in which case
/// crossovers only cost strength.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvalidationPolicy {
    pub max_crossovers: Option<u32>,
    pub breakout: Option<BreakoutRule>,
}

/// Why and when a zone should be retired.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub reason: String,
    pub at: chrono::DateTime<chrono::Utc>,
}

impl InvalidationPolicy {
    pub fn is_enabled(&self) -> bool {
        self.max_crossovers.is_some() || self.breakout.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_crossovers == Some(0) {
            return Err(ConfigError::Parameters("max_crossovers must be at least 1".into()));
        }
        if let Some(rule) = &self.breakout {
            if rule.atr_period == 0 || !(rule.atr_multiple > 0.0) || !(rule.max_distance_pct > 0.0) {
                return Err(ConfigError::Parameters(
                    "breakout rule needs a positive ATR period, multiple and distance".into(),
                ));
            }
        }
        Ok(())
    }

    /// First rule the zone violates, if any. Bars before the zone existed
    /// are ignored by the breakout check.
    pub fn verdict(&self, zone: &Zone, candles: &CandleSeries) -> Option<Verdict> {
        let last = candles.last()?;

        if let Some(limit) = self.max_crossovers {
            if zone.crossover_count >= limit {
                return Some(Verdict {
                    reason: format!("crossed {} times", zone.crossover_count),
                    at: last.timestamp,
                });
            }
        }

        let rule = self.breakout.as_ref()?;
        let max_distance = (last.close * rule.max_distance_pct).abs();
        if (zone.value - last.close).abs() > max_distance {
            return Some(Verdict {
                reason: "too far from price".to_string(),
                at: last.timestamp,
            });
        }

        let tr = candles.true_ranges();
        let period = rule.atr_period;
        for (i, bar) in candles.iter().enumerate() {
            if i < period || bar.timestamp < zone.first_detected {
                continue;
            }
            let atr = tr[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
            let threshold = atr * rule.atr_multiple;
            if bar.low - zone.value > threshold {
                return Some(Verdict {
                    reason: "broken to the upside".to_string(),
                    at: bar.timestamp,
                });
            }
            if zone.value - bar.high > threshold {
                return Some(Verdict {
                    reason: "broken to the downside".to_string(),
                    at: bar.timestamp,
                });
            }
        }
        None
    }

    /// Re-reads each zone and retires those that violate the policy.
    /// Returns the ids that were invalidated.
    pub async fn apply(
        &self,
        store: &dyn ZoneStore,
        zone_ids: &[ZoneId],
        candles: &CandleSeries,
    ) -> StoreResult<Vec<ZoneId>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let mut retired = Vec::new();
        for &id in zone_ids {
            let Some(zone) = store.get_zone(id).await? else {
                continue;
            };
            if !zone.active {
                continue;
            }
            if let Some(v) = self.verdict(&zone, candles) {
                if store.invalidate(id, Some(&v.reason), Some(v.at)).await? {
                    info!(zone_id = id, value = zone.value, reason = %v.reason, "retired zone");
                    retired.push(id);
                }
            }
        }
        Ok(retired)
    }
}
