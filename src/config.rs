use serde::{Deserialize, Serialize};

use crate::core::invalidation::InvalidationPolicy;
use crate::error::ConfigError;
use crate::models::Timeframe;

/// Tuning knobs for one zone indicator run.
///
/// Deserializes from the JSON parameter blob stored alongside each zone.
/// Missing keys take their defaults, and the short legacy key names
/// (`filter_len`, `include_ph`, `include_pl`) are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrZoneParams {
    /// Most recent pivots kept per run; 0 keeps all of them.
    pub pivot_lookback: usize,
    #[serde(alias = "filter_len")]
    pub filter_length: f64,
    pub precision: usize,
    pub auto_precision: bool,
    pub threshold_ratio: f64,
    #[serde(alias = "include_ph")]
    pub include_pivot_highs: bool,
    #[serde(alias = "include_pl")]
    pub include_pivot_lows: bool,
    pub lengths: Vec<usize>,
    pub zone_tolerance: f64,
    pub scale: usize,
    pub touch_tolerance_pct: f64,
    pub invalidation: InvalidationPolicy,
}

impl Default for SrZoneParams {
    fn default() -> Self {
        Self {
            pivot_lookback: 50,
            filter_length: 3.0,
            precision: 75,
            auto_precision: false,
            threshold_ratio: 0.25,
            include_pivot_highs: true,
            include_pivot_lows: true,
            lengths: vec![5, 10, 20, 50],
            zone_tolerance: 15.0,
            scale: 30,
            touch_tolerance_pct: 0.001,
            invalidation: InvalidationPolicy::default(),
        }
    }
}

impl SrZoneParams {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let params: SrZoneParams = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Parameters(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision == 0 {
            return Err(ConfigError::NonPositivePrecision);
        }
        if !(0.0..=1.0).contains(&self.threshold_ratio) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold_ratio));
        }
        if self.lengths.is_empty() {
            return Err(ConfigError::NoLengths);
        }
        if self.lengths.contains(&0) {
            return Err(ConfigError::ZeroLength);
        }
        if !(self.zone_tolerance >= 0.0) {
            return Err(ConfigError::NegativeTolerance(self.zone_tolerance));
        }
        if self.scale < 2 {
            return Err(ConfigError::ScaleTooSmall(self.scale));
        }
        if !self.include_pivot_highs && !self.include_pivot_lows {
            return Err(ConfigError::NoPivotKinds);
        }
        if !(self.touch_tolerance_pct >= 0.0) {
            return Err(ConfigError::Parameters(format!(
                "touch tolerance {} must be non-negative",
                self.touch_tolerance_pct
            )));
        }
        self.invalidation.validate()
    }

    /// Parameter blob recorded on every zone this run creates.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Process-level settings for the batch runner.
#[derive(Debug, Clone)]
pub struct Config {
    pub symbol: String,
    /// Single-qualifier mode when set; otherwise every qualifier runs.
    pub qualifier: Option<String>,
    /// Overrides timeframe inference from bar spacing.
    pub timeframe: Option<Timeframe>,
    pub params_json: Option<String>,
    pub store_path: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let opt = |key: &str| -> Option<String> {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        };

        Config {
            symbol: env("SRZ_SYMBOL", "SPX"),
            qualifier: opt("SRZ_QUALIFIER"),
            timeframe: opt("SRZ_TIMEFRAME").and_then(|s| Timeframe::from_str_loose(&s)),
            params_json: opt("SRZ_PARAMS_JSON"),
            store_path: env("SRZ_STORE_PATH", "data/sr_zones.json"),
            log_level: env("LOG_LEVEL", "info"),
        }
    }

    /// The configured parameter blob, or an empty object.
    pub fn params(&self) -> Result<serde_json::Value, ConfigError> {
        match &self.params_json {
            Some(raw) => serde_json::from_str(raw).map_err(|e| ConfigError::Parameters(e.to_string())),
            None => Ok(serde_json::json!({})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_indicator_settings() {
        let p = SrZoneParams::default();
        assert_eq!(p.pivot_lookback, 50);
        assert_eq!(p.precision, 75);
        assert_eq!(p.lengths, vec![5, 10, 20, 50]);
        assert!((p.threshold_ratio - 0.25).abs() < 1e-9);
        assert!((p.zone_tolerance - 15.0).abs() < 1e-9);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let p = SrZoneParams::from_json(&json!({
            "filter_len": 5,
            "include_ph": false,
            "precision": 40
        }))
        .unwrap();
        assert!((p.filter_length - 5.0).abs() < 1e-9);
        assert!(!p.include_pivot_highs);
        assert!(p.include_pivot_lows);
        assert_eq!(p.precision, 40);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            SrZoneParams::from_json(&json!({"precision": 0})),
            Err(ConfigError::NonPositivePrecision)
        );
        assert_eq!(
            SrZoneParams::from_json(&json!({"threshold_ratio": 1.5})),
            Err(ConfigError::ThresholdOutOfRange(1.5))
        );
        assert_eq!(
            SrZoneParams::from_json(&json!({"lengths": []})),
            Err(ConfigError::NoLengths)
        );
        assert_eq!(
            SrZoneParams::from_json(&json!({"zone_tolerance": -1.0})),
            Err(ConfigError::NegativeTolerance(-1.0))
        );
        assert!(matches!(
            SrZoneParams::from_json(&json!({"precision": "many"})),
            Err(ConfigError::Parameters(_))
        ));
    }

    #[test]
    fn null_means_defaults() {
        assert_eq!(
            SrZoneParams::from_json(&serde_json::Value::Null).unwrap(),
            SrZoneParams::default()
        );
    }
}
