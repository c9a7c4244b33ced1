pub mod sr_zones;

pub use sr_zones::SrZoneIndicator;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SrZoneError};
use crate::models::{CandleSeries, Timeframe, ZoneRecord};
use crate::store::ZoneStore;

/// What an indicator run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Zones(Vec<ZoneRecord>),
    /// Input was rejected before any work was done.
    Skipped { reason: String },
}

impl IndicatorOutput {
    pub fn records(&self) -> &[ZoneRecord] {
        match self {
            IndicatorOutput::Zones(records) => records,
            IndicatorOutput::Skipped { .. } => &[],
        }
    }
}

#[async_trait]
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;
    async fn calculate(&self, bars: &CandleSeries) -> Result<IndicatorOutput, SrZoneError>;
}

/// Everything a constructor may need.
#[derive(Clone)]
pub struct IndicatorContext {
    pub params: serde_json::Value,
    pub qualifier: Option<String>,
    pub symbol: String,
    pub timeframe: Option<Timeframe>,
    pub store: Arc<dyn ZoneStore>,
}

impl IndicatorContext {
    pub fn new(store: Arc<dyn ZoneStore>) -> Self {
        Self {
            params: serde_json::json!({}),
            qualifier: None,
            symbol: "SPX".to_string(),
            timeframe: None,
            store,
        }
    }
}

pub type IndicatorCtor = fn(IndicatorContext) -> Result<Box<dyn Indicator>, ConfigError>;

/// Explicit name to constructor table.
#[derive(Default)]
pub struct IndicatorRegistry {
    ctors: BTreeMap<String, IndicatorCtor>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the zone indicator under its current and legacy keys.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("srzones", SrZoneIndicator::boxed);
        registry.register("enhanced_srzones", SrZoneIndicator::boxed);
        registry
    }

    pub fn register(&mut self, key: &str, ctor: IndicatorCtor) {
        self.ctors.insert(key.to_lowercase(), ctor);
    }

    pub fn keys(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }

    pub fn build(&self, key: &str, ctx: IndicatorContext) -> Result<Box<dyn Indicator>, ConfigError> {
        let ctor = self
            .ctors
            .get(&key.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownIndicator(key.to_string()))?;
        ctor(ctx)
    }
}
