use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Indicator, IndicatorContext, IndicatorOutput};
use crate::config::SrZoneParams;
use crate::core::interactions::InteractionTracker;
use crate::core::pipeline::ZonePipeline;
use crate::error::{ConfigError, SrZoneError};
use crate::models::{CandleSeries, Timeframe, WeightingScheme, ZoneCandidate, ZoneRecord};
use crate::store::ZoneStore;

/// Support/resistance zone indicator: runs the pivot histogram pipeline per
/// qualifier, merges the candidates into the store, replays interactions and
/// reports the active zones.
pub struct SrZoneIndicator {
    params: SrZoneParams,
    qualifiers: Vec<WeightingScheme>,
    timeframe: Option<Timeframe>,
    tracker: InteractionTracker,
    store: Arc<dyn ZoneStore>,
}

impl SrZoneIndicator {
    pub fn new(ctx: IndicatorContext) -> Result<Self, ConfigError> {
        let params = SrZoneParams::from_json(&ctx.params)?;
        let qualifiers = match ctx.qualifier.as_deref() {
            Some(q) => vec![q.parse::<WeightingScheme>()?],
            None => WeightingScheme::ALL.to_vec(),
        };
        let tracker = InteractionTracker::new(ctx.symbol).with_touch_pct(params.touch_tolerance_pct);
        Ok(Self {
            params,
            qualifiers,
            timeframe: ctx.timeframe,
            tracker,
            store: ctx.store,
        })
    }

    pub fn boxed(ctx: IndicatorContext) -> Result<Box<dyn Indicator>, ConfigError> {
        Ok(Box::new(Self::new(ctx)?))
    }

    pub fn qualifiers(&self) -> &[WeightingScheme] {
        &self.qualifiers
    }

    async fn run_qualifier(
        &self,
        pipeline: &ZonePipeline,
        bars: &CandleSeries,
        qualifier: WeightingScheme,
        timeframe: Timeframe,
    ) -> Result<Vec<ZoneRecord>, SrZoneError> {
        let store = self.store.as_ref();
        let Ok(output) = pipeline.run(bars, qualifier, timeframe) else {
            return Ok(Vec::new());
        };

        let candidates: Vec<ZoneCandidate> = output
            .proposals
            .iter()
            .map(|p| p.candidate.clone())
            .collect();
        let ids = store
            .upsert_batch(&candidates, self.params.zone_tolerance)
            .await?;
        for (id, proposal) in ids.iter().zip(&output.proposals) {
            for pivot in &proposal.pivots {
                store.add_pivot(*id, pivot, timeframe).await?;
            }
        }

        let events = self
            .tracker
            .replay(store, bars, timeframe, Some(qualifier))
            .await?;

        let as_of = bars.last().map(|b| b.timestamp);
        let policy = &self.params.invalidation;
        let mut retired = Vec::new();
        if policy.is_enabled() {
            let ids: Vec<_> = store
                .query(timeframe, Some(qualifier), as_of)
                .await?
                .iter()
                .map(|z| z.id)
                .collect();
            retired = policy.apply(store, &ids, bars).await?;
        }

        let zones = store.query(timeframe, Some(qualifier), as_of).await?;
        info!(
            qualifier = %qualifier,
            timeframe = %timeframe,
            candidates = candidates.len(),
            interactions = events.len(),
            retired = retired.len(),
            active = zones.len(),
            "zone run complete"
        );
        Ok(zones.iter().map(|z| z.to_record()).collect())
    }
}

#[async_trait]
impl Indicator for SrZoneIndicator {
    fn name(&self) -> &str {
        "srzones"
    }

    async fn calculate(&self, bars: &CandleSeries) -> Result<IndicatorOutput, SrZoneError> {
        if let Err(defect) = bars.validate() {
            warn!(%defect, "rejecting bar series");
            return Ok(IndicatorOutput::Skipped {
                reason: defect.to_string(),
            });
        }

        let timeframe = self.timeframe.unwrap_or_else(|| {
            let first = bars[0].timestamp;
            Timeframe::from_spacing(first, bars.get(1).map(|b| b.timestamp))
        });
        info!(timeframe = %timeframe, bars = bars.len(), "running zone indicator");

        let pipeline = ZonePipeline::new(self.params.clone());
        let mut records = Vec::new();
        // Sequential so zone ids are assigned deterministically.
        for &qualifier in &self.qualifiers {
            records.extend(self.run_qualifier(&pipeline, bars, qualifier, timeframe).await?);
        }
        Ok(IndicatorOutput::Zones(records))
    }
}
