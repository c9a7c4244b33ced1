use tracing::debug;

use crate::error::StoreResult;
use crate::models::{
    bar_id, Candle, CandleSeries, InteractionEvent, InteractionType, Timeframe, WeightingScheme,
};
use crate::store::ZoneStore;

/// Default touch band: 0.1% of the zone value.
pub const TOUCH_TOLERANCE_PCT: f64 = 0.001;

/// Classifies how bar `cur` interacted with a level, given the bar before it
/// and, for bounces, the one before that. A bar can produce several events.
pub fn classify(
    before_prev: Option<&Candle>,
    prev: &Candle,
    cur: &Candle,
    value: f64,
    touch_pct: f64,
) -> Vec<InteractionType> {
    let mut out = Vec::new();
    let band = (value * touch_pct).abs();

    if prev.close < value && cur.close > value {
        out.push(InteractionType::CrossoverUp);
    } else if prev.close > value && cur.close < value {
        out.push(InteractionType::CrossoverDown);
    }

    if (cur.high - value).abs() <= band || (cur.low - value).abs() <= band {
        out.push(InteractionType::Touch);
    }

    if let Some(pp) = before_prev {
        if pp.close > prev.close && cur.close > prev.close && (prev.low - value).abs() <= band {
            out.push(InteractionType::BounceUp);
        } else if pp.close < prev.close
            && cur.close < prev.close
            && (prev.high - value).abs() <= band
        {
            out.push(InteractionType::BounceDown);
        }
    }
    out
}

/// Replays bars against stored zones and feeds each event back into the
/// zone's strength.
pub struct InteractionTracker {
    pub symbol: String,
    pub touch_pct: f64,
}

impl InteractionTracker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            touch_pct: TOUCH_TOLERANCE_PCT,
        }
    }

    pub fn with_touch_pct(mut self, touch_pct: f64) -> Self {
        self.touch_pct = touch_pct;
        self
    }

    /// Zones are read once, as of the last bar, so the replay does not see
    /// its own strength updates. Returns the events written.
    pub async fn replay(
        &self,
        store: &dyn ZoneStore,
        candles: &CandleSeries,
        timeframe: Timeframe,
        qualifier: Option<WeightingScheme>,
    ) -> StoreResult<Vec<InteractionEvent>> {
        let Some(last) = candles.last() else {
            return Ok(Vec::new());
        };
        let zones = store.query(timeframe, qualifier, Some(last.timestamp)).await?;
        if zones.is_empty() || candles.len() < 2 {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for i in 1..candles.len() {
            let cur = &candles[i];
            let prev = &candles[i - 1];
            let before_prev = i.checked_sub(2).map(|k| &candles[k]);
            let id = bar_id(cur.timestamp, &self.symbol);

            for zone in &zones {
                for kind in classify(before_prev, prev, cur, zone.value, self.touch_pct) {
                    let event = InteractionEvent {
                        zone_id: zone.id,
                        bar_id: id.clone(),
                        timeframe,
                        kind,
                        strength: kind.strength_delta(),
                        timestamp: cur.timestamp,
                        price: zone.value,
                    };
                    store.add_interaction(event.clone()).await?;
                    store
                        .adjust_strength(zone.id, kind.strength_delta(), cur.timestamp)
                        .await?;
                    events.push(event);
                }
            }
        }

        debug!(
            timeframe = %timeframe,
            zones = zones.len(),
            events = events.len(),
            "interaction replay finished"
        );
        Ok(events)
    }
}
