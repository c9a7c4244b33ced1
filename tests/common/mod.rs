#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use sr_zones::error::StoreResult;
use sr_zones::models::{
    Candle, CandleSeries, InteractionEvent, InteractionFilter, Pivot, Timeframe, WeightingScheme,
    Zone, ZoneCandidate, ZoneId, ZoneInteraction, ZonePivot,
};
use sr_zones::store::{MemoryZoneStore, ZoneStore};

pub fn ts(minutes: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + Duration::minutes(minutes)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    make_candles_from(0, data)
}

/// Same as `make_candles`, starting `offset` minutes after the base time.
pub fn make_candles_from(offset: i64, data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: ts(offset + i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// Triangle wave between `lo` and `hi`; bars span half a point around it.
pub fn zigzag_from(offset: i64, n: usize, period: usize, lo: f64, hi: f64) -> CandleSeries {
    let half = period as f64 / 2.0;
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let phase = (i % period) as f64;
            let frac = if phase <= half {
                phase / half
            } else {
                (period as f64 - phase) / half
            };
            let mid = lo + (hi - lo) * frac;
            (mid, mid + 0.5, mid - 0.5, mid)
        })
        .collect();
    make_candles_from(offset, &data)
}

pub fn zigzag(n: usize, period: usize, lo: f64, hi: f64) -> CandleSeries {
    zigzag_from(0, n, period, lo, hi)
}

pub fn uniform_candidate(value: f64, strength: f64) -> ZoneCandidate {
    ZoneCandidate {
        value,
        strength,
        qualifier: WeightingScheme::Uniform,
        timeframe: Timeframe::M1,
        first_detected: ts(0),
        last_confirmed: ts(0),
        parameters: serde_json::json!({}),
    }
}

/// Memory store that counts every call made through the trait.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryZoneStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ZoneStore for CountingStore {
    async fn upsert(&self, candidate: &ZoneCandidate, tolerance: f64) -> StoreResult<ZoneId> {
        self.hit();
        self.inner.upsert(candidate, tolerance).await
    }

    async fn upsert_batch(
        &self,
        candidates: &[ZoneCandidate],
        tolerance: f64,
    ) -> StoreResult<Vec<ZoneId>> {
        self.hit();
        self.inner.upsert_batch(candidates, tolerance).await
    }

    async fn adjust_strength(
        &self,
        zone_id: ZoneId,
        delta: f64,
        last_confirmed: DateTime<Utc>,
    ) -> StoreResult<f64> {
        self.hit();
        self.inner.adjust_strength(zone_id, delta, last_confirmed).await
    }

    async fn invalidate(
        &self,
        zone_id: ZoneId,
        reason: Option<&str>,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        self.hit();
        self.inner.invalidate(zone_id, reason, at).await
    }

    async fn query(
        &self,
        timeframe: Timeframe,
        qualifier: Option<WeightingScheme>,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Zone>> {
        self.hit();
        self.inner.query(timeframe, qualifier, as_of).await
    }

    async fn get_zone(&self, zone_id: ZoneId) -> StoreResult<Option<Zone>> {
        self.hit();
        self.inner.get_zone(zone_id).await
    }

    async fn zones_near(
        &self,
        price: f64,
        timeframe: Timeframe,
        tolerance: f64,
        qualifier: Option<WeightingScheme>,
    ) -> StoreResult<Vec<Zone>> {
        self.hit();
        self.inner.zones_near(price, timeframe, tolerance, qualifier).await
    }

    async fn add_pivot(
        &self,
        zone_id: ZoneId,
        pivot: &Pivot,
        timeframe: Timeframe,
    ) -> StoreResult<u64> {
        self.hit();
        self.inner.add_pivot(zone_id, pivot, timeframe).await
    }

    async fn pivots_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<ZonePivot>> {
        self.hit();
        self.inner.pivots_for_zone(zone_id).await
    }

    async fn add_interaction(&self, event: InteractionEvent) -> StoreResult<u64> {
        self.hit();
        self.inner.add_interaction(event).await
    }

    async fn interactions_for_zone(
        &self,
        zone_id: ZoneId,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>> {
        self.hit();
        self.inner.interactions_for_zone(zone_id, filter).await
    }

    async fn recent_interactions(
        &self,
        timeframe: Timeframe,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>> {
        self.hit();
        self.inner.recent_interactions(timeframe, filter).await
    }
}
