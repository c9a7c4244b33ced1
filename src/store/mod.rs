pub mod memory;

pub use memory::MemoryZoneStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    InteractionEvent, InteractionFilter, Pivot, Timeframe, WeightingScheme, Zone, ZoneCandidate,
    ZoneId, ZoneInteraction, ZonePivot,
};

/// Persistence boundary for zones and their provenance.
///
/// Implementations serialize writes: the nearest-zone lookup of an upsert
/// and the update or insert that follows happen under one lock.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Merges into the nearest active zone of the same qualifier and
    /// timeframe within `tolerance`, or inserts a new zone.
    async fn upsert(&self, candidate: &ZoneCandidate, tolerance: f64) -> StoreResult<ZoneId>;

    /// Applies several candidates atomically. Each is matched only against
    /// zones that were active before the batch started.
    async fn upsert_batch(
        &self,
        candidates: &[ZoneCandidate],
        tolerance: f64,
    ) -> StoreResult<Vec<ZoneId>>;

    /// Adds `delta` to the zone strength and returns the new strength.
    async fn adjust_strength(
        &self,
        zone_id: ZoneId,
        delta: f64,
        last_confirmed: DateTime<Utc>,
    ) -> StoreResult<f64>;

    /// Retires a zone. Returns false when the zone does not exist; a second
    /// call on the same zone changes nothing.
    async fn invalidate(
        &self,
        zone_id: ZoneId,
        reason: Option<&str>,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;

    /// Active zones first detected at or before `as_of` (default now),
    /// ordered by qualifier then value.
    async fn query(
        &self,
        timeframe: Timeframe,
        qualifier: Option<WeightingScheme>,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Zone>>;

    async fn get_zone(&self, zone_id: ZoneId) -> StoreResult<Option<Zone>>;

    /// Active zones within `tolerance` of `price`, nearest first, stronger
    /// first among equals.
    async fn zones_near(
        &self,
        price: f64,
        timeframe: Timeframe,
        tolerance: f64,
        qualifier: Option<WeightingScheme>,
    ) -> StoreResult<Vec<Zone>>;

    async fn add_pivot(
        &self,
        zone_id: ZoneId,
        pivot: &Pivot,
        timeframe: Timeframe,
    ) -> StoreResult<u64>;

    /// Newest first.
    async fn pivots_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<ZonePivot>>;

    async fn add_interaction(&self, event: InteractionEvent) -> StoreResult<u64>;

    /// Newest first.
    async fn interactions_for_zone(
        &self,
        zone_id: ZoneId,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>>;

    /// Newest first.
    async fn recent_interactions(
        &self,
        timeframe: Timeframe,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>>;
}

/// Strength-weighted merge of a candidate into an existing zone.
///
/// Falls back to the candidate value when the weights cannot form a
/// meaningful average (non-positive total or a negative side).
pub fn merge_candidate(zone: &mut Zone, candidate: &ZoneCandidate) {
    let old = zone.strength;
    let new = candidate.strength;
    let total = old + new;

    zone.value = if total > 0.0 && old >= 0.0 && new >= 0.0 {
        (zone.value * old + candidate.value * new) / total
    } else {
        candidate.value
    };
    zone.strength = total;
    confirm(zone, candidate.last_confirmed);
}

/// Advances `last_confirmed` without moving it backwards or before
/// `first_detected`.
pub fn confirm(zone: &mut Zone, at: DateTime<Utc>) {
    zone.last_confirmed = zone.last_confirmed.max(at).max(zone.first_detected);
}
