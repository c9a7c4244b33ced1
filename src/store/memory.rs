use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{confirm, merge_candidate, ZoneStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    InteractionEvent, InteractionFilter, Pivot, Timeframe, WeightingScheme, Zone, ZoneCandidate,
    ZoneId, ZoneInteraction, ZonePivot,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    zones: BTreeMap<ZoneId, Zone>,
    pivots: Vec<ZonePivot>,
    interactions: Vec<ZoneInteraction>,
    next_zone_id: ZoneId,
    next_pivot_id: u64,
    next_interaction_id: u64,
}

impl Tables {
    fn nearest_in(
        &self,
        pool: Option<&HashSet<ZoneId>>,
        candidate: &ZoneCandidate,
        tolerance: f64,
    ) -> Option<ZoneId> {
        let mut best: Option<(ZoneId, f64)> = None;
        for zone in self.zones.values() {
            if !zone.active
                || zone.qualifier != candidate.qualifier
                || zone.timeframe != candidate.timeframe
                || pool.is_some_and(|p| !p.contains(&zone.id))
            {
                continue;
            }
            let d = zone.distance_to(candidate.value);
            if d > tolerance {
                continue;
            }
            // ids ascend, so strict comparison keeps the lowest id on ties
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((zone.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    fn apply(
        &mut self,
        pool: Option<&HashSet<ZoneId>>,
        candidate: &ZoneCandidate,
        tolerance: f64,
    ) -> ZoneId {
        if let Some(id) = self.nearest_in(pool, candidate, tolerance) {
            if let Some(zone) = self.zones.get_mut(&id) {
                merge_candidate(zone, candidate);
                debug!(
                    zone_id = id,
                    value = zone.value,
                    strength = zone.strength,
                    "merged candidate"
                );
                return id;
            }
        }

        self.next_zone_id += 1;
        let id = self.next_zone_id;
        let first_detected = candidate.first_detected;
        self.zones.insert(
            id,
            Zone {
                id,
                value: candidate.value,
                qualifier: candidate.qualifier,
                timeframe: candidate.timeframe,
                strength: candidate.strength,
                first_detected,
                last_confirmed: candidate.last_confirmed.max(first_detected),
                invalidated_at: None,
                invalidation_reason: None,
                active: true,
                crossover_count: 0,
                source_parameters: candidate.parameters.clone(),
            },
        );
        debug!(zone_id = id, value = candidate.value, "created zone");
        id
    }
}

/// In-process zone store. One lock covers every table, so all writes are
/// serialized.
#[derive(Debug, Default)]
pub struct MemoryZoneStore {
    tables: RwLock<Tables>,
}

impl MemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON snapshot; a missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no zone snapshot, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let tables: Tables = serde_json::from_str(&content)?;
        info!(path = %path.display(), zones = tables.zones.len(), "loaded zone snapshot");
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tables = self.tables.read().await;
        let json = serde_json::to_string_pretty(&*tables)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), zones = tables.zones.len(), "saved zone snapshot");
        Ok(())
    }

    pub async fn zone_count(&self) -> usize {
        self.tables.read().await.zones.len()
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, u64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl ZoneStore for MemoryZoneStore {
    async fn upsert(&self, candidate: &ZoneCandidate, tolerance: f64) -> StoreResult<ZoneId> {
        let mut tables = self.tables.write().await;
        Ok(tables.apply(None, candidate, tolerance))
    }

    async fn upsert_batch(
        &self,
        candidates: &[ZoneCandidate],
        tolerance: f64,
    ) -> StoreResult<Vec<ZoneId>> {
        let mut tables = self.tables.write().await;
        let pool: HashSet<ZoneId> = tables
            .zones
            .values()
            .filter(|z| z.active)
            .map(|z| z.id)
            .collect();
        Ok(candidates
            .iter()
            .map(|c| tables.apply(Some(&pool), c, tolerance))
            .collect())
    }

    async fn adjust_strength(
        &self,
        zone_id: ZoneId,
        delta: f64,
        last_confirmed: DateTime<Utc>,
    ) -> StoreResult<f64> {
        let mut tables = self.tables.write().await;
        let zone = tables
            .zones
            .get_mut(&zone_id)
            .ok_or(StoreError::ZoneNotFound(zone_id))?;
        zone.strength += delta;
        confirm(zone, last_confirmed);
        Ok(zone.strength)
    }

    async fn invalidate(
        &self,
        zone_id: ZoneId,
        reason: Option<&str>,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(zone) = tables.zones.get_mut(&zone_id) else {
            return Ok(false);
        };
        if zone.active {
            zone.active = false;
            zone.invalidated_at = Some(at.unwrap_or_else(Utc::now));
            zone.invalidation_reason = reason.map(str::to_string);
            info!(zone_id, reason = reason.unwrap_or("unspecified"), "zone invalidated");
        }
        Ok(true)
    }

    async fn query(
        &self,
        timeframe: Timeframe,
        qualifier: Option<WeightingScheme>,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Zone>> {
        let as_of = as_of.unwrap_or_else(Utc::now);
        let tables = self.tables.read().await;
        let mut zones: Vec<Zone> = tables
            .zones
            .values()
            .filter(|z| {
                z.active
                    && z.timeframe == timeframe
                    && qualifier.map_or(true, |q| z.qualifier == q)
                    && z.first_detected <= as_of
            })
            .cloned()
            .collect();
        zones.sort_by(|a, b| {
            a.qualifier
                .as_str()
                .cmp(b.qualifier.as_str())
                .then(a.value.total_cmp(&b.value))
        });
        Ok(zones)
    }

    async fn get_zone(&self, zone_id: ZoneId) -> StoreResult<Option<Zone>> {
        Ok(self.tables.read().await.zones.get(&zone_id).cloned())
    }

    async fn zones_near(
        &self,
        price: f64,
        timeframe: Timeframe,
        tolerance: f64,
        qualifier: Option<WeightingScheme>,
    ) -> StoreResult<Vec<Zone>> {
        let tables = self.tables.read().await;
        let mut zones: Vec<Zone> = tables
            .zones
            .values()
            .filter(|z| {
                z.active
                    && z.timeframe == timeframe
                    && qualifier.map_or(true, |q| z.qualifier == q)
                    && z.distance_to(price) <= tolerance
            })
            .cloned()
            .collect();
        zones.sort_by(|a, b| {
            a.distance_to(price)
                .total_cmp(&b.distance_to(price))
                .then(b.strength.total_cmp(&a.strength))
        });
        Ok(zones)
    }

    async fn add_pivot(
        &self,
        zone_id: ZoneId,
        pivot: &Pivot,
        timeframe: Timeframe,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if !tables.zones.contains_key(&zone_id) {
            return Err(StoreError::ZoneNotFound(zone_id));
        }
        tables.next_pivot_id += 1;
        let id = tables.next_pivot_id;
        tables.pivots.push(ZonePivot {
            id,
            zone_id,
            pivot_value: pivot.level,
            pivot_timestamp: pivot.timestamp,
            pivot_type: pivot.kind,
            weight: pivot.weight,
            timeframe,
        });
        Ok(id)
    }

    async fn pivots_for_zone(&self, zone_id: ZoneId) -> StoreResult<Vec<ZonePivot>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ZonePivot> = tables
            .pivots
            .iter()
            .filter(|p| p.zone_id == zone_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.pivot_timestamp, p.id));
        Ok(rows)
    }

    async fn add_interaction(&self, event: InteractionEvent) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let zone = tables
            .zones
            .get_mut(&event.zone_id)
            .ok_or(StoreError::ZoneNotFound(event.zone_id))?;
        if event.kind.is_crossover() {
            zone.crossover_count += 1;
        }
        tables.next_interaction_id += 1;
        let id = tables.next_interaction_id;
        tables.interactions.push(ZoneInteraction { id, event });
        Ok(id)
    }

    async fn interactions_for_zone(
        &self,
        zone_id: ZoneId,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ZoneInteraction> = tables
            .interactions
            .iter()
            .filter(|i| i.event.zone_id == zone_id && filter.matches(&i.event))
            .cloned()
            .collect();
        newest_first(&mut rows, |i| (i.event.timestamp, i.id));
        Ok(rows)
    }

    async fn recent_interactions(
        &self,
        timeframe: Timeframe,
        filter: &InteractionFilter,
    ) -> StoreResult<Vec<ZoneInteraction>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ZoneInteraction> = tables
            .interactions
            .iter()
            .filter(|i| i.event.timeframe == timeframe && filter.matches(&i.event))
            .cloned()
            .collect();
        newest_first(&mut rows, |i| (i.event.timestamp, i.id));
        Ok(rows)
    }
}
