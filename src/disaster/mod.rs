//! Time-evolving disaster zones and the live cost matrix they produce.
//!
//! The [`DisasterEngine`] is the only writer of the live matrix. Every change
//! to the zone set rebuilds it from the immutable baseline and publishes a new
//! [`Arc`]; readers holding the previous handle are never mutated under.

mod physics;
mod zone;

pub use physics::{affected_nodes, apply_zone, recompute, PENALTY_CEILING};
pub use zone::{DisasterCategory, DisasterZone, LifecycleTemplate, Severity, Velocity};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SimError;
use crate::geo::{GeoPoint, Region};
use crate::network::{DistanceMatrix, NodeMap};
use crate::NodeId;

/// Maximum number of concurrent zones.
pub const DISASTER_LIMIT: usize = 10;

/// Radius a decaying zone shrinks to before it expires, in km.
pub const MIN_ZONE_RADIUS_KM: f64 = 10.0;

/// Parameters of a zone to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub category: DisasterCategory,
    /// Raw level; checked against [`Severity`] on creation.
    #[serde(default = "ZoneRequest::default_severity")]
    pub severity: u8,
    #[serde(default = "ZoneRequest::default_radius")]
    pub radius_km: f64,
}

impl ZoneRequest {
    pub fn new(lat: f64, lon: f64, category: DisasterCategory, severity: u8, radius_km: f64) -> Self {
        Self {
            lat,
            lon,
            category,
            severity,
            radius_km,
        }
    }

    fn default_severity() -> u8 {
        2
    }

    fn default_radius() -> f64 {
        50.0
    }
}

/// Bounds the engine enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub region: Region,
    pub limit: usize,
    pub min_radius_km: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            region: Region::JAVA,
            limit: DISASTER_LIMIT,
            min_radius_km: MIN_ZONE_RADIUS_KM,
        }
    }
}

/// Owns the zone set and derives the live matrix from it.
#[derive(Debug, Clone)]
pub struct DisasterEngine {
    settings: EngineSettings,
    locations: Vec<GeoPoint>,
    base: Arc<DistanceMatrix>,
    live: Arc<DistanceMatrix>,
    zones: Vec<DisasterZone>,
    next_id: u64,
}

impl DisasterEngine {
    pub fn new(nodes: &NodeMap, base: Arc<DistanceMatrix>, settings: EngineSettings) -> Self {
        Self {
            settings,
            locations: nodes.iter().map(|(_, n)| n.location()).collect(),
            live: Arc::clone(&base),
            base,
            zones: Vec::new(),
            next_id: 0,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn base(&self) -> &Arc<DistanceMatrix> {
        &self.base
    }

    /// Current live matrix, baseline plus every active zone.
    pub fn live(&self) -> &Arc<DistanceMatrix> {
        &self.live
    }

    pub fn zones(&self) -> &[DisasterZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Validates and adds a zone, then rebuilds the live matrix.
    ///
    /// Capacity is checked first, then coordinates, severity and radius.
    /// Nothing changes on error.
    pub fn create(&mut self, request: &ZoneRequest, episode: u64) -> Result<DisasterZone, SimError> {
        if self.zones.len() >= self.settings.limit {
            return Err(SimError::Capacity {
                limit: self.settings.limit,
            });
        }
        let center = GeoPoint::new(request.lat, request.lon);
        if !self.settings.region.contains(center) {
            return Err(SimError::validation(format!(
                "Coordinates outside operating region ({})",
                self.settings.region
            )));
        }
        let severity = Severity::try_from(request.severity)?;
        if !request.radius_km.is_finite() || request.radius_km < 0.0 {
            return Err(SimError::validation(format!(
                "Radius must be a non-negative number of km, got {}",
                request.radius_km
            )));
        }

        let zone = DisasterZone::new(
            self.next_id,
            center,
            request.category,
            severity,
            request.radius_km,
            episode,
        );
        self.next_id += 1;
        self.zones.push(zone.clone());
        self.recompute();

        info!(
            id = zone.id,
            category = %zone.category,
            severity = %zone.severity,
            center = %zone.center,
            radius_km = zone.radius_km,
            "disaster zone created"
        );
        Ok(zone)
    }

    /// Rebuilds the live matrix from the baseline.
    pub fn recompute(&mut self) {
        self.live = if self.zones.is_empty() {
            Arc::clone(&self.base)
        } else {
            Arc::new(recompute(&self.base, &self.locations, &self.zones))
        };
    }

    /// Ages every zone by one episode and drops the expired ones.
    ///
    /// Rebuilds the live matrix when anything moved, shrank or expired, and
    /// returns the number of zones removed.
    pub fn advance(&mut self) -> usize {
        let mut modified = false;
        let mut expired = Vec::new();
        for zone in &mut self.zones {
            let tick = zone.tick(&self.settings.region, self.settings.min_radius_km);
            modified |= tick.modified;
            if tick.expired {
                expired.push(zone.id);
            }
        }

        if !expired.is_empty() {
            self.zones.retain(|z| !expired.contains(&z.id));
            for id in &expired {
                info!(id, "disaster zone expired");
            }
            modified = true;
        }
        if modified {
            self.recompute();
            debug!(active = self.zones.len(), "live matrix rebuilt after lifecycle tick");
        }
        expired.len()
    }

    /// Removes every zone, restarts ids and restores the baseline.
    pub fn clear(&mut self) -> usize {
        let removed = self.zones.len();
        self.zones.clear();
        self.next_id = 0;
        self.live = Arc::clone(&self.base);
        removed
    }

    /// Node ids a hypothetical zone would cover, without creating it.
    pub fn nodes_within(&self, center: GeoPoint, radius_km: f64) -> Vec<NodeId> {
        let probe = DisasterZone::new(0, center, DisasterCategory::Quake, Severity::Light, radius_km, 0);
        affected_nodes(&self.locations, &probe)
    }
}
