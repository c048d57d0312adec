//! Disaster zones: severity levels, category lifecycle templates and the
//! per-episode evolution of a single zone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::geo::{GeoPoint, Region};

/// Impact level of a zone. Decides the cost multiplier and which edges it hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
    /// Standing water: only roads entirely inside the zone slow down.
    Light = 1,
    /// Serious flooding: any road touching the zone slows down.
    Moderate = 2,
    /// Road cut: touching roads become effectively impassable.
    Blocking = 3,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Light, Severity::Moderate, Severity::Blocking];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Severity::Light => 1.2,
            Severity::Moderate => 2.5,
            Severity::Blocking => 100.0,
        }
    }

    pub fn passable(self) -> bool {
        !matches!(self, Severity::Blocking)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Light => "light flooding",
            Severity::Moderate => "moderate flood",
            Severity::Blocking => "road blocked",
        }
    }

    /// Whether an edge with the given endpoint membership is penalized.
    pub fn affects_edge(self, u_inside: bool, v_inside: bool) -> bool {
        match self {
            Severity::Light => u_inside && v_inside,
            Severity::Moderate | Severity::Blocking => u_inside || v_inside,
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = SimError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Severity::Light),
            2 => Ok(Severity::Moderate),
            3 => Ok(Severity::Blocking),
            _ => Err(SimError::validation(
                "Invalid severity level. Must be one of: [1, 2, 3]",
            )),
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} ({})", self.level(), self.label())
    }
}

/// Drift in degrees per episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub d_lon: f64,
    pub d_lat: f64,
}

/// Motion, decay and lifetime a category stamps onto new zones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleTemplate {
    pub velocity: Option<Velocity>,
    /// Radius lost per episode, in km.
    pub decay_rate: Option<f64>,
    /// Episodes until forced expiry.
    pub lifetime: Option<u32>,
}

/// Kind of event; decides how a zone evolves, not how hard it hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisasterCategory {
    #[default]
    Flood,
    Quake,
    Landslide,
    Storm,
}

impl DisasterCategory {
    pub const ALL: [DisasterCategory; 4] = [
        DisasterCategory::Flood,
        DisasterCategory::Quake,
        DisasterCategory::Landslide,
        DisasterCategory::Storm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DisasterCategory::Flood => "flood",
            DisasterCategory::Quake => "quake",
            DisasterCategory::Landslide => "landslide",
            DisasterCategory::Storm => "storm",
        }
    }

    pub fn template(self) -> LifecycleTemplate {
        match self {
            DisasterCategory::Flood => LifecycleTemplate {
                velocity: None,
                decay_rate: Some(0.5),
                lifetime: Some(300),
            },
            DisasterCategory::Quake | DisasterCategory::Landslide => LifecycleTemplate {
                velocity: None,
                decay_rate: None,
                lifetime: None,
            },
            DisasterCategory::Storm => LifecycleTemplate {
                velocity: Some(Velocity {
                    d_lon: 0.01,
                    d_lat: 0.0,
                }),
                decay_rate: None,
                lifetime: Some(500),
            },
        }
    }
}

impl fmt::Display for DisasterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisasterCategory {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DisasterCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                SimError::validation(format!(
                    "Unknown disaster type '{}'. Must be one of: flood, quake, landslide, storm",
                    s
                ))
            })
    }
}

/// An active perturbation zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterZone {
    pub id: u64,
    pub center: GeoPoint,
    pub category: DisasterCategory,
    pub severity: Severity,
    pub multiplier: f64,
    pub passable: bool,
    pub radius_km: f64,
    /// Episodes elapsed since creation.
    pub age: u32,
    pub spawn_episode: u64,
    pub velocity: Option<Velocity>,
    pub decay_rate: Option<f64>,
    pub lifetime: Option<u32>,
}

/// What one lifecycle tick did to a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tick {
    pub modified: bool,
    pub expired: bool,
}

impl DisasterZone {
    pub(crate) fn new(
        id: u64,
        center: GeoPoint,
        category: DisasterCategory,
        severity: Severity,
        radius_km: f64,
        spawn_episode: u64,
    ) -> Self {
        let template = category.template();
        Self {
            id,
            center,
            category,
            severity,
            multiplier: severity.multiplier(),
            passable: severity.passable(),
            radius_km,
            age: 0,
            spawn_episode,
            velocity: template.velocity,
            decay_rate: template.decay_rate,
            lifetime: template.lifetime,
        }
    }

    /// Advances the zone by one episode.
    ///
    /// Drift is clamped to `region`; decay never shrinks the radius below
    /// `min_radius_km`, and reaching that floor expires the zone.
    pub(crate) fn tick(&mut self, region: &Region, min_radius_km: f64) -> Tick {
        let mut tick = Tick::default();
        self.age = self.age.saturating_add(1);

        if let Some(v) = self.velocity {
            let drifted = GeoPoint::new(self.center.lat + v.d_lat, self.center.lon + v.d_lon);
            self.center = region.clamp(drifted);
            tick.modified = true;
        }

        if let Some(rate) = self.decay_rate {
            self.radius_km = (self.radius_km - rate).max(min_radius_km);
            tick.modified = true;
            if self.radius_km <= min_radius_km {
                tick.expired = true;
            }
        }

        if let Some(lifetime) = self.lifetime {
            if lifetime > 0 && self.age >= lifetime {
                tick.expired = true;
            }
        }
        tick
    }
}
