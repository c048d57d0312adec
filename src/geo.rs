//! Geodesic helpers: coordinates, great-circle distance, and the operating region.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by every great-circle computation, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometers (haversine formula).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.lat, self.lon)
    }
}

/// Haversine distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1.0 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Rectangular operating region in which disaster zones may exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Region {
    /// The island of Java, the region the default network lives in.
    pub const JAVA: Region = Region {
        lat_min: -9.0,
        lat_max: -5.0,
        lon_min: 105.0,
        lon_max: 115.0,
    };

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.lat_min..=self.lat_max).contains(&point.lat)
            && (self.lon_min..=self.lon_max).contains(&point.lon)
    }

    /// Returns `point` pulled back inside the region bounds.
    pub fn clamp(&self, point: GeoPoint) -> GeoPoint {
        GeoPoint {
            lat: point.lat.clamp(self.lat_min, self.lat_max),
            lon: point.lon.clamp(self.lon_min, self.lon_max),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.lat_min < self.lat_max && self.lon_min < self.lon_max
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::JAVA
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} lat, {} to {} lon",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_to_self() {
        let p = GeoPoint::new(-6.2088, 106.8456);
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_on_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        // 2πR / 360
        assert!((d - 111.19).abs() < 0.01);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = GeoPoint::new(-6.1096, 106.8837);
        let b = GeoPoint::new(-7.9666, 112.6326);
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-9);
    }

    #[test]
    fn java_region_bounds() {
        assert!(Region::JAVA.contains(GeoPoint::new(-6.9, 107.6)));
        assert!(Region::JAVA.contains(GeoPoint::new(-9.0, 115.0)));
        assert!(!Region::JAVA.contains(GeoPoint::new(-4.9, 107.6)));
        assert!(!Region::JAVA.contains(GeoPoint::new(-6.9, 115.1)));
    }

    #[test]
    fn clamp_pulls_point_inside() {
        let p = Region::JAVA.clamp(GeoPoint::new(-10.0, 120.0));
        assert_eq!(p, GeoPoint::new(-9.0, 115.0));
    }
}
