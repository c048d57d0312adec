//! Rebuilding the live cost matrix from the baseline and the active zones.

use crate::geo::GeoPoint;
use crate::network::DistanceMatrix;
use crate::NodeId;

use super::zone::DisasterZone;

/// Upper bound on any perturbed edge cost.
pub const PENALTY_CEILING: f64 = 100_000.0;

/// Nodes within the zone's radius of its center (great-circle distance).
pub fn affected_nodes(locations: &[GeoPoint], zone: &DisasterZone) -> Vec<NodeId> {
    locations
        .iter()
        .enumerate()
        .filter(|(_, p)| zone.center.distance_km(p) <= zone.radius_km)
        .map(|(id, _)| id)
        .collect()
}

/// Scales every edge `zone` affects, once per unordered pair, both directions.
pub fn apply_zone(matrix: &mut DistanceMatrix, locations: &[GeoPoint], zone: &DisasterZone) {
    let n = matrix.len().min(locations.len());
    let mut inside = vec![false; n];
    for id in affected_nodes(&locations[..n], zone) {
        inside[id] = true;
    }
    if !inside.iter().any(|&b| b) {
        return;
    }

    for u in 0..n {
        for v in u + 1..n {
            if zone.severity.affects_edge(inside[u], inside[v]) {
                matrix.scale_capped(u, v, zone.multiplier, PENALTY_CEILING);
                matrix.scale_capped(v, u, zone.multiplier, PENALTY_CEILING);
            }
        }
    }
}

/// Fresh live matrix: a copy of `base` with every zone applied in order.
pub fn recompute(base: &DistanceMatrix, locations: &[GeoPoint], zones: &[DisasterZone]) -> DistanceMatrix {
    let mut live = base.clone();
    for zone in zones {
        apply_zone(&mut live, locations, zone);
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disaster::zone::{DisasterCategory, Severity};
    use crate::network::ring_matrix;

    /// Five nodes spaced a degree of longitude apart along the equator.
    fn line() -> Vec<GeoPoint> {
        (0..5).map(|i| GeoPoint::new(0.0, i as f64)).collect()
    }

    fn zone_at(node: usize, severity: Severity, radius: f64) -> DisasterZone {
        DisasterZone::new(0, line()[node], DisasterCategory::Quake, severity, radius, 0)
    }

    #[test]
    fn blocking_zone_with_zero_radius_caps_every_touching_edge() {
        let base = ring_matrix();
        let live = recompute(&base, &line(), &[zone_at(2, Severity::Blocking, 0.0)]);
        for other in [0, 1, 3, 4] {
            assert_eq!(live.get(2, other), (base.get(2, other) * 100.0).min(PENALTY_CEILING));
            assert_eq!(live.get(other, 2), live.get(2, other));
        }
        assert_eq!(live.get(0, 1), base.get(0, 1));
        assert_eq!(live.get(2, 2), 0.0);
    }

    #[test]
    fn light_zone_around_a_single_node_changes_nothing() {
        let base = ring_matrix();
        let live = recompute(&base, &line(), &[zone_at(2, Severity::Light, 0.0)]);
        assert_eq!(live, base);
    }

    #[test]
    fn light_zone_hits_only_internal_edges() {
        let base = ring_matrix();
        // ~111 km spacing: a 120 km radius around node 2 covers 1, 2 and 3.
        let live = recompute(&base, &line(), &[zone_at(2, Severity::Light, 120.0)]);
        assert!((live.get(1, 2) - base.get(1, 2) * 1.2).abs() < 1e-9);
        assert!((live.get(3, 1) - base.get(3, 1) * 1.2).abs() < 1e-9);
        assert_eq!(live.get(0, 2), base.get(0, 2));
        assert_eq!(live.get(3, 4), base.get(3, 4));
    }

    #[test]
    fn each_edge_is_scaled_once_per_zone() {
        let base = ring_matrix();
        let live = recompute(&base, &line(), &[zone_at(2, Severity::Moderate, 120.0)]);
        // Both endpoints inside, still a single ×2.5.
        assert!((live.get(1, 3) - base.get(1, 3) * 2.5).abs() < 1e-9);
    }

    #[test]
    fn overlapping_zones_compound_up_to_ceiling() {
        let base = ring_matrix();
        let z = zone_at(0, Severity::Blocking, 0.0);
        let live = recompute(&base, &line(), &[z.clone(), z]);
        assert_eq!(live.get(0, 1), PENALTY_CEILING);
    }

    #[test]
    fn severity_never_lowers_costs() {
        let base = ring_matrix();
        let mut previous = base.clone();
        for severity in Severity::ALL {
            let live = recompute(&base, &line(), &[zone_at(1, severity, 120.0)]);
            for u in 0..5 {
                for v in 0..5 {
                    assert!(live.get(u, v) >= previous.get(u, v));
                }
            }
            previous = live;
        }
    }

    #[test]
    fn no_zones_is_exactly_the_base() {
        let base = ring_matrix();
        assert_eq!(recompute(&base, &line(), &[]), base);
    }
}
