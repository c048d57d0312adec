use crate::error::SimError;
use crate::NodeId;

/// Anything that can price a directed hop between two nodes.
///
/// Implemented by the raw [`DistanceMatrix`] and by an agent's view of it,
/// which layers agent-local road overrides on top of the shared matrix.
pub trait EdgeCost {
    /// Cost of travelling from `from` to `to`.
    fn cost(&self, from: NodeId, to: NodeId) -> f64;

    /// Sum of hop costs along consecutive route entries.
    fn route_distance(&self, route: &[NodeId]) -> f64 {
        route.windows(2).map(|hop| self.cost(hop[0], hop[1])).sum()
    }
}

/// Total distance of `route` under `costs`.
///
/// Free-function form of [`EdgeCost::route_distance`].
pub fn calculate_total_distance<C: EdgeCost + ?Sized>(route: &[NodeId], costs: &C) -> f64 {
    costs.route_distance(route)
}

/// Dense N×N matrix of non-negative travel costs, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// An all-zero N×N matrix.
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    /// Builds a matrix from nested rows.
    ///
    /// Rows must form a square of finite, non-negative values.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SimError> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(SimError::validation(format!(
                    "Matrix row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(bad) = row.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(SimError::validation(format!(
                    "Matrix row {} contains invalid cost {}",
                    i, bad
                )));
            }
            data.extend(row);
        }
        Ok(Self { n, data })
    }

    /// Number of nodes (rows) in the matrix.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, from: NodeId, to: NodeId) -> f64 {
        self.data[from * self.n + to]
    }

    pub fn set(&mut self, from: NodeId, to: NodeId, value: f64) {
        self.data[from * self.n + to] = value;
    }

    /// Multiplies the cost of `from → to` by `factor`, capped at `ceiling`.
    pub fn scale_capped(&mut self, from: NodeId, to: NodeId, factor: f64, ceiling: f64) {
        let idx = from * self.n + to;
        self.data[idx] = (self.data[idx] * factor).min(ceiling);
    }

    pub fn row(&self, from: NodeId) -> &[f64] {
        &self.data[from * self.n..(from + 1) * self.n]
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.n).all(|i| (i + 1..self.n).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance))
    }
}

impl EdgeCost for DistanceMatrix {
    fn cost(&self, from: NodeId, to: NodeId) -> f64 {
        self.get(from, to)
    }
}

#[cfg(test)]
pub(crate) fn ring_matrix() -> DistanceMatrix {
    DistanceMatrix::from_rows(vec![
        vec![0.0, 10.0, 15.0, 20.0, 25.0],
        vec![10.0, 0.0, 35.0, 25.0, 30.0],
        vec![15.0, 35.0, 0.0, 30.0, 20.0],
        vec![20.0, 25.0, 30.0, 0.0, 15.0],
        vec![25.0, 30.0, 20.0, 15.0, 0.0],
    ])
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ring_tour_distance() {
        let m = ring_matrix();
        let route = [0, 1, 2, 3, 4, 0];
        assert_eq!(calculate_total_distance(&route, &m), 115.0);
        assert_eq!(m.route_distance(&route), 115.0);
    }

    #[test]
    fn ring_is_symmetric_with_zero_diagonal() {
        let m = ring_matrix();
        assert!(m.is_symmetric(0.0));
        assert!((0..m.len()).all(|i| m.get(i, i) == 0.0));
    }

    #[test]
    fn from_rows_rejects_ragged_and_negative() {
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]).is_err());
        assert!(DistanceMatrix::from_rows(vec![vec![0.0, -1.0], vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn scale_capped_respects_ceiling() {
        let mut m = ring_matrix();
        m.scale_capped(1, 2, 100.0, 1000.0);
        assert_eq!(m.get(1, 2), 1000.0);
        m.scale_capped(0, 1, 2.0, 1000.0);
        assert_eq!(m.get(0, 1), 20.0);
    }

    #[test]
    fn empty_and_single_node_routes_cost_nothing() {
        let m = ring_matrix();
        assert_eq!(m.route_distance(&[]), 0.0);
        assert_eq!(m.route_distance(&[3]), 0.0);
    }

    proptest! {
        #[test]
        fn distance_is_additive(route in proptest::collection::vec(0usize..5, 2..12), split in 1usize..11) {
            let m = ring_matrix();
            let split = split.min(route.len() - 1);
            let whole = m.route_distance(&route);
            let parts = m.route_distance(&route[..=split]) + m.route_distance(&route[split..]);
            prop_assert!((whole - parts).abs() < 1e-9);
        }
    }
}
