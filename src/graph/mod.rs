//! Proximity graph builder.
//!
//! Connects each placed point to a handful of its nearest neighbors within
//! its own category, producing the sparse edge set the pulse animation runs
//! over. Construction is the expensive step: per-partition distance work is
//! quadratic, so partitions past `grid_threshold` points go through a
//! spatial hash grid instead of the full pairwise matrix.

pub mod pulse;
mod spatial;

use crate::error::{Error, Result};
use crate::holders::Category;
use crate::layout::PlacedPoint;
use pulse::PulseState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use spatial::SpatialGrid;
use std::collections::{BTreeMap, HashSet};

/// Tunables for graph construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphParams {
    /// Target degree lower bound per node.
    pub min_neighbors: u32,
    /// Hard degree upper bound per node.
    pub max_neighbors: u32,
    /// Restrict edges to endpoints of the same category.
    pub same_category_only: bool,
    /// Partition size beyond which the spatial grid replaces the full
    /// pairwise distance matrix.
    pub grid_threshold: usize,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            min_neighbors: 3,
            max_neighbors: 6,
            same_category_only: true,
            grid_threshold: 1000,
        }
    }
}

impl GraphParams {
    fn validate(&self) -> Result<()> {
        if self.min_neighbors == 0 || self.min_neighbors > self.max_neighbors {
            return Err(Error::Domain(format!(
                "neighbor bounds must satisfy 1 <= min <= max, got {}..{}",
                self.min_neighbors, self.max_neighbors
            )));
        }
        Ok(())
    }
}

/// An unordered pair of placed points with a cached distance. Endpoints
/// never change once created; only the pulse state mutates.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    /// Lower point index.
    pub a: u32,
    /// Higher point index.
    pub b: u32,
    /// Category of the endpoints (of the lower-indexed endpoint if a
    /// cross-category build ever mixes them).
    pub category: Category,
    /// Euclidean distance between the endpoints.
    pub distance: f64,
    #[serde(skip)]
    pub(crate) state: PulseState,
}

impl Edge {
    pub fn is_active(&self) -> bool {
        matches!(self.state, PulseState::Active { .. })
    }
}

/// Aggregate construction statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub edges_by_category: BTreeMap<Category, usize>,
    pub total_edges: usize,
    pub avg_edges_per_node: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub avg_distance: f64,
}

/// The built graph. The edge set is immutable after construction; pulse
/// activation toggles in place.
#[derive(Debug)]
pub struct ProximityGraph {
    pub(crate) edges: Vec<Edge>,
    stats: GraphStats,
}

impl ProximityGraph {
    /// Build the nearest-neighbor graph over placed points.
    ///
    /// Zero points is a legitimate transient state while data loads and
    /// yields an empty graph. Each node draws a target degree uniformly
    /// from `min..=max` (capped at partition size minus one) and connects
    /// to its nearest not-yet-saturated neighbors; duplicate pairs are
    /// suppressed through a normalized-pair set, so the check is O(1) per
    /// candidate.
    pub fn build(
        points: &[PlacedPoint],
        params: &GraphParams,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        params.validate()?;

        let partitions = partition_indices(points, params.same_category_only);
        let mut edges: Vec<Edge> = Vec::new();
        let mut seen: HashSet<(u32, u32)> = HashSet::new();
        let mut degrees = vec![0u32; points.len()];

        for ids in partitions.values() {
            connect_partition(points, ids, params, rng, &mut edges, &mut seen, &mut degrees);
        }

        let stats = compute_stats(&edges, points.len());
        tracing::info!(
            edges = stats.total_edges,
            avg_per_node = stats.avg_edges_per_node,
            "built proximity graph"
        );

        Ok(Self { edges, stats })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Degree of every point, counting both endpoints of each edge.
    pub fn degrees(&self, point_count: usize) -> Vec<u32> {
        let mut degrees = vec![0u32; point_count];
        for edge in &self.edges {
            degrees[edge.a as usize] += 1;
            degrees[edge.b as usize] += 1;
        }
        degrees
    }
}

/// Group point indices by category, or lump everything together when
/// cross-category edges are allowed. BTreeMap keeps partition order
/// stable so seeded builds reproduce.
fn partition_indices(
    points: &[PlacedPoint],
    same_category_only: bool,
) -> BTreeMap<Option<Category>, Vec<u32>> {
    let mut partitions: BTreeMap<Option<Category>, Vec<u32>> = BTreeMap::new();
    for (index, point) in points.iter().enumerate() {
        let key = same_category_only.then_some(point.category);
        partitions.entry(key).or_default().push(index as u32);
    }
    partitions
}

fn connect_partition(
    points: &[PlacedPoint],
    ids: &[u32],
    params: &GraphParams,
    rng: &mut impl Rng,
    edges: &mut Vec<Edge>,
    seen: &mut HashSet<(u32, u32)>,
    degrees: &mut [u32],
) {
    let n = ids.len();
    if n < 2 {
        return;
    }

    // Candidate ids per node, nearest first. The grid path returns a
    // superset of the nearest candidates; both paths sort by true distance.
    let grid = (n > params.grid_threshold)
        .then(|| SpatialGrid::build(ids, |id| &points[id as usize].position));

    for &id in ids {
        let target = rng
            .gen_range(params.min_neighbors..=params.max_neighbors)
            .min(n as u32 - 1);
        if degrees[id as usize] >= target {
            continue;
        }

        let center = &points[id as usize].position;
        let mut candidates: Vec<(u32, f64)> = match &grid {
            Some(grid) => grid
                .nearest_candidates(center, id, params.max_neighbors as usize * 3)
                .into_iter()
                .map(|other| (other, center.distance(&points[other as usize].position)))
                .collect(),
            None => ids
                .iter()
                .copied()
                .filter(|&other| other != id)
                .map(|other| (other, center.distance(&points[other as usize].position)))
                .collect(),
        };
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        for (other, distance) in candidates {
            if degrees[id as usize] >= target {
                break;
            }
            let pair = (id.min(other), id.max(other));
            if seen.contains(&pair) {
                continue;
            }
            // Hard cap: a popular node never exceeds max_neighbors.
            if degrees[other as usize] >= params.max_neighbors {
                continue;
            }
            seen.insert(pair);
            degrees[id as usize] += 1;
            degrees[other as usize] += 1;
            edges.push(Edge {
                a: pair.0,
                b: pair.1,
                category: points[pair.0 as usize].category,
                distance,
                state: PulseState::Inactive,
            });
        }

        if degrees[id as usize] < params.min_neighbors.min(n as u32 - 1) {
            tracing::debug!(
                id,
                degree = degrees[id as usize],
                "node left under-connected; neighbors saturated"
            );
        }
    }
}

fn compute_stats(edges: &[Edge], point_count: usize) -> GraphStats {
    let mut stats = GraphStats {
        total_edges: edges.len(),
        ..GraphStats::default()
    };
    if point_count > 0 {
        stats.avg_edges_per_node = edges.len() as f64 / point_count as f64;
    }
    if edges.is_empty() {
        return stats;
    }

    let mut min = f64::INFINITY;
    let mut max = 0.0f64;
    let mut sum = 0.0;
    for edge in edges {
        *stats.edges_by_category.entry(edge.category).or_insert(0) += 1;
        min = min.min(edge.distance);
        max = max.max(edge.distance);
        sum += edge.distance;
    }
    stats.min_distance = min;
    stats.max_distance = max;
    stats.avg_distance = sum / edges.len() as f64;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holders::{sample, Category, Record};
    use crate::layout::{LayoutGenerator, LayoutParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn placed(records: &[Record], seed: u64) -> Vec<crate::layout::PlacedPoint> {
        let gen = LayoutGenerator::new(LayoutParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        gen.place_all(records, &mut rng).unwrap()
    }

    fn uniform_records(category: Category, count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| Record {
                address: format!("wallet-{category}-{i}"),
                magnitude: 1000.0,
                category,
            })
            .collect()
    }

    #[test]
    fn no_duplicate_unordered_pairs() {
        let points = placed(&uniform_records(Category::Primary, 50), 1);
        let mut rng = StdRng::seed_from_u64(2);
        let graph = ProximityGraph::build(&points, &GraphParams::default(), &mut rng).unwrap();

        let mut pairs = HashSet::new();
        for edge in graph.edges() {
            assert!(edge.a < edge.b, "edge endpoints not normalized");
            assert!(
                pairs.insert((edge.a, edge.b)),
                "duplicate edge {}-{}",
                edge.a,
                edge.b
            );
        }
    }

    #[test]
    fn same_category_only_never_crosses() {
        let mut records = uniform_records(Category::Primary, 20);
        records.extend(uniform_records(Category::Secondary, 20));
        let points = placed(&records, 3);
        let mut rng = StdRng::seed_from_u64(4);
        let graph = ProximityGraph::build(&points, &GraphParams::default(), &mut rng).unwrap();

        assert!(!graph.is_empty());
        for edge in graph.edges() {
            assert_eq!(
                points[edge.a as usize].category,
                points[edge.b as usize].category
            );
        }
    }

    #[test]
    fn degrees_stay_within_bounds() {
        let points = placed(&uniform_records(Category::Primary, 60), 5);
        let params = GraphParams::default();
        let mut rng = StdRng::seed_from_u64(6);
        let graph = ProximityGraph::build(&points, &params, &mut rng).unwrap();

        for (i, degree) in graph.degrees(points.len()).into_iter().enumerate() {
            assert!(
                degree >= params.min_neighbors && degree <= params.max_neighbors,
                "node {i} has degree {degree}"
            );
        }
    }

    #[test]
    fn tiny_partition_caps_degree_at_size_minus_one() {
        let points = placed(&uniform_records(Category::Primary, 3), 7);
        let params = GraphParams::default(); // min 3 > partition - 1
        let mut rng = StdRng::seed_from_u64(8);
        let graph = ProximityGraph::build(&points, &params, &mut rng).unwrap();

        // Three nodes with min_neighbors 3 collapse to the complete graph.
        assert_eq!(graph.edges().len(), 3);
        for degree in graph.degrees(points.len()) {
            assert_eq!(degree, 2);
        }
    }

    #[test]
    fn empty_input_builds_empty_graph() {
        let mut rng = StdRng::seed_from_u64(9);
        let graph = ProximityGraph::build(&[], &GraphParams::default(), &mut rng).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.stats().total_edges, 0);
        assert_eq!(graph.stats().avg_edges_per_node, 0.0);
    }

    #[test]
    fn single_point_builds_empty_graph() {
        let points = placed(&uniform_records(Category::Primary, 1), 10);
        let mut rng = StdRng::seed_from_u64(11);
        let graph = ProximityGraph::build(&points, &GraphParams::default(), &mut rng).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn invalid_neighbor_bounds_are_rejected() {
        let params = GraphParams {
            min_neighbors: 6,
            max_neighbors: 3,
            ..GraphParams::default()
        };
        let mut rng = StdRng::seed_from_u64(12);
        assert!(ProximityGraph::build(&[], &params, &mut rng).is_err());
    }

    #[test]
    fn two_category_scenario_stays_partitioned() {
        // Ten primary and five secondary holders, degree target 2..=3.
        let mut records = uniform_records(Category::Primary, 10);
        records.extend(uniform_records(Category::Secondary, 5));
        let points = placed(&records, 13);
        let params = GraphParams {
            min_neighbors: 2,
            max_neighbors: 3,
            ..GraphParams::default()
        };
        let mut rng = StdRng::seed_from_u64(14);
        let graph = ProximityGraph::build(&points, &params, &mut rng).unwrap();

        let primary_edges = graph.stats().edges_by_category[&Category::Primary];
        assert!(
            (10..=15).contains(&primary_edges),
            "primary partition produced {primary_edges} edges"
        );
        for edge in graph.edges() {
            assert_eq!(
                points[edge.a as usize].category,
                points[edge.b as usize].category
            );
        }
        for (i, degree) in graph.degrees(points.len()).into_iter().enumerate() {
            assert!(
                (2..=3).contains(&degree),
                "node {i} has degree {degree} outside 2..=3"
            );
        }
    }

    #[test]
    fn grid_path_preserves_invariants() {
        let records = sample(15, 200);
        let points = placed(&records, 16);
        let params = GraphParams {
            grid_threshold: 10, // force the spatial grid path
            ..GraphParams::default()
        };
        let mut rng = StdRng::seed_from_u64(17);
        let graph = ProximityGraph::build(&points, &params, &mut rng).unwrap();

        assert!(!graph.is_empty());
        let mut pairs = HashSet::new();
        for edge in graph.edges() {
            assert!(pairs.insert((edge.a, edge.b)));
            assert_eq!(
                points[edge.a as usize].category,
                points[edge.b as usize].category
            );
        }
        for degree in graph.degrees(points.len()) {
            assert!(degree <= params.max_neighbors);
        }
    }

    #[test]
    fn stats_are_consistent() {
        let points = placed(&uniform_records(Category::Primary, 40), 18);
        let mut rng = StdRng::seed_from_u64(19);
        let graph = ProximityGraph::build(&points, &GraphParams::default(), &mut rng).unwrap();

        let stats = graph.stats();
        assert_eq!(
            stats.total_edges,
            stats.edges_by_category.values().sum::<usize>()
        );
        assert!(stats.min_distance <= stats.avg_distance);
        assert!(stats.avg_distance <= stats.max_distance);
        assert!(stats.min_distance > 0.0);
        assert!(
            (stats.avg_edges_per_node - stats.total_edges as f64 / points.len() as f64).abs()
                < 1e-12
        );
    }
}
