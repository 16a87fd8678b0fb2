//! Uniform spatial hash grid for nearest-neighbor candidate queries.
//!
//! Pairwise distance computation is quadratic in partition size; past
//! roughly a thousand points per category the graph builder switches to
//! this grid. Cells are keyed by `floor(coord / cell_size)` and queried in
//! expanding Chebyshev rings.

use crate::layout::Vec3;
use std::collections::HashMap;

pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<(i32, i32, i32), Vec<(u32, Vec3)>>,
}

impl SpatialGrid {
    /// Build a grid over the given points. `ids` index into an external
    /// point array; `position` resolves them.
    pub fn build<'a>(ids: &[u32], position: impl Fn(u32) -> &'a Vec3) -> Self {
        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &id in ids {
            let p = position(id);
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }

        // Aim for a handful of points per cell: diagonal over cube root of n.
        let diagonal = max.distance(&min);
        let cell_size = (diagonal / (ids.len().max(1) as f64).cbrt()).max(1e-6);

        let mut cells: HashMap<(i32, i32, i32), Vec<(u32, Vec3)>> = HashMap::new();
        for &id in ids {
            let p = *position(id);
            cells.entry(Self::key(&p, cell_size)).or_default().push((id, p));
        }

        Self { cell_size, cells }
    }

    fn key(p: &Vec3, cell_size: f64) -> (i32, i32, i32) {
        (
            (p.x / cell_size).floor() as i32,
            (p.y / cell_size).floor() as i32,
            (p.z / cell_size).floor() as i32,
        )
    }

    /// Candidate ids for the `k` nearest neighbors of `center`, superset of
    /// the true k nearest.
    ///
    /// Rings expand until the next ring provably cannot hold anything
    /// closer than the current k-th best: every cell at Chebyshev ring
    /// `r + 1` lies at least `r * cell_size` away from the probe.
    pub fn nearest_candidates(&self, center: &Vec3, exclude: u32, k: usize) -> Vec<u32> {
        let center_key = Self::key(center, self.cell_size);
        let max_ring = self
            .cells
            .keys()
            .map(|key| {
                (key.0 - center_key.0)
                    .abs()
                    .max((key.1 - center_key.1).abs())
                    .max((key.2 - center_key.2).abs())
            })
            .max()
            .unwrap_or(0);

        let mut candidates: Vec<(u32, f64)> = Vec::new();
        for ring in 0..=max_ring {
            self.collect_ring(center_key, ring, center, exclude, &mut candidates);
            if candidates.len() >= k && k > 0 {
                let mut distances: Vec<f64> = candidates.iter().map(|&(_, d)| d).collect();
                distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let kth = distances[k - 1];
                if ring as f64 * self.cell_size >= kth {
                    break;
                }
            }
        }

        candidates.into_iter().map(|(id, _)| id).collect()
    }

    /// Append the contents of every cell at exactly Chebyshev distance
    /// `ring` from the probe's cell.
    fn collect_ring(
        &self,
        center_key: (i32, i32, i32),
        ring: i32,
        center: &Vec3,
        exclude: u32,
        out: &mut Vec<(u32, f64)>,
    ) {
        for dx in -ring..=ring {
            for dy in -ring..=ring {
                for dz in -ring..=ring {
                    if dx.abs().max(dy.abs()).max(dz.abs()) != ring {
                        continue;
                    }
                    let key = (center_key.0 + dx, center_key.1 + dy, center_key.2 + dz);
                    if let Some(bucket) = self.cells.get(&key) {
                        out.extend(
                            bucket
                                .iter()
                                .filter(|(id, _)| *id != exclude)
                                .map(|(id, p)| (*id, center.distance(p))),
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_cloud(seed: u64, n: usize) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-200.0..200.0),
                    rng.gen_range(-200.0..200.0),
                    rng.gen_range(-200.0..200.0),
                )
            })
            .collect()
    }

    #[test]
    fn candidates_contain_true_nearest_neighbors() {
        let points = random_cloud(17, 300);
        let ids: Vec<u32> = (0..points.len() as u32).collect();
        let grid = SpatialGrid::build(&ids, |id| &points[id as usize]);

        let k = 6;
        for probe in 0..points.len() as u32 {
            let center = &points[probe as usize];
            let candidates = grid.nearest_candidates(center, probe, k);

            // Brute-force k nearest.
            let mut all: Vec<u32> = ids.iter().copied().filter(|&id| id != probe).collect();
            all.sort_by(|&a, &b| {
                center
                    .distance(&points[a as usize])
                    .partial_cmp(&center.distance(&points[b as usize]))
                    .unwrap()
            });

            for nearest in &all[..k] {
                assert!(
                    candidates.contains(nearest),
                    "grid candidates for {probe} missing true neighbor {nearest}"
                );
            }
        }
    }

    #[test]
    fn excludes_the_probe_itself() {
        let points = random_cloud(3, 50);
        let ids: Vec<u32> = (0..points.len() as u32).collect();
        let grid = SpatialGrid::build(&ids, |id| &points[id as usize]);
        let candidates = grid.nearest_candidates(&points[10], 10, 5);
        assert!(!candidates.contains(&10));
    }

    #[test]
    fn handles_tiny_inputs() {
        let points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let ids: Vec<u32> = vec![0, 1];
        let grid = SpatialGrid::build(&ids, |id| &points[id as usize]);
        let candidates = grid.nearest_candidates(&points[0], 0, 6);
        assert_eq!(candidates, vec![1]);
    }
}
