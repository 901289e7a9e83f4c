//! Synthetic geometry generators.
//!
//! Random generators take an explicit seed so test runs and benchmarks are
//! reproducible.

use map_common::{BoundingBox, Coord, Feature, Geometry, Polygon};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `count` uniformly distributed points inside `extent`.
pub fn random_points(count: usize, extent: BoundingBox, seed: u64) -> Vec<Coord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            (
                rng.gen_range(extent.min_x..=extent.max_x),
                rng.gen_range(extent.min_y..=extent.max_y),
            )
        })
        .collect()
}

/// A random walk of `vertices` vertices starting in the middle of `extent`,
/// each step at most `step` long, kept inside `extent`.
pub fn random_walk(vertices: usize, extent: BoundingBox, step: f64, seed: u64) -> Vec<Coord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut x, mut y) = extent.center();
    let mut line = Vec::with_capacity(vertices);
    for _ in 0..vertices {
        line.push((x, y));
        x = (x + rng.gen_range(-step..=step)).clamp(extent.min_x, extent.max_x);
        y = (y + rng.gen_range(-step..=step)).clamp(extent.min_y, extent.max_y);
    }
    line
}

/// Closed regular polygon ring with `sides` vertices.
pub fn regular_ring(center: Coord, radius: f64, sides: usize) -> Vec<Coord> {
    let sides = sides.max(3);
    let mut ring: Vec<Coord> = (0..sides)
        .map(|i| {
            let a = i as f64 / sides as f64 * std::f64::consts::TAU;
            (center.0 + radius * a.cos(), center.1 + radius * a.sin())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// Point features at random positions, ids starting at 1.
pub fn random_point_features(count: usize, extent: BoundingBox, seed: u64) -> Vec<Feature> {
    random_points(count, extent, seed)
        .into_iter()
        .enumerate()
        .map(|(i, p)| Feature::new(i as u64 + 1, Geometry::Point(p)))
        .collect()
}

/// Regular polygon features scattered over `extent`.
///
/// # Arguments
///
/// * `count` - Number of features to generate
/// * `extent` - Area the polygon centres are drawn from
/// * `radius` - Circumradius of every polygon, in map units
/// * `seed` - RNG seed; equal seeds give equal features
///
/// # Returns
///
/// Polygon features of 6 to 10 sides, ids starting at 1.
pub fn random_polygon_features(
    count: usize,
    extent: BoundingBox,
    radius: f64,
    seed: u64,
) -> Vec<Feature> {
    random_points(count, extent, seed)
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            Feature::new(
                i as u64 + 1,
                Geometry::Polygon(Polygon::new(regular_ring(c, radius, 6 + i % 5), vec![])),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_points_are_reproducible() {
        let extent = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let a = random_points(20, extent, 7);
        let b = random_points(20, extent, 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|&(x, y)| extent.contains_point(x, y)));
    }

    #[test]
    fn test_random_walk_stays_inside() {
        let extent = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let line = random_walk(200, extent, 10.0, 3);
        assert_eq!(line.len(), 200);
        assert!(line.iter().all(|&(x, y)| extent.contains_point(x, y)));
    }

    #[test]
    fn test_regular_ring_is_closed() {
        let ring = regular_ring((0.0, 0.0), 10.0, 6);
        assert_eq!(ring.len(), 7);
        assert_eq!(ring.first(), ring.last());
    }
}
