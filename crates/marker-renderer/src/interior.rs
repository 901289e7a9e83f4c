//! Interior label points for polygons.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use map_common::{BoundingBox, Coord, Polygon};

/// Finds a point well inside a polygon.
pub trait InteriorPoint: Send + Sync {
    fn interior(&self, polygon: &Polygon, scale_factor: f64) -> Option<Coord>;
}

/// Pole of inaccessibility search that prefers cells near the centroid.
///
/// Precision is `10 × scale_factor` pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolylabelInterior;

impl InteriorPoint for PolylabelInterior {
    fn interior(&self, polygon: &Polygon, scale_factor: f64) -> Option<Coord> {
        polylabel(polygon, 10.0 * scale_factor)
    }
}

fn segment_dist_sq((px, py): Coord, (ax, ay): Coord, (bx, by): Coord) -> f64 {
    let (mut x, mut y) = (ax, ay);
    let (dx, dy) = (bx - ax, by - ay);

    if dx != 0.0 || dy != 0.0 {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = bx;
            y = by;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    let (dx, dy) = (px - x, py - y);
    dx * dx + dy * dy
}

/// Signed distance to the outline; negative outside.
fn polygon_distance(p: Coord, polygon: &Polygon) -> f64 {
    let mut inside = false;
    let mut min_dist_sq = f64::INFINITY;

    for ring in polygon.rings() {
        let n = ring.len();
        if n == 0 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let a = ring[i];
            let b = ring[j];
            if (a.1 > p.1) != (b.1 > p.1) && p.0 < (b.0 - a.0) * (p.1 - a.1) / (b.1 - a.1) + a.0 {
                inside = !inside;
            }
            min_dist_sq = min_dist_sq.min(segment_dist_sq(p, a, b));
            j = i;
        }
    }

    let d = min_dist_sq.sqrt();
    if inside {
        d
    } else {
        -d
    }
}

struct Fitness {
    centroid: Coord,
    max_size: f64,
}

impl Fitness {
    fn score(&self, (x, y): Coord, distance: f64) -> f64 {
        if distance <= 0.0 {
            return distance;
        }
        let (dx, dy) = (x - self.centroid.0, y - self.centroid.1);
        distance * (1.0 - (dx * dx + dy * dy).sqrt() / self.max_size)
    }
}

struct Cell {
    center: Coord,
    half: f64,
    fitness: f64,
    max_fitness: f64,
}

impl Cell {
    fn new(center: Coord, half: f64, polygon: &Polygon, fitness: &Fitness) -> Self {
        let d = polygon_distance(center, polygon);
        Self {
            center,
            half,
            fitness: fitness.score(center, d),
            max_fitness: fitness.score(center, d + half * std::f64::consts::SQRT_2),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.max_fitness.total_cmp(&other.max_fitness) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_fitness.total_cmp(&other.max_fitness)
    }
}

pub fn polylabel(polygon: &Polygon, precision: f64) -> Option<Coord> {
    let bbox = BoundingBox::from_points(polygon.exterior.iter().copied())?;
    let (width, height) = (bbox.width(), bbox.height());

    let cell_size = width.min(height);
    if cell_size == 0.0 {
        return Some((bbox.min_x, bbox.min_y));
    }

    let centroid = match polygon.centroid() {
        Some(c) => c,
        None => return Some(bbox.center()),
    };
    let fitness = Fitness {
        centroid,
        max_size: width.max(height),
    };

    let half = cell_size / 2.0;
    let mut queue = BinaryHeap::new();
    let mut x = bbox.min_x;
    while x < bbox.max_x {
        let mut y = bbox.min_y;
        while y < bbox.max_y {
            queue.push(Cell::new((x + half, y + half), half, polygon, &fitness));
            y += cell_size;
        }
        x += cell_size;
    }

    let mut best = Cell::new(centroid, 0.0, polygon, &fitness);

    while let Some(cell) = queue.pop() {
        let best_fitness = best.fitness.max(cell.fitness);
        let (cx, cy) = cell.center;
        let h = cell.half / 2.0;
        let drill = cell.max_fitness - best_fitness > precision;

        if cell.fitness > best.fitness {
            best = cell;
        }
        if !drill {
            continue;
        }

        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            queue.push(Cell::new((cx + sx * h, cy + sy * h), h, polygon, &fitness));
        }
    }

    Some(best.center)
}
