//! Radial-distance simplification.

use map_common::Coord;

/// Drop vertices closer than `tolerance` to the previously kept vertex.
/// End points are always kept, so closed rings stay closed.
pub fn simplify_line(line: &[Coord], tolerance: f64) -> Vec<Coord> {
    if line.len() <= 2 || tolerance <= 0.0 {
        return line.to_vec();
    }

    let tol_sq = tolerance * tolerance;
    let last = line[line.len() - 1];
    let mut out = vec![line[0]];

    for &p in &line[1..line.len() - 1] {
        let prev = out[out.len() - 1];
        let (dx, dy) = (p.0 - prev.0, p.1 - prev.1);
        if dx * dx + dy * dy >= tol_sq {
            out.push(p);
        }
    }
    out.push(last);
    out
}

/// Simplify a ring, falling back to the input if it would collapse.
pub fn simplify_ring(ring: &[Coord], tolerance: f64) -> Vec<Coord> {
    let simplified = simplify_line(ring, tolerance);
    if simplified.len() < 4 {
        ring.to_vec()
    } else {
        simplified
    }
}
