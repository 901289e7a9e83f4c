//! Parallel offset of lines and rings in pixel space.

use map_common::Coord;

/// Longest allowed miter, as a multiple of the offset.
const MITER_LIMIT: f64 = 2.0;

/// Offset `line` by `offset` pixels. Positive values move the line to the
/// left of its direction of travel (y axis pointing down).
pub fn offset_line(line: &[Coord], offset: f64) -> Vec<Coord> {
    let points = dedup(line);
    if points.len() < 2 || offset == 0.0 {
        return line.to_vec();
    }

    let closed = points.len() > 2 && points.first() == points.last();
    let normals: Vec<Coord> = points.windows(2).map(|w| left_normal(w[0], w[1])).collect();
    let n = points.len();

    (0..n)
        .map(|i| {
            let before = if i > 0 {
                Some(normals[i - 1])
            } else if closed {
                normals.last().copied()
            } else {
                None
            };
            let after = if i < n - 1 {
                Some(normals[i])
            } else if closed {
                normals.first().copied()
            } else {
                None
            };

            let (nx, ny) = match (before, after) {
                (Some(a), Some(b)) => miter(a, b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => (0.0, 0.0),
            };
            (points[i].0 + nx * offset, points[i].1 + ny * offset)
        })
        .collect()
}

fn dedup(line: &[Coord]) -> Vec<Coord> {
    let mut out: Vec<Coord> = Vec::with_capacity(line.len());
    for &p in line {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

fn left_normal((x0, y0): Coord, (x1, y1): Coord) -> Coord {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    (dy / len, -dx / len)
}

/// Unit-offset miter vector at a join between two segment normals.
fn miter(a: Coord, b: Coord) -> Coord {
    let (sx, sy) = (a.0 + b.0, a.1 + b.1);
    let len = (sx * sx + sy * sy).sqrt();
    if len < 1e-9 {
        // a full reversal; keep the incoming normal
        return a;
    }
    let (mx, my) = (sx / len, sy / len);
    let cos_half = mx * a.0 + my * a.1;
    let scale = (1.0 / cos_half.max(1e-9)).min(MITER_LIMIT);
    (mx * scale, my * scale)
}
