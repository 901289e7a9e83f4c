//! Chaikin corner-cutting.

use map_common::Coord;

fn cut(p: Coord, q: Coord, ratio: f64) -> (Coord, Coord) {
    let (dx, dy) = (q.0 - p.0, q.1 - p.1);
    (
        (p.0 + ratio * dx, p.1 + ratio * dy),
        (p.0 + (1.0 - ratio) * dx, p.1 + (1.0 - ratio) * dy),
    )
}

fn ratio(factor: f64) -> f64 {
    0.25 * factor.clamp(0.0, 1.0)
}

/// One smoothing pass over an open line; end points are preserved.
pub fn smooth_line(line: &[Coord], factor: f64) -> Vec<Coord> {
    let r = ratio(factor);
    if line.len() < 3 || r <= 0.0 {
        return line.to_vec();
    }

    let mut out = Vec::with_capacity(line.len() * 2);
    out.push(line[0]);
    for w in line.windows(2) {
        let (a, b) = cut(w[0], w[1], r);
        out.push(a);
        out.push(b);
    }
    out.push(line[line.len() - 1]);
    out
}

/// One smoothing pass over a closed ring; the result is closed.
pub fn smooth_ring(ring: &[Coord], factor: f64) -> Vec<Coord> {
    let r = ratio(factor);
    if ring.len() < 4 || r <= 0.0 {
        return ring.to_vec();
    }

    let open = if ring.first() == ring.last() {
        &ring[..ring.len() - 1]
    } else {
        ring
    };

    let mut out = Vec::with_capacity(open.len() * 2 + 1);
    for i in 0..open.len() {
        let (a, b) = cut(open[i], open[(i + 1) % open.len()], r);
        out.push(a);
        out.push(b);
    }
    out.push(out[0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_line_keeps_endpoints() {
        let line = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let smoothed = smooth_line(&line, 1.0);
        assert_eq!(smoothed.first(), Some(&(0.0, 0.0)));
        assert_eq!(smoothed.last(), Some(&(10.0, 10.0)));
        // the corner itself is cut away
        assert!(!smoothed.contains(&(10.0, 0.0)));
    }

    #[test]
    fn test_smooth_ring_stays_closed() {
        let ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        let smoothed = smooth_ring(&ring, 0.5);
        assert_eq!(smoothed.len(), 9);
        assert_eq!(smoothed.first(), smoothed.last());
    }

    #[test]
    fn test_zero_factor_is_noop() {
        let line = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
        assert_eq!(smooth_line(&line, 0.0), line);
    }
}
