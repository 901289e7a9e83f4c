//! Clipping of lines and polygons against an axis-aligned box.

use map_common::{BoundingBox, Coord, Geometry, Polygon};

/// Clip a polygon ring by ring (Sutherland–Hodgman).
///
/// Returns `None` when nothing of the exterior ring remains.
pub fn clip_polygon(polygon: &Polygon, bbox: &BoundingBox) -> Option<Polygon> {
    let exterior = clip_ring(&polygon.exterior, bbox);
    if exterior.len() < 3 {
        return None;
    }
    let interiors = polygon
        .interiors
        .iter()
        .map(|ring| clip_ring(ring, bbox))
        .filter(|ring| ring.len() >= 3)
        .collect();
    Some(Polygon::new(exterior, interiors))
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn inside(&self, (x, y): Coord, b: &BoundingBox) -> bool {
        match self {
            Edge::Left => x >= b.min_x,
            Edge::Right => x <= b.max_x,
            Edge::Bottom => y >= b.min_y,
            Edge::Top => y <= b.max_y,
        }
    }

    fn intersect(&self, (x0, y0): Coord, (x1, y1): Coord, b: &BoundingBox) -> Coord {
        match self {
            Edge::Left | Edge::Right => {
                let x = if matches!(self, Edge::Left) { b.min_x } else { b.max_x };
                let t = (x - x0) / (x1 - x0);
                (x, y0 + t * (y1 - y0))
            }
            Edge::Bottom | Edge::Top => {
                let y = if matches!(self, Edge::Bottom) { b.min_y } else { b.max_y };
                let t = (y - y0) / (y1 - y0);
                (x0 + t * (x1 - x0), y)
            }
        }
    }
}

fn clip_ring(ring: &[Coord], bbox: &BoundingBox) -> Vec<Coord> {
    let mut output: Vec<Coord> = open_ring(ring).to_vec();

    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &current in &input {
            let cur_in = edge.inside(current, bbox);
            let prev_in = edge.inside(prev, bbox);
            if cur_in {
                if !prev_in {
                    output.push(edge.intersect(prev, current, bbox));
                }
                output.push(current);
            } else if prev_in {
                output.push(edge.intersect(prev, current, bbox));
            }
            prev = current;
        }
    }

    if let Some(&first) = output.first() {
        output.push(first);
    }
    output
}

/// The ring without its closing vertex.
fn open_ring(ring: &[Coord]) -> &[Coord] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Clip a segment (Liang–Barsky). Returns the visible part and whether the
/// end point was kept unchanged.
fn clip_segment(p0: Coord, p1: Coord, b: &BoundingBox) -> Option<(Coord, Coord, bool)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    let checks = [
        (-dx, p0.0 - b.min_x),
        (dx, b.max_x - p0.0),
        (-dy, p0.1 - b.min_y),
        (dy, b.max_y - p0.1),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    let start = (p0.0 + t0 * dx, p0.1 + t0 * dy);
    let end = (p0.0 + t1 * dx, p0.1 + t1 * dy);
    Some((start, end, t1 >= 1.0))
}

/// Clip a line string, splitting it where it leaves the box.
pub fn clip_line(line: &[Coord], bbox: &BoundingBox) -> Vec<Vec<Coord>> {
    if line.len() == 1 {
        let (x, y) = line[0];
        return if bbox.contains_point(x, y) {
            vec![line.to_vec()]
        } else {
            Vec::new()
        };
    }

    let mut parts: Vec<Vec<Coord>> = Vec::new();
    let mut current: Vec<Coord> = Vec::new();

    for segment in line.windows(2) {
        match clip_segment(segment[0], segment[1], bbox) {
            Some((start, end, end_kept)) => {
                if current.last() != Some(&start) {
                    if current.len() > 1 {
                        parts.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(start);
                }
                current.push(end);
                if !end_kept {
                    parts.push(std::mem::take(&mut current));
                }
            }
            None => {
                if current.len() > 1 {
                    parts.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }

    if current.len() > 1 {
        parts.push(current);
    }
    parts
}

fn lines_to_geometry(mut parts: Vec<Vec<Coord>>) -> Geometry {
    match parts.len() {
        0 => Geometry::Empty,
        1 => Geometry::LineString(parts.remove(0)),
        _ => Geometry::MultiLineString(parts),
    }
}

/// Clip polygonal geometry; other geometry is returned unchanged.
pub fn clip_polygons(geometry: &Geometry, bbox: &BoundingBox) -> Geometry {
    match geometry {
        Geometry::Polygon(poly) => clip_polygon(poly, bbox)
            .map(Geometry::Polygon)
            .unwrap_or(Geometry::Empty),
        Geometry::MultiPolygon(polys) => {
            let clipped: Vec<Polygon> = polys.iter().filter_map(|p| clip_polygon(p, bbox)).collect();
            if clipped.is_empty() {
                Geometry::Empty
            } else {
                Geometry::MultiPolygon(clipped)
            }
        }
        other => other.clone(),
    }
}

/// Clip lineal geometry; other geometry is returned unchanged.
pub fn clip_lines(geometry: &Geometry, bbox: &BoundingBox) -> Geometry {
    match geometry {
        Geometry::LineString(line) => lines_to_geometry(clip_line(line, bbox)),
        Geometry::MultiLineString(lines) => {
            lines_to_geometry(lines.iter().flat_map(|l| clip_line(l, bbox)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_line_inside_is_unchanged() {
        let line = vec![(1.0, 1.0), (5.0, 5.0), (9.0, 1.0)];
        assert_eq!(clip_line(&line, &unit_box()), vec![line]);
    }

    #[test]
    fn test_line_crossing_box() {
        let parts = clip_line(&[(-5.0, 5.0), (15.0, 5.0)], &unit_box());
        assert_eq!(parts, vec![vec![(0.0, 5.0), (10.0, 5.0)]]);
    }

    #[test]
    fn test_line_split_into_parts() {
        // in, out, back in
        let line = vec![(2.0, 2.0), (2.0, 20.0), (8.0, 20.0), (8.0, 2.0)];
        let parts = clip_line(&line, &unit_box());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], vec![(2.0, 2.0), (2.0, 10.0)]);
        assert_eq!(parts[1], vec![(8.0, 10.0), (8.0, 2.0)]);
    }

    #[test]
    fn test_line_outside() {
        assert!(clip_line(&[(20.0, 20.0), (30.0, 30.0)], &unit_box()).is_empty());
    }

    #[test]
    fn test_zero_length_line_survives() {
        let parts = clip_line(&[(3.0, 3.0), (3.0, 3.0)], &unit_box());
        assert_eq!(parts, vec![vec![(3.0, 3.0), (3.0, 3.0)]]);
    }

    #[test]
    fn test_polygon_clip() {
        let poly = Polygon::new(
            vec![(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0), (-5.0, -5.0)],
            vec![],
        );
        let clipped = clip_polygon(&poly, &unit_box()).unwrap();
        let env = BoundingBox::from_points(clipped.exterior.iter().copied()).unwrap();
        assert_eq!(env, BoundingBox::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(clipped.exterior.first(), clipped.exterior.last());
        assert!((clipped.signed_area().abs() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_outside_is_dropped() {
        let poly = Polygon::new(
            vec![(20.0, 20.0), (30.0, 20.0), (30.0, 30.0), (20.0, 20.0)],
            vec![],
        );
        assert!(clip_polygon(&poly, &unit_box()).is_none());
        assert_eq!(
            clip_polygons(&Geometry::Polygon(poly), &unit_box()),
            Geometry::Empty
        );
    }
}
