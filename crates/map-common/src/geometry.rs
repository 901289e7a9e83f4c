//! Feature geometry and attributes as delivered by the datasource layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bbox::BoundingBox;
use crate::style::Value;

/// A single `(x, y)` vertex.
pub type Coord = (f64, f64);

/// A polygon with one exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<Coord>>", into = "Vec<Vec<Coord>>")]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub interiors: Vec<Vec<Coord>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Coord>, interiors: Vec<Vec<Coord>>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// All rings, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<Coord>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// Signed area of the exterior ring (shoelace formula).
    pub fn signed_area(&self) -> f64 {
        ring_signed_area(&self.exterior)
    }

    /// Area-weighted centroid, holes subtracted.
    ///
    /// Returns `None` for degenerate polygons with zero area.
    pub fn centroid(&self) -> Option<Coord> {
        let mut area_sum = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;

        for (i, ring) in self.rings().enumerate() {
            let sign = if i == 0 { 1.0 } else { -1.0 };
            let area = ring_signed_area(ring);
            let (rx, ry) = ring_centroid_moment(ring);
            // Holes contribute with the opposite orientation of the shell.
            let orient = if area < 0.0 { -1.0 } else { 1.0 };
            area_sum += sign * area.abs();
            cx += sign * orient * rx;
            cy += sign * orient * ry;
        }

        if area_sum.abs() < f64::EPSILON {
            return None;
        }
        Some((cx / (6.0 * area_sum), cy / (6.0 * area_sum)))
    }
}

impl From<Vec<Vec<Coord>>> for Polygon {
    fn from(mut rings: Vec<Vec<Coord>>) -> Self {
        if rings.is_empty() {
            return Polygon::new(Vec::new(), Vec::new());
        }
        let exterior = rings.remove(0);
        Polygon::new(exterior, rings)
    }
}

impl From<Polygon> for Vec<Vec<Coord>> {
    fn from(polygon: Polygon) -> Self {
        let mut rings = Vec::with_capacity(1 + polygon.interiors.len());
        rings.push(polygon.exterior);
        rings.extend(polygon.interiors);
        rings
    }
}

fn ring_signed_area(ring: &[Coord]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % ring.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum / 2.0
}

fn ring_centroid_moment(ring: &[Coord]) -> Coord {
    if ring.len() < 3 {
        return (0.0, 0.0);
    }
    let mut mx = 0.0;
    let mut my = 0.0;
    for i in 0..ring.len() {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % ring.len()];
        let cross = x0 * y1 - x1 * y0;
        mx += (x0 + x1) * cross;
        my += (y0 + y1) * cross;
    }
    (mx, my)
}

/// Topological type of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    pub fn is_polygonal(&self) -> bool {
        matches!(self, GeometryType::Polygon | GeometryType::MultiPolygon)
    }

    pub fn is_lineal(&self) -> bool {
        matches!(self, GeometryType::LineString | GeometryType::MultiLineString)
    }
}

/// Typed feature geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Empty,
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Polygon),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Empty => GeometryType::Unknown,
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Empty => true,
            Geometry::Point(_) => false,
            Geometry::LineString(line) | Geometry::MultiPoint(line) => line.is_empty(),
            Geometry::Polygon(poly) => poly.exterior.is_empty(),
            Geometry::MultiLineString(lines) => lines.iter().all(|l| l.is_empty()),
            Geometry::MultiPolygon(polys) => polys.iter().all(|p| p.exterior.is_empty()),
        }
    }

    /// Iterate every vertex of the geometry.
    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Geometry::Empty => Box::new(std::iter::empty()),
            Geometry::Point(p) => Box::new(std::iter::once(*p)),
            Geometry::LineString(line) | Geometry::MultiPoint(line) => {
                Box::new(line.iter().copied())
            }
            Geometry::Polygon(poly) => Box::new(poly.rings().flatten().copied()),
            Geometry::MultiLineString(lines) => Box::new(lines.iter().flatten().copied()),
            Geometry::MultiPolygon(polys) => {
                Box::new(polys.iter().flat_map(|p| p.rings().flatten().copied()))
            }
        }
    }

    /// Bounding box of all vertices; `None` for empty geometries.
    pub fn envelope(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.coords())
    }

    /// Apply `f` to every vertex in place.
    pub fn map_coords_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(Coord) -> Coord,
    {
        match self {
            Geometry::Empty => {}
            Geometry::Point(p) => *p = f(*p),
            Geometry::LineString(line) | Geometry::MultiPoint(line) => map_line(line, &mut f),
            Geometry::Polygon(poly) => map_polygon(poly, &mut f),
            Geometry::MultiLineString(lines) => {
                lines.iter_mut().for_each(|line| map_line(line, &mut f))
            }
            Geometry::MultiPolygon(polys) => {
                polys.iter_mut().for_each(|poly| map_polygon(poly, &mut f))
            }
        }
    }
}

fn map_line<F: FnMut(Coord) -> Coord>(line: &mut [Coord], f: &mut F) {
    for c in line.iter_mut() {
        *c = f(*c);
    }
}

fn map_polygon<F: FnMut(Coord) -> Coord>(poly: &mut Polygon, f: &mut F) {
    map_line(&mut poly.exterior, f);
    for ring in poly.interiors.iter_mut() {
        map_line(ring, f);
    }
}

/// A map feature: geometry plus named attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    pub geometry: Geometry,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Feature {
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}
