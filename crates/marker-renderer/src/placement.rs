//! Marker placement along converted geometry.
//!
//! A [`MarkerPlacementFinder`] walks pixel-space geometry and produces
//! candidate positions according to the placement method. Each candidate is
//! checked against the [`CollisionDetector`] before it is accepted.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use map_common::{
    BoundingBox, Coord, Feature, Geometry, MarkerResult, Polygon, PropertyKey, StyleProperties,
};
use tiny_skia::Transform;

use crate::collision::CollisionDetector;
use crate::interior::InteriorPoint;

pub const DEFAULT_SPACING: f64 = 100.0;
pub const DEFAULT_MAX_ERROR: f64 = 0.2;

/// Where markers go on a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlacementMethod {
    #[default]
    Point,
    Line,
    Interior,
    VertexFirst,
    VertexLast,
}

impl PlacementMethod {
    pub fn name(&self) -> &'static str {
        match self {
            PlacementMethod::Point => "point",
            PlacementMethod::Line => "line",
            PlacementMethod::Interior => "interior",
            PlacementMethod::VertexFirst => "vertex-first",
            PlacementMethod::VertexLast => "vertex-last",
        }
    }
}

impl FromStr for PlacementMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "point" => Ok(PlacementMethod::Point),
            "line" => Ok(PlacementMethod::Line),
            "interior" => Ok(PlacementMethod::Interior),
            "vertex-first" => Ok(PlacementMethod::VertexFirst),
            "vertex-last" => Ok(PlacementMethod::VertexLast),
            other => Err(format!("Unknown placement method: {}", other)),
        }
    }
}

impl fmt::Display for PlacementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How markers are oriented relative to the line they sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Right,
    Left,
    Auto,
    AutoDown,
    LeftOnly,
    RightOnly,
    Up,
    Down,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Left => "left",
            Direction::Auto => "auto",
            Direction::AutoDown => "auto-down",
            Direction::LeftOnly => "left-only",
            Direction::RightOnly => "right-only",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Final marker angle for a line angle, or `None` if the placement
    /// should be skipped.
    pub fn apply(&self, angle: f64) -> Option<f64> {
        let angle = normalize_angle(angle);
        match self {
            Direction::Right => Some(angle),
            Direction::Left => Some(normalize_angle(angle + PI)),
            Direction::Up => Some(0.0),
            Direction::Down => Some(PI),
            Direction::Auto => Some(if angle.abs() > FRAC_PI_2 {
                normalize_angle(angle + PI)
            } else {
                angle
            }),
            Direction::AutoDown => Some(if angle.abs() < FRAC_PI_2 {
                normalize_angle(angle + PI)
            } else {
                angle
            }),
            Direction::LeftOnly => {
                let flipped = normalize_angle(angle + PI);
                (flipped.abs() < FRAC_PI_2).then_some(flipped)
            }
            Direction::RightOnly => (angle.abs() < FRAC_PI_2).then_some(angle),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "right" => Ok(Direction::Right),
            "left" => Ok(Direction::Left),
            "auto" => Ok(Direction::Auto),
            "auto-down" => Ok(Direction::AutoDown),
            "left-only" => Ok(Direction::LeftOnly),
            "right-only" => Ok(Direction::RightOnly),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize to `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Placement controls for one symbolizer/feature pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementParams {
    /// Marker bounds in marker space.
    pub size: BoundingBox,
    /// Marker space to placement space (recentred, scaled, image transform).
    pub transform: Transform,
    /// Already multiplied by the scale factor.
    pub spacing: f64,
    pub max_error: f64,
    pub allow_overlap: bool,
    pub avoid_edges: bool,
    pub direction: Direction,
    pub method: PlacementMethod,
    pub ignore_placement: bool,
    pub opacity: f64,
    pub scale_factor: f64,
    pub snap_to_pixels: bool,
}

impl PlacementParams {
    pub fn new(size: BoundingBox, transform: Transform, scale_factor: f64) -> Self {
        Self {
            size,
            transform,
            spacing: DEFAULT_SPACING * scale_factor,
            max_error: DEFAULT_MAX_ERROR,
            allow_overlap: false,
            avoid_edges: false,
            direction: Direction::default(),
            method: PlacementMethod::default(),
            ignore_placement: false,
            opacity: 1.0,
            scale_factor,
            snap_to_pixels: false,
        }
    }

    pub fn from_properties(
        props: &StyleProperties,
        feature: &Feature,
        size: BoundingBox,
        transform: Transform,
        scale_factor: f64,
        snap_to_pixels: bool,
    ) -> MarkerResult<Self> {
        Ok(Self {
            size,
            transform,
            spacing: props.get_f64(PropertyKey::Spacing, feature, DEFAULT_SPACING)? * scale_factor,
            max_error: props.get_f64(PropertyKey::MaxError, feature, DEFAULT_MAX_ERROR)?,
            allow_overlap: props.get_bool(PropertyKey::AllowOverlap, feature, false)?,
            avoid_edges: props.get_bool(PropertyKey::AvoidEdges, feature, false)?,
            direction: props.get_enum(PropertyKey::Direction, feature, Direction::default())?,
            method: props.get_enum(
                PropertyKey::PlacementType,
                feature,
                PlacementMethod::default(),
            )?,
            ignore_placement: props.get_bool(PropertyKey::IgnorePlacement, feature, false)?,
            opacity: props.get_f64(PropertyKey::Opacity, feature, 1.0)?,
            scale_factor,
            snap_to_pixels,
        })
    }

    /// Marker bounds after the marker transform.
    pub fn marker_box(&self) -> BoundingBox {
        transform_box(&self.transform, &self.size)
    }
}

/// An accepted marker position.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Radians, clockwise in pixel space.
    pub angle: f64,
    /// Full marker-to-pixel transform.
    pub transform: Transform,
    /// Occupied pixel box.
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementOutcome {
    pub placements: Vec<Placement>,
    /// Candidates dropped by the collision checks.
    pub rejected: usize,
}

/// Map `bbox` through `ts` and take the envelope.
pub fn transform_box(ts: &Transform, bbox: &BoundingBox) -> BoundingBox {
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
    ];
    let mapped = corners.iter().map(|&(x, y)| {
        (
            ts.sx as f64 * x + ts.kx as f64 * y + ts.tx as f64,
            ts.ky as f64 * x + ts.sy as f64 * y + ts.ty as f64,
        )
    });
    BoundingBox::from_points(mapped).unwrap_or_default()
}

pub struct MarkerPlacementFinder<'a> {
    params: &'a PlacementParams,
    interior: &'a dyn InteriorPoint,
    marker_width: f64,
}

impl<'a> MarkerPlacementFinder<'a> {
    pub fn new(params: &'a PlacementParams, interior: &'a dyn InteriorPoint) -> Self {
        Self {
            params,
            interior,
            marker_width: params.marker_box().width(),
        }
    }

    /// Distance between markers on a line; never less than the marker width.
    pub fn effective_spacing(&self) -> f64 {
        let spacing = if self.params.spacing < 1.0 {
            DEFAULT_SPACING * self.params.scale_factor
        } else {
            self.params.spacing
        };
        spacing.max(self.marker_width)
    }

    /// Place markers on pixel-space `geometry`.
    pub fn find(
        &self,
        geometry: &Geometry,
        detector: &mut dyn CollisionDetector,
    ) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        match geometry {
            Geometry::Empty => {}
            Geometry::Point(p) => self.place_point(*p, detector, &mut outcome),
            Geometry::MultiPoint(points) => {
                for p in points {
                    self.place_point(*p, detector, &mut outcome);
                }
            }
            Geometry::LineString(line) => self.place_on_line(line, detector, &mut outcome),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    self.place_on_line(line, detector, &mut outcome);
                }
            }
            Geometry::Polygon(poly) => self.place_on_polygon(poly, detector, &mut outcome),
            Geometry::MultiPolygon(polys) => {
                for poly in polys {
                    self.place_on_polygon(poly, detector, &mut outcome);
                }
            }
        }
        outcome
    }

    fn place_point(
        &self,
        p: Coord,
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        self.commit(p, 0.0, detector, outcome);
    }

    fn place_on_line(
        &self,
        line: &[Coord],
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        if line.is_empty() {
            return;
        }
        match self.params.method {
            PlacementMethod::Point | PlacementMethod::Interior => {
                if let Some(p) = PathWalker::new(line).midpoint() {
                    self.commit(p, 0.0, detector, outcome);
                }
            }
            PlacementMethod::Line => self.place_along(line, detector, outcome),
            PlacementMethod::VertexFirst => self.place_vertex(line, true, detector, outcome),
            PlacementMethod::VertexLast => self.place_vertex(line, false, detector, outcome),
        }
    }

    fn place_on_polygon(
        &self,
        polygon: &Polygon,
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        if polygon.exterior.is_empty() {
            return;
        }
        match self.params.method {
            PlacementMethod::Point => {
                let p = polygon
                    .centroid()
                    .or_else(|| self.interior.interior(polygon, self.params.scale_factor));
                if let Some(p) = p {
                    self.commit(p, 0.0, detector, outcome);
                }
            }
            PlacementMethod::Interior => {
                let p = self
                    .interior
                    .interior(polygon, self.params.scale_factor)
                    .or_else(|| polygon.centroid());
                if let Some(p) = p {
                    self.commit(p, 0.0, detector, outcome);
                }
            }
            PlacementMethod::Line => {
                for ring in polygon.rings() {
                    self.place_along(ring, detector, outcome);
                }
            }
            PlacementMethod::VertexFirst => {
                self.place_vertex(&polygon.exterior, true, detector, outcome)
            }
            PlacementMethod::VertexLast => {
                self.place_vertex(&polygon.exterior, false, detector, outcome)
            }
        }
    }

    fn place_vertex(
        &self,
        line: &[Coord],
        first: bool,
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        let (p, angle) = match (first, line) {
            (_, [only]) => (*only, 0.0),
            (true, [a, b, ..]) => (*a, segment_angle(*a, *b)),
            (false, [.., a, b]) => (*b, segment_angle(*a, *b)),
            _ => return,
        };
        if let Some(angle) = self.params.direction.apply(angle) {
            self.commit(p, angle, detector, outcome);
        }
    }

    fn place_along(
        &self,
        line: &[Coord],
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        let walker = PathWalker::new(line);
        let length = walker.length();

        if length == 0.0 {
            self.commit(line[0], 0.0, detector, outcome);
            return;
        }

        let spacing = self.effective_spacing();
        let tolerance = self.params.max_error * spacing;
        let mut distance = spacing / 2.0;

        while distance <= length {
            let mut candidates = vec![distance];
            if tolerance > 0.0 && !self.params.allow_overlap {
                for factor in [0.5, -0.5, 1.0, -1.0] {
                    candidates.push((distance + factor * tolerance).clamp(0.0, length));
                }
            }

            let mut placed = false;
            let mut tried = false;
            for d in candidates {
                let Some((p, line_angle)) = walker.point_at(d) else {
                    continue;
                };
                let Some(angle) = self.params.direction.apply(line_angle) else {
                    continue;
                };
                tried = true;
                if let Some(placement) = self.try_place(p, angle, detector) {
                    outcome.placements.push(placement);
                    placed = true;
                    break;
                }
            }
            if tried && !placed {
                outcome.rejected += 1;
            }

            distance += spacing;
        }
    }

    fn commit(
        &self,
        p: Coord,
        angle: f64,
        detector: &mut dyn CollisionDetector,
        outcome: &mut PlacementOutcome,
    ) {
        match self.try_place(p, angle, detector) {
            Some(placement) => outcome.placements.push(placement),
            None => outcome.rejected += 1,
        }
    }

    /// Run the collision checks and reserve the marker box.
    fn try_place(
        &self,
        (x, y): Coord,
        angle: f64,
        detector: &mut dyn CollisionDetector,
    ) -> Option<Placement> {
        let transform = self
            .params
            .transform
            .post_concat(Transform::from_rotate(angle.to_degrees() as f32))
            .post_concat(Transform::from_translate(x as f32, y as f32));
        let bbox = transform_box(&transform, &self.params.size);

        if self.params.avoid_edges && !detector.extent().contains(&bbox) {
            return None;
        }
        if !self.params.allow_overlap && !detector.has_placement(&bbox) {
            return None;
        }
        if !self.params.ignore_placement {
            detector.insert(bbox);
        }

        Some(Placement {
            x,
            y,
            angle,
            transform,
            bbox,
        })
    }
}

fn segment_angle((x0, y0): Coord, (x1, y1): Coord) -> f64 {
    (y1 - y0).atan2(x1 - x0)
}

/// Distance lookups along a polyline.
struct PathWalker<'a> {
    line: &'a [Coord],
    /// Cumulative length at each vertex.
    offsets: Vec<f64>,
}

impl<'a> PathWalker<'a> {
    fn new(line: &'a [Coord]) -> Self {
        let mut offsets = Vec::with_capacity(line.len());
        let mut total = 0.0;
        offsets.push(0.0);
        for w in line.windows(2) {
            let (dx, dy) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
            total += (dx * dx + dy * dy).sqrt();
            offsets.push(total);
        }
        Self { line, offsets }
    }

    fn length(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    fn midpoint(&self) -> Option<Coord> {
        if self.length() == 0.0 {
            return self.line.first().copied();
        }
        self.point_at(self.length() / 2.0).map(|(p, _)| p)
    }

    /// Position and segment angle at `distance` from the start.
    fn point_at(&self, distance: f64) -> Option<(Coord, f64)> {
        for (i, w) in self.line.windows(2).enumerate() {
            let (start, end) = (self.offsets[i], self.offsets[i + 1]);
            let seg = end - start;
            if seg <= 0.0 || distance > end {
                continue;
            }
            let t = ((distance - start) / seg).clamp(0.0, 1.0);
            let (a, b) = (w[0], w[1]);
            let p = (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
            return Some((p, segment_angle(a, b)));
        }
        None
    }
}
