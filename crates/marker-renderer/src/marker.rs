//! Marker definitions: immutable vector or raster symbols shared by every
//! placement that references the same name.

use map_common::{BoundingBox, Color};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MARKER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a marker, used in cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    pub fn next() -> Self {
        MarkerId(NEXT_MARKER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

fn f32_key(v: f32) -> u32 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

fn f64_key(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Gradient geometry in the marker's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientKind {
    Linear { x1: f32, y1: f32, x2: f32, y2: f32 },
    Radial { cx: f32, cy: f32, r: f32, fx: f32, fy: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadMethod {
    Pad,
    Reflect,
    Repeat,
}

impl From<SpreadMethod> for tiny_skia::SpreadMode {
    fn from(spread: SpreadMethod) -> Self {
        match spread {
            SpreadMethod::Pad => tiny_skia::SpreadMode::Pad,
            SpreadMethod::Reflect => tiny_skia::SpreadMode::Reflect,
            SpreadMethod::Repeat => tiny_skia::SpreadMode::Repeat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// A gradient paint server.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub stops: Vec<GradientStop>,
    pub spread: SpreadMethod,
    pub transform: tiny_skia::Transform,
}

impl Eq for Gradient {}

impl Hash for Gradient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.kind {
            GradientKind::Linear { x1, y1, x2, y2 } => {
                0u8.hash(state);
                for v in [x1, y1, x2, y2] {
                    f32_key(v).hash(state);
                }
            }
            GradientKind::Radial { cx, cy, r, fx, fy } => {
                1u8.hash(state);
                for v in [cx, cy, r, fx, fy] {
                    f32_key(v).hash(state);
                }
            }
        }
        for stop in &self.stops {
            f32_key(stop.offset).hash(state);
            stop.color.hash(state);
        }
        self.spread.hash(state);
        let t = self.transform;
        for v in [t.sx, t.kx, t.ky, t.sy, t.tx, t.ty] {
            f32_key(v).hash(state);
        }
    }
}

impl Gradient {
    /// Build a backend shader, folding `opacity` into every stop.
    pub fn to_shader(&self, opacity: f32) -> Option<tiny_skia::Shader<'static>> {
        let stops: Vec<tiny_skia::GradientStop> = self
            .stops
            .iter()
            .map(|s| tiny_skia::GradientStop::new(s.offset, s.color.to_skia(opacity)))
            .collect();

        match self.kind {
            GradientKind::Linear { x1, y1, x2, y2 } => tiny_skia::LinearGradient::new(
                tiny_skia::Point::from_xy(x1, y1),
                tiny_skia::Point::from_xy(x2, y2),
                stops,
                self.spread.into(),
                self.transform,
            ),
            GradientKind::Radial { cx, cy, r, fx, fy } => tiny_skia::RadialGradient::new(
                tiny_skia::Point::from_xy(fx, fy),
                tiny_skia::Point::from_xy(cx, cy),
                r,
                stops,
                self.spread.into(),
                self.transform,
            ),
        }
    }
}

/// Fill or stroke paint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Paint {
    Color(Color),
    Gradient(Arc<Gradient>),
}

impl Paint {
    pub fn is_gradient(&self) -> bool {
        matches!(self, Paint::Gradient(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl From<FillRule> for tiny_skia::FillRule {
    fn from(rule: FillRule) -> Self {
        match rule {
            FillRule::NonZero => tiny_skia::FillRule::Winding,
            FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl From<LineCap> for tiny_skia::LineCap {
    fn from(cap: LineCap) -> Self {
        match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl From<LineJoin> for tiny_skia::LineJoin {
    fn from(join: LineJoin) -> Self {
        match join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        }
    }
}

/// Paint attributes of one shape of a vector marker.
///
/// `*_enabled` says whether the channel is drawn; `*_none` records an
/// explicit `none` in the source, which blocks style overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAttributes {
    pub fill: Paint,
    pub fill_enabled: bool,
    pub fill_none: bool,
    pub fill_opacity: f64,
    pub fill_rule: FillRule,
    pub stroke: Paint,
    pub stroke_enabled: bool,
    pub stroke_none: bool,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub opacity: f64,
    pub visible: bool,
}

impl Default for PathAttributes {
    fn default() -> Self {
        Self {
            fill: Paint::Color(Color::BLACK),
            fill_enabled: true,
            fill_none: false,
            fill_opacity: 1.0,
            fill_rule: FillRule::NonZero,
            stroke: Paint::Color(Color::BLACK),
            stroke_enabled: false,
            stroke_none: false,
            stroke_width: 1.0,
            stroke_opacity: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 4.0,
            opacity: 1.0,
            visible: true,
        }
    }
}

impl Eq for PathAttributes {}

impl Hash for PathAttributes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fill.hash(state);
        self.fill_enabled.hash(state);
        self.fill_none.hash(state);
        f64_key(self.fill_opacity).hash(state);
        self.fill_rule.hash(state);
        self.stroke.hash(state);
        self.stroke_enabled.hash(state);
        self.stroke_none.hash(state);
        f64_key(self.stroke_width).hash(state);
        f64_key(self.stroke_opacity).hash(state);
        self.line_cap.hash(state);
        self.line_join.hash(state);
        f64_key(self.miter_limit).hash(state);
        f64_key(self.opacity).hash(state);
        self.visible.hash(state);
    }
}

impl PathAttributes {
    /// Solid fill, no stroke.
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Paint::Color(color),
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke = Paint::Color(color);
        self.stroke_enabled = true;
        self.stroke_width = width;
        self
    }

    /// Whether the fill channel produces any pixels.
    pub fn draws_fill(&self) -> bool {
        self.visible && (self.fill_enabled || self.fill.is_gradient()) && !self.fill_none
    }

    /// Whether the stroke channel produces any pixels.
    pub fn draws_stroke(&self) -> bool {
        self.visible
            && (self.stroke_enabled || self.stroke.is_gradient())
            && !self.stroke_none
            && self.stroke_width > 0.0
    }
}

/// One drawable shape of a vector marker.
#[derive(Debug, Clone)]
pub struct VectorShape {
    pub path: tiny_skia::Path,
}

/// A vector marker: shapes, their default attributes and a bounding box.
#[derive(Debug)]
pub struct VectorMarker {
    id: MarkerId,
    shapes: Vec<VectorShape>,
    attributes: Arc<Vec<PathAttributes>>,
    bbox: BoundingBox,
}

impl VectorMarker {
    /// Build a marker whose bounding box is the union of its shapes' bounds.
    pub fn new(shapes: Vec<(tiny_skia::Path, PathAttributes)>) -> Self {
        let bbox = shapes
            .iter()
            .map(|(path, _)| {
                let b = path.bounds();
                BoundingBox::new(
                    b.left() as f64,
                    b.top() as f64,
                    b.right() as f64,
                    b.bottom() as f64,
                )
            })
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self::with_bbox(shapes, bbox)
    }

    /// Build a marker with an explicit bounding box (e.g. an SVG viewport).
    pub fn with_bbox(shapes: Vec<(tiny_skia::Path, PathAttributes)>, bbox: BoundingBox) -> Self {
        let (shapes, attributes): (Vec<_>, Vec<_>) = shapes
            .into_iter()
            .map(|(path, attrs)| (VectorShape { path }, attrs))
            .unzip();
        Self {
            id: MarkerId::next(),
            shapes,
            attributes: Arc::new(attributes),
            bbox,
        }
    }

    /// Same shapes and bbox with a different set of default attributes.
    ///
    /// The copy gets a fresh identity.
    pub fn with_attributes(&self, attributes: Arc<Vec<PathAttributes>>) -> Self {
        Self {
            id: MarkerId::next(),
            shapes: self.shapes.clone(),
            attributes,
            bbox: self.bbox,
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn shapes(&self) -> &[VectorShape] {
        &self.shapes
    }

    pub fn attributes(&self) -> &Arc<Vec<PathAttributes>> {
        &self.attributes
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// A raster marker in premultiplied RGBA.
#[derive(Debug)]
pub struct RasterMarker {
    id: MarkerId,
    pixmap: tiny_skia::Pixmap,
}

impl RasterMarker {
    pub fn new(pixmap: tiny_skia::Pixmap) -> Self {
        Self {
            id: MarkerId::next(),
            pixmap,
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }
}

/// A resolved marker.
#[derive(Debug, Clone)]
pub enum MarkerDefinition {
    Null,
    Vector(Arc<VectorMarker>),
    Raster(Arc<RasterMarker>),
}

impl MarkerDefinition {
    pub fn is_null(&self) -> bool {
        matches!(self, MarkerDefinition::Null)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            MarkerDefinition::Null => None,
            MarkerDefinition::Vector(v) => Some(v.bounding_box()),
            MarkerDefinition::Raster(r) => Some(r.bounding_box()),
        }
    }
}

impl From<VectorMarker> for MarkerDefinition {
    fn from(marker: VectorMarker) -> Self {
        MarkerDefinition::Vector(Arc::new(marker))
    }
}

impl From<RasterMarker> for MarkerDefinition {
    fn from(marker: RasterMarker) -> Self {
        MarkerDefinition::Raster(Arc::new(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn square_path(size: f32) -> tiny_skia::Path {
        let rect = tiny_skia::Rect::from_xywh(0.0, 0.0, size, size).unwrap();
        tiny_skia::PathBuilder::from_rect(rect)
    }

    #[test]
    fn test_marker_ids_are_unique() {
        let a = VectorMarker::new(vec![(square_path(4.0), PathAttributes::default())]);
        let b = VectorMarker::new(vec![(square_path(4.0), PathAttributes::default())]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_bbox_is_union_of_shapes() {
        let marker = VectorMarker::new(vec![
            (square_path(4.0), PathAttributes::default()),
            (square_path(10.0), PathAttributes::default()),
        ]);
        assert_eq!(marker.bounding_box(), BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(marker.attributes().len(), 2);
    }

    #[test]
    fn test_attributes_compare_by_value() {
        let a = PathAttributes::filled(Color::BLUE).with_stroke(Color::BLACK, 0.5);
        let b = PathAttributes::filled(Color::BLUE).with_stroke(Color::BLACK, 0.5);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = b.clone().with_stroke(Color::BLACK, 1.0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_draw_channels() {
        let mut attrs = PathAttributes::filled(Color::BLUE);
        assert!(attrs.draws_fill());
        assert!(!attrs.draws_stroke());

        attrs.fill_none = true;
        assert!(!attrs.draws_fill());

        let attrs = PathAttributes::default().with_stroke(Color::BLACK, 0.0);
        assert!(!attrs.draws_stroke());
    }

    #[test]
    fn test_raster_bbox() {
        let raster = RasterMarker::new(tiny_skia::Pixmap::new(10, 6).unwrap());
        assert_eq!(raster.bounding_box(), BoundingBox::new(0.0, 0.0, 10.0, 6.0));
    }
}
