//! Common test fixtures for marker rendering tests.
//!
//! Pre-defined extents, marker sources and symbolizers that represent the
//! usual scenarios: a single-shape SVG pin, a multi-shape SVG, a small
//! raster icon, literal and feature-dependent symbolizers.

use map_common::{BoundingBox, Color, Feature, Geometry, Polygon, PropertyKey, StyleProperties};
use tiny_skia::Pixmap;

/// Common map extents for testing.
pub mod extent {
    use map_common::BoundingBox;

    /// Pixel-space extent of a 256x256 tile.
    pub fn tile_256() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 256.0, 256.0)
    }

    /// Web-mercator-like extent, 1000 map units per side.
    pub fn mercator_square() -> BoundingBox {
        BoundingBox::new(-500.0, -500.0, 500.0, 500.0)
    }
}

/// SVG marker sources.
pub mod svg {
    /// 12x16 pin with one filled and stroked path.
    pub const PIN: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="16" viewBox="0 0 12 16">
  <path d="M6 0 C2.7 0 0 2.7 0 6 C0 10.5 6 16 6 16 C6 16 12 10.5 12 6 C12 2.7 9.3 0 6 0 Z" fill="#e03020" stroke="#000000" stroke-width="1"/>
</svg>"##;

    /// Two shapes; never eligible for the sub-image cache.
    pub const TWO_SHAPES: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
  <rect x="0" y="0" width="20" height="20" fill="#ffffff"/>
  <circle cx="10" cy="10" r="6" fill="#0000ff"/>
</svg>"##;

    /// Linear gradient fill.
    pub const GRADIENT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
  <defs>
    <linearGradient id="g" x1="0" y1="0" x2="1" y2="0">
      <stop offset="0" stop-color="#ff0000"/>
      <stop offset="1" stop-color="#0000ff"/>
    </linearGradient>
  </defs>
  <rect x="0" y="0" width="10" height="10" fill="url(#g)"/>
</svg>"##;

    /// Shape whose fill is explicitly `none`.
    pub const OUTLINE_ONLY: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
  <rect x="1" y="1" width="8" height="8" fill="none" stroke="#000000" stroke-width="2"/>
</svg>"##;
}

/// A `size`x`size` raster filled with `color`.
pub fn raster_square(size: u32, color: Color) -> Pixmap {
    let mut pixmap = Pixmap::new(size, size).expect("non-zero raster size");
    pixmap.fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
    pixmap
}

/// Symbolizer made only of literals.
pub fn literal_symbolizer(file: &str) -> StyleProperties {
    StyleProperties::new()
        .with(PropertyKey::File, file)
        .with(PropertyKey::Fill, Color::rgb(0, 128, 0))
        .with(PropertyKey::AllowOverlap, true)
}

/// Symbolizer whose fill colour comes from the feature's `color` attribute.
pub fn expression_symbolizer(file: &str) -> StyleProperties {
    StyleProperties::new()
        .with(PropertyKey::File, file)
        .with_expression(PropertyKey::Fill, "[color]")
        .expect("valid fill expression")
        .with(PropertyKey::AllowOverlap, true)
}

pub fn point_feature(id: u64, x: f64, y: f64) -> Feature {
    Feature::new(id, Geometry::Point((x, y)))
}

pub fn line_feature(id: u64, coords: Vec<(f64, f64)>) -> Feature {
    Feature::new(id, Geometry::LineString(coords))
}

/// Axis-aligned square polygon.
pub fn square_feature(id: u64, bbox: BoundingBox) -> Feature {
    let ring = vec![
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
        (bbox.min_x, bbox.min_y),
    ];
    Feature::new(id, Geometry::Polygon(Polygon::new(ring, vec![])))
}
