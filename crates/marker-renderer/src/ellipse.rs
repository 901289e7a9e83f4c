//! Procedurally sized ellipse markers.
//!
//! `shape://ellipse` with an explicit `width` or `height` is not scaled from
//! the catalog asset but built as an exact ellipse of the requested size.
//! Built ellipses are cached by their dimensions.

use map_common::{BoundingBox, Feature, MarkerResult, PropertyKey, StyleProperties};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

use crate::cache::MarkerCaches;
use crate::marker::VectorMarker;

/// Dimensions of a procedural ellipse. Unset values are negative infinity.
#[derive(Debug, Clone, Copy)]
pub struct EllipseKey {
    pub width: f64,
    pub height: f64,
    pub stroke_width: f64,
}

impl EllipseKey {
    pub const UNSET: f64 = f64::NEG_INFINITY;

    pub fn new(width: Option<f64>, height: Option<f64>, stroke_width: Option<f64>) -> Self {
        Self {
            width: width.unwrap_or(Self::UNSET),
            height: height.unwrap_or(Self::UNSET),
            stroke_width: stroke_width.unwrap_or(Self::UNSET),
        }
    }

    /// Evaluate the key from the symbolizer properties.
    pub fn evaluate(properties: &StyleProperties, feature: &Feature) -> MarkerResult<Self> {
        Ok(Self::new(
            properties.get_optional_f64(PropertyKey::Width, feature)?,
            properties.get_optional_f64(PropertyKey::Height, feature)?,
            properties.get_optional_f64(PropertyKey::StrokeWidth, feature)?,
        ))
    }

    fn is_set(v: f64) -> bool {
        v != Self::UNSET
    }

    /// Final (width, height); a single given dimension is used for both.
    pub fn dimensions(&self) -> (f64, f64) {
        match (Self::is_set(self.width), Self::is_set(self.height)) {
            (true, true) => (self.width, self.height),
            (true, false) => (self.width, self.width),
            (false, true) => (self.height, self.height),
            (false, false) => (0.0, 0.0),
        }
    }

    fn bits(&self) -> [u64; 3] {
        let key = |v: f64| if v == 0.0 { 0 } else { v.to_bits() };
        [key(self.width), key(self.height), key(self.stroke_width)]
    }
}

impl PartialEq for EllipseKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for EllipseKey {}

impl Hash for EllipseKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Fetch the ellipse for `key`, building and caching it on a miss.
///
/// The ellipse takes its paint attributes from `stock`, the catalog's
/// default ellipse.
pub fn get_or_build(caches: &MarkerCaches, key: EllipseKey, stock: &VectorMarker) -> Arc<VectorMarker> {
    if let Some(marker) = caches.ellipses.get(&key) {
        return marker;
    }

    let marker = Arc::new(build_ellipse(&key, stock));
    debug!(
        width = key.width,
        height = key.height,
        stroke_width = key.stroke_width,
        "Built procedural ellipse"
    );
    caches.ellipses.insert(key, Arc::clone(&marker));
    marker
}

/// Build an ellipse centred on the origin.
///
/// The bounding box is padded by half the stroke width. Degenerate
/// dimensions yield a marker without shapes.
pub fn build_ellipse(key: &EllipseKey, stock: &VectorMarker) -> VectorMarker {
    let (width, height) = key.dimensions();

    let stroke_width = if EllipseKey::is_set(key.stroke_width) {
        key.stroke_width
    } else {
        stock
            .attributes()
            .first()
            .map(|a| a.stroke_width)
            .unwrap_or(0.0)
    };
    let half_stroke = stroke_width.abs() / 2.0;

    let attrs = stock.attributes().first().cloned().unwrap_or_default();
    let shapes: Vec<_> = tiny_skia::Rect::from_xywh(
        (-width / 2.0) as f32,
        (-height / 2.0) as f32,
        width as f32,
        height as f32,
    )
    .and_then(tiny_skia::PathBuilder::from_oval)
    .map(|path| vec![(path, attrs)])
    .unwrap_or_default();

    let bbox = BoundingBox::centered(width, height).pad(half_stroke);
    VectorMarker::with_bbox(shapes, bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerCacheConfig;
    use crate::marker::PathAttributes;
    use map_common::Color;
    use test_utils::assert_approx_eq;

    fn stock() -> VectorMarker {
        let rect = tiny_skia::Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        VectorMarker::new(vec![(
            tiny_skia::PathBuilder::from_oval(rect).unwrap(),
            PathAttributes::filled(Color::BLUE).with_stroke(Color::BLACK, 0.5),
        )])
    }

    #[test]
    fn test_unset_dimensions_participate_in_equality() {
        let a = EllipseKey::new(Some(8.0), Some(4.0), None);
        let b = EllipseKey::new(Some(8.0), Some(4.0), None);
        let c = EllipseKey::new(Some(8.0), Some(4.0), Some(0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.stroke_width, f64::NEG_INFINITY);
    }

    #[test]
    fn test_single_dimension_is_mirrored() {
        assert_eq!(EllipseKey::new(Some(6.0), None, None).dimensions(), (6.0, 6.0));
        assert_eq!(EllipseKey::new(None, Some(3.0), None).dimensions(), (3.0, 3.0));
    }

    #[test]
    fn test_build_ellipse_geometry() {
        let ellipse = build_ellipse(&EllipseKey::new(Some(8.0), Some(4.0), Some(2.0)), &stock());
        assert_eq!(ellipse.bounding_box(), BoundingBox::new(-5.0, -3.0, 5.0, 3.0));

        let bounds = ellipse.shapes()[0].path.bounds();
        assert_approx_eq!(bounds.width(), 8.0, 1e-4);
        assert_approx_eq!(bounds.height(), 4.0, 1e-4);
        assert_eq!(ellipse.attributes()[0].fill, stock().attributes()[0].fill);
    }

    #[test]
    fn test_degenerate_ellipse_has_no_shapes() {
        let ellipse = build_ellipse(&EllipseKey::new(Some(0.0), None, None), &stock());
        assert!(ellipse.shapes().is_empty());
    }

    #[test]
    fn test_cache_returns_shared_ellipse() {
        let caches = MarkerCaches::new(&MarkerCacheConfig::default());
        let stock = stock();
        let key = EllipseKey::new(Some(8.0), Some(4.0), None);

        let a = get_or_build(&caches, key, &stock);
        let b = get_or_build(&caches, key, &stock);
        assert!(Arc::ptr_eq(&a, &b));

        let c = get_or_build(&caches, EllipseKey::new(Some(9.0), Some(4.0), None), &stock);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(caches.ellipses.len(), 2);
    }
}
