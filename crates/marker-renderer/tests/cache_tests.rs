//! Tests for the attribute, ellipse and sub-image caches as seen through
//! full symbolizer renders.

mod common;

use std::sync::Arc;

use common::{render_fresh, renderer, renderer_with, total_placements};
use map_common::{Color, PropertyKey, StyleProperties};
use marker_renderer::ellipse::{self, EllipseKey};
use marker_renderer::{MarkerCacheConfig, MarkerDefinition, PathAttributes, VectorMarker, ELLIPSE_URI};
use test_utils::fixtures::{expression_symbolizer, literal_symbolizer, point_feature};
use test_utils::{count_painted, diff_bytes, painted_bounds, rgba_at};

// ============================================================================
// Attribute cache
// ============================================================================

#[test]
fn test_literal_symbolizer_shares_resolved_attributes() {
    let renderer = renderer();
    let props = literal_symbolizer(ELLIPSE_URI);
    let features = [point_feature(1, 25.0, 50.0), point_feature(2, 75.0, 50.0)];

    let (target, outcomes) = render_fresh(&renderer, &props, &features);

    assert_eq!(total_placements(&outcomes), 2);
    let stats = renderer.caches().attributes.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);

    assert_eq!(rgba_at(&target, 25, 50), Some([0, 128, 0, 255]));
    assert_eq!(rgba_at(&target, 75, 50), Some([0, 128, 0, 255]));
}

#[test]
fn test_disabling_caches_keeps_pixels() {
    // Fill only, at whole-pixel positions.
    let props = literal_symbolizer(ELLIPSE_URI).with(PropertyKey::StrokeWidth, 0.0);
    let features = [
        point_feature(1, 20.0, 20.0),
        point_feature(2, 50.0, 50.0),
        point_feature(3, 80.0, 30.0),
    ];

    let cached = renderer();
    let uncached = renderer_with(&MarkerCacheConfig::disabled());

    let (a, _) = render_fresh(&cached, &props, &features);
    let (b, _) = render_fresh(&uncached, &props, &features);

    assert!(cached.caches().images.stats().hits > 0);
    assert!(uncached.caches().attributes.is_empty());
    assert!(uncached.caches().images.is_empty());
    assert!(count_painted(&a) > 0);
    assert_eq!(diff_bytes(&a, &b), 0);
}

#[test]
fn test_expression_symbolizer_never_reuses_entries() {
    let renderer = renderer();
    let props = expression_symbolizer(ELLIPSE_URI);
    let features = [
        point_feature(1, 25.0, 50.0).with_attribute("color", "#ff0000"),
        point_feature(2, 75.0, 50.0).with_attribute("color", "#0000ff"),
    ];

    let (target, outcomes) = render_fresh(&renderer, &props, &features);

    assert_eq!(total_placements(&outcomes), 2);
    let stats = renderer.caches().attributes.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.hits, 0);

    assert_eq!(rgba_at(&target, 25, 50), Some([255, 0, 0, 255]));
    assert_eq!(rgba_at(&target, 75, 50), Some([0, 0, 255, 255]));
    // Differing attributes give differing sub-image keys.
    assert_eq!(renderer.caches().images.len(), 2);
}

#[test]
fn test_missing_attribute_uses_marker_default() {
    let renderer = renderer();
    let props = expression_symbolizer(ELLIPSE_URI);
    let (target, _) = render_fresh(&renderer, &props, &[point_feature(1, 50.0, 50.0)]);

    // The built-in ellipse is blue.
    assert_eq!(rgba_at(&target, 50, 50), Some([0, 0, 255, 255]));
}

// ============================================================================
// Ellipse cache
// ============================================================================

fn stock_ellipse(renderer: &marker_renderer::MarkerRenderer) -> Arc<marker_renderer::VectorMarker> {
    match renderer.catalog().get(ELLIPSE_URI) {
        Some(MarkerDefinition::Vector(v)) => v,
        other => panic!("unexpected built-in ellipse {:?}", other),
    }
}

#[test]
fn test_same_dimensions_share_one_ellipse() {
    let renderer = renderer();
    let stock = stock_ellipse(&renderer);
    let caches = renderer.caches();

    let a = ellipse::get_or_build(caches, EllipseKey::new(Some(8.0), Some(4.0), None), &stock);
    let b = ellipse::get_or_build(caches, EllipseKey::new(Some(8.0), Some(4.0), None), &stock);
    let c = ellipse::get_or_build(caches, EllipseKey::new(Some(8.0), Some(6.0), None), &stock);

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert!(c.bounding_box().height() > a.bounding_box().height());
    assert_eq!(caches.ellipses.len(), 2);
}

#[test]
fn test_sized_ellipse_is_built_procedurally() {
    let renderer = renderer();
    let props = StyleProperties::new()
        .with(PropertyKey::File, ELLIPSE_URI)
        .with(PropertyKey::Width, 8.0)
        .with(PropertyKey::Height, 4.0)
        .with(PropertyKey::Fill, Color::rgb(255, 0, 0));

    let (target, outcomes) = render_fresh(&renderer, &props, &[point_feature(1, 50.0, 50.0)]);

    assert_eq!(total_placements(&outcomes), 1);
    let key = EllipseKey::new(Some(8.0), Some(4.0), None);
    assert!(renderer.caches().ellipses.get(&key).is_some());

    let bounds = painted_bounds(&target).unwrap();
    assert!(bounds.width() >= 8.0 && bounds.width() <= 10.0, "{:?}", bounds);
    assert!(bounds.height() >= 4.0 && bounds.height() <= 6.0, "{:?}", bounds);
}

#[test]
fn test_unsized_ellipse_uses_catalog_asset() {
    let renderer = renderer();
    let props = StyleProperties::new().with(PropertyKey::File, ELLIPSE_URI);

    let (target, outcomes) = render_fresh(&renderer, &props, &[point_feature(1, 50.0, 50.0)]);

    assert_eq!(total_placements(&outcomes), 1);
    assert!(renderer.caches().ellipses.is_empty());
    let bounds = painted_bounds(&target).unwrap();
    assert!(bounds.width() >= 10.0 && bounds.width() <= 12.0, "{:?}", bounds);
}

// ============================================================================
// Sub-image cache
// ============================================================================

#[test]
fn test_translations_in_one_phase_bucket_hit() {
    let renderer = renderer();
    let props = literal_symbolizer(ELLIPSE_URI);
    let features = [point_feature(1, 20.01, 60.0), point_feature(2, 40.05, 60.0)];

    render_fresh(&renderer, &props, &features);

    let stats = renderer.caches().images.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_registered_vector_marker_uses_sub_image_cache() {
    let renderer = renderer();
    let rect = tiny_skia::Rect::from_xywh(-4.0, -4.0, 8.0, 8.0).unwrap();
    let marker = VectorMarker::new(vec![(
        tiny_skia::PathBuilder::from_rect(rect),
        PathAttributes::filled(Color::rgb(255, 0, 0)),
    )]);
    renderer.catalog().insert_vector("box", marker);

    let props = StyleProperties::new()
        .with(PropertyKey::File, "box")
        .with(PropertyKey::AllowOverlap, true);
    let features = [point_feature(1, 20.0, 50.0), point_feature(2, 60.0, 50.0)];
    let (target, outcomes) = render_fresh(&renderer, &props, &features);

    assert_eq!(total_placements(&outcomes), 2);
    let stats = renderer.caches().images.stats();
    assert_eq!((stats.misses, stats.hits), (1, 1));
    assert_eq!(rgba_at(&target, 20, 50), Some([255, 0, 0, 255]));
    assert_eq!(rgba_at(&target, 60, 50), Some([255, 0, 0, 255]));
}

#[test]
fn test_scaled_marker_bypasses_sub_image_cache() {
    let renderer = renderer();
    let props = literal_symbolizer("shape://square").with(PropertyKey::Width, 20.0);

    let (target, outcomes) = render_fresh(&renderer, &props, &[point_feature(1, 50.0, 50.0)]);

    assert_eq!(total_placements(&outcomes), 1);
    assert!(renderer.caches().images.is_empty());
    let bounds = painted_bounds(&target).unwrap();
    assert!(bounds.width() >= 20.0, "{:?}", bounds);
}

#[test]
fn test_sheared_marker_bypasses_sub_image_cache() {
    let renderer = renderer();
    let props = literal_symbolizer("shape://square").with(PropertyKey::ImageTransform, "skewX(20)");

    let (target, _) = render_fresh(&renderer, &props, &[point_feature(1, 50.0, 50.0)]);

    assert!(renderer.caches().images.is_empty());
    assert!(count_painted(&target) > 0);
}

#[test]
fn test_caches_stay_bounded() {
    let config = MarkerCacheConfig {
        image_cache_size: 2,
        ..MarkerCacheConfig::default()
    };
    let renderer = renderer_with(&config);
    let props = literal_symbolizer(ELLIPSE_URI);
    // One feature per phase column.
    let features: Vec<_> = (0..6)
        .map(|k| point_feature(k + 1, 10.0 + 12.0 * k as f64 + k as f64 / 8.0 + 0.01, 50.0))
        .collect();

    render_fresh(&renderer, &props, &features);

    let stats = renderer.caches().images.stats();
    assert_eq!(stats.misses, 6);
    assert!(stats.entries <= 2);
    assert_eq!(stats.capacity, 2);
}
