//! Tests for placement and collision handling through full renders.

mod common;

use common::{render_fresh, render_pass, renderer, total_placements, SIZE};
use std::sync::Arc;

use map_common::{BoundingBox, Coord, Feature, Geometry, Polygon, PropertyKey, StyleProperties};
use marker_renderer::converter::ConverterOptions;
use marker_renderer::{
    ConverterStage, IdentityProjection, InteriorPoint, VertexConverter, ViewTransform, ELLIPSE_URI,
};
use test_utils::fixtures::{line_feature, point_feature, square_feature};
use test_utils::{count_painted, is_blank, random_point_features};
use tiny_skia::Pixmap;

fn ellipse(allow_overlap: bool) -> StyleProperties {
    StyleProperties::new()
        .with(PropertyKey::File, ELLIPSE_URI)
        .with(PropertyKey::AllowOverlap, allow_overlap)
}

// ============================================================================
// Collision modes
// ============================================================================

#[test]
fn test_overlapping_markers_are_rejected() {
    let renderer = renderer();
    let features = [point_feature(1, 50.0, 50.0), point_feature(2, 52.0, 50.0)];
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();

    let (outcomes, detector) = render_pass(&renderer, &ellipse(false), &features, &mut target);

    assert_eq!(outcomes[0].placements, 1);
    assert_eq!(outcomes[1].placements, 0);
    assert_eq!(outcomes[1].rejected, 1);
    assert_eq!(detector.len(), 1);
}

#[test]
fn test_allow_overlap_places_everything() {
    let renderer = renderer();
    let features = [point_feature(1, 50.0, 50.0), point_feature(2, 52.0, 50.0)];
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();

    let (outcomes, detector) = render_pass(&renderer, &ellipse(true), &features, &mut target);

    assert_eq!(total_placements(&outcomes), 2);
    assert_eq!(detector.len(), 2);
}

#[test]
fn test_ignore_placement_reserves_nothing() {
    let renderer = renderer();
    let props = ellipse(false).with(PropertyKey::IgnorePlacement, true);
    let features = [point_feature(1, 50.0, 50.0), point_feature(2, 50.0, 50.0)];
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();

    let (outcomes, detector) = render_pass(&renderer, &props, &features, &mut target);

    assert_eq!(total_placements(&outcomes), 2);
    assert!(detector.is_empty());
}

#[test]
fn test_avoid_edges_rejects_partial_markers() {
    let renderer = renderer();
    let features = [point_feature(1, 2.0, 50.0)];

    let (target, outcomes) = render_fresh(&renderer, &ellipse(false), &features);
    assert_eq!(outcomes[0].placements, 1);
    assert!(count_painted(&target) > 0);

    let props = ellipse(false).with(PropertyKey::AvoidEdges, true);
    let (target, outcomes) = render_fresh(&renderer, &props, &features);
    assert_eq!(outcomes[0].placements, 0);
    assert!(is_blank(&target));
}

#[test]
fn test_random_points_never_overlap() {
    let renderer = renderer();
    let features = random_point_features(200, BoundingBox::new(0.0, 0.0, 100.0, 100.0), 42);
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();

    let (outcomes, detector) = render_pass(&renderer, &ellipse(false), &features, &mut target);

    assert_eq!(total_placements(&outcomes), detector.len());
    let boxes = detector.boxes();
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

// ============================================================================
// Line placement
// ============================================================================

fn arrows_along_line() -> StyleProperties {
    StyleProperties::new()
        .with(PropertyKey::File, "shape://arrow")
        .with(PropertyKey::PlacementType, "line")
        .with(PropertyKey::AllowOverlap, true)
}

#[test]
fn test_zero_length_line_gets_one_marker() {
    let renderer = renderer();
    let feature = line_feature(1, vec![(40.0, 40.0), (40.0, 40.0)]);

    let (_, outcomes) = render_fresh(&renderer, &arrows_along_line(), &[feature]);

    assert_eq!(outcomes[0].placements, 1);
}

#[test]
fn test_line_spacing() {
    let renderer = renderer();
    let feature = line_feature(1, vec![(0.0, 50.0), (100.0, 50.0)]);

    let props = arrows_along_line().with(PropertyKey::Spacing, 20.0);
    let (_, outcomes) = render_fresh(&renderer, &props, &[feature.clone()]);
    // 10, 30, 50, 70, 90
    assert_eq!(outcomes[0].placements, 5);

    // Spacing never drops below the marker width.
    let props = arrows_along_line().with(PropertyKey::Spacing, 5.0);
    let (_, outcomes) = render_fresh(&renderer, &props, &[feature]);
    assert_eq!(outcomes[0].placements, 7);
}

#[test]
fn test_direction_filters_line_placements() {
    let renderer = renderer();
    let rightward = line_feature(1, vec![(0.0, 50.0), (100.0, 50.0)]);
    let leftward = line_feature(2, vec![(100.0, 50.0), (0.0, 50.0)]);
    let props = arrows_along_line().with(PropertyKey::Direction, "left-only");

    let (_, outcomes) = render_fresh(&renderer, &props, &[rightward]);
    assert_eq!(outcomes[0].placements, 0);

    let (_, outcomes) = render_fresh(&renderer, &props, &[leftward]);
    assert_eq!(outcomes[0].placements, 1);
}

#[test]
fn test_unknown_direction_is_an_error() {
    let renderer = renderer();
    let props = arrows_along_line().with(PropertyKey::Direction, "sideways");
    let feature = line_feature(1, vec![(0.0, 50.0), (100.0, 50.0)]);

    let view = ViewTransform::pixel_space(SIZE, SIZE);
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();
    let mut detector = marker_renderer::LabelCollisionDetector::new(view.screen_box());
    let mut ctx = marker_renderer::RenderContext {
        target: &mut target,
        view: &view,
        projection: &IdentityProjection,
        clip_box: view.extent(),
        scale_factor: 1.0,
        detector: &mut detector,
    };
    assert!(renderer.render(&mut ctx, &props, &feature).is_err());
}

// ============================================================================
// Polygons and vertices
// ============================================================================

#[test]
fn test_polygon_interior_placement() {
    let renderer = renderer();
    let feature = square_feature(1, BoundingBox::new(30.0, 30.0, 70.0, 70.0));
    let props = ellipse(false).with(PropertyKey::PlacementType, "interior");

    let (target, outcomes) = render_fresh(&renderer, &props, &[feature]);

    assert_eq!(outcomes[0].placements, 1);
    assert_eq!(test_utils::rgba_at(&target, 50, 50), Some([0, 0, 255, 255]));
}

/// Puts the interior point on the bottom-left corner of the envelope.
struct BottomLeft;

impl InteriorPoint for BottomLeft {
    fn interior(&self, polygon: &Polygon, _scale_factor: f64) -> Option<Coord> {
        let bbox = BoundingBox::from_points(polygon.exterior.iter().copied())?;
        Some((bbox.min_x, bbox.max_y))
    }
}

#[test]
fn test_custom_interior_point() {
    let renderer = renderer().with_interior(Arc::new(BottomLeft));
    let feature = square_feature(1, BoundingBox::new(30.0, 30.0, 70.0, 70.0));
    let props = ellipse(false).with(PropertyKey::PlacementType, "interior");

    let (target, outcomes) = render_fresh(&renderer, &props, &[feature]);

    assert_eq!(outcomes[0].placements, 1);
    // (30, 30) in map units is (30, 70) on screen.
    assert_eq!(test_utils::rgba_at(&target, 30, 70), Some([0, 0, 255, 255]));
    assert_eq!(test_utils::rgba_at(&target, 50, 50), Some([0, 0, 0, 0]));
}

#[test]
fn test_vertex_placements() {
    let renderer = renderer();
    let feature = line_feature(1, vec![(10.0, 10.0), (50.0, 50.0), (90.0, 10.0)]);

    for method in ["vertex-first", "vertex-last"] {
        let props = arrows_along_line().with(PropertyKey::PlacementType, method);
        let (target, outcomes) = render_fresh(&renderer, &props, &[feature.clone()]);
        assert_eq!(outcomes[0].placements, 1, "{}", method);
        assert!(count_painted(&target) > 0);
    }
}

#[test]
fn test_clipped_away_geometry_places_nothing() {
    let renderer = renderer();
    let feature = line_feature(1, vec![(200.0, 200.0), (300.0, 300.0)]);

    let (target, outcomes) = render_fresh(&renderer, &arrows_along_line(), &[feature]);

    assert_eq!(outcomes[0].placements, 0);
    assert!(is_blank(&target));
}

// ============================================================================
// Vertex conversion
// ============================================================================

#[test]
fn test_converter_stage_order() {
    let feature = Feature::new(1, Geometry::LineString(vec![(0.0, 0.0), (10.0, 10.0)]));
    let props = StyleProperties::new()
        .with(PropertyKey::Offset, 2.0)
        .with(PropertyKey::SimplifyTolerance, 1.0)
        .with(PropertyKey::Smooth, 0.5);
    let options = ConverterOptions::from_properties(&props, &feature, 1.0).unwrap();
    let view = ViewTransform::pixel_space(SIZE, SIZE);

    let converter = VertexConverter::new(
        feature.geometry.geometry_type(),
        view.extent(),
        &view,
        &IdentityProjection,
        options,
    );

    assert_eq!(
        converter.enabled_stages(),
        vec![
            ConverterStage::ClipLine,
            ConverterStage::Transform,
            ConverterStage::Offset,
            ConverterStage::Affine,
            ConverterStage::Simplify,
            ConverterStage::Smooth,
        ]
    );
}

#[test]
fn test_clip_disabled_for_points() {
    let feature = point_feature(1, 5.0, 5.0);
    let props = StyleProperties::new().with(PropertyKey::Clip, false);
    let options = ConverterOptions::from_properties(&props, &feature, 1.0).unwrap();
    let view = ViewTransform::pixel_space(SIZE, SIZE);

    let converter = VertexConverter::new(
        feature.geometry.geometry_type(),
        view.extent(),
        &view,
        &IdentityProjection,
        options,
    );

    assert_eq!(
        converter.enabled_stages(),
        vec![ConverterStage::Transform, ConverterStage::Affine]
    );
}
