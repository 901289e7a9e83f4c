//! Marker symbolizer rendering.
//!
//! [`MarkerRenderer::render`] resolves the symbolizer's marker, derives the
//! marker transform, converts the feature geometry, places markers and
//! composites every accepted placement into the framebuffer.

use std::sync::Arc;

use map_common::{BoundingBox, Feature, MarkerResult, PropertyKey, StyleProperties};
use metrics::counter;
use tiny_skia::{Pixmap, Transform};
use tracing::{debug, warn};

use crate::attributes::resolve_attributes;
use crate::cache::MarkerCaches;
use crate::catalog::{MarkerCatalog, ELLIPSE_URI};
use crate::collision::CollisionDetector;
use crate::compositor::{self, RenderParams};
use crate::converter::{ConverterOptions, VertexConverter};
use crate::ellipse::{self, EllipseKey};
use crate::interior::{InteriorPoint, PolylabelInterior};
use crate::marker::{MarkerDefinition, RasterMarker, VectorMarker};
use crate::placement::{MarkerPlacementFinder, PlacementOutcome, PlacementParams};
use crate::view::{Projection, ViewTransform};

/// Everything one render pass draws into.
pub struct RenderContext<'a> {
    pub target: &'a mut Pixmap,
    pub view: &'a ViewTransform,
    pub projection: &'a dyn Projection,
    /// Clip box in map coordinates.
    pub clip_box: BoundingBox,
    pub scale_factor: f64,
    pub detector: &'a mut dyn CollisionDetector,
}

/// What happened to one feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub placements: usize,
    pub rejected: usize,
    /// The marker could not be resolved and nothing was drawn.
    pub skipped: bool,
}

impl RenderOutcome {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

impl From<&PlacementOutcome> for RenderOutcome {
    fn from(outcome: &PlacementOutcome) -> Self {
        Self {
            placements: outcome.placements.len(),
            rejected: outcome.rejected,
            skipped: false,
        }
    }
}

/// Renders marker symbolizers. Cheap to clone; clones share the catalog
/// and caches.
#[derive(Clone)]
pub struct MarkerRenderer {
    catalog: Arc<MarkerCatalog>,
    caches: Arc<MarkerCaches>,
    interior: Arc<dyn InteriorPoint>,
}

impl MarkerRenderer {
    pub fn new(catalog: Arc<MarkerCatalog>, caches: Arc<MarkerCaches>) -> Self {
        Self {
            catalog,
            caches,
            interior: Arc::new(PolylabelInterior),
        }
    }

    pub fn with_interior(mut self, interior: Arc<dyn InteriorPoint>) -> Self {
        self.interior = interior;
        self
    }

    pub fn catalog(&self) -> &Arc<MarkerCatalog> {
        &self.catalog
    }

    pub fn caches(&self) -> &Arc<MarkerCaches> {
        &self.caches
    }

    /// Render one symbolizer for one feature.
    ///
    /// Missing or unreadable marker assets skip the feature and are not
    /// reported as errors.
    pub fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        props: &StyleProperties,
        feature: &Feature,
    ) -> MarkerResult<RenderOutcome> {
        let filename = props
            .get_string(PropertyKey::File, feature)
            .unwrap_or_else(|| ELLIPSE_URI.to_string());
        if filename.is_empty() {
            return Ok(RenderOutcome::default());
        }

        let marker = match self.catalog.find(&filename) {
            Ok(marker) => marker,
            Err(e) if e.is_feature_skippable() => {
                warn!(file = %filename, feature = feature.id, error = %e, "Skipping marker");
                counter!("marker_assets_missing_total").increment(1);
                return Ok(RenderOutcome::skipped());
            }
            Err(e) => return Err(e),
        };

        let outcome = match &marker {
            MarkerDefinition::Null => RenderOutcome::default(),
            MarkerDefinition::Vector(vector) => {
                self.render_vector(ctx, &filename, vector, props, feature)?
            }
            MarkerDefinition::Raster(raster) => self.render_raster(ctx, raster, props, feature)?,
        };

        counter!("marker_placements_total").increment(outcome.placements as u64);
        Ok(outcome)
    }

    fn render_vector(
        &self,
        ctx: &mut RenderContext<'_>,
        filename: &str,
        stock: &Arc<VectorMarker>,
        props: &StyleProperties,
        feature: &Feature,
    ) -> MarkerResult<RenderOutcome> {
        let sf = ctx.scale_factor;
        let snap_to_pixels = !MarkerCatalog::is_uri(filename);
        let attributes = resolve_attributes(&self.caches, stock, props, feature)?;

        let procedural = filename == ELLIPSE_URI
            && (props.has(PropertyKey::Width) || props.has(PropertyKey::Height));

        let mut image_tr = Transform::from_scale(sf as f32, sf as f32);
        let marker = if procedural {
            let key = EllipseKey::evaluate(props, feature)?;
            ellipse::get_or_build(&self.caches, key, stock)
        } else {
            let bbox = stock.bounding_box();
            image_tr = size_scaling(image_tr, bbox.width(), bbox.height(), props, feature)?;
            Arc::clone(stock)
        };
        image_tr = apply_image_transform(image_tr, props, feature, sf)?;

        let bbox = marker.bounding_box();
        let marker_trans = recenter(&bbox).post_concat(image_tr);

        let params =
            PlacementParams::from_properties(props, feature, bbox, marker_trans, sf, snap_to_pixels)?;
        let render_params = RenderParams::from_properties(props, feature, &params)?;
        let placed = self.place(ctx, &params, props, feature)?;

        for placement in &placed.placements {
            compositor::render_vector(
                &mut *ctx.target,
                &self.caches,
                &marker,
                &attributes,
                placement.transform,
                &render_params,
            );
        }

        debug!(
            feature = feature.id,
            placements = placed.placements.len(),
            rejected = placed.rejected,
            "Rendered vector markers"
        );
        Ok(RenderOutcome::from(&placed))
    }

    fn render_raster(
        &self,
        ctx: &mut RenderContext<'_>,
        raster: &Arc<RasterMarker>,
        props: &StyleProperties,
        feature: &Feature,
    ) -> MarkerResult<RenderOutcome> {
        let sf = ctx.scale_factor;
        let image_tr = Transform::from_scale(sf as f32, sf as f32);
        let image_tr = size_scaling(
            image_tr,
            raster.width() as f64,
            raster.height() as f64,
            props,
            feature,
        )?;
        let image_tr = apply_image_transform(image_tr, props, feature, sf)?;

        let bbox = raster.bounding_box();
        let marker_trans = recenter(&bbox).post_concat(image_tr);

        let params = PlacementParams::from_properties(props, feature, bbox, marker_trans, sf, false)?;
        let render_params = RenderParams::from_properties(props, feature, &params)?;
        let placed = self.place(ctx, &params, props, feature)?;

        for placement in &placed.placements {
            compositor::render_raster(&mut *ctx.target, raster, placement.transform, &render_params);
        }

        debug!(
            feature = feature.id,
            placements = placed.placements.len(),
            rejected = placed.rejected,
            "Rendered raster markers"
        );
        Ok(RenderOutcome::from(&placed))
    }

    /// Convert the feature geometry and run the placement finder over it.
    fn place(
        &self,
        ctx: &mut RenderContext<'_>,
        params: &PlacementParams,
        props: &StyleProperties,
        feature: &Feature,
    ) -> MarkerResult<PlacementOutcome> {
        let options = ConverterOptions::from_properties(props, feature, ctx.scale_factor)?;
        let converter = VertexConverter::new(
            feature.geometry.geometry_type(),
            ctx.clip_box,
            ctx.view,
            ctx.projection,
            options,
        );
        let geometry = converter.convert(&feature.geometry);

        let finder = MarkerPlacementFinder::new(params, self.interior.as_ref());
        Ok(finder.find(&geometry, &mut *ctx.detector))
    }
}

fn recenter(bbox: &BoundingBox) -> Transform {
    let (cx, cy) = bbox.center();
    Transform::from_translate(-cx as f32, -cy as f32)
}

/// Scale from the natural marker size to the declared `width`/`height`.
///
/// With only one dimension given the scaling is uniform.
fn size_scaling(
    image_tr: Transform,
    natural_width: f64,
    natural_height: f64,
    props: &StyleProperties,
    feature: &Feature,
) -> MarkerResult<Transform> {
    let width = props.get_f64(PropertyKey::Width, feature, 0.0)?;
    let height = props.get_f64(PropertyKey::Height, feature, 0.0)?;

    let (sx, sy) = match (width > 0.0, height > 0.0) {
        (true, true) if natural_width > 0.0 && natural_height > 0.0 => {
            (width / natural_width, height / natural_height)
        }
        (true, false) if natural_width > 0.0 => {
            let s = width / natural_width;
            (s, s)
        }
        (false, true) if natural_height > 0.0 => {
            let s = height / natural_height;
            (s, s)
        }
        _ => return Ok(image_tr),
    };

    Ok(Transform::from_scale(sx as f32, sy as f32).post_concat(image_tr))
}

fn apply_image_transform(
    image_tr: Transform,
    props: &StyleProperties,
    feature: &Feature,
    scale_factor: f64,
) -> MarkerResult<Transform> {
    Ok(match props.get_transform(PropertyKey::ImageTransform, feature)? {
        Some(list) if !list.is_empty() => image_tr.post_concat(list.to_transform(scale_factor)),
        _ => image_tr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::LabelCollisionDetector;
    use crate::view::IdentityProjection;
    use map_common::Geometry;

    fn renderer() -> MarkerRenderer {
        MarkerRenderer::new(
            Arc::new(MarkerCatalog::new()),
            Arc::new(MarkerCaches::default()),
        )
    }

    fn render_one(
        renderer: &MarkerRenderer,
        props: &StyleProperties,
        feature: &Feature,
        target: &mut Pixmap,
    ) -> RenderOutcome {
        let view = ViewTransform::pixel_space(target.width(), target.height());
        let mut detector = LabelCollisionDetector::new(view.screen_box());
        let mut ctx = RenderContext {
            target,
            view: &view,
            projection: &IdentityProjection,
            clip_box: view.extent(),
            scale_factor: 1.0,
            detector: &mut detector,
        };
        renderer.render(&mut ctx, props, feature).unwrap()
    }

    #[test]
    fn test_size_scaling_rules() {
        let feature = Feature::new(1, Geometry::Empty);
        let base = Transform::identity();

        let props = StyleProperties::new().with(PropertyKey::Width, 20.0);
        let ts = size_scaling(base, 10.0, 5.0, &props, &feature).unwrap();
        assert_eq!((ts.sx, ts.sy), (2.0, 2.0));

        let props = StyleProperties::new().with(PropertyKey::Height, 20.0);
        let ts = size_scaling(base, 10.0, 5.0, &props, &feature).unwrap();
        assert_eq!((ts.sx, ts.sy), (4.0, 4.0));

        let props = StyleProperties::new()
            .with(PropertyKey::Width, 20.0)
            .with(PropertyKey::Height, 20.0);
        let ts = size_scaling(base, 10.0, 5.0, &props, &feature).unwrap();
        assert_eq!((ts.sx, ts.sy), (2.0, 4.0));

        let ts = size_scaling(base, 10.0, 5.0, &StyleProperties::new(), &feature).unwrap();
        assert!(ts.is_identity());
    }

    #[test]
    fn test_default_ellipse_draws_blue() {
        let renderer = renderer();
        let mut target = Pixmap::new(40, 40).unwrap();
        let feature = Feature::new(1, Geometry::Point((20.0, 20.0)));

        let outcome = render_one(&renderer, &StyleProperties::new(), &feature, &mut target);

        assert_eq!(outcome.placements, 1);
        // map y is flipped; (20, 20) stays at the centre of a 40x40 view
        let px = target.pixel(20, 20).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (0, 0, 255));
    }

    #[test]
    fn test_missing_asset_skips_feature() {
        let renderer = renderer();
        let mut target = Pixmap::new(10, 10).unwrap();
        let feature = Feature::new(1, Geometry::Point((5.0, 5.0)));
        let props = StyleProperties::new().with(PropertyKey::File, "shape://nothing");

        let outcome = render_one(&renderer, &props, &feature, &mut target);

        assert!(outcome.skipped);
        assert!(target.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_null_marker_is_noop() {
        let renderer = renderer();
        renderer.catalog().insert_null("blank");
        let mut target = Pixmap::new(10, 10).unwrap();
        let feature = Feature::new(1, Geometry::Point((5.0, 5.0)));
        let props = StyleProperties::new().with(PropertyKey::File, "blank");

        let outcome = render_one(&renderer, &props, &feature, &mut target);

        assert_eq!(outcome, RenderOutcome::default());
    }

    #[test]
    fn test_expression_error_propagates() {
        let renderer = renderer();
        let mut target = Pixmap::new(10, 10).unwrap();
        let feature = Feature::new(1, Geometry::Point((5.0, 5.0))).with_attribute("w", "wide");
        let props = StyleProperties::new()
            .with_expression(PropertyKey::Width, "[w]")
            .unwrap();

        let view = ViewTransform::pixel_space(10, 10);
        let mut detector = LabelCollisionDetector::new(view.screen_box());
        let mut ctx = RenderContext {
            target: &mut target,
            view: &view,
            projection: &IdentityProjection,
            clip_box: view.extent(),
            scale_factor: 1.0,
            detector: &mut detector,
        };
        assert!(renderer.render(&mut ctx, &props, &feature).is_err());
    }
}
