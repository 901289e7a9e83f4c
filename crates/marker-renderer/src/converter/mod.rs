//! Vertex conversion pipeline.
//!
//! Feature geometry goes through a fixed sequence of stages before
//! placement: clip, coordinate transform, parallel offset, affine
//! geometry transform, simplification and smoothing. Stages are switched
//! on by the symbolizer; their order never changes.

pub mod clip;
pub mod offset;
pub mod simplify;
pub mod smooth;

use std::borrow::Cow;

use map_common::{
    BoundingBox, Coord, Feature, Geometry, GeometryType, MarkerResult, Polygon, PropertyKey,
    StyleProperties,
};
use tiny_skia::Transform;

use crate::view::{Projection, ViewTransform};

/// One stage of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterStage {
    ClipPolygon,
    ClipLine,
    Transform,
    Offset,
    Affine,
    Simplify,
    Smooth,
}

/// Scalar controls for the pipeline, evaluated once per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterOptions {
    pub clip: bool,
    /// Offset in pixels, already multiplied by the scale factor.
    pub offset: f64,
    /// Tolerance in pixels, already multiplied by the scale factor.
    pub simplify_tolerance: f64,
    pub smooth: f64,
    pub geometry_transform: Option<Transform>,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            clip: true,
            offset: 0.0,
            simplify_tolerance: 0.0,
            smooth: 0.0,
            geometry_transform: None,
        }
    }
}

impl ConverterOptions {
    pub fn from_properties(
        props: &StyleProperties,
        feature: &Feature,
        scale_factor: f64,
    ) -> MarkerResult<Self> {
        let geometry_transform = props
            .get_transform(PropertyKey::GeometryTransform, feature)?
            .filter(|list| !list.is_empty())
            .map(|list| list.to_transform(scale_factor));

        Ok(Self {
            clip: props.get_bool(PropertyKey::Clip, feature, true)?,
            offset: props.get_f64(PropertyKey::Offset, feature, 0.0)? * scale_factor,
            simplify_tolerance: props.get_f64(PropertyKey::SimplifyTolerance, feature, 0.0)?
                * scale_factor,
            smooth: props.get_f64(PropertyKey::Smooth, feature, 0.0)?,
            geometry_transform,
        })
    }
}

/// Converts feature geometry from source coordinates to pixel space.
pub struct VertexConverter<'a> {
    geometry_type: GeometryType,
    clip_box: BoundingBox,
    view: &'a ViewTransform,
    projection: &'a dyn Projection,
    options: ConverterOptions,
}

impl<'a> VertexConverter<'a> {
    pub fn new(
        geometry_type: GeometryType,
        clip_box: BoundingBox,
        view: &'a ViewTransform,
        projection: &'a dyn Projection,
        options: ConverterOptions,
    ) -> Self {
        Self {
            geometry_type,
            clip_box,
            view,
            projection,
            options,
        }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// The stages `convert` will run, in application order.
    pub fn enabled_stages(&self) -> Vec<ConverterStage> {
        let mut stages = Vec::with_capacity(6);
        if self.options.clip {
            if self.geometry_type.is_polygonal() {
                stages.push(ConverterStage::ClipPolygon);
            } else if self.geometry_type.is_lineal() {
                stages.push(ConverterStage::ClipLine);
            }
        }
        stages.push(ConverterStage::Transform);
        if self.options.offset.abs() > 0.0 {
            stages.push(ConverterStage::Offset);
        }
        stages.push(ConverterStage::Affine);
        if self.options.simplify_tolerance > 0.0 {
            stages.push(ConverterStage::Simplify);
        }
        if self.options.smooth > 0.0 {
            stages.push(ConverterStage::Smooth);
        }
        stages
    }

    /// Run every enabled stage. The input is copied at most once; the
    /// coordinate and affine stages rewrite vertices in place.
    pub fn convert(&self, geometry: &Geometry) -> Geometry {
        let mut current = Cow::Borrowed(geometry);
        for stage in self.enabled_stages() {
            current = Cow::Owned(self.apply(stage, current));
        }
        current.into_owned()
    }

    fn apply(&self, stage: ConverterStage, geometry: Cow<'_, Geometry>) -> Geometry {
        match stage {
            ConverterStage::ClipPolygon => clip::clip_polygons(&geometry, &self.clip_box),
            ConverterStage::ClipLine => clip::clip_lines(&geometry, &self.clip_box),
            ConverterStage::Transform => {
                let mut geometry = geometry.into_owned();
                geometry.map_coords_in_place(|c| self.view.forward(self.projection.forward(c)));
                geometry
            }
            ConverterStage::Offset => {
                let d = self.options.offset;
                map_parts(
                    &geometry,
                    |line| offset::offset_line(line, d),
                    |ring| offset::offset_line(ring, d),
                )
            }
            ConverterStage::Affine => {
                let mut geometry = geometry.into_owned();
                if let Some(ts) = self.options.geometry_transform.filter(|ts| !ts.is_identity()) {
                    geometry.map_coords_in_place(|c| apply_affine(&ts, c));
                }
                geometry
            }
            ConverterStage::Simplify => {
                let tol = self.options.simplify_tolerance;
                map_parts(
                    &geometry,
                    |line| simplify::simplify_line(line, tol),
                    |ring| simplify::simplify_ring(ring, tol),
                )
            }
            ConverterStage::Smooth => {
                let factor = self.options.smooth;
                map_parts(
                    &geometry,
                    |line| smooth::smooth_line(line, factor),
                    |ring| smooth::smooth_ring(ring, factor),
                )
            }
        }
    }
}

fn apply_affine(ts: &Transform, (x, y): Coord) -> Coord {
    (
        ts.sx as f64 * x + ts.kx as f64 * y + ts.tx as f64,
        ts.ky as f64 * x + ts.sy as f64 * y + ts.ty as f64,
    )
}

/// Rebuild lineal and polygonal parts; points pass through.
fn map_parts<L, R>(geometry: &Geometry, line_fn: L, ring_fn: R) -> Geometry
where
    L: Fn(&[Coord]) -> Vec<Coord>,
    R: Fn(&[Coord]) -> Vec<Coord>,
{
    let polygon = |p: &Polygon| {
        Polygon::new(
            ring_fn(&p.exterior),
            p.interiors.iter().map(|r| ring_fn(r)).collect(),
        )
    };
    match geometry {
        Geometry::LineString(line) => Geometry::LineString(line_fn(line)),
        Geometry::MultiLineString(lines) => {
            Geometry::MultiLineString(lines.iter().map(|l| line_fn(l)).collect())
        }
        Geometry::Polygon(p) => Geometry::Polygon(polygon(p)),
        Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(polys.iter().map(polygon).collect()),
        other => other.clone(),
    }
}
