//! Marker rasterization and compositing.
//!
//! Vector markers placed with a pure translation go through the sub-image
//! cache: the fractional part of the translation is quantized into an
//! N×N phase grid and each (marker, phase, attributes) triple is rendered
//! once into small fill and stroke buffers, which are then blitted at the
//! integer part of the translation. Anything else is drawn directly.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use map_common::{BoundingBox, Feature, MarkerResult, PropertyKey, StyleProperties};
use tiny_skia::{BlendMode, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::trace;

use crate::cache::MarkerCaches;
use crate::marker::{MarkerId, Paint, PathAttributes, RasterMarker, VectorMarker};
use crate::placement::{transform_box, PlacementParams};

/// `composite-operation` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeOp(pub BlendMode);

impl Default for CompositeOp {
    fn default() -> Self {
        CompositeOp(BlendMode::SourceOver)
    }
}

impl CompositeOp {
    pub fn blend_mode(&self) -> BlendMode {
        self.0
    }
}

impl FromStr for CompositeOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim() {
            "clear" => BlendMode::Clear,
            "src" => BlendMode::Source,
            "dst" => BlendMode::Destination,
            "src-over" => BlendMode::SourceOver,
            "dst-over" => BlendMode::DestinationOver,
            "src-in" => BlendMode::SourceIn,
            "dst-in" => BlendMode::DestinationIn,
            "src-out" => BlendMode::SourceOut,
            "dst-out" => BlendMode::DestinationOut,
            "src-atop" => BlendMode::SourceAtop,
            "dst-atop" => BlendMode::DestinationAtop,
            "xor" => BlendMode::Xor,
            "plus" => BlendMode::Plus,
            "modulate" => BlendMode::Modulate,
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "color-dodge" => BlendMode::ColorDodge,
            "color-burn" => BlendMode::ColorBurn,
            "hard-light" => BlendMode::HardLight,
            "soft-light" => BlendMode::SoftLight,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            "hue" => BlendMode::Hue,
            "saturation" => BlendMode::Saturation,
            "color" => BlendMode::Color,
            "value" | "luminosity" => BlendMode::Luminosity,
            other => return Err(format!("Unknown composite operation: {}", other)),
        };
        Ok(CompositeOp(mode))
    }
}

/// `gamma-method` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GammaMethod {
    #[default]
    Power,
    Linear,
    None,
    Threshold,
    Multiply,
}

impl GammaMethod {
    /// Whether edges are anti-aliased.
    pub fn anti_alias(&self) -> bool {
        !matches!(self, GammaMethod::None | GammaMethod::Threshold)
    }
}

impl FromStr for GammaMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "power" => Ok(GammaMethod::Power),
            "linear" => Ok(GammaMethod::Linear),
            "none" => Ok(GammaMethod::None),
            "threshold" => Ok(GammaMethod::Threshold),
            "multiply" => Ok(GammaMethod::Multiply),
            other => Err(format!("Unknown gamma method: {}", other)),
        }
    }
}

impl fmt::Display for GammaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GammaMethod::Power => "power",
            GammaMethod::Linear => "linear",
            GammaMethod::None => "none",
            GammaMethod::Threshold => "threshold",
            GammaMethod::Multiply => "multiply",
        };
        f.write_str(name)
    }
}

/// Compositing controls for one symbolizer/feature pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub anti_alias: bool,
    pub snap_to_pixels: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend_mode: BlendMode::SourceOver,
            anti_alias: true,
            snap_to_pixels: false,
        }
    }
}

impl RenderParams {
    pub fn from_properties(
        props: &StyleProperties,
        feature: &Feature,
        placement: &PlacementParams,
    ) -> MarkerResult<Self> {
        let op = props.get_enum(
            PropertyKey::CompositeOperation,
            feature,
            CompositeOp::default(),
        )?;
        let gamma = props.get_enum(PropertyKey::GammaMethod, feature, GammaMethod::default())?;

        Ok(Self {
            opacity: placement.opacity.clamp(0.0, 1.0) as f32,
            blend_mode: op.blend_mode(),
            anti_alias: gamma.anti_alias(),
            snap_to_pixels: placement.snap_to_pixels,
        })
    }
}

/// Key of the sub-image cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubImageKey {
    pub marker: MarkerId,
    /// Phase bucket, `row * N + column`.
    pub sample: u32,
    pub attributes: PathAttributes,
    pub anti_alias: bool,
}

/// Pre-rendered fill and stroke passes of one marker at one phase.
///
/// A pass that produced no visible pixels is stored as `None`.
#[derive(Debug, Clone)]
pub struct SubImages {
    pub fill: Option<Arc<Pixmap>>,
    pub stroke: Option<Arc<Pixmap>>,
    /// Offset of the buffers from the integer translation.
    pub origin: (i32, i32),
}

/// Phase bucket of a fractional offset pair on an `n`×`n` grid.
pub fn phase_bucket(dx: f64, dy: f64, n: u32) -> (u32, u32) {
    let last = n.saturating_sub(1);
    let col = ((dx * n as f64).floor().max(0.0) as u32).min(last);
    let row = ((dy * n as f64).floor().max(0.0) as u32).min(last);
    (col, row)
}

/// Whether the transform can use the sub-image cache.
pub fn is_cacheable(attributes: &[PathAttributes], transform: &Transform) -> bool {
    attributes.len() == 1
        && transform.sx == 1.0
        && transform.sy == 1.0
        && transform.kx == 0.0
        && transform.ky == 0.0
}

fn snap(transform: Transform, params: &RenderParams) -> Transform {
    if params.snap_to_pixels {
        Transform::from_row(
            transform.sx,
            transform.ky,
            transform.kx,
            transform.sy,
            transform.tx.round(),
            transform.ty.round(),
        )
    } else {
        transform
    }
}

/// Whether `bbox` under `transform`, grown by `margin` pixels, overlaps
/// the target.
fn reaches_target(target: &Pixmap, transform: &Transform, bbox: &BoundingBox, margin: f64) -> bool {
    let area = transform_box(transform, bbox);
    let frame = BoundingBox::new(
        -margin,
        -margin,
        target.width() as f64 + margin,
        target.height() as f64 + margin,
    );
    [area.min_x, area.min_y, area.max_x, area.max_y]
        .iter()
        .all(|v| v.is_finite())
        && area.intersects(&frame)
}

/// Pixel position `base + offset`, if it fits the blit API.
fn blit_coord(base: f64, offset: i32) -> Option<i32> {
    i32::try_from((base as i64).saturating_add(i64::from(offset))).ok()
}

/// Draw a vector marker with `transform` (marker space to pixels).
///
/// # Arguments
///
/// * `target` - Framebuffer to composite into
/// * `caches` - Render caches; the sub-image cache is used for pure
///   translations of single-shape markers
/// * `marker` - The vector marker
/// * `attributes` - Resolved paint attributes, one per shape
/// * `transform` - Marker space to pixel space
/// * `params` - Opacity, blend mode, anti-aliasing and pixel snapping
///
/// Markers that land entirely outside `target` are not drawn.
pub fn render_vector(
    target: &mut Pixmap,
    caches: &MarkerCaches,
    marker: &VectorMarker,
    attributes: &[PathAttributes],
    transform: Transform,
    params: &RenderParams,
) {
    let transform = snap(transform, params);

    let stroke_reach = attributes
        .iter()
        .filter(|a| a.draws_stroke())
        .map(|a| a.stroke_width.abs())
        .fold(0.0, f64::max);
    if !reaches_target(target, &transform, &marker.bounding_box(), stroke_reach + 1.0) {
        trace!(marker = marker.id().get(), "Marker outside target, not drawn");
        return;
    }

    if !is_cacheable(attributes, &transform) {
        draw_shapes(target, marker, attributes, transform, params, Pass::Both);
        return;
    }

    let attr = &attributes[0];
    let n = caches.sampling_rate();
    let (tx, ty) = (transform.tx as f64, transform.ty as f64);
    let (ix, iy) = (tx.floor(), ty.floor());
    let (col, row) = phase_bucket(tx - ix, ty - iy, n);

    let key = SubImageKey {
        marker: marker.id(),
        sample: row * n + col,
        attributes: attr.clone(),
        anti_alias: params.anti_alias,
    };

    let images = match caches.images.get(&key) {
        Some(images) => images,
        None => {
            let phase = (col as f64 / n as f64, row as f64 / n as f64);
            let images = rasterize_sub_images(marker, attr, phase, params.anti_alias);
            caches.images.insert(key, images.clone());
            images
        }
    };

    let (Some(x), Some(y)) = (blit_coord(ix, images.origin.0), blit_coord(iy, images.origin.1))
    else {
        return;
    };
    let paint = PixmapPaint {
        opacity: params.opacity,
        blend_mode: params.blend_mode,
        quality: FilterQuality::Nearest,
    };
    for image in [&images.fill, &images.stroke].into_iter().flatten() {
        let image: &Pixmap = image;
        target.draw_pixmap(x, y, image.as_ref(), &paint, Transform::identity(), None);
    }
}

/// Render the fill and stroke passes at a sub-pixel phase.
fn rasterize_sub_images(
    marker: &VectorMarker,
    attr: &PathAttributes,
    phase: (f64, f64),
    anti_alias: bool,
) -> SubImages {
    let bbox = marker.bounding_box();
    let margin = if attr.draws_stroke() {
        attr.stroke_width.abs()
    } else {
        0.0
    };
    let x0 = (bbox.min_x - margin).floor();
    let y0 = (bbox.min_y - margin).floor();
    let width = ((bbox.width() + 2.0 * margin).ceil() as u32).saturating_add(2);
    let height = ((bbox.height() + 2.0 * margin).ceil() as u32).saturating_add(2);

    let local = Transform::from_translate((phase.0 - x0) as f32, (phase.1 - y0) as f32);
    let params = RenderParams {
        anti_alias,
        ..RenderParams::default()
    };
    let attrs = std::slice::from_ref(attr);

    let render_pass = |pass: Pass| -> Option<Arc<Pixmap>> {
        let mut buffer = Pixmap::new(width, height)?;
        draw_shapes(&mut buffer, marker, attrs, local, &params, pass);
        if buffer.data().iter().all(|b| *b == 0) {
            None
        } else {
            Some(Arc::new(buffer))
        }
    };

    trace!(marker = marker.id().get(), width, height, "Rendering marker sub-images");

    SubImages {
        fill: if attr.draws_fill() { render_pass(Pass::Fill) } else { None },
        stroke: if attr.draws_stroke() { render_pass(Pass::Stroke) } else { None },
        origin: (x0 as i32, y0 as i32),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Fill,
    Stroke,
    Both,
}

fn draw_shapes(
    target: &mut Pixmap,
    marker: &VectorMarker,
    attributes: &[PathAttributes],
    transform: Transform,
    params: &RenderParams,
    pass: Pass,
) {
    for (shape, attr) in marker.shapes().iter().zip(attributes.iter()) {
        if !attr.visible {
            continue;
        }
        if pass != Pass::Stroke && attr.draws_fill() {
            let alpha = (attr.fill_opacity * attr.opacity) as f32 * params.opacity;
            if let Some(paint) = make_paint(&attr.fill, alpha, params) {
                target.fill_path(&shape.path, &paint, attr.fill_rule.into(), transform, None);
            }
        }
        if pass != Pass::Fill && attr.draws_stroke() {
            let alpha = (attr.stroke_opacity * attr.opacity) as f32 * params.opacity;
            if let Some(paint) = make_paint(&attr.stroke, alpha, params) {
                let stroke = tiny_skia::Stroke {
                    width: attr.stroke_width as f32,
                    miter_limit: attr.miter_limit as f32,
                    line_cap: attr.line_cap.into(),
                    line_join: attr.line_join.into(),
                    dash: None,
                };
                target.stroke_path(&shape.path, &paint, &stroke, transform, None);
            }
        }
    }
}

fn make_paint(source: &Paint, alpha: f32, params: &RenderParams) -> Option<tiny_skia::Paint<'static>> {
    let mut paint = tiny_skia::Paint {
        anti_alias: params.anti_alias,
        blend_mode: params.blend_mode,
        ..tiny_skia::Paint::default()
    };
    match source {
        Paint::Color(color) => paint.set_color(color.to_skia(alpha)),
        Paint::Gradient(gradient) => paint.shader = gradient.to_shader(alpha)?,
    }
    Some(paint)
}

/// Draw a raster marker with `transform` (image space to pixels).
pub fn render_raster(
    target: &mut Pixmap,
    marker: &RasterMarker,
    transform: Transform,
    params: &RenderParams,
) {
    let mut paint = PixmapPaint {
        opacity: params.opacity,
        blend_mode: params.blend_mode,
        quality: FilterQuality::Nearest,
    };

    if !reaches_target(target, &transform, &marker.bounding_box(), 1.0) {
        return;
    }

    let pure_translation = transform.sx == 1.0
        && transform.sy == 1.0
        && transform.kx == 0.0
        && transform.ky == 0.0;

    if pure_translation {
        let (Some(x), Some(y)) = (
            blit_coord(transform.tx.round() as f64, 0),
            blit_coord(transform.ty.round() as f64, 0),
        ) else {
            return;
        };
        target.draw_pixmap(x, y, marker.pixmap().as_ref(), &paint, Transform::identity(), None);
    } else {
        paint.quality = FilterQuality::Bilinear;
        target.draw_pixmap(0, 0, marker.pixmap().as_ref(), &paint, snap(transform, params), None);
    }
}
