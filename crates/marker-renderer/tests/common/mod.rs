//! Common helpers for marker-renderer integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use map_common::{Feature, StyleProperties};
use marker_renderer::{
    IdentityProjection, LabelCollisionDetector, MarkerCacheConfig, MarkerCaches, MarkerCatalog,
    MarkerRenderer, RenderContext, RenderOutcome, ViewTransform,
};
use tiny_skia::Pixmap;

pub const SIZE: u32 = 100;

/// Renderer with the built-in catalog and caches built from `config`.
pub fn renderer_with(config: &MarkerCacheConfig) -> MarkerRenderer {
    MarkerRenderer::new(
        Arc::new(MarkerCatalog::new()),
        Arc::new(MarkerCaches::new(config)),
    )
}

pub fn renderer() -> MarkerRenderer {
    renderer_with(&MarkerCacheConfig::default())
}

/// Render every feature with `props` into `target` in one pass, sharing a
/// collision detector. Map units are pixels, y up.
pub fn render_pass(
    renderer: &MarkerRenderer,
    props: &StyleProperties,
    features: &[Feature],
    target: &mut Pixmap,
) -> (Vec<RenderOutcome>, LabelCollisionDetector) {
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
    let outcomes = features
        .iter()
        .map(|f| renderer.render(&mut ctx, props, f).unwrap())
        .collect();
    (outcomes, detector)
}

/// Render into a fresh `SIZE`x`SIZE` framebuffer.
pub fn render_fresh(
    renderer: &MarkerRenderer,
    props: &StyleProperties,
    features: &[Feature],
) -> (Pixmap, Vec<RenderOutcome>) {
    let mut target = Pixmap::new(SIZE, SIZE).unwrap();
    let (outcomes, _) = render_pass(renderer, props, features, &mut target);
    (target, outcomes)
}

pub fn total_placements(outcomes: &[RenderOutcome]) -> usize {
    outcomes.iter().map(|o| o.placements).sum()
}
