//! SVG marker loading.
//!
//! Documents are parsed with `usvg`, which resolves styles, units and
//! nested transforms. Every path is flattened into marker space with its
//! absolute transform applied, and its fill and stroke become the marker's
//! default [`PathAttributes`]. Text and embedded images are ignored.

use map_common::{BoundingBox, Color, MarkerError, MarkerResult};
use std::sync::Arc;
use tracing::debug;

use crate::marker::{
    FillRule, Gradient, GradientKind, GradientStop, LineCap, LineJoin, Paint, PathAttributes,
    SpreadMethod, VectorMarker,
};

/// Parse an SVG document into a vector marker.
///
/// The bounding box is the document's viewport, so markers keep the
/// padding their author gave them.
pub fn parse_svg(name: &str, text: &str) -> MarkerResult<VectorMarker> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(text, &opt).map_err(|e| MarkerError::AssetLoad {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let mut shapes = Vec::new();
    collect_paths(tree.root(), 1.0, &mut shapes);

    let size = tree.size();
    let bbox = BoundingBox::new(0.0, 0.0, size.width() as f64, size.height() as f64);

    debug!(name = %name, shapes = shapes.len(), "Parsed SVG marker");
    Ok(VectorMarker::with_bbox(shapes, bbox))
}

fn collect_paths(
    group: &usvg::Group,
    parent_opacity: f64,
    out: &mut Vec<(tiny_skia::Path, PathAttributes)>,
) {
    let opacity = parent_opacity * group.opacity().get() as f64;
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect_paths(child, opacity, out),
            usvg::Node::Path(path) => {
                if let Some(shape) = convert_path(path, opacity) {
                    out.push(shape);
                }
            }
            _ => {}
        }
    }
}

fn convert_path(path: &usvg::Path, opacity: f64) -> Option<(tiny_skia::Path, PathAttributes)> {
    let transform = path.abs_transform();
    let data = path.data().clone().transform(transform)?;

    let mut attrs = PathAttributes {
        opacity,
        ..PathAttributes::default()
    };

    match path.fill() {
        Some(fill) => {
            attrs.fill_opacity = fill.opacity().get() as f64;
            attrs.fill_rule = match fill.rule() {
                usvg::FillRule::NonZero => FillRule::NonZero,
                usvg::FillRule::EvenOdd => FillRule::EvenOdd,
            };
            match convert_paint(fill.paint(), transform) {
                Some(paint) => attrs.fill = paint,
                None => attrs.fill_enabled = false,
            }
        }
        None => {
            attrs.fill_enabled = false;
            attrs.fill_none = true;
        }
    }

    if let Some(stroke) = path.stroke() {
        if let Some(paint) = convert_paint(stroke.paint(), transform) {
            attrs.stroke = paint;
            attrs.stroke_enabled = true;
        }
        attrs.stroke_opacity = stroke.opacity().get() as f64;
        attrs.stroke_width = stroke.width().get() as f64 * transform_scale(transform);
        attrs.miter_limit = stroke.miterlimit().get() as f64;
        attrs.line_cap = match stroke.linecap() {
            usvg::LineCap::Butt => LineCap::Butt,
            usvg::LineCap::Round => LineCap::Round,
            usvg::LineCap::Square => LineCap::Square,
        };
        attrs.line_join = match stroke.linejoin() {
            usvg::LineJoin::Round => LineJoin::Round,
            usvg::LineJoin::Bevel => LineJoin::Bevel,
            _ => LineJoin::Miter,
        };
    }

    Some((data, attrs))
}

/// Average linear scale of an affine transform.
fn transform_scale(ts: tiny_skia::Transform) -> f64 {
    let det = (ts.sx * ts.sy - ts.kx * ts.ky) as f64;
    det.abs().sqrt()
}

fn convert_paint(paint: &usvg::Paint, transform: tiny_skia::Transform) -> Option<Paint> {
    match paint {
        usvg::Paint::Color(c) => Some(Paint::Color(Color::rgb(c.red, c.green, c.blue))),
        usvg::Paint::LinearGradient(lg) => Some(Paint::Gradient(Arc::new(Gradient {
            kind: GradientKind::Linear {
                x1: lg.x1(),
                y1: lg.y1(),
                x2: lg.x2(),
                y2: lg.y2(),
            },
            stops: convert_stops(lg.stops()),
            spread: convert_spread(lg.spread_method()),
            transform: transform.pre_concat(lg.transform()),
        }))),
        usvg::Paint::RadialGradient(rg) => Some(Paint::Gradient(Arc::new(Gradient {
            kind: GradientKind::Radial {
                cx: rg.cx(),
                cy: rg.cy(),
                r: rg.r().get(),
                fx: rg.fx(),
                fy: rg.fy(),
            },
            stops: convert_stops(rg.stops()),
            spread: convert_spread(rg.spread_method()),
            transform: transform.pre_concat(rg.transform()),
        }))),
        // patterns are not supported for markers
        usvg::Paint::Pattern(_) => None,
    }
}

fn convert_stops(stops: &[usvg::Stop]) -> Vec<GradientStop> {
    stops
        .iter()
        .map(|stop| {
            let c = stop.color();
            let alpha = (stop.opacity().get() * 255.0).round() as u8;
            GradientStop {
                offset: stop.offset().get(),
                color: Color::rgba(c.red, c.green, c.blue, alpha),
            }
        })
        .collect()
}

fn convert_spread(spread: usvg::SpreadMethod) -> SpreadMethod {
    match spread {
        usvg::SpreadMethod::Pad => SpreadMethod::Pad,
        usvg::SpreadMethod::Reflect => SpreadMethod::Reflect,
        usvg::SpreadMethod::Repeat => SpreadMethod::Repeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
        <circle cx="10" cy="10" r="8" fill="#ff0000" stroke="#000000" stroke-width="2"/>
    </svg>"##;

    #[test]
    fn test_parse_circle() {
        let marker = parse_svg("circle.svg", CIRCLE).unwrap();
        assert_eq!(marker.bounding_box(), BoundingBox::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(marker.shapes().len(), 1);

        let attrs = &marker.attributes()[0];
        assert_eq!(attrs.fill, Paint::Color(Color::rgb(255, 0, 0)));
        assert!(attrs.stroke_enabled);
        assert!((attrs.stroke_width - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_explicit_none_fill() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <rect width="10" height="10" fill="none" stroke="black"/>
        </svg>"#;
        let marker = parse_svg("outline.svg", svg).unwrap();
        let attrs = &marker.attributes()[0];
        assert!(attrs.fill_none);
        assert!(!attrs.draws_fill());
        assert!(attrs.draws_stroke());
    }

    #[test]
    fn test_group_transform_is_applied() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20">
            <g transform="translate(10 10)"><rect width="5" height="5"/></g>
        </svg>"#;
        let marker = parse_svg("moved.svg", svg).unwrap();
        let bounds = marker.shapes()[0].path.bounds();
        assert_eq!(bounds.left(), 10.0);
        assert_eq!(bounds.bottom(), 15.0);
    }

    #[test]
    fn test_invalid_svg() {
        let err = parse_svg("broken.svg", "<svg").unwrap_err();
        assert!(matches!(err, MarkerError::AssetLoad { .. }));
    }
}
