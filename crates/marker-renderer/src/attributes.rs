//! Resolution of per-feature paint attributes for vector markers.
//!
//! A marker's default attributes are overridden by the symbolizer's `fill`,
//! `fill-opacity`, `stroke`, `stroke-width` and `stroke-opacity`. When no
//! property of the symbolizer depends on the feature, the result is cached
//! under the marker identity plus the full property set.

use map_common::{Feature, MarkerResult, PropertyKey, StyleProperties};
use std::sync::Arc;
use tracing::trace;

use crate::cache::MarkerCaches;
use crate::marker::{MarkerId, Paint, PathAttributes, VectorMarker};

/// Resolved attribute list, one entry per marker shape.
pub type ResolvedAttributes = Arc<Vec<PathAttributes>>;

/// Structural key of the attribute cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    pub marker: MarkerId,
    pub properties: StyleProperties,
}

/// Resolve the attributes to draw `marker` with for `feature`.
///
/// # Arguments
///
/// * `caches` - Render caches; only the attribute cache is used
/// * `marker` - Vector marker supplying the per-shape defaults
/// * `properties` - Symbolizer properties, literals or expressions
/// * `feature` - Feature the expressions are evaluated against
///
/// # Returns
///
/// One attribute entry per marker shape. Shared with other callers when the
/// property set is feature-independent.
pub fn resolve_attributes(
    caches: &MarkerCaches,
    marker: &VectorMarker,
    properties: &StyleProperties,
    feature: &Feature,
) -> MarkerResult<ResolvedAttributes> {
    // Only feature-independent property sets can ever be stored, so only
    // those are worth looking up.
    let cacheable = properties.is_feature_independent();
    let key = cacheable.then(|| AttributeKey {
        marker: marker.id(),
        properties: properties.clone(),
    });

    if let Some(key) = &key {
        if let Some(attrs) = caches.attributes.get(key) {
            return Ok(attrs);
        }
    }

    let resolved = match apply_overrides(marker.attributes(), properties, feature)? {
        Some(custom) => Arc::new(custom),
        None => Arc::clone(marker.attributes()),
    };

    if let Some(key) = key {
        trace!(marker = marker.id().get(), "Caching resolved marker attributes");
        caches.attributes.insert(key, Arc::clone(&resolved));
    }

    Ok(resolved)
}

/// Apply explicit style overrides to a copy of `defaults`.
///
/// Returns `None` when the symbolizer sets no override or no shape is
/// visible, in which case the defaults are used unchanged.
pub fn apply_overrides(
    defaults: &[PathAttributes],
    properties: &StyleProperties,
    feature: &Feature,
) -> MarkerResult<Option<Vec<PathAttributes>>> {
    let fill = properties.get_color(PropertyKey::Fill, feature)?;
    let fill_opacity = properties.get_optional_f64(PropertyKey::FillOpacity, feature)?;
    let stroke = properties.get_color(PropertyKey::Stroke, feature)?;
    let stroke_width = properties.get_optional_f64(PropertyKey::StrokeWidth, feature)?;
    let stroke_opacity = properties.get_optional_f64(PropertyKey::StrokeOpacity, feature)?;

    if fill.is_none()
        && fill_opacity.is_none()
        && stroke.is_none()
        && stroke_width.is_none()
        && stroke_opacity.is_none()
    {
        return Ok(None);
    }

    let mut any_visible = false;
    let mut custom = defaults.to_vec();

    for attr in custom.iter_mut().filter(|a| a.visible) {
        any_visible = true;

        if !attr.stroke_none {
            if let Some(width) = stroke_width {
                attr.stroke_width = width;
                attr.stroke_enabled = true;
            }
            if let Some(color) = stroke {
                attr.stroke = Paint::Color(color);
                attr.stroke_enabled = true;
            }
            if let Some(opacity) = stroke_opacity {
                attr.stroke_opacity = opacity;
                attr.stroke_enabled = true;
            }
        }

        if !attr.fill_none {
            if let Some(color) = fill {
                attr.fill = Paint::Color(color);
                attr.fill_enabled = true;
            }
            if let Some(opacity) = fill_opacity {
                attr.fill_opacity = opacity;
                attr.fill_enabled = true;
            }
        }
    }

    Ok(any_visible.then_some(custom))
}
