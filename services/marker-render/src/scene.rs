//! Scene files: what to draw and where.
//!
//! A scene is a JSON document naming the output size, the map extent, extra
//! markers to register and a list of layers. Each layer pairs one marker
//! symbolizer with the features it is applied to.
//!
//! ```json
//! {
//!   "width": 256, "height": 256,
//!   "extent": { "min_x": 0, "min_y": 0, "max_x": 256, "max_y": 256 },
//!   "markers": [{ "name": "pin", "svg": "<svg ...>" }],
//!   "layers": [{
//!     "name": "stations",
//!     "symbolizer": { "file": "pin", "fill": "[color]" },
//!     "features": [{ "id": 1, "geometry": { "type": "Point", "coordinates": [10, 20] } }]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use map_common::{BoundingBox, Color, Feature, StyleProperties};
use marker_renderer::{
    IdentityProjection, LabelCollisionDetector, MarkerCatalog, MarkerRenderer, RenderContext,
    ViewTransform,
};
use serde::Deserialize;
use tiny_skia::Pixmap;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub extent: BoundingBox,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Background colour; transparent when absent.
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub markers: Vec<MarkerSource>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

fn default_scale_factor() -> f64 {
    1.0
}

/// A marker registered under `name`, given inline or as a file.
#[derive(Debug, Deserialize)]
pub struct MarkerSource {
    pub name: String,
    #[serde(default)]
    pub svg: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub name: String,
    pub symbolizer: StyleProperties,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Totals over one scene render.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneStats {
    pub features: usize,
    pub placements: usize,
    pub rejected: usize,
    pub skipped: usize,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid scene {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text)?;
        if scene.width == 0 || scene.height == 0 {
            bail!("Scene size must be non-zero, got {}x{}", scene.width, scene.height);
        }
        if scene.scale_factor <= 0.0 {
            bail!("Scale factor must be positive, got {}", scene.scale_factor);
        }
        Ok(scene)
    }

    /// Register the scene's own markers; relative paths resolve against
    /// `base_dir`.
    pub fn register_markers(&self, catalog: &MarkerCatalog, base_dir: &Path) -> Result<()> {
        for source in &self.markers {
            match (&source.svg, &source.path) {
                (Some(svg), _) => {
                    catalog
                        .insert_svg(&source.name, svg)
                        .with_context(|| format!("Marker '{}'", source.name))?;
                }
                (None, Some(path)) => {
                    let path = base_dir.join(path);
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read marker {}", path.display()))?;
                    let is_svg = path
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("svg"))
                        .unwrap_or(false);
                    if is_svg {
                        let text = String::from_utf8(bytes)
                            .with_context(|| format!("Marker {} is not UTF-8", path.display()))?;
                        catalog.insert_svg(&source.name, &text)?;
                    } else {
                        catalog.insert_image(&source.name, &bytes)?;
                    }
                }
                (None, None) => bail!("Marker '{}' has neither svg nor path", source.name),
            }
            debug!(name = %source.name, "Registered scene marker");
        }
        Ok(())
    }

    /// Draw every layer in order. All layers share one collision detector.
    pub fn render(&self, renderer: &MarkerRenderer) -> Result<(Pixmap, SceneStats)> {
        let mut target = Pixmap::new(self.width, self.height)
            .with_context(|| format!("Cannot allocate {}x{} image", self.width, self.height))?;
        if let Some(background) = &self.background {
            target.fill(Color::parse(background)?.to_skia(1.0));
        }

        let view = ViewTransform::new(self.width, self.height, self.extent);
        let mut detector = LabelCollisionDetector::new(view.screen_box());
        let mut stats = SceneStats::default();

        for layer in &self.layers {
            let mut ctx = RenderContext {
                target: &mut target,
                view: &view,
                projection: &IdentityProjection,
                clip_box: self.extent,
                scale_factor: self.scale_factor,
                detector: &mut detector,
            };
            let before = stats;
            for feature in &layer.features {
                let outcome = renderer
                    .render(&mut ctx, &layer.symbolizer, feature)
                    .with_context(|| format!("Layer '{}', feature {}", layer.name, feature.id))?;
                stats.features += 1;
                stats.placements += outcome.placements;
                stats.rejected += outcome.rejected;
                stats.skipped += usize::from(outcome.skipped);
            }
            info!(
                layer = %layer.name,
                features = layer.features.len(),
                placements = stats.placements - before.placements,
                rejected = stats.rejected - before.rejected,
                "Rendered layer"
            );
        }

        Ok((target, stats))
    }
}
