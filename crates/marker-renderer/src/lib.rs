//! Marker symbolizer placement and rendering.
//!
//! Draws vector (SVG) and raster markers at positions derived from feature
//! geometry:
//! - Marker catalog with built-in `shape://` markers
//! - Vertex conversion (clip, transform, offset, simplify, smooth)
//! - Point, line, interior and vertex placement with collision checks
//! - Attribute, procedural ellipse and sub-image caches
//! - PNG encoding of the framebuffer

pub mod attributes;
pub mod cache;
pub mod catalog;
pub mod collision;
pub mod compositor;
pub mod config;
pub mod converter;
pub mod dispatch;
pub mod ellipse;
pub mod interior;
pub mod marker;
pub mod placement;
pub mod png;
pub mod svg;
pub mod view;

pub use cache::{CacheStats, MarkerCaches};
pub use catalog::{MarkerCatalog, ELLIPSE_URI};
pub use collision::{CollisionDetector, LabelCollisionDetector};
pub use compositor::{GammaMethod, RenderParams};
pub use config::MarkerCacheConfig;
pub use converter::{ConverterStage, VertexConverter};
pub use dispatch::{MarkerRenderer, RenderContext, RenderOutcome};
pub use ellipse::EllipseKey;
pub use interior::{InteriorPoint, PolylabelInterior};
pub use marker::{MarkerDefinition, MarkerId, PathAttributes, RasterMarker, VectorMarker};
pub use placement::{Direction, Placement, PlacementMethod, PlacementParams};
pub use view::{IdentityProjection, Projection, ViewTransform};
