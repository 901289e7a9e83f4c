//! Marker catalog: named, interned marker definitions.
//!
//! The catalog starts with the built-in `shape://` markers. Other markers
//! are registered explicitly or loaded lazily from disk the first time a
//! file path is looked up.

use image::GenericImageView;
use map_common::{MarkerError, MarkerResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::marker::{MarkerDefinition, RasterMarker, VectorMarker};
use crate::svg::parse_svg;

/// Pseudo-name of the default (and procedurally sizable) ellipse marker.
pub const ELLIPSE_URI: &str = "shape://ellipse";

/// Built-in SVG markers (name, document)
const BUILTIN_MARKERS: &[(&str, &str)] = &[
    (ELLIPSE_URI, include_str!("../assets/ellipse.svg")),
    ("shape://arrow", include_str!("../assets/arrow.svg")),
    ("shape://square", include_str!("../assets/square.svg")),
];

/// Thread-safe registry of marker definitions keyed by name or URI.
#[derive(Debug, Default)]
pub struct MarkerCatalog {
    markers: RwLock<HashMap<String, MarkerDefinition>>,
    base_dir: Option<PathBuf>,
}

impl MarkerCatalog {
    /// A catalog holding the built-in `shape://` markers.
    pub fn new() -> Self {
        let catalog = Self::empty();
        for (name, svg) in BUILTIN_MARKERS {
            if let Err(e) = catalog.insert_svg(name, svg) {
                warn!(name = %name, error = %e, "Failed to load built-in marker");
            }
        }
        catalog
    }

    /// A catalog with no markers at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve relative file names against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Whether `name` is a URI (`scheme://...`) rather than a file path.
    pub fn is_uri(name: &str) -> bool {
        name.contains("://")
    }

    /// Look up a marker, loading it from disk if `name` is an unregistered
    /// file path.
    ///
    /// # Arguments
    ///
    /// * `name` - Registered name, `shape://` URI, or a file path resolved
    ///   against the base directory
    ///
    /// # Returns
    ///
    /// The marker definition. `AssetNotFound` for unknown URIs and missing
    /// files, `AssetLoad` when a file exists but cannot be decoded.
    pub fn find(&self, name: &str) -> MarkerResult<MarkerDefinition> {
        if let Some(marker) = self.get(name) {
            return Ok(marker);
        }
        if Self::is_uri(name) {
            return Err(MarkerError::AssetNotFound(name.to_string()));
        }

        let path = self.resolve_path(name);
        if !path.is_file() {
            return Err(MarkerError::AssetNotFound(name.to_string()));
        }
        self.load_file_as(name, &path)
    }

    /// Look up an already registered marker.
    pub fn get(&self, name: &str) -> Option<MarkerDefinition> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse and register an SVG document.
    pub fn insert_svg(&self, name: &str, svg: &str) -> MarkerResult<MarkerDefinition> {
        let marker = parse_svg(name, svg)?;
        Ok(self.insert(name, MarkerDefinition::from(marker)))
    }

    /// Decode and register a raster image (any format `image` can read).
    pub fn insert_image(&self, name: &str, bytes: &[u8]) -> MarkerResult<MarkerDefinition> {
        let pixmap = decode_image(name, bytes)?;
        Ok(self.insert(name, MarkerDefinition::from(RasterMarker::new(pixmap))))
    }

    pub fn insert_vector(&self, name: &str, marker: VectorMarker) -> MarkerDefinition {
        self.insert(name, MarkerDefinition::from(marker))
    }

    pub fn insert_pixmap(&self, name: &str, pixmap: tiny_skia::Pixmap) -> MarkerDefinition {
        self.insert(name, MarkerDefinition::from(RasterMarker::new(pixmap)))
    }

    /// Register a placeholder that renders nothing.
    pub fn insert_null(&self, name: &str) -> MarkerDefinition {
        self.insert(name, MarkerDefinition::Null)
    }

    /// Load a marker file, registering it under its path.
    pub fn load_file(&self, path: impl AsRef<Path>) -> MarkerResult<MarkerDefinition> {
        let path = path.as_ref();
        self.load_file_as(&path.to_string_lossy(), path)
    }

    fn load_file_as(&self, name: &str, path: &Path) -> MarkerResult<MarkerDefinition> {
        let bytes = std::fs::read(path).map_err(|e| MarkerError::AssetLoad {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false);

        if is_svg {
            let text = String::from_utf8(bytes).map_err(|e| MarkerError::AssetLoad {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            self.insert_svg(name, &text)
        } else {
            self.insert_image(name, &bytes)
        }
    }

    fn insert(&self, name: &str, marker: MarkerDefinition) -> MarkerDefinition {
        debug!(name = %name, "Registered marker");
        let mut markers = self.markers.write().unwrap_or_else(|e| e.into_inner());
        markers.insert(name.to_string(), marker.clone());
        marker
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, MarkerDefinition>> {
        self.markers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve_path(&self, name: &str) -> PathBuf {
        let path = PathBuf::from(name);
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }
}

/// Decode image bytes into a premultiplied pixmap.
fn decode_image(name: &str, bytes: &[u8]) -> MarkerResult<tiny_skia::Pixmap> {
    let load_error = |message: String| MarkerError::AssetLoad {
        name: name.to_string(),
        message,
    };

    let img = image::load_from_memory(bytes).map_err(|e| load_error(e.to_string()))?;
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| load_error(format!("invalid image size {}x{}", width, height)))?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_builtins_are_seeded() {
        let catalog = MarkerCatalog::new();
        assert!(catalog.contains(ELLIPSE_URI));
        assert!(catalog.contains("shape://arrow"));
        assert!(catalog.contains("shape://square"));

        match catalog.find(ELLIPSE_URI).unwrap() {
            MarkerDefinition::Vector(marker) => {
                let bbox = marker.bounding_box();
                assert_eq!((bbox.width(), bbox.height()), (10.0, 10.0));
            }
            other => panic!("Expected vector ellipse, got {:?}", other),
        }
    }

    #[test]
    fn test_lookups_share_definitions() {
        let catalog = MarkerCatalog::new();
        let (a, b) = match (catalog.find("shape://arrow"), catalog.find("shape://arrow")) {
            (Ok(MarkerDefinition::Vector(a)), Ok(MarkerDefinition::Vector(b))) => (a, b),
            _ => panic!("Expected vector markers"),
        };
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_names() {
        let catalog = MarkerCatalog::new();
        let err = catalog.find("shape://star").unwrap_err();
        assert!(matches!(err, MarkerError::AssetNotFound(_)));

        let err = catalog.find("/definitely/not/here.svg").unwrap_err();
        assert!(err.is_feature_skippable());
    }

    #[test]
    fn test_is_uri() {
        assert!(MarkerCatalog::is_uri("shape://ellipse"));
        assert!(MarkerCatalog::is_uri("image://pin"));
        assert!(!MarkerCatalog::is_uri("icons/pin.svg"));
    }

    #[test]
    fn test_insert_pixmap_and_null() {
        let catalog = MarkerCatalog::empty();
        assert!(catalog.is_empty());

        catalog.insert_pixmap("dot", tiny_skia::Pixmap::new(3, 3).unwrap());
        catalog.insert_null("nothing");
        assert!(matches!(catalog.get("dot"), Some(MarkerDefinition::Raster(_))));
        assert!(catalog.get("nothing").unwrap().is_null());
        assert_eq!(catalog.names(), vec!["dot".to_string(), "nothing".to_string()]);
    }

    #[test]
    fn test_bad_image_bytes() {
        let catalog = MarkerCatalog::empty();
        let err = catalog.insert_image("junk.png", b"not an image").unwrap_err();
        assert!(matches!(err, MarkerError::AssetLoad { .. }));
    }
}
