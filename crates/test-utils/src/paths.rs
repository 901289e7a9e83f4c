//! Path utilities for locating marker assets and test data.
//!
//! Tests find marker files in three kinds of places: an explicit
//! `TEST_DATA_DIR`, per-crate `testdata/` directories, and the renderer's
//! bundled `assets/` directory (the SVGs behind the `shape://` markers).
//! Markers written on the fly go into a temporary directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// This is determined by walking up from the current crate's manifest directory
/// until we find the workspace Cargo.toml.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the path to the testdata directory for a specific crate.
///
/// # Arguments
///
/// * `crate_name` - The name of the crate (e.g., "marker-renderer")
///
/// # Returns
///
/// The path to `crates/{crate_name}/testdata/`
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join(crate_name)
        .join("testdata")
}

/// Returns the directory holding the renderer's built-in marker SVGs.
pub fn marker_assets_dir() -> PathBuf {
    workspace_root()
        .join("crates")
        .join("marker-renderer")
        .join("assets")
}

/// Searches for a marker or test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `crates/marker-renderer/testdata/`
/// 3. `crates/marker-renderer/assets/`
/// 4. `testdata/` at the workspace root
///
/// # Arguments
///
/// * `name` - The filename to search for (e.g., "arrow.svg")
///
/// # Returns
///
/// `Some(PathBuf)` if the file is found, `None` otherwise.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    candidates.extend([
        crate_testdata_dir("marker-renderer").join(name),
        marker_assets_dir().join(name),
        workspace_root().join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.is_file())
}

/// Writes a marker file into `dir` and returns its path.
///
/// # Arguments
///
/// * `dir` - Directory the catalog will resolve relative names against
/// * `name` - File name, used as-is as the marker's catalog name
/// * `contents` - SVG source or encoded image bytes
pub fn write_marker_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write marker file");
    path
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
