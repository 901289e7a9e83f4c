//! Marker render tool.
//!
//! Renders a JSON scene of marker symbolizers and features to a PNG.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use marker_renderer::png::encode_pixmap;
use marker_renderer::{MarkerCacheConfig, MarkerCaches, MarkerCatalog, MarkerRenderer};

mod scene;

use scene::Scene;

#[derive(Parser, Debug)]
#[command(name = "marker-render")]
#[command(about = "Render map markers from a scene file to PNG")]
struct Args {
    /// Scene file (JSON)
    scene: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = "markers.png", env = "MARKER_OUTPUT")]
    output: PathBuf,

    /// Directory for relative marker file names (defaults to the scene's directory)
    #[arg(long, env = "MARKER_DIR")]
    marker_dir: Option<PathBuf>,

    /// Render the scene this many times with the same caches
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// Disable all marker caches
    #[arg(long)]
    no_cache: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "MARKER_JSON_LOGS")]
    json_logs: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let mut config = MarkerCacheConfig::from_env();
    if args.no_cache {
        config.enabled = false;
    }
    config.validate()?;

    let scene = Scene::load(&args.scene)?;
    let base_dir = args
        .marker_dir
        .clone()
        .or_else(|| args.scene.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let catalog = MarkerCatalog::new().with_base_dir(&base_dir);
    scene.register_markers(&catalog, &base_dir)?;
    let renderer = MarkerRenderer::new(Arc::new(catalog), Arc::new(MarkerCaches::new(&config)));

    info!(
        scene = %args.scene.display(),
        width = scene.width,
        height = scene.height,
        layers = scene.layers.len(),
        caches = config.enabled,
        "Rendering scene"
    );

    let mut image = None;
    for pass in 0..args.repeat.max(1) {
        let start = Instant::now();
        let (pixmap, stats) = scene.render(&renderer)?;
        info!(
            pass,
            features = stats.features,
            placements = stats.placements,
            rejected = stats.rejected,
            skipped = stats.skipped,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Render pass complete"
        );
        image = Some(pixmap);
    }

    let caches = renderer.caches();
    for (name, stats) in [
        ("attributes", caches.attributes.stats()),
        ("ellipses", caches.ellipses.stats()),
        ("images", caches.images.stats()),
    ] {
        info!(
            cache = name,
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            hit_rate = stats.hit_rate(),
            "Cache statistics"
        );
    }

    let image = image.context("No render pass ran")?;
    let png = encode_pixmap(&image)?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), bytes = png.len(), "Wrote PNG");

    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if args.json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}
