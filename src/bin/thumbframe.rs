//! Provides the `thumbframe` tool for rendering auto-framed model thumbnails.
//!
//! Usage: `thumbframe <model_file> [--output DIR] [--config FILE] [--asset-root DIR] [--layers FILE]`
//!
//! Writes `{model}_Thumbnail.png` next to the input file, or into the
//! generated-images folder of the asset root when one is given.
//! Supports glTF/GLB and Wavefront OBJ.
//!
//! # Examples
//! ```text
//! thumbframe crate.glb --output thumbnails
//! ```

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use thumbframe::assets::default_output_dir;
use thumbframe::layers::LayerRegistry;
use thumbframe::{formats, logging, ThumbnailConfig, ThumbnailGenerator, ThumbnailImage};

#[derive(Parser)]
#[command(
    name = "thumbframe",
    about = "Render an auto-framed PNG thumbnail of a 3D model",
    version
)]
struct Cli {
    /// Model file to render (.gltf, .glb, .obj)
    model: PathBuf,

    /// Directory the thumbnail is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON5 configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project asset root; thumbnails written inside it are re-indexed
    #[arg(long)]
    asset_root: Option<PathBuf>,

    /// Layer registry file, created or updated with the isolation layer
    #[arg(long)]
    layers: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ThumbnailConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => ThumbnailConfig::default(),
    };
    if cli.asset_root.is_some() {
        config.asset_root = cli.asset_root.clone();
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    logging::init_logging(&config.logging);

    if !cli.model.exists() {
        fail(format!("file not found: {}", cli.model.display()));
    }

    let mut model = formats::load_model_from_path(&cli.model).unwrap_or_else(|e| fail(e));
    tracing::info!(
        model = %cli.model.display(),
        triangles = model.triangle_count(),
        "Loaded model"
    );

    let layers = match &cli.layers {
        Some(path) => LayerRegistry::load(path).unwrap_or_else(|e| fail(e)),
        None => LayerRegistry::default(),
    };

    let output_dir = output_dir(&cli, &config);
    let mut generator = ThumbnailGenerator::new(config).with_layers(layers);

    let thumbnail = match generator.capture_and_save(&mut model.scene, Some(model.root), &output_dir) {
        Ok(Some(thumbnail)) => thumbnail,
        Ok(None) => fail("failed to render thumbnail (see log for details)"),
        Err(e) => fail(e),
    };

    if let Some(path) = &cli.layers {
        if let Err(e) = generator.layers().save(path) {
            tracing::warn!(error = %e, path = %path.display(), "Could not save layer registry");
        }
    }

    match &thumbnail.image {
        ThumbnailImage::Asset { asset_path, .. } => eprintln!("Saved {}", asset_path),
        ThumbnailImage::Rendered(_) => eprintln!("Saved {}", thumbnail.path.display()),
    }
}

/// Explicit output, then the asset root's generated folder, then the model's folder.
fn output_dir(cli: &Cli, config: &ThumbnailConfig) -> PathBuf {
    if let Some(dir) = &cli.output {
        return dir.clone();
    }
    if let Some(root) = &config.asset_root {
        return default_output_dir(root);
    }
    cli.model
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}
