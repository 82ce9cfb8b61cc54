//! CLI logic for the Tachie scene exporter.
//!
//! Loads a saved scene against the layer catalog and writes it as an image.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::path::Path;

use log::{debug, info, warn};

use tachie::{Composer, TachieError, config::CatalogConfig};

/// Run the Tachie CLI application
///
/// Loads the configuration and catalog, rebuilds the scene, waits until
/// every layer image is decoded and exports the result.
///
/// # Errors
///
/// Returns `TachieError` for:
/// - Configuration loading errors
/// - Catalog or scene files that cannot be read
/// - Export errors
pub fn run(args: &Args) -> Result<(), TachieError> {
    info!(
        input_path = args.input,
        output_path = args.output,
        scale:% = args.scale;
        "Processing scene"
    );

    let mut app_config = config::load_config(args.config.as_deref().map(Path::new))?;
    if let Some(catalog) = &args.catalog {
        let asset_dir = app_config.catalog().asset_dir().to_path_buf();
        app_config = app_config.with_catalog(CatalogConfig::new(catalog, asset_dir));
    }

    let mut composer = Composer::open(app_config)?;
    let dropped = composer.load_scene(Path::new(&args.input))?;
    if !dropped.is_empty() {
        warn!(count = dropped.len(); "Scene references layers missing from the catalog");
    }

    let applied = composer.wait_idle();
    debug!(applied; "Scene images decoded");

    composer.export(&args.output, args.scale)?;

    info!(output_file = args.output; "Scene exported successfully");

    Ok(())
}
