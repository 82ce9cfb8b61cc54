//! Configuration types for the Tachie compositor.
//!
//! This module provides configuration structures that control where the
//! catalog and assets live, how large the canvas is and how export fills it.
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! TOML file; every field has a default.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level application configuration.
//! - [`CatalogConfig`] - Location of the layer catalog and its images.
//! - [`CanvasConfig`] - Default canvas size and the background directory.
//! - [`StyleConfig`] - Export fill color.
//! - [`LoaderConfig`] - Decode queue bound.
//! - [`AlignmentConfig`] - Optional learned alignment table.
//!
//! # Example
//!
//! ```
//! # use tachie::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.canvas().width(), 1920);
//! assert!(config.style().background_color().unwrap().is_none());
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use tachie_core::{color::Color, geometry::Size};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    catalog: CatalogConfig,

    #[serde(default)]
    canvas: CanvasConfig,

    #[serde(default)]
    style: StyleConfig,

    #[serde(default)]
    loader: LoaderConfig,

    #[serde(default)]
    alignment: AlignmentConfig,
}

impl AppConfig {
    pub fn catalog(&self) -> &CatalogConfig {
        &self.catalog
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn loader(&self) -> &LoaderConfig {
        &self.loader
    }

    pub fn alignment(&self) -> &AlignmentConfig {
        &self.alignment
    }

    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Where the layer catalog and the layer images are read from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog JSON file.
    path: PathBuf,

    /// Directory holding `<archetype>_<size>_<layer_id>.png` files.
    asset_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("character_analysis.json"),
            asset_dir: PathBuf::from("cr_data_png"),
        }
    }
}

impl CatalogConfig {
    pub fn new(path: impl Into<PathBuf>, asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            asset_dir: asset_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }
}

/// Canvas used when no background image fixes the size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    width: u32,
    height: u32,

    /// Directory background names are resolved against.
    background_dir: PathBuf,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            background_dir: PathBuf::from("backgrounds"),
        }
    }
}

impl CanvasConfig {
    pub fn new(width: u32, height: u32, background_dir: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            background_dir: background_dir.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Default canvas size as a [`Size`].
    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }

    pub fn background_dir(&self) -> &Path {
        &self.background_dir
    }
}

/// Visual styling configuration for exported images.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    /// Fill beneath everything, as a color string. Unset means transparent.
    #[serde(default)]
    background_color: Option<String>,
}

impl StyleConfig {
    pub fn new(background_color: Option<String>) -> Self {
        Self { background_color }
    }

    /// Returns the parsed background [`Color`], or `None` if no color is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color string cannot be parsed
    /// into a valid [`Color`].
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }
}

/// Decode worker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of decode tasks that may wait in the queue.
    queue_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

impl LoaderConfig {
    pub fn new(queue_capacity: usize) -> Self {
        Self { queue_capacity }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

/// Alignment advisor settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlignmentConfig {
    /// JSON file with a learned alignment table, loaded when it exists.
    #[serde(default)]
    table_path: Option<PathBuf>,
}

impl AlignmentConfig {
    pub fn new(table_path: Option<PathBuf>) -> Self {
        Self { table_path }
    }

    pub fn table_path(&self) -> Option<&Path> {
        self.table_path.as_deref()
    }
}
