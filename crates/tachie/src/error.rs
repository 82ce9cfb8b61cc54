//! Error types for Tachie operations.
//!
//! This module provides the main error type [`TachieError`] which wraps
//! the error conditions that can occur while composing, loading, saving and
//! exporting scenes.

use std::{io, path::PathBuf};

use thiserror::Error;

use tachie_core::{ModelError, catalog::CatalogError};

/// The main error type for Tachie operations.
#[derive(Debug, Error)]
pub enum TachieError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid operation: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to process `{}`: {cause}", path.display())]
    Persistence { path: PathBuf, cause: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<crate::export::Error> for TachieError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}

impl TachieError {
    /// Create a new `Persistence` error for the file at `path`.
    pub fn persistence(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}
