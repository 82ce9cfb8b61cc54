//! Export of composed scenes.
//!
//! This module provides the [`Exporter`] trait that turns a [`Frame`], the
//! draw list of a scene at one resolution, into an output file.
//!
//! # Available Backends
//!
//! - [`raster`]: PNG and JPEG output via [`raster::RasterExporter`]
//! - [`svg`]: SVG output via [`svg::SvgExporter`], referencing image files
//!
//! # Error Handling
//!
//! Export operations return [`Error`], covering encoder failures and I/O
//! errors. [`Error`] converts into [`TachieError::Export`] at the crate
//! boundary.
//!
//! [`TachieError::Export`]: crate::TachieError::Export

/// Raster export backend.
pub mod raster;
/// SVG export backend.
pub mod svg;

use std::{fmt, str::FromStr};

use tachie_core::{bitmap::DecodedImage, color::Color, geometry::Size};

use crate::compositor::DrawItem;

/// Everything an exporter paints, already projected to output pixels.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Output size in pixels
    pub canvas: Size,
    /// Fill beneath everything; transparent when absent
    pub fill: Option<Color>,
    /// Stretched over the whole canvas before any item
    pub background: Option<&'a DecodedImage>,
    /// Back to front
    pub items: &'a [DrawItem],
}

/// Abstraction for export backends.
pub trait Exporter {
    /// Writes one frame to the backend's output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the frame cannot be converted to the
    /// target format, or [`Error::Io`] if writing the output fails.
    fn export_frame(&mut self, frame: &Frame<'_>) -> Result<(), Error>;
}

/// Resolution multiplier of an export.
///
/// # Examples
///
/// ```
/// use tachie::export::ExportScale;
///
/// let scale: ExportScale = "3".parse().unwrap();
/// assert_eq!(scale.factor(), 3.0);
/// assert!("5".parse::<ExportScale>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExportScale {
    #[default]
    X1,
    X2,
    X3,
    X4,
}

impl ExportScale {
    pub const ALL: [ExportScale; 4] = [Self::X1, Self::X2, Self::X3, Self::X4];

    pub fn factor(self) -> f32 {
        match self {
            Self::X1 => 1.0,
            Self::X2 => 2.0,
            Self::X3 => 3.0,
            Self::X4 => 4.0,
        }
    }
}

impl TryFrom<u8> for ExportScale {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::X1),
            2 => Ok(Self::X2),
            3 => Ok(Self::X3),
            4 => Ok(Self::X4),
            other => Err(format!("export scale must be 1, 2, 3 or 4, got {other}")),
        }
    }
}

impl FromStr for ExportScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim_end_matches(['x', 'X'])
            .parse()
            .map_err(|_| format!("invalid export scale `{s}`"))?;
        Self::try_from(value)
    }
}

impl fmt::Display for ExportScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// Errors that can occur during export.
///
/// This type is converted into [`TachieError::Export`] at the crate
/// boundary via the [`From`] implementation in [`crate::error`].
///
/// [`TachieError::Export`]: crate::TachieError::Export
#[derive(Debug)]
pub enum Error {
    /// An encoder or format failure described by `message`.
    Encode(String),
    /// An I/O error encountered while writing output.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "Encode error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(_) => None,
            Self::Io(err) => Some(err),
        }
    }
}
