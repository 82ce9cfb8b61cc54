//! Decoded pixel buffers shared between the model and the exporters.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbaImage;

use crate::geometry::Size;

/// An immutable RGBA image.
///
/// Clones share the same pixel buffer, so a decoded image can be held by an
/// instance and its duplicates without copying pixels.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: Arc<RgbaImage>,
    origin: Option<PathBuf>,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
            origin: None,
        }
    }

    /// Records the file the pixels were decoded from.
    pub fn with_origin(mut self, path: impl Into<PathBuf>) -> Self {
        self.origin = Some(path.into());
        self
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel dimensions as a [`Size`]
    pub fn size(&self) -> Size {
        Size::new(self.width() as f32, self.height() as f32)
    }

    /// True when both handles point at the same pixel buffer
    pub fn shares_pixels(&self, other: &DecodedImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl PartialEq for DecodedImage {
    fn eq(&self, other: &Self) -> bool {
        self.shares_pixels(other) || (self.origin == other.origin && self.pixels == other.pixels)
    }
}
