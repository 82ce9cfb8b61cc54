//! PNG and JPEG export.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use image::{
    ExtendedColorType, ImageEncoder, Rgba, RgbaImage,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
    imageops::{self, FilterType as ResizeFilter},
};
use log::{debug, error, info};

use crate::export::{self, Frame};

/// Largest pixel buffer a frame or a single resampled item may need.
pub const MAX_PIXELS: u64 = 16_384 * 16_384;

/// Encoders the raster exporter can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    /// Picks the format from a file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Paints a frame into a pixel buffer and writes it at maximum quality.
#[derive(Debug, Clone)]
pub struct RasterExporter {
    path: PathBuf,
    format: RasterFormat,
}

impl RasterExporter {
    /// Creates an exporter for `path`, choosing the encoder by extension.
    ///
    /// # Errors
    ///
    /// Returns [`export::Error::Encode`] for an extension other than
    /// `png`, `jpg` or `jpeg`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, export::Error> {
        let path = path.into();
        let format = RasterFormat::from_path(&path).ok_or_else(|| {
            export::Error::Encode(format!("unsupported raster format: {}", path.display()))
        })?;
        Ok(Self { path, format })
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    /// Paints `frame` back to front.
    ///
    /// # Errors
    ///
    /// Returns [`export::Error::Encode`] if the canvas or a resampled item
    /// would exceed [`MAX_PIXELS`].
    pub fn render(frame: &Frame<'_>) -> Result<RgbaImage, export::Error> {
        let width = pixel_extent(frame.canvas.width());
        let height = pixel_extent(frame.canvas.height());
        check_budget("canvas", width, height)?;
        let fill = frame
            .fill
            .map_or(Rgba([0, 0, 0, 0]), |color| Rgba(color.to_rgba8()));
        let mut canvas = RgbaImage::from_pixel(width, height, fill);

        if let Some(background) = frame.background {
            let stretched = resample(background.pixels(), width, height);
            imageops::overlay(&mut canvas, &stretched, 0, 0);
        }

        for item in frame.items {
            let size = item.scaled_size();
            let target_width = pixel_extent(size.width());
            let target_height = pixel_extent(size.height());
            check_budget("draw item", target_width, target_height)?;
            let position = item.position();

            let pixels = item.image().pixels();
            if (pixels.width(), pixels.height()) == (target_width, target_height) {
                imageops::overlay(
                    &mut canvas,
                    pixels,
                    position.x().floor() as i64,
                    position.y().floor() as i64,
                );
            } else {
                let resized = resample(pixels, target_width, target_height);
                imageops::overlay(
                    &mut canvas,
                    &resized,
                    position.x().floor() as i64,
                    position.y().floor() as i64,
                );
            }
        }
        Ok(canvas)
    }

    fn encode(&self, canvas: &RgbaImage) -> Result<(), export::Error> {
        let file = match File::create(&self.path) {
            Ok(file) => file,
            Err(err) => {
                error!(path:? = self.path, err:err; "Failed to create image file");
                return Err(export::Error::Io(err));
            }
        };
        let writer = BufWriter::new(file);

        let result = match self.format {
            RasterFormat::Png => {
                PngEncoder::new_with_quality(writer, CompressionType::Best, FilterType::Adaptive)
                    .write_image(
                        canvas.as_raw(),
                        canvas.width(),
                        canvas.height(),
                        ExtendedColorType::Rgba8,
                    )
            }
            RasterFormat::Jpeg => {
                let flattened = flatten_on_white(canvas);
                JpegEncoder::new_with_quality(writer, 100).write_image(
                    flattened.as_raw(),
                    flattened.width(),
                    flattened.height(),
                    ExtendedColorType::Rgb8,
                )
            }
        };

        result.map_err(|err| {
            error!(path:? = self.path, err:err; "Failed to encode image");
            match err {
                image::ImageError::IoError(err) => export::Error::Io(err),
                other => export::Error::Encode(other.to_string()),
            }
        })
    }
}

impl export::Exporter for RasterExporter {
    fn export_frame(&mut self, frame: &Frame<'_>) -> Result<(), export::Error> {
        info!(path:? = self.path, items = frame.items.len(); "Rendering raster export");
        let canvas = Self::render(frame).inspect_err(|err| {
            error!(path:? = self.path, err:err = *err; "Frame too large to render");
        })?;
        debug!(width = canvas.width(), height = canvas.height(); "Raster frame painted");

        self.encode(&canvas)
    }
}

/// Rounds a float extent to whole pixels, never below one.
fn pixel_extent(value: f32) -> u32 {
    value.round().max(1.0) as u32
}

fn check_budget(what: &str, width: u32, height: u32) -> Result<(), export::Error> {
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(export::Error::Encode(format!(
            "{what} of {width}x{height} pixels exceeds the {MAX_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

/// Lanczos3 when enlarging, Catmull-Rom when shrinking.
fn resample(pixels: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let enlarging = u64::from(width) * u64::from(height)
        > u64::from(pixels.width()) * u64::from(pixels.height());
    let filter = if enlarging {
        ResizeFilter::Lanczos3
    } else {
        ResizeFilter::CatmullRom
    };
    imageops::resize(pixels, width, height, filter)
}

/// JPEG has no alpha channel.
fn flatten_on_white(canvas: &RgbaImage) -> image::RgbImage {
    image::RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let Rgba([r, g, b, a]) = *canvas.get_pixel(x, y);
        let alpha = u32::from(a);
        let blend = |channel: u8| {
            ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use tachie_core::{
        bitmap::DecodedImage,
        color::Color,
        geometry::{Point, Size},
        identifier::LayerId,
        layer::{LayerDescriptor, SizeVariant},
    };

    use super::*;
    use crate::{compositor::SceneCompositor, export::Exporter};

    fn solid(width: u32, height: u32, pixel: [u8; 4]) -> DecodedImage {
        DecodedImage::new(RgbaImage::from_pixel(width, height, Rgba(pixel)))
    }

    fn compositor_with_square() -> SceneCompositor {
        let mut compositor = SceneCompositor::new(Size::new(20.0, 10.0));
        let id = compositor.add_instance("hero", SizeVariant::M);
        let instance = compositor.get_mut(id).unwrap();
        instance.select_layer(LayerDescriptor::new(
            LayerId::Catalog(0),
            "square",
            Point::new(-2.0, -2.0),
            Size::new(4.0, 4.0),
        ));
        instance.apply_decoded(LayerId::Catalog(0), solid(4, 4, [255, 0, 0, 255]));
        compositor
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RasterFormat::from_path(Path::new("a.PNG")), Some(RasterFormat::Png));
        assert_eq!(RasterFormat::from_path(Path::new("a.jpeg")), Some(RasterFormat::Jpeg));
        assert_eq!(RasterFormat::from_path(Path::new("a.gif")), None);
        assert!(RasterExporter::new("out.bmp").is_err());
    }

    #[test]
    fn test_render_places_items_around_center() {
        let compositor = compositor_with_square();
        let items = compositor.build_draw_list(1.0);
        let frame = Frame {
            canvas: compositor.canvas_size(),
            fill: None,
            background: None,
            items: &items,
        };
        let canvas = RasterExporter::render(&frame).unwrap();

        assert_eq!(canvas.dimensions(), (20, 10));
        assert_eq!(canvas.get_pixel(10, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(8, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(7, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_render_with_multiplier_and_fill() {
        let compositor = compositor_with_square();
        let items = compositor.build_draw_list(2.0);
        let frame = Frame {
            canvas: compositor.canvas_size().scale(2.0),
            fill: Some(Color::new("white").unwrap()),
            background: None,
            items: &items,
        };
        let canvas = RasterExporter::render(&frame).unwrap();

        assert_eq!(canvas.dimensions(), (40, 20));
        // The 4x4 square is now 8x8 with its top-left corner at (16, 6)
        let inside = canvas.get_pixel(19, 9);
        assert!(inside[0] >= 250 && inside[1] <= 5 && inside[3] >= 250);
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_background_is_stretched() {
        let background = solid(2, 1, [0, 0, 255, 255]);
        let frame = Frame {
            canvas: Size::new(6.0, 3.0),
            fill: None,
            background: Some(&background),
            items: &[],
        };
        let canvas = RasterExporter::render(&frame).unwrap();
        assert!(canvas.pixels().all(|pixel| pixel[2] > 200 && pixel[3] == 255));
    }

    #[test]
    fn test_export_writes_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = compositor_with_square();
        let items = compositor.build_draw_list(1.0);
        let frame = Frame {
            canvas: compositor.canvas_size(),
            fill: None,
            background: None,
            items: &items,
        };

        for name in ["out.png", "out.jpg"] {
            let path = dir.path().join(name);
            RasterExporter::new(&path).unwrap().export_frame(&frame).unwrap();
            let written = image::open(&path).unwrap();
            assert_eq!((written.width(), written.height()), (20, 10));
        }
    }

    #[test]
    fn test_oversized_frames_are_rejected() {
        let mut compositor = compositor_with_square();
        let id = compositor.instances().next().unwrap().id();
        compositor.get_mut(id).unwrap().set_scale(1.0e6).unwrap();
        let items = compositor.build_draw_list(1.0);
        let frame = Frame {
            canvas: compositor.canvas_size(),
            fill: None,
            background: None,
            items: &items,
        };
        let err = RasterExporter::render(&frame).unwrap_err();
        assert!(matches!(err, export::Error::Encode(_)));

        let huge_canvas = Frame {
            canvas: Size::new(100_000.0, 100_000.0),
            fill: None,
            background: None,
            items: &[],
        };
        assert!(RasterExporter::render(&huge_canvas).is_err());

        let dir = tempfile::tempdir().unwrap();
        let result = RasterExporter::new(dir.path().join("big.png"))
            .unwrap()
            .export_frame(&frame);
        assert!(matches!(result, Err(export::Error::Encode(_))));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let frame = Frame {
            canvas: Size::new(1.0, 1.0),
            fill: None,
            background: None,
            items: &[],
        };
        let err = RasterExporter::new(path).unwrap().export_frame(&frame).unwrap_err();
        assert!(matches!(err, export::Error::Io(_)));
    }
}
