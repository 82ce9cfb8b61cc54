//! SVG export.
//!
//! The document references image files instead of embedding pixels: every
//! draw item becomes an `<image>` whose `href` is the file it was decoded
//! from. Consecutive items of one instance share a `<g data-instance>` group.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use ::svg::{Document, node::element as svg_element};
use log::{debug, error, info, warn};

use tachie_core::{bitmap::DecodedImage, identifier::InstanceId};

use crate::{
    compositor::{DrawItem, DrawSource},
    export::{self, Frame},
};

/// Writes frames as SVG documents.
#[derive(Debug, Clone)]
pub struct SvgExporter {
    file_name: PathBuf,
}

impl SvgExporter {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Builds the document for a frame.
    pub fn render(frame: &Frame<'_>) -> Document {
        let (width, height) = (frame.canvas.width(), frame.canvas.height());
        let mut doc = Document::new()
            .set("viewBox", format!("0 0 {width} {height}"))
            .set("width", width)
            .set("height", height);

        if let Some(color) = frame.fill {
            doc = doc.add(
                svg_element::Rectangle::new()
                    .set("width", width)
                    .set("height", height)
                    .set("fill", color.to_string()),
            );
        }

        if let Some(background) = frame.background {
            match image_element(background, 0.0, 0.0, width, height) {
                Some(element) => doc = doc.add(element.set("preserveAspectRatio", "none")),
                None => warn!("Background has no source file, leaving it out of the SVG"),
            }
        }

        let mut current: Option<(InstanceId, svg_element::Group)> = None;
        for item in frame.items {
            let Some(element) = item_element(item) else {
                continue;
            };

            current = match current {
                Some((instance, group)) if instance == item.instance() => {
                    Some((instance, group.add(element)))
                }
                previous => {
                    if let Some((_, group)) = previous {
                        doc = doc.add(group);
                    }
                    let group = svg_element::Group::new()
                        .set("data-instance", item.instance().to_string())
                        .add(element);
                    Some((item.instance(), group))
                }
            };
        }
        if let Some((_, group)) = current {
            doc = doc.add(group);
        }

        doc
    }

    /// Writes an SVG document to the configured file.
    pub fn write_document(&self, doc: &Document) -> Result<(), export::Error> {
        info!(file_name:? = self.file_name; "Creating SVG file");
        let mut f = match File::create(&self.file_name) {
            Ok(file) => file,
            Err(err) => {
                error!(file_name:? = self.file_name, err:err; "Failed to create SVG file");
                return Err(export::Error::Io(err));
            }
        };

        if let Err(err) = write!(f, "{doc}") {
            error!(file_name:? = self.file_name, err:err; "Failed to write SVG content");
            return Err(export::Error::Io(err));
        }

        Ok(())
    }
}

impl export::Exporter for SvgExporter {
    fn export_frame(&mut self, frame: &Frame<'_>) -> Result<(), export::Error> {
        let doc = Self::render(frame);
        debug!(items = frame.items.len(); "SVG document rendered");

        self.write_document(&doc)
    }
}

fn item_element(item: &DrawItem) -> Option<svg_element::Image> {
    let position = item.position();
    let size = item.scaled_size();
    let Some(element) = image_element(
        item.image(),
        position.x(),
        position.y(),
        size.width(),
        size.height(),
    ) else {
        debug!(instance:% = item.instance(); "Skipping draw item without a source file");
        return None;
    };

    let element = match item.source() {
        DrawSource::Layer(id) => element.set("data-layer", i64::from(*id)),
        DrawSource::Component(name) => element.set("data-component", name.as_str()),
    };
    Some(element)
}

fn image_element(
    image: &DecodedImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Option<svg_element::Image> {
    let origin = image.origin().map(Path::to_string_lossy)?;
    Some(
        svg_element::Image::new()
            .set("href", origin.into_owned())
            .set("x", x)
            .set("y", y)
            .set("width", width)
            .set("height", height),
    )
}
