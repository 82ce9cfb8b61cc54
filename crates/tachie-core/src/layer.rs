//! Layer descriptors and the small closed vocabularies that describe them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    geometry::{Point, Size},
    identifier::LayerId,
};

/// Size variant of a character archetype.
///
/// Each archetype ships a separate layer set per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariant {
    S,
    M,
    L,
    LL,
}

impl SizeVariant {
    pub const ALL: [SizeVariant; 4] = [Self::S, Self::M, Self::L, Self::LL];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "s",
            Self::M => "m",
            Self::L => "l",
            Self::LL => "ll",
        }
    }
}

impl FromStr for SizeVariant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s" => Ok(Self::S),
            "m" => Ok(Self::M),
            "l" => Ok(Self::L),
            "ll" => Ok(Self::LL),
            _ => Err(ModelError::UnknownSizeVariant(s.to_string())),
        }
    }
}

impl fmt::Display for SizeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classification of a layer, used to pick a default placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Costume,
    Expression,
    Accessory,
    Custom,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::Costume,
        Self::Expression,
        Self::Accessory,
        Self::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Costume => "costume",
            Self::Expression => "expression",
            Self::Accessory => "accessory",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor information recorded when an imported layer was placed.
///
/// `anchor_x`/`anchor_y` are fractions of the image size; the image's top-left
/// corner sits at `(x - width * anchor_x, y - height * anchor_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPoint {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
}

impl AlignmentPoint {
    /// A centered anchor at `position` with unit scale.
    pub fn centered(position: Point) -> Self {
        Self {
            x: position.x(),
            y: position.y(),
            scale: 1.0,
            anchor_x: 0.5,
            anchor_y: 0.5,
        }
    }

    /// Top-left corner of an image of `size` placed on this anchor.
    pub fn top_left(&self, size: Size) -> Point {
        Point::new(
            self.x - size.width() * self.anchor_x,
            self.y - size.height() * self.anchor_y,
        )
    }
}

/// One selectable layer: where it sits inside the character and how large it is.
///
/// Catalog layers are built once when the catalog is loaded; custom layers are
/// built when an image is imported into an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    id: LayerId,
    name: String,
    position: Point,
    size: Size,
    has_image: bool,
    custom: bool,
    source_path: Option<String>,
    category: Option<Category>,
    z_order_hint: Option<i32>,
    alignment_point: Option<AlignmentPoint>,
}

impl LayerDescriptor {
    /// Creates a descriptor with an image, no hint and no recorded alignment.
    ///
    /// The `custom` flag follows the id variant.
    pub fn new(id: LayerId, name: impl Into<String>, position: Point, size: Size) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            size,
            has_image: true,
            custom: id.is_custom(),
            source_path: None,
            category: None,
            z_order_hint: None,
            alignment_point: None,
        }
    }

    pub fn with_has_image(mut self, has_image: bool) -> Self {
        self.has_image = has_image;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_z_order_hint(mut self, hint: i32) -> Self {
        self.z_order_hint = Some(hint);
        self
    }

    pub fn with_alignment_point(mut self, point: AlignmentPoint) -> Self {
        self.alignment_point = Some(point);
        self
    }

    /// Returns a copy of this descriptor under another id.
    pub fn with_id(mut self, id: LayerId) -> Self {
        self.id = id;
        self.custom = id.is_custom();
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-left corner relative to the character's local origin
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// False when the catalog lists the layer but ships no image for it
    pub fn has_image(&self) -> bool {
        self.has_image
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn z_order_hint(&self) -> Option<i32> {
        self.z_order_hint
    }

    pub fn alignment_point(&self) -> Option<&AlignmentPoint> {
        self.alignment_point.as_ref()
    }
}
