//! Initial placement of imported overlay images.
//!
//! [`AlignmentAdvisor`] guesses what an imported image is from its label and
//! pixel size, picks a zone inside that category and returns a starting
//! position in the character's local space.
//!
//! Two sources of positions exist:
//!
//! - An [`ArchetypeProfile`], the average catalog position of layers of the
//!   same archetype/size whose names match the category. Used when available.
//! - The [`AlignmentTable`], a per category/zone anchor table relative to the
//!   character center. The image is centered on the anchor.
//!
//! Manual corrections feed back through [`AlignmentAdvisor::learn`], which
//! returns a new table instead of mutating the current one.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use tachie_core::{
    catalog::LayerSet,
    geometry::{Point, Size},
    layer::{AlignmentPoint, Category},
};

/// Zone every category falls back to
pub const DEFAULT_ZONE: &str = "default";

/// Weight of a new observation in [`AlignmentAdvisor::learn`]
const LEARNING_RATE: f32 = 0.2;

const COSTUME_LABELS: &[&str] = &[
    "服装", "衣服", "上衣", "下装", "裙子", "裤子", "外套", "内衣", "costume", "clothes", "dress",
    "shirt", "pants", "coat",
];
const EXPRESSION_LABELS: &[&str] = &[
    "表情", "眼睛", "眉毛", "嘴巴", "笑容", "哭泣", "愤怒", "expression", "eyes", "eyebrows",
    "mouth", "smile", "cry",
];
const ACCESSORY_LABELS: &[&str] = &[
    "配饰", "装饰", "帽子", "耳环", "项链", "手镯", "发饰", "accessory", "decoration", "hat",
    "earring", "necklace", "bracelet",
];

const COSTUME_LAYER_NAMES: &[&str] = &["服", "衣", "裙", "裤", "袖", "领"];
const EXPRESSION_LAYER_NAMES: &[&str] = &["眼", "眉", "嘴", "笑", "哭", "怒", "表情"];
const ACCESSORY_LAYER_NAMES: &[&str] = &["饰", "带", "环", "链", "帽", "花"];

type ZoneRule = (&'static [&'static str], &'static str);

const COSTUME_ZONES: &[ZoneRule] = &[
    (&["帽", "头", "hat", "head"], "head"),
    (&["面", "脸", "face", "mask"], "face"),
    (&["胸", "chest", "top"], "chest"),
    (&["腰", "waist", "belt"], "waist"),
    (&["腿", "leg", "pants", "skirt"], "legs"),
];
const EXPRESSION_ZONES: &[ZoneRule] = &[
    (&["眼", "eye"], "eyes"),
    (&["眉", "brow"], "eyebrows"),
    (&["嘴", "mouth", "lip"], "mouth"),
    (&["脸", "cheek"], "cheeks"),
];
const ACCESSORY_ZONES: &[ZoneRule] = &[
    (&["发", "hair"], "hair"),
    (&["耳", "ear"], "ear"),
    (&["颈", "neck"], "neck"),
    (&["手", "hand"], "hand"),
    (&["腕", "wrist"], "wrist"),
    (&["背", "back"], "back"),
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Anchor offsets relative to the character center, per category and zone.
///
/// Serialized as `{"position_zones": {"<category>": {"<zone>": [x, y]}}}`.
/// Categories missing from a loaded file keep their built-in zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableFile", into = "TableFile")]
pub struct AlignmentTable {
    zones: IndexMap<Category, IndexMap<String, Point>>,
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    #[serde(default)]
    position_zones: IndexMap<Category, IndexMap<String, Point>>,
}

impl From<TableFile> for AlignmentTable {
    fn from(file: TableFile) -> Self {
        let mut table = Self::default();
        table.zones.extend(file.position_zones);
        table
    }
}

impl From<AlignmentTable> for TableFile {
    fn from(table: AlignmentTable) -> Self {
        Self {
            position_zones: table.zones,
        }
    }
}

impl Default for AlignmentTable {
    fn default() -> Self {
        let entries: [(Category, &[(&str, f32, f32)]); 4] = [
            (
                Category::Costume,
                &[
                    ("head", 0.0, -150.0),
                    ("face", 0.0, -50.0),
                    ("chest", 0.0, 20.0),
                    ("waist", 0.0, 80.0),
                    ("legs", 0.0, 150.0),
                    ("body", 0.0, 0.0),
                    (DEFAULT_ZONE, 0.0, 0.0),
                ],
            ),
            (
                Category::Expression,
                &[
                    ("eyes", 0.0, -80.0),
                    ("eyebrows", 0.0, -120.0),
                    ("mouth", 0.0, -20.0),
                    ("face", 0.0, -60.0),
                    ("cheeks", -30.0, -50.0),
                    (DEFAULT_ZONE, 0.0, -60.0),
                ],
            ),
            (
                Category::Accessory,
                &[
                    ("hair", 0.0, -180.0),
                    ("ear", -40.0, -100.0),
                    ("neck", 0.0, -20.0),
                    ("hand", -80.0, 50.0),
                    ("wrist", -60.0, 30.0),
                    ("back", 0.0, 10.0),
                    ("side", -100.0, 0.0),
                    (DEFAULT_ZONE, 0.0, -50.0),
                ],
            ),
            (Category::Custom, &[(DEFAULT_ZONE, 0.0, 0.0)]),
        ];

        let zones = entries
            .into_iter()
            .map(|(category, zones)| {
                let zones = zones
                    .iter()
                    .map(|(zone, x, y)| (zone.to_string(), Point::new(*x, *y)))
                    .collect();
                (category, zones)
            })
            .collect();
        Self { zones }
    }
}

impl AlignmentTable {
    /// Anchor of one zone, if the table has it
    pub fn get(&self, category: Category, zone: &str) -> Option<Point> {
        self.zones.get(&category)?.get(zone).copied()
    }

    /// Zones of a category with their anchors
    pub fn zones(&self, category: Category) -> impl Iterator<Item = (&str, Point)> {
        self.zones
            .get(&category)
            .into_iter()
            .flat_map(|zones| zones.iter().map(|(zone, point)| (zone.as_str(), *point)))
    }
}

/// Average catalog positions per category for one archetype/size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchetypeProfile {
    averages: HashMap<Category, Point>,
}

impl ArchetypeProfile {
    pub fn average(&self, category: Category) -> Option<Point> {
        self.averages.get(&category).copied()
    }
}

/// Input of [`AlignmentAdvisor::suggest`].
#[derive(Debug, Clone, Copy)]
pub struct SuggestRequest<'a> {
    /// File or layer name of the imported image
    pub label: &'a str,
    /// Pixel size of the imported image
    pub size: Size,
    /// Category chosen by the operator; inferred when absent
    pub category: Option<Category>,
    /// Positions of the target archetype's own layers
    pub profile: Option<&'a ArchetypeProfile>,
}

/// A suggested placement in the character's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub category: Category,
    pub zone: String,
    /// Top-left corner of the image
    pub position: Point,
    pub anchor: AlignmentPoint,
}

#[derive(Debug, Clone, Default)]
pub struct AlignmentAdvisor {
    table: AlignmentTable,
}

impl AlignmentAdvisor {
    pub fn new(table: AlignmentTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AlignmentTable {
        &self.table
    }

    /// Classifies an image by label keywords, then by pixel size.
    ///
    /// An empty label is always [`Category::Custom`].
    ///
    /// # Examples
    ///
    /// ```
    /// use tachie::alignment::AlignmentAdvisor;
    /// use tachie_core::{geometry::Size, layer::Category};
    ///
    /// assert_eq!(AlignmentAdvisor::infer_category("red_dress", Size::new(10.0, 10.0)), Category::Costume);
    /// assert_eq!(AlignmentAdvisor::infer_category("img", Size::new(50.0, 50.0)), Category::Accessory);
    /// assert_eq!(AlignmentAdvisor::infer_category("", Size::new(50.0, 50.0)), Category::Custom);
    /// assert_eq!(AlignmentAdvisor::infer_category("x", Size::new(250.0, 250.0)), Category::Custom);
    /// ```
    pub fn infer_category(label: &str, size: Size) -> Category {
        if label.is_empty() {
            return Category::Custom;
        }
        let label = label.to_lowercase();
        if contains_any(&label, COSTUME_LABELS) {
            return Category::Costume;
        }
        if contains_any(&label, EXPRESSION_LABELS) {
            return Category::Expression;
        }
        if contains_any(&label, ACCESSORY_LABELS) {
            return Category::Accessory;
        }

        let (width, height) = (size.width(), size.height());
        if width < 100.0 && height < 100.0 {
            Category::Accessory
        } else if width < 200.0 && height < 200.0 {
            Category::Expression
        } else if width > 300.0 || height > 300.0 {
            Category::Costume
        } else {
            Category::Custom
        }
    }

    /// Picks a zone inside the category from label keywords.
    pub fn infer_zone(label: &str, category: Category) -> &'static str {
        if label.is_empty() {
            return DEFAULT_ZONE;
        }
        let label = label.to_lowercase();
        let (rules, fallback): (&[ZoneRule], &str) = match category {
            Category::Costume => (COSTUME_ZONES, "body"),
            Category::Expression => (EXPRESSION_ZONES, "face"),
            Category::Accessory => (ACCESSORY_ZONES, DEFAULT_ZONE),
            Category::Custom => (&[], DEFAULT_ZONE),
        };
        rules
            .iter()
            .find(|(keywords, _)| contains_any(&label, keywords))
            .map_or(fallback, |(_, zone)| zone)
    }

    /// Anchor of a zone, falling back to the category default, then the center.
    pub fn base_offset(&self, category: Category, zone: &str) -> Point {
        self.table
            .get(category, zone)
            .or_else(|| self.table.get(category, DEFAULT_ZONE))
            .unwrap_or_default()
    }

    /// Small nudge for left/right and upper/lower keywords.
    pub fn name_based_adjustment(label: &str) -> Point {
        let label = label.to_lowercase();

        let dx = if contains_any(&label, &["左", "left", "l_"]) {
            -20.0
        } else if contains_any(&label, &["右", "right", "r_"]) {
            20.0
        } else {
            0.0
        };
        let dy = if contains_any(&label, &["上", "upper", "top"]) {
            -10.0
        } else if contains_any(&label, &["下", "lower", "bottom"]) {
            10.0
        } else {
            0.0
        };
        Point::new(dx, dy)
    }

    /// Blends an observed placement into a copy of the table.
    ///
    /// Only zones that already exist for the category are updated; other
    /// observations return an unchanged copy.
    pub fn learn(&self, category: Category, zone: &str, observed: Point) -> AlignmentTable {
        let mut table = self.table.clone();
        if let Some(anchor) = table
            .zones
            .get_mut(&category)
            .and_then(|zones| zones.get_mut(zone))
        {
            *anchor = anchor.blend(observed, LEARNING_RATE);
            debug!(category:% = category, zone = zone, x = anchor.x(), y = anchor.y(); "Alignment zone updated");
        }
        table
    }

    /// Averages catalog positions per category, matching layer names by keyword.
    pub fn profile(layers: &LayerSet) -> ArchetypeProfile {
        let mut sums: HashMap<Category, (Point, usize)> = HashMap::new();

        for layer in layers.iter() {
            let name = layer.name().to_lowercase();
            let category = if contains_any(&name, COSTUME_LAYER_NAMES) {
                Category::Costume
            } else if contains_any(&name, EXPRESSION_LAYER_NAMES) {
                Category::Expression
            } else if contains_any(&name, ACCESSORY_LAYER_NAMES) {
                Category::Accessory
            } else {
                continue;
            };

            let entry = sums.entry(category).or_insert((Point::default(), 0));
            entry.0 = entry.0.add_point(layer.position());
            entry.1 += 1;
        }

        let averages = sums
            .into_iter()
            .map(|(category, (sum, count))| (category, sum.scale(1.0 / count as f32)))
            .collect();
        ArchetypeProfile { averages }
    }

    /// Suggests a category, zone and top-left position for an imported image.
    pub fn suggest(&self, request: &SuggestRequest<'_>) -> Suggestion {
        let category = request
            .category
            .unwrap_or_else(|| Self::infer_category(request.label, request.size));
        let zone = Self::infer_zone(request.label, category).to_string();
        let adjustment = Self::name_based_adjustment(request.label);

        if let Some(average) = request.profile.and_then(|p| p.average(category)) {
            let position = average.add_point(adjustment);
            return Suggestion {
                category,
                zone,
                position,
                anchor: AlignmentPoint {
                    x: position.x(),
                    y: position.y(),
                    scale: 1.0,
                    anchor_x: 0.0,
                    anchor_y: 0.0,
                },
            };
        }

        let anchor =
            AlignmentPoint::centered(self.base_offset(category, &zone).add_point(adjustment));
        Suggestion {
            category,
            zone,
            position: anchor.top_left(request.size),
            anchor,
        }
    }
}
