//! The read-only layer catalog.
//!
//! The catalog maps every character archetype and size variant to the layers
//! that can be selected for it. It is decoded once from its JSON form:
//!
//! ```json
//! {
//!   "hero": {
//!     "layer_mapping": {
//!       "m": {
//!         "body": [
//!           { "layer_id": 0, "name": "base", "position": [0, 0], "size": [400, 900], "has_image": true }
//!         ]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Groups keep their file order. Size keys that are not a known
//! [`SizeVariant`] are skipped with a warning, and duplicate layer ids inside
//! one archetype/size are rejected.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    geometry::{Point, Size},
    identifier::LayerId,
    layer::{LayerDescriptor, SizeVariant},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("character `{0}` not found in catalog")]
    UnknownArchetype(String),

    #[error("character `{archetype}` has no `{size}` layers")]
    UnknownSize {
        archetype: String,
        size: SizeVariant,
    },

    #[error("malformed catalog record for `{archetype}`: {reason}")]
    Malformed { archetype: String, reason: String },

    #[error("cannot read catalog `{}`: {cause}", path.display())]
    Unreadable { path: PathBuf, cause: String },
}

#[derive(Debug, Deserialize)]
struct LayerEntry {
    layer_id: i64,
    name: String,
    position: Point,
    size: Size,
    #[serde(default = "default_has_image")]
    has_image: bool,
}

fn default_has_image() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ArchetypeEntry {
    #[serde(default)]
    layer_mapping: IndexMap<String, IndexMap<String, Vec<LayerEntry>>>,
}

type CatalogDocument = IndexMap<String, ArchetypeEntry>;

/// The layers available for one archetype at one size variant.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    groups: IndexMap<String, Vec<LayerId>>,
    layers: IndexMap<LayerId, LayerDescriptor>,
}

impl LayerSet {
    /// Group names with the layer ids they contain, in catalog order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[LayerId])> {
        self.groups
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerDescriptor> {
        self.layers.get(&id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// All layers in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Archetype {
    variants: IndexMap<SizeVariant, LayerSet>,
}

/// Mapping from (archetype, size variant) to selectable layers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "CatalogDocument")]
pub struct LayerCatalog {
    archetypes: IndexMap<String, Archetype>,
}

impl LayerCatalog {
    /// Archetype names in catalog order.
    pub fn archetype_names(&self) -> impl Iterator<Item = &str> {
        self.archetypes.keys().map(String::as_str)
    }

    /// Size variants the archetype ships layers for.
    pub fn sizes(&self, archetype: &str) -> Result<Vec<SizeVariant>, CatalogError> {
        self.archetype(archetype)
            .map(|entry| entry.variants.keys().copied().collect())
    }

    /// Returns the layer set of one archetype at one size.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownArchetype`] or [`CatalogError::UnknownSize`]
    /// if the combination is not in the catalog.
    pub fn layers(&self, archetype: &str, size: SizeVariant) -> Result<&LayerSet, CatalogError> {
        self.archetype(archetype)?
            .variants
            .get(&size)
            .ok_or_else(|| CatalogError::UnknownSize {
                archetype: archetype.to_string(),
                size,
            })
    }

    /// Looks up one layer, returning `None` if any part of the key is unknown.
    pub fn lookup(
        &self,
        archetype: &str,
        size: SizeVariant,
        id: LayerId,
    ) -> Option<&LayerDescriptor> {
        self.layers(archetype, size).ok()?.get(id)
    }

    pub fn contains_archetype(&self, archetype: &str) -> bool {
        self.archetypes.contains_key(archetype)
    }

    /// Image file of a catalog layer: `<dir>/<archetype>_<size>_<layer_id>.png`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tachie_core::{catalog::LayerCatalog, identifier::LayerId, layer::SizeVariant};
    ///
    /// let path = LayerCatalog::asset_path(Path::new("cr_data_png"), "hero", SizeVariant::M, LayerId::Catalog(3));
    /// assert_eq!(path, Path::new("cr_data_png/hero_m_3.png"));
    /// ```
    pub fn asset_path(dir: &Path, archetype: &str, size: SizeVariant, layer: LayerId) -> PathBuf {
        dir.join(format!("{archetype}_{size}_{}.png", i64::from(layer)))
    }

    fn archetype(&self, archetype: &str) -> Result<&Archetype, CatalogError> {
        self.archetypes
            .get(archetype)
            .ok_or_else(|| CatalogError::UnknownArchetype(archetype.to_string()))
    }
}

impl TryFrom<CatalogDocument> for LayerCatalog {
    type Error = CatalogError;

    fn try_from(document: CatalogDocument) -> Result<Self, Self::Error> {
        let mut archetypes = IndexMap::with_capacity(document.len());

        for (name, entry) in document {
            let mut variants = IndexMap::new();

            for (size_key, groups) in entry.layer_mapping {
                let Ok(size) = size_key.parse::<SizeVariant>() else {
                    warn!(archetype = name.as_str(), size = size_key.as_str(); "Skipping unknown size variant");
                    continue;
                };

                let mut set = LayerSet::default();
                for (group, entries) in groups {
                    let mut ids = Vec::with_capacity(entries.len());
                    for entry in entries {
                        let id = catalog_layer_id(&name, entry.layer_id)?;
                        if set.layers.contains_key(&id) {
                            return Err(CatalogError::Malformed {
                                archetype: name,
                                reason: format!("duplicate layer id {id} in size `{size}`"),
                            });
                        }
                        let descriptor =
                            LayerDescriptor::new(id, entry.name, entry.position, entry.size)
                                .with_has_image(entry.has_image);
                        set.layers.insert(id, descriptor);
                        ids.push(id);
                    }
                    set.groups.insert(group, ids);
                }
                variants.insert(size, set);
            }

            archetypes.insert(name, Archetype { variants });
        }

        Ok(Self { archetypes })
    }
}

fn catalog_layer_id(archetype: &str, raw: i64) -> Result<LayerId, CatalogError> {
    match LayerId::try_from(raw) {
        Ok(id @ LayerId::Catalog(_)) => Ok(id),
        _ => Err(CatalogError::Malformed {
            archetype: archetype.to_string(),
            reason: format!("layer id {raw} is not a valid catalog id"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "hero": {
            "layer_mapping": {
                "m": {
                    "body": [
                        {"layer_id": 0, "name": "base", "position": [0, 0], "size": [400, 900], "has_image": true},
                        {"layer_id": 2, "name": "arm", "position": [-50, 200], "size": [100, 300], "has_image": false}
                    ],
                    "face": [
                        {"layer_id": 1, "name": "smile", "position": [150, 80], "size": [100, 60]}
                    ]
                },
                "xxl": {}
            }
        }
    }"#;

    #[test]
    fn test_parse_catalog() {
        let catalog: LayerCatalog = serde_json::from_str(CATALOG).unwrap();

        assert_eq!(catalog.archetype_names().collect::<Vec<_>>(), vec!["hero"]);
        assert_eq!(catalog.sizes("hero").unwrap(), vec![SizeVariant::M]);

        let set = catalog.layers("hero", SizeVariant::M).unwrap();
        assert_eq!(set.len(), 3);
        let groups: Vec<_> = set.groups().map(|(name, _)| name).collect();
        assert_eq!(groups, vec!["body", "face"]);

        let arm = set.get(LayerId::Catalog(2)).unwrap();
        assert_eq!(arm.name(), "arm");
        assert_eq!(arm.position(), Point::new(-50.0, 200.0));
        assert!(!arm.has_image());

        let smile = catalog
            .lookup("hero", SizeVariant::M, LayerId::Catalog(1))
            .unwrap();
        assert!(smile.has_image());
        assert!(!smile.is_custom());
    }

    #[test]
    fn test_unknown_archetype_and_size() {
        let catalog: LayerCatalog = serde_json::from_str(CATALOG).unwrap();

        assert_eq!(
            catalog.layers("villain", SizeVariant::M).unwrap_err(),
            CatalogError::UnknownArchetype("villain".to_string())
        );
        assert!(matches!(
            catalog.layers("hero", SizeVariant::LL),
            Err(CatalogError::UnknownSize { .. })
        ));
        assert!(
            catalog
                .lookup("hero", SizeVariant::M, LayerId::Catalog(99))
                .is_none()
        );
    }

    #[test]
    fn test_duplicate_layer_id_rejected() {
        let json = r#"{"hero": {"layer_mapping": {"s": {
            "a": [{"layer_id": 1, "name": "x", "position": [0, 0], "size": [1, 1]}],
            "b": [{"layer_id": 1, "name": "y", "position": [0, 0], "size": [1, 1]}]
        }}}}"#;

        let err = serde_json::from_str::<LayerCatalog>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate layer id"));
    }

    #[test]
    fn test_negative_layer_id_rejected() {
        let json = r#"{"hero": {"layer_mapping": {"s": {
            "a": [{"layer_id": -1, "name": "x", "position": [0, 0], "size": [1, 1]}]
        }}}}"#;

        assert!(serde_json::from_str::<LayerCatalog>(json).is_err());
    }
}
