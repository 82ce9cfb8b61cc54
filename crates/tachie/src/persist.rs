//! Scene files and character records.
//!
//! Two persisted shapes exist:
//!
//! - [`SceneFile`] stores every instance by layer id only. Layers are
//!   resolved against the catalog again on load; ids the catalog no longer
//!   has are dropped and reported in [`SceneLoad::dropped`].
//! - [`InstanceRecord`] stores one instance in full, including custom layers
//!   and custom components, so it can be moved between scenes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use tachie_core::{
    ModelError,
    catalog::LayerCatalog,
    component::{CustomComponent, CustomComponentSet},
    geometry::{Point, Size},
    identifier::{InstanceId, LayerId},
    instance::CharacterInstance,
    layer::{AlignmentPoint, Category, LayerDescriptor, SizeVariant},
};

use crate::{compositor::SceneCompositor, error::TachieError};

fn default_scale() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// The saved scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    /// Background file name; empty when none is set
    #[serde(default)]
    pub background: String,

    #[serde(default)]
    pub characters: Vec<CharacterRecord>,
}

/// One instance inside a [`SceneFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub character_name: String,
    pub size: SizeVariant,
    #[serde(default)]
    pub x_offset: f32,
    #[serde(default)]
    pub y_offset: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Position in the file when absent
    #[serde(default)]
    pub z_order: Option<i32>,
    /// Selected layer ids
    #[serde(default)]
    pub layers: Vec<LayerId>,
    /// Draw order; the order of `layers` when absent
    #[serde(default)]
    pub layer_order: Option<Vec<LayerId>>,
}

/// A layer id that a loaded scene referenced but the catalog lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedLayer {
    pub instance: InstanceId,
    pub layer: LayerId,
}

/// Result of rebuilding a [`SceneFile`].
#[derive(Debug, Clone, Default)]
pub struct SceneLoad {
    pub background: Option<String>,
    pub instances: Vec<CharacterInstance>,
    pub dropped: Vec<DroppedLayer>,
}

impl SceneFile {
    /// Records the current scene, instances in insertion order.
    pub fn capture(compositor: &SceneCompositor) -> Self {
        let characters = compositor
            .instances()
            .map(|instance| {
                let transform = instance.transform();
                CharacterRecord {
                    character_name: instance.archetype().to_string(),
                    size: instance.size(),
                    x_offset: transform.offset().x(),
                    y_offset: transform.offset().y(),
                    scale: transform.scale(),
                    visible: instance.visible(),
                    z_order: Some(instance.z_order()),
                    layers: instance.active_layers().map(LayerDescriptor::id).collect(),
                    layer_order: Some(instance.draw_order().to_vec()),
                }
            })
            .collect();

        Self {
            background: compositor
                .background()
                .map(|background| background.name().to_string())
                .unwrap_or_default(),
            characters,
        }
    }

    /// Rebuilds every instance against `catalog`.
    ///
    /// Instances get fresh ids. An archetype or size the catalog does not
    /// know yields an instance without layers.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] for an invalid transform; nothing is built in
    /// that case.
    pub fn restore(&self, catalog: &LayerCatalog) -> Result<SceneLoad, ModelError> {
        let mut load = SceneLoad {
            background: Some(self.background.clone()).filter(|name| !name.is_empty()),
            ..SceneLoad::default()
        };

        for (index, record) in self.characters.iter().enumerate() {
            let z_order = record
                .z_order
                .unwrap_or_else(|| i32::try_from(index).unwrap_or(i32::MAX));
            let mut instance = CharacterInstance::new(&record.character_name, record.size, z_order);
            instance.set_offset(Point::new(record.x_offset, record.y_offset))?;
            instance.set_scale(record.scale)?;
            instance.set_visible(record.visible);

            let mut descriptors = Vec::with_capacity(record.layers.len());
            for &id in &record.layers {
                match catalog.lookup(&record.character_name, record.size, id) {
                    Some(descriptor) => descriptors.push(descriptor.clone()),
                    None => load.dropped.push(DroppedLayer {
                        instance: instance.id(),
                        layer: id,
                    }),
                }
            }
            let order = record.layer_order.as_ref().unwrap_or(&record.layers);
            instance.restore_layers(descriptors, order.iter().copied());

            load.instances.push(instance);
        }

        if !load.dropped.is_empty() {
            warn!(count = load.dropped.len(); "Scene references layers missing from the catalog");
        }
        Ok(load)
    }
}

/// Full record of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: String,
    /// Display name at export time
    #[serde(default)]
    pub name: String,
    pub character_name: String,
    pub size: SizeVariant,
    #[serde(default)]
    pub x_offset: f32,
    #[serde(default)]
    pub y_offset: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub layer_order: Vec<LayerId>,
    /// Descriptors keyed by the layer id written as a string
    #[serde(default)]
    pub composition_layers: IndexMap<String, LayerRecord>,
    #[serde(default)]
    pub custom_components: ComponentsRecord,
}

/// A layer descriptor as stored in an [`InstanceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Used when the map key is not an integer
    #[serde(default)]
    pub layer_id: Option<LayerId>,
    pub name: String,
    pub position: Point,
    pub size: Size,
    #[serde(default = "default_true")]
    pub has_image: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_order_hint: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_point: Option<AlignmentPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentsRecord {
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    pub image_path: PathBuf,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl From<&LayerDescriptor> for LayerRecord {
    fn from(layer: &LayerDescriptor) -> Self {
        Self {
            layer_id: Some(layer.id()),
            name: layer.name().to_string(),
            position: layer.position(),
            size: layer.size(),
            has_image: layer.has_image(),
            custom: layer.is_custom(),
            source_path: layer.source_path().map(str::to_string),
            category: layer.category(),
            z_order_hint: layer.z_order_hint(),
            alignment_point: layer.alignment_point().copied(),
        }
    }
}

impl LayerRecord {
    fn to_descriptor(&self, id: LayerId) -> LayerDescriptor {
        let mut descriptor = LayerDescriptor::new(id, &self.name, self.position, self.size)
            .with_has_image(self.has_image);
        if let Some(path) = &self.source_path {
            descriptor = descriptor.with_source_path(path);
        }
        if let Some(category) = self.category {
            descriptor = descriptor.with_category(category);
        }
        if let Some(hint) = self.z_order_hint {
            descriptor = descriptor.with_z_order_hint(hint);
        }
        if let Some(point) = self.alignment_point {
            descriptor = descriptor.with_alignment_point(point);
        }
        descriptor
    }
}

impl From<&CustomComponent> for ComponentRecord {
    fn from(component: &CustomComponent) -> Self {
        Self {
            name: component.name().to_string(),
            image_path: component.source_path().to_path_buf(),
            x: component.position().x(),
            y: component.position().y(),
            scale: component.scale(),
            z_index: component.z_index(),
            visible: component.visible(),
        }
    }
}

impl ComponentsRecord {
    pub fn capture(components: &CustomComponentSet) -> Self {
        Self {
            components: components.iter().map(ComponentRecord::from).collect(),
        }
    }

    /// Rebuilds the set; decoded images are not part of the record.
    pub fn restore(&self) -> Result<CustomComponentSet, ModelError> {
        let components = self
            .components
            .iter()
            .map(|record| {
                CustomComponent::new(&record.name, &record.image_path, record.z_index)
                    .with_position(Point::new(record.x, record.y))
                    .with_visible(record.visible)
                    .with_scale(record.scale)
            })
            .collect::<Result<Vec<_>, _>>()?;
        CustomComponentSet::restore(components)
    }
}

impl InstanceRecord {
    pub fn capture(instance: &CharacterInstance) -> Self {
        let transform = instance.transform();
        Self {
            instance_id: instance.id().to_string(),
            name: instance.display_name(),
            character_name: instance.archetype().to_string(),
            size: instance.size(),
            x_offset: transform.offset().x(),
            y_offset: transform.offset().y(),
            scale: transform.scale(),
            visible: instance.visible(),
            z_order: instance.z_order(),
            layer_order: instance.draw_order().to_vec(),
            composition_layers: instance
                .active_layers()
                .map(|layer| (i64::from(layer.id()).to_string(), LayerRecord::from(layer)))
                .collect(),
            custom_components: ComponentsRecord::capture(instance.components()),
        }
    }

    /// Rebuilds the instance from its stored descriptors.
    ///
    /// The stored id is kept when it parses; otherwise a fresh one is
    /// generated. Layers whose key is not an integer fall back to the id
    /// embedded in the record and are skipped if that is missing too.
    pub fn restore(&self) -> Result<CharacterInstance, ModelError> {
        let id = InstanceId::parse(&self.instance_id).unwrap_or_else(|| {
            debug!(instance_id = self.instance_id.as_str(); "Unparseable instance id, generating a new one");
            InstanceId::generate()
        });
        let mut instance = CharacterInstance::with_id(id, &self.character_name, self.size, self.z_order);
        instance.set_offset(Point::new(self.x_offset, self.y_offset))?;
        instance.set_scale(self.scale)?;
        instance.set_visible(self.visible);

        let mut descriptors = Vec::with_capacity(self.composition_layers.len());
        for (key, record) in &self.composition_layers {
            let layer_id = key
                .parse::<i64>()
                .ok()
                .and_then(|value| LayerId::try_from(value).ok())
                .or(record.layer_id);
            match layer_id {
                Some(layer_id) => descriptors.push(record.to_descriptor(layer_id)),
                None => warn!(key = key.as_str(); "Skipping layer record without a usable id"),
            }
        }
        instance.restore_layers(descriptors, self.layer_order.iter().copied());
        instance.restore_components(self.custom_components.restore()?);
        Ok(instance)
    }
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns [`TachieError::Persistence`] naming the file on read or parse failure.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TachieError> {
    let content = fs::read_to_string(path).map_err(|err| TachieError::persistence(path, err))?;
    serde_json::from_str(&content).map_err(|err| TachieError::persistence(path, err))
}

/// Writes a value as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`TachieError::Persistence`] naming the file on encode or write failure.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TachieError> {
    let content =
        serde_json::to_string_pretty(value).map_err(|err| TachieError::persistence(path, err))?;
    fs::write(path, content).map_err(|err| TachieError::persistence(path, err))
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn catalog() -> LayerCatalog {
        serde_json::from_str(
            r#"{"hero": {"layer_mapping": {"m": {
                "body": [
                    {"layer_id": 0, "name": "base", "position": [0, 0], "size": [400, 900]},
                    {"layer_id": 1, "name": "arm", "position": [-50, 200], "size": [100, 300]}
                ],
                "face": [
                    {"layer_id": 2, "name": "eyes", "position": [150, 100], "size": [100, 40]},
                    {"layer_id": 3, "name": "mouth", "position": [170, 160], "size": [60, 20], "has_image": false}
                ]
            }}}}"#,
        )
        .unwrap()
    }

    fn scene_with_two_instances(catalog: &LayerCatalog) -> SceneCompositor {
        let mut compositor = SceneCompositor::default();
        let layers = catalog.layers("hero", SizeVariant::M).unwrap();

        let first = compositor.add_instance("hero", SizeVariant::M);
        let instance = compositor.get_mut(first).unwrap();
        for id in [2, 0, 1] {
            instance.select_from(layers, LayerId::Catalog(id)).unwrap();
        }
        instance.set_offset(Point::new(-120.0, 35.5)).unwrap();
        instance.set_scale(0.75).unwrap();

        let second = compositor.add_instance("hero", SizeVariant::M);
        let instance = compositor.get_mut(second).unwrap();
        instance.select_from(layers, LayerId::Catalog(3)).unwrap();
        instance.set_visible(false);
        compositor
    }

    #[test]
    fn test_scene_round_trip() {
        let catalog = catalog();
        let compositor = scene_with_two_instances(&catalog);

        let json = serde_json::to_string(&SceneFile::capture(&compositor)).unwrap();
        let file: SceneFile = serde_json::from_str(&json).unwrap();
        let load = file.restore(&catalog).unwrap();

        assert!(load.dropped.is_empty());
        assert!(load.background.is_none());
        let originals: Vec<_> = compositor.instances().collect();
        assert_eq!(load.instances.len(), originals.len());
        for (restored, original) in load.instances.iter().zip(originals) {
            assert_ne!(restored.id(), original.id());
            assert_eq!(restored.draw_order(), original.draw_order());
            assert_eq!(
                restored.active_layers().map(LayerDescriptor::id).collect::<Vec<_>>(),
                original.active_layers().map(LayerDescriptor::id).collect::<Vec<_>>()
            );
            assert_eq!(restored.transform(), original.transform());
            assert_eq!(restored.visible(), original.visible());
            assert_eq!(restored.z_order(), original.z_order());
        }
    }

    #[test]
    fn test_missing_layers_are_dropped_and_reported() {
        let file: SceneFile = serde_json::from_str(
            r#"{"background": "park.png", "characters": [
                {"character_name": "hero", "size": "m", "layers": [1, 9, 0], "layer_order": [9, 0, 1]},
                {"character_name": "ghost", "size": "s", "layers": [4]}
            ]}"#,
        )
        .unwrap();
        let load = file.restore(&catalog()).unwrap();

        assert_eq!(load.background.as_deref(), Some("park.png"));
        assert_eq!(
            load.instances[0].draw_order(),
            [LayerId::Catalog(0), LayerId::Catalog(1)]
        );
        assert_eq!(load.instances[0].z_order(), 0);
        assert_eq!(load.instances[1].z_order(), 1);
        assert!(load.instances[1].draw_order().is_empty());

        let dropped: Vec<_> = load.dropped.iter().map(|d| d.layer).collect();
        assert_eq!(dropped, [LayerId::Catalog(9), LayerId::Catalog(4)]);
        assert_eq!(load.dropped[1].instance, load.instances[1].id());
    }

    #[test]
    fn test_scene_defaults() {
        let file: SceneFile =
            serde_json::from_str(r#"{"characters": [{"character_name": "hero", "size": "ll"}]}"#)
                .unwrap();
        let record = &file.characters[0];
        assert_approx_eq!(f32, record.scale, 1.0);
        assert!(record.visible);
        assert!(record.layer_order.is_none());
    }

    #[test]
    fn test_invalid_scale_rejects_whole_scene() {
        let file: SceneFile = serde_json::from_str(
            r#"{"characters": [
                {"character_name": "hero", "size": "m"},
                {"character_name": "hero", "size": "m", "scale": 0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            file.restore(&catalog()).unwrap_err(),
            ModelError::InvalidScale(0.0)
        );
    }

    #[test]
    fn test_instance_record_round_trip() {
        let catalog = catalog();
        let mut compositor = scene_with_two_instances(&catalog);
        let id = compositor.instances().next().unwrap().id();
        let instance = compositor.get_mut(id).unwrap();
        let custom = instance.insert_custom_layer(
            LayerDescriptor::new(LayerId::Custom(0), "halo", Point::new(0.0, -200.0), Size::new(80.0, 20.0))
                .with_source_path("halo.png")
                .with_category(Category::Accessory)
                .with_z_order_hint(5),
            None,
        );
        instance
            .components_mut()
            .add("badge", "badge.png", None)
            .unwrap()
            .set_position(Point::new(10.0, 20.0));

        let record = InstanceRecord::capture(instance);
        assert!(record.composition_layers.contains_key("-1"));

        let json = serde_json::to_string_pretty(&record).unwrap();
        let restored = serde_json::from_str::<InstanceRecord>(&json)
            .unwrap()
            .restore()
            .unwrap();

        assert_eq!(restored.id(), instance.id());
        assert_eq!(restored.draw_order(), instance.draw_order());
        assert_eq!(restored.layer(custom), instance.layer(custom));
        let badge = restored.components().get("badge").unwrap();
        assert_eq!(badge.position(), Point::new(10.0, 20.0));
        assert_eq!(badge.z_index(), 10000);
        assert_eq!(restored.components().next_z_index(), 10001);
    }

    #[test]
    fn test_instance_record_key_fallback() {
        let record: InstanceRecord = serde_json::from_str(
            r#"{"instance_id": "not-a-uuid", "character_name": "hero", "size": "m",
                "layer_order": [-2, 1],
                "composition_layers": {
                    "1": {"name": "arm", "position": [0, 0], "size": [1, 1]},
                    "custom": {"layer_id": -2, "name": "wing", "position": [5, 5], "size": [2, 2]},
                    "junk": {"name": "lost", "position": [0, 0], "size": [1, 1]}
                }}"#,
        )
        .unwrap();
        let instance = record.restore().unwrap();

        assert_eq!(instance.draw_order(), [LayerId::Custom(2), LayerId::Catalog(1)]);
        assert!(instance.layer(LayerId::Custom(2)).unwrap().is_custom());
    }

    #[test]
    fn test_json_helpers_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");

        let err = read_json::<SceneFile>(&path).unwrap_err();
        assert!(matches!(err, TachieError::Persistence { path: p, .. } if p == path));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_json::<SceneFile>(&path),
            Err(TachieError::Persistence { .. })
        ));

        let file = SceneFile {
            background: "bg.png".to_string(),
            characters: Vec::new(),
        };
        write_json(&path, &file).unwrap();
        assert_eq!(read_json::<SceneFile>(&path).unwrap(), file);
    }
}
