//! Scene ownership and the global draw order.
//!
//! [`SceneCompositor`] owns every [`CharacterInstance`] in the scene together
//! with the background selection, and flattens them into one ordered list of
//! [`DrawItem`]s.
//!
//! # Draw order
//!
//! ```text
//! visible instances, ascending (z_order, instance id)
//!   └─ slots 0..=len(layer draw order)
//!        ├─ components whose clamp(z_index, 0, len) == slot, in z order
//!        └─ layer at index slot (if any), when its pixels are decoded
//! ```
//!
//! Positions are relative to the top-left of the output canvas:
//! `(local * instance_scale + offset) * multiplier + canvas_center`, where the
//! canvas center is half of the canvas size scaled by the multiplier.

use indexmap::IndexMap;
use log::debug;

use tachie_core::{
    ModelError,
    bitmap::DecodedImage,
    component::CustomComponent,
    geometry::{Point, Size},
    identifier::{InstanceId, LayerId},
    instance::CharacterInstance,
    layer::SizeVariant,
};

/// Canvas size used when no background fixes it
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(1920.0, 1080.0);

/// The selected background image.
///
/// Its size is unknown until the image has been decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    name: String,
    size: Option<Size>,
}

impl Background {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }
}

/// What a draw item was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawSource {
    Layer(LayerId),
    Component(String),
}

/// One image placed on the output canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    instance: InstanceId,
    source: DrawSource,
    image: DecodedImage,
    position: Point,
    scale: f32,
}

impl DrawItem {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn source(&self) -> &DrawSource {
        &self.source
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    /// Top-left corner on the output canvas
    pub fn position(&self) -> Point {
        self.position
    }

    /// Factor to apply to the image's pixel size
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Size of the image after scaling
    pub fn scaled_size(&self) -> Size {
        self.image.size().scale(self.scale)
    }
}

#[derive(Debug, Clone)]
pub struct SceneCompositor {
    instances: IndexMap<InstanceId, CharacterInstance>,
    background: Option<Background>,
    default_canvas: Size,
}

impl Default for SceneCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE)
    }
}

impl SceneCompositor {
    /// Creates an empty scene whose canvas falls back to `default_canvas`.
    pub fn new(default_canvas: Size) -> Self {
        Self {
            instances: IndexMap::new(),
            background: None,
            default_canvas,
        }
    }

    /// Instances in insertion order
    pub fn instances(&self) -> impl Iterator<Item = &CharacterInstance> {
        self.instances.values()
    }

    pub fn get(&self, id: InstanceId) -> Option<&CharacterInstance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut CharacterInstance> {
        self.instances.get_mut(&id)
    }

    /// Like [`SceneCompositor::get_mut`] but reports a missing instance as an error.
    pub fn instance_mut(&mut self, id: InstanceId) -> Result<&mut CharacterInstance, ModelError> {
        self.instances
            .get_mut(&id)
            .ok_or(ModelError::UnknownInstance(id))
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// One above the highest z-order in the scene, or 0 when empty.
    pub fn next_z_order(&self) -> i32 {
        self.instances
            .values()
            .map(|instance| instance.z_order().saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Adds a fresh instance on top of every other instance.
    pub fn add_instance(&mut self, archetype: &str, size: SizeVariant) -> InstanceId {
        let instance = CharacterInstance::new(archetype, size, self.next_z_order());
        let id = instance.id();
        debug!(instance_id:% = id, archetype, size:% = size; "Instance added");
        self.instances.insert(id, instance);
        id
    }

    /// Inserts a fully built instance, keeping its z-order.
    ///
    /// An instance with the same id is replaced in place.
    pub fn insert_instance(&mut self, instance: CharacterInstance) -> InstanceId {
        let id = instance.id();
        self.instances.insert(id, instance);
        id
    }

    pub fn remove_instance(&mut self, id: InstanceId) -> Option<CharacterInstance> {
        self.instances.shift_remove(&id)
    }

    /// Removes every instance and the background.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.background = None;
    }

    /// Copies an instance on top of the scene and returns the copy's id.
    pub fn duplicate_instance(&mut self, id: InstanceId) -> Result<InstanceId, ModelError> {
        let z_order = self.next_z_order();
        let copy = self
            .instances
            .get(&id)
            .ok_or(ModelError::UnknownInstance(id))?
            .duplicate(z_order);
        let copy_id = copy.id();
        self.instances.insert(copy_id, copy);
        Ok(copy_id)
    }

    /// Swaps z-order with the nearest instance above. Returns false at the top.
    pub fn bring_forward(&mut self, id: InstanceId) -> Result<bool, ModelError> {
        let current = self.z_of(id)?;
        let target = self
            .instances
            .values()
            .map(CharacterInstance::z_order)
            .filter(|z| *z > current)
            .min();
        Ok(self.swap_z(id, current, target))
    }

    /// Swaps z-order with the nearest instance below. Returns false at the bottom.
    pub fn send_backward(&mut self, id: InstanceId) -> Result<bool, ModelError> {
        let current = self.z_of(id)?;
        let target = self
            .instances
            .values()
            .map(CharacterInstance::z_order)
            .filter(|z| *z < current)
            .max();
        Ok(self.swap_z(id, current, target))
    }

    /// Raises the instance strictly above every other one.
    pub fn bring_to_front(&mut self, id: InstanceId) -> Result<bool, ModelError> {
        let current = self.z_of(id)?;
        let Some(max_other) = self.other_z_orders(id).max() else {
            return Ok(false);
        };
        if current > max_other {
            return Ok(false);
        }
        self.instance_mut(id)?
            .set_z_order(max_other.saturating_add(1));
        Ok(true)
    }

    /// Lowers the instance strictly below every other one.
    pub fn send_to_back(&mut self, id: InstanceId) -> Result<bool, ModelError> {
        let current = self.z_of(id)?;
        let Some(min_other) = self.other_z_orders(id).min() else {
            return Ok(false);
        };
        if current < min_other {
            return Ok(false);
        }
        self.instance_mut(id)?
            .set_z_order(min_other.saturating_sub(1));
        Ok(true)
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Option<Background>) {
        self.background = background;
    }

    /// Records the decoded size of the current background.
    ///
    /// Returns false if `name` is no longer the selected background.
    pub fn set_background_size(&mut self, name: &str, size: Size) -> bool {
        match &mut self.background {
            Some(background) if background.name == name => {
                background.size = Some(size);
                true
            }
            _ => false,
        }
    }

    /// Background size once known, else the configured default.
    pub fn canvas_size(&self) -> Size {
        self.background
            .as_ref()
            .and_then(Background::size)
            .unwrap_or(self.default_canvas)
    }

    /// Visible instances in draw order, bottom first.
    pub fn visible_in_order(&self) -> Vec<&CharacterInstance> {
        let mut visible: Vec<&CharacterInstance> =
            self.instances.values().filter(|i| i.visible()).collect();
        visible.sort_by_key(|instance| (instance.z_order(), instance.id()));
        visible
    }

    /// Flattens the scene into draw items, bottom first.
    ///
    /// Selected layers without decoded pixels and components without an image
    /// are skipped. The result depends only on the current state.
    pub fn build_draw_list(&self, multiplier: f32) -> Vec<DrawItem> {
        let center = self.canvas_size().scale(multiplier).center();
        let mut items = Vec::new();

        for instance in self.visible_in_order() {
            let transform = instance.transform();
            let place = |local: Point| {
                transform
                    .apply(local)
                    .scale(multiplier)
                    .add_point(center)
            };

            let order = instance.draw_order();
            let components: Vec<&CustomComponent> = instance
                .components()
                .ordered_by_z()
                .into_iter()
                .filter(|component| component.visible() && component.image().is_some())
                .collect();

            for slot in 0..=order.len() {
                for component in &components {
                    if component_slot(component, order.len()) != slot {
                        continue;
                    }
                    if let Some(image) = component.image() {
                        items.push(DrawItem {
                            instance: instance.id(),
                            source: DrawSource::Component(component.name().to_string()),
                            image: image.clone(),
                            position: place(component.position()),
                            scale: component.scale() * transform.scale() * multiplier,
                        });
                    }
                }

                let Some(layer_id) = order.get(slot).copied() else {
                    continue;
                };
                let (Some(layer), Some(image)) =
                    (instance.layer(layer_id), instance.decoded(layer_id))
                else {
                    continue;
                };
                items.push(DrawItem {
                    instance: instance.id(),
                    source: DrawSource::Layer(layer_id),
                    image: image.clone(),
                    position: place(layer.position()),
                    scale: transform.scale() * multiplier,
                });
            }
        }

        items
    }

    /// Topmost visible instance under a canvas point, at multiplier 1.
    pub fn instance_at(&self, point: Point) -> Option<InstanceId> {
        let scene_point = point.sub_point(self.canvas_size().center());
        self.visible_in_order()
            .into_iter()
            .rev()
            .find(|instance| {
                instance
                    .local_bounds()
                    .is_some_and(|bounds| bounds.contains(scene_point))
            })
            .map(CharacterInstance::id)
    }

    fn z_of(&self, id: InstanceId) -> Result<i32, ModelError> {
        self.instances
            .get(&id)
            .map(CharacterInstance::z_order)
            .ok_or(ModelError::UnknownInstance(id))
    }

    fn other_z_orders(&self, id: InstanceId) -> impl Iterator<Item = i32> + '_ {
        self.instances
            .values()
            .filter(move |instance| instance.id() != id)
            .map(CharacterInstance::z_order)
    }

    fn swap_z(&mut self, id: InstanceId, current: i32, target: Option<i32>) -> bool {
        let Some(target) = target else {
            return false;
        };
        if let Some(neighbour) = self
            .instances
            .values_mut()
            .find(|instance| instance.id() != id && instance.z_order() == target)
        {
            neighbour.set_z_order(current);
        }
        if let Some(instance) = self.instances.get_mut(&id) {
            instance.set_z_order(target);
        }
        true
    }
}

/// Index in the layer draw order a component is drawn before.
fn component_slot(component: &CustomComponent, len: usize) -> usize {
    usize::try_from(component.z_index())
        .unwrap_or(0)
        .min(len)
}
