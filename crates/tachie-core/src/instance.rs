//! One placed copy of a character archetype.
//!
//! A [`CharacterInstance`] tracks which layers are selected, the order they
//! are drawn in, the decoded pixels that have arrived for them so far, its
//! transform within the scene and the custom overlays attached to it.
//!
//! The selected layers and the draw order always hold the same set of ids.
//! Every operation that touches one updates the other before returning.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::{
    bitmap::DecodedImage,
    catalog::LayerSet,
    component::CustomComponentSet,
    error::ModelError,
    geometry::{Bounds, Point},
    identifier::{InstanceId, LayerId},
    layer::{Category, LayerDescriptor, SizeVariant},
};

/// Offset applied to a duplicate so it does not cover the original exactly
pub const DUPLICATE_OFFSET: Point = Point::new(100.0, 100.0);

/// Placement of an instance relative to the canvas center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    offset: Point,
    scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Zero offset and unit scale
    pub fn identity() -> Self {
        Self {
            offset: Point::default(),
            scale: 1.0,
        }
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Maps a point from the character's local space into scene space.
    pub fn apply(&self, local: Point) -> Point {
        local.scale(self.scale).add_point(self.offset)
    }
}

/// Relative moves within an instance's layer draw order.
///
/// The end of the draw order is the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMove {
    Up,
    Down,
    ToTop,
    ToBottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterInstance {
    id: InstanceId,
    archetype: String,
    size: SizeVariant,
    transform: Transform,
    visible: bool,
    z_order: i32,
    active_layers: IndexMap<LayerId, LayerDescriptor>,
    draw_order: Vec<LayerId>,
    decoded: HashMap<LayerId, DecodedImage>,
    components: CustomComponentSet,
    next_custom_id: u32,
}

impl CharacterInstance {
    /// Creates an empty, visible instance with the identity transform.
    pub fn new(archetype: impl Into<String>, size: SizeVariant, z_order: i32) -> Self {
        Self::with_id(InstanceId::generate(), archetype, size, z_order)
    }

    /// Like [`CharacterInstance::new`] but with a caller-chosen identifier.
    pub fn with_id(
        id: InstanceId,
        archetype: impl Into<String>,
        size: SizeVariant,
        z_order: i32,
    ) -> Self {
        Self {
            id,
            archetype: archetype.into(),
            size,
            transform: Transform::identity(),
            visible: true,
            z_order,
            active_layers: IndexMap::new(),
            draw_order: Vec::new(),
            decoded: HashMap::new(),
            components: CustomComponentSet::new(),
            next_custom_id: 1,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    pub fn size(&self) -> SizeVariant {
        self.size
    }

    /// `<archetype>_<size>_<id prefix>`, for display only
    pub fn display_name(&self) -> String {
        format!("{}_{}_{}", self.archetype, self.size, self.id.short())
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn set_z_order(&mut self, z_order: i32) {
        self.z_order = z_order;
    }

    /// Moves the instance, rejecting non-finite coordinates.
    pub fn set_offset(&mut self, offset: Point) -> Result<(), ModelError> {
        if !offset.is_finite() {
            return Err(ModelError::InvalidOffset(offset.x(), offset.y()));
        }
        self.transform.offset = offset;
        Ok(())
    }

    /// Rescales the instance, rejecting zero, negative and non-finite values.
    pub fn set_scale(&mut self, scale: f32) -> Result<(), ModelError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ModelError::InvalidScale(scale));
        }
        self.transform.scale = scale;
        Ok(())
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::identity();
    }

    /// Selected layers in selection order
    pub fn active_layers(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.active_layers.values()
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerDescriptor> {
        self.active_layers.get(&id)
    }

    pub fn is_active(&self, id: LayerId) -> bool {
        self.active_layers.contains_key(&id)
    }

    /// Layer ids from bottom to top
    pub fn draw_order(&self) -> &[LayerId] {
        &self.draw_order
    }

    pub fn decoded(&self, id: LayerId) -> Option<&DecodedImage> {
        self.decoded.get(&id)
    }

    pub fn components(&self) -> &CustomComponentSet {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut CustomComponentSet {
        &mut self.components
    }

    /// Selects a layer. A layer not yet in the draw order goes on top.
    ///
    /// Re-selecting an active layer replaces its descriptor and keeps its
    /// place in the draw order and any decoded pixels.
    pub fn select_layer(&mut self, layer: LayerDescriptor) {
        let id = layer.id();
        if self.active_layers.insert(id, layer).is_none() && !self.draw_order.contains(&id) {
            self.draw_order.push(id);
        }
    }

    /// Selects a layer from the catalog set this instance was built from.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownLayer`] and leaves the instance untouched
    /// if `id` is not part of `layers`.
    pub fn select_from(
        &mut self,
        layers: &LayerSet,
        id: LayerId,
    ) -> Result<&LayerDescriptor, ModelError> {
        let descriptor = layers.get(id).ok_or(ModelError::UnknownLayer(id))?;
        self.select_layer(descriptor.clone());
        self.active_layers
            .get(&id)
            .ok_or(ModelError::UnknownLayer(id))
    }

    /// Drops a layer and its pixels. Returns false if it was not selected.
    pub fn deselect_layer(&mut self, id: LayerId) -> bool {
        let removed = self.active_layers.shift_remove(&id).is_some();
        self.decoded.remove(&id);
        self.draw_order.retain(|layer| *layer != id);
        removed
    }

    /// Moves a layer within the draw order.
    ///
    /// Returns `Ok(false)` when the move would go past either end, which leaves
    /// the order unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownLayer`] if the layer is not selected.
    ///
    /// # Examples
    ///
    /// ```
    /// use tachie_core::{
    ///     geometry::{Point, Size},
    ///     identifier::LayerId,
    ///     instance::{CharacterInstance, LayerMove},
    ///     layer::{LayerDescriptor, SizeVariant},
    /// };
    ///
    /// let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
    /// for n in [3, 1, 2] {
    ///     let id = LayerId::Catalog(n);
    ///     instance.select_layer(LayerDescriptor::new(id, "part", Point::default(), Size::new(1.0, 1.0)));
    /// }
    ///
    /// assert!(instance.reorder_layer(LayerId::Catalog(1), LayerMove::ToTop).unwrap());
    /// assert_eq!(
    ///     instance.draw_order(),
    ///     &[LayerId::Catalog(3), LayerId::Catalog(2), LayerId::Catalog(1)]
    /// );
    /// ```
    pub fn reorder_layer(&mut self, id: LayerId, movement: LayerMove) -> Result<bool, ModelError> {
        let index = self
            .draw_order
            .iter()
            .position(|layer| *layer == id)
            .ok_or(ModelError::UnknownLayer(id))?;
        let last = self.draw_order.len() - 1;

        let target = match movement {
            LayerMove::Up if index < last => index + 1,
            LayerMove::Down if index > 0 => index - 1,
            LayerMove::ToTop if index < last => last,
            LayerMove::ToBottom if index > 0 => 0,
            _ => return Ok(false),
        };

        let layer = self.draw_order.remove(index);
        self.draw_order.insert(target, layer);
        Ok(true)
    }

    /// Adds an imported image as a custom layer and returns its new id.
    ///
    /// The layer takes the image's pixel size and origin path.
    pub fn add_custom_layer(
        &mut self,
        name: &str,
        image: DecodedImage,
        position: Point,
        z_order_hint: Option<i32>,
    ) -> LayerId {
        let mut descriptor =
            LayerDescriptor::new(LayerId::Custom(0), name, position, image.size())
                .with_category(Category::Custom);
        if let Some(path) = image.origin() {
            descriptor = descriptor.with_source_path(path.to_string_lossy());
        }
        if let Some(hint) = z_order_hint {
            descriptor = descriptor.with_z_order_hint(hint);
        }
        self.insert_custom_layer(descriptor, Some(image))
    }

    /// Inserts a custom layer under a freshly allocated id.
    ///
    /// The id stored in `descriptor` is replaced. Custom ids are never reused
    /// within an instance. Placement in the draw order follows the
    /// descriptor's z-order hint: the layer goes right before the first layer
    /// whose hint is strictly greater, otherwise on top. A missing hint counts
    /// as 0 on both sides, so catalog layers sit at 0.
    pub fn insert_custom_layer(
        &mut self,
        descriptor: LayerDescriptor,
        image: Option<DecodedImage>,
    ) -> LayerId {
        let id = LayerId::Custom(self.next_custom_id);
        self.next_custom_id += 1;

        let descriptor = descriptor.with_id(id);
        let hint = descriptor.z_order_hint().unwrap_or(0);
        let slot = self
            .draw_order
            .iter()
            .position(|existing| {
                self.active_layers
                    .get(existing)
                    .is_some_and(|other| hint < other.z_order_hint().unwrap_or(0))
            })
            .unwrap_or(self.draw_order.len());

        self.active_layers.insert(id, descriptor);
        self.draw_order.insert(slot, id);
        if let Some(image) = image {
            self.decoded.insert(id, image);
        }
        id
    }

    /// Replaces the layer selection with previously saved state.
    ///
    /// `order` is normalized against `layers`: unknown ids are dropped,
    /// duplicates keep their first position, and selected layers missing from
    /// `order` are appended in the order they were given. Decoded pixels are
    /// discarded.
    pub fn restore_layers(
        &mut self,
        layers: impl IntoIterator<Item = LayerDescriptor>,
        order: impl IntoIterator<Item = LayerId>,
    ) {
        let active: IndexMap<LayerId, LayerDescriptor> =
            layers.into_iter().map(|layer| (layer.id(), layer)).collect();

        let mut draw_order: Vec<LayerId> = Vec::with_capacity(active.len());
        for id in order {
            if active.contains_key(&id) && !draw_order.contains(&id) {
                draw_order.push(id);
            }
        }
        for id in active.keys() {
            if !draw_order.contains(id) {
                draw_order.push(*id);
            }
        }

        self.next_custom_id = active
            .keys()
            .filter_map(|id| match id {
                LayerId::Custom(n) => Some(n.saturating_add(1)),
                LayerId::Catalog(_) => None,
            })
            .max()
            .unwrap_or(1)
            .max(self.next_custom_id);
        self.active_layers = active;
        self.draw_order = draw_order;
        self.decoded.clear();
    }

    /// Replaces the overlay set, e.g. when loading a saved instance.
    pub fn restore_components(&mut self, components: CustomComponentSet) {
        self.components = components;
    }

    /// Stores decoded pixels for a layer that is still selected.
    ///
    /// Returns false, dropping the image, if the layer was deselected while
    /// it was decoding.
    pub fn apply_decoded(&mut self, id: LayerId, image: DecodedImage) -> bool {
        if !self.active_layers.contains_key(&id) {
            return false;
        }
        self.decoded.insert(id, image);
        true
    }

    /// Scene-space box around every selected layer and every decoded overlay.
    pub fn local_bounds(&self) -> Option<Bounds> {
        let scale = self.transform.scale;
        let layer_boxes = self.active_layers.values().map(|layer| {
            Bounds::new_from_top_left(
                self.transform.apply(layer.position()),
                layer.size().scale(scale),
            )
        });
        let component_boxes = self.components.iter().filter_map(|component| {
            component.size().map(|size| {
                Bounds::new_from_top_left(
                    self.transform.apply(component.position()),
                    size.scale(scale),
                )
            })
        });

        layer_boxes
            .chain(component_boxes)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }

    /// Copies this instance under a new id, shifted by [`DUPLICATE_OFFSET`].
    ///
    /// Layer maps, draw order and overlays are copied; decoded pixel buffers
    /// are shared since they are immutable.
    pub fn duplicate(&self, z_order: i32) -> Self {
        let mut copy = self.clone();
        copy.id = InstanceId::generate();
        copy.transform.offset = self.transform.offset.add_point(DUPLICATE_OFFSET);
        copy.z_order = z_order;
        copy
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::geometry::Size;

    fn layer(n: u32) -> LayerDescriptor {
        LayerDescriptor::new(
            LayerId::Catalog(n),
            format!("layer{n}"),
            Point::new(n as f32 * 10.0, 0.0),
            Size::new(100.0, 50.0),
        )
    }

    fn hinted(n: u32, hint: i32) -> LayerDescriptor {
        layer(n).with_z_order_hint(hint)
    }

    fn image(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(RgbaImage::new(width, height))
    }

    fn instance_with(ids: &[u32]) -> CharacterInstance {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        for id in ids {
            instance.select_layer(layer(*id));
        }
        instance
    }

    fn order(instance: &CharacterInstance) -> Vec<LayerId> {
        instance.draw_order().to_vec()
    }

    #[test]
    fn test_new_instance_defaults() {
        let instance = CharacterInstance::new("hero", SizeVariant::L, 4);
        assert_eq!(instance.transform(), Transform::identity());
        assert!(instance.visible());
        assert_eq!(instance.z_order(), 4);
        assert!(instance.display_name().starts_with("hero_l_"));
        assert_eq!(instance.display_name().len(), "hero_l_".len() + 8);
    }

    #[test]
    fn test_select_appends_once() {
        let mut instance = instance_with(&[1, 2]);
        instance.select_layer(layer(1).with_has_image(false));

        assert_eq!(order(&instance), vec![LayerId::Catalog(1), LayerId::Catalog(2)]);
        assert!(!instance.layer(LayerId::Catalog(1)).unwrap().has_image());
    }

    #[test]
    fn test_deselect_removes_everything() {
        let mut instance = instance_with(&[1, 2]);
        assert!(instance.apply_decoded(LayerId::Catalog(1), image(2, 2)));

        assert!(instance.deselect_layer(LayerId::Catalog(1)));
        assert!(!instance.is_active(LayerId::Catalog(1)));
        assert!(instance.decoded(LayerId::Catalog(1)).is_none());
        assert_eq!(order(&instance), vec![LayerId::Catalog(2)]);

        assert!(!instance.deselect_layer(LayerId::Catalog(1)));
    }

    #[test]
    fn test_reorder_moves() {
        let mut instance = instance_with(&[3, 1, 2]);

        assert!(instance.reorder_layer(LayerId::Catalog(1), LayerMove::ToTop).unwrap());
        assert_eq!(
            order(&instance),
            vec![LayerId::Catalog(3), LayerId::Catalog(2), LayerId::Catalog(1)]
        );

        assert!(instance.reorder_layer(LayerId::Catalog(1), LayerMove::Down).unwrap());
        assert_eq!(
            order(&instance),
            vec![LayerId::Catalog(3), LayerId::Catalog(1), LayerId::Catalog(2)]
        );

        assert!(instance.reorder_layer(LayerId::Catalog(2), LayerMove::ToBottom).unwrap());
        assert_eq!(
            order(&instance),
            vec![LayerId::Catalog(2), LayerId::Catalog(3), LayerId::Catalog(1)]
        );
    }

    #[test]
    fn test_reorder_past_ends_is_noop() {
        let mut instance = instance_with(&[1, 2, 3]);
        let before = order(&instance);

        assert!(!instance.reorder_layer(LayerId::Catalog(3), LayerMove::Up).unwrap());
        assert!(!instance.reorder_layer(LayerId::Catalog(3), LayerMove::ToTop).unwrap());
        assert!(!instance.reorder_layer(LayerId::Catalog(1), LayerMove::Down).unwrap());
        assert!(!instance.reorder_layer(LayerId::Catalog(1), LayerMove::ToBottom).unwrap());
        assert_eq!(order(&instance), before);

        assert_eq!(
            instance.reorder_layer(LayerId::Catalog(9), LayerMove::Up),
            Err(ModelError::UnknownLayer(LayerId::Catalog(9)))
        );
    }

    #[test]
    fn test_custom_layer_hint_insertion() {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        instance.select_layer(hinted(1, 0));
        instance.select_layer(hinted(2, 10));

        let id = instance.add_custom_layer("bow", image(8, 8), Point::default(), Some(5));

        assert_eq!(id, LayerId::Custom(1));
        assert_eq!(
            order(&instance),
            vec![LayerId::Catalog(1), id, LayerId::Catalog(2)]
        );
        assert!(instance.decoded(id).is_some());
        let descriptor = instance.layer(id).unwrap();
        assert!(descriptor.is_custom());
        assert_eq!(descriptor.size(), Size::new(8.0, 8.0));
    }

    #[test]
    fn test_custom_layer_hint_tie_goes_after() {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        instance.select_layer(hinted(1, 5));
        instance.select_layer(layer(2));

        let id = instance.add_custom_layer("bow", image(1, 1), Point::default(), Some(5));
        assert_eq!(
            order(&instance),
            vec![LayerId::Catalog(1), LayerId::Catalog(2), id]
        );
    }

    #[test]
    fn test_custom_layer_negative_hint_goes_below_catalog() {
        let mut instance = instance_with(&[1, 2]);

        let under = instance.add_custom_layer("shadow", image(4, 4), Point::default(), Some(-5));
        assert_eq!(
            order(&instance),
            vec![under, LayerId::Catalog(1), LayerId::Catalog(2)]
        );

        // No hint counts as 0: above the catalog layers, below a positive hint
        let raised = instance.add_custom_layer("cape", image(4, 4), Point::default(), Some(3));
        let plain = instance.add_custom_layer("pin", image(4, 4), Point::default(), None);
        assert_eq!(
            order(&instance),
            vec![under, LayerId::Catalog(1), LayerId::Catalog(2), plain, raised]
        );
    }

    #[test]
    fn test_custom_ids_are_not_reused() {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        let first = instance.add_custom_layer("a", image(1, 1), Point::default(), None);
        let second = instance.add_custom_layer("b", image(1, 1), Point::default(), None);
        instance.deselect_layer(first);
        let third = instance.add_custom_layer("c", image(1, 1), Point::default(), None);

        assert_eq!(first, LayerId::Custom(1));
        assert_eq!(second, LayerId::Custom(2));
        assert_eq!(third, LayerId::Custom(3));
    }

    #[test]
    fn test_select_from_rejects_unknown() {
        let catalog: crate::catalog::LayerCatalog = serde_json::from_str(
            r#"{"hero": {"layer_mapping": {"m": {"body": [
                {"layer_id": 1, "name": "base", "position": [0, 0], "size": [10, 10]}
            ]}}}}"#,
        )
        .unwrap();
        let set = catalog.layers("hero", SizeVariant::M).unwrap();
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);

        assert!(instance.select_from(set, LayerId::Catalog(1)).is_ok());
        assert_eq!(
            instance.select_from(set, LayerId::Catalog(7)).unwrap_err(),
            ModelError::UnknownLayer(LayerId::Catalog(7))
        );
        assert_eq!(order(&instance), vec![LayerId::Catalog(1)]);
    }

    #[test]
    fn test_apply_decoded_ignores_deselected() {
        let mut instance = instance_with(&[1]);
        instance.deselect_layer(LayerId::Catalog(1));

        assert!(!instance.apply_decoded(LayerId::Catalog(1), image(1, 1)));
        assert!(instance.decoded(LayerId::Catalog(1)).is_none());
    }

    #[test]
    fn test_restore_layers_normalizes_order() {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        instance.restore_layers(
            [layer(1), layer(2), layer(3), layer(4)],
            [
                LayerId::Catalog(3),
                LayerId::Catalog(9),
                LayerId::Catalog(1),
                LayerId::Catalog(3),
            ],
        );

        assert_eq!(
            order(&instance),
            vec![
                LayerId::Catalog(3),
                LayerId::Catalog(1),
                LayerId::Catalog(2),
                LayerId::Catalog(4)
            ]
        );
    }

    #[test]
    fn test_restore_layers_keeps_custom_ids_unique() {
        let mut instance = CharacterInstance::new("hero", SizeVariant::M, 0);
        let custom = layer(0).with_id(LayerId::Custom(4));
        instance.restore_layers([custom], std::iter::empty());

        let id = instance.add_custom_layer("new", image(1, 1), Point::default(), None);
        assert_eq!(id, LayerId::Custom(5));
    }

    #[test]
    fn test_transform_validation() {
        let mut instance = instance_with(&[]);
        assert!(instance.set_scale(0.0).is_err());
        assert!(instance.set_scale(-1.0).is_err());
        assert!(instance.set_scale(f32::NAN).is_err());
        assert!(instance.set_offset(Point::new(f32::INFINITY, 0.0)).is_err());
        assert_eq!(instance.transform(), Transform::identity());

        instance.set_scale(2.0).unwrap();
        instance.set_offset(Point::new(5.0, -5.0)).unwrap();
        instance.reset_transform();
        assert_eq!(instance.transform(), Transform::identity());
    }

    #[test]
    fn test_local_bounds() {
        let mut instance = instance_with(&[0, 5]);
        instance.set_scale(2.0).unwrap();
        instance.set_offset(Point::new(10.0, 20.0)).unwrap();

        let bounds = instance.local_bounds().unwrap();
        assert_eq!(bounds.min_point(), Point::new(10.0, 20.0));
        // layer 5 sits at x=50 and is 100 wide: (50 + 100) * 2 + 10
        assert_eq!(bounds.max_x(), 310.0);
        assert_eq!(bounds.max_y(), 120.0);

        assert!(instance_with(&[]).local_bounds().is_none());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut original = instance_with(&[1, 2]);
        original.set_offset(Point::new(5.0, 5.0)).unwrap();
        original.set_scale(1.5).unwrap();
        original
            .components_mut()
            .add("badge", "badge.png", None)
            .unwrap();

        let mut copy = original.duplicate(7);
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.transform().offset(), Point::new(105.0, 105.0));
        assert_eq!(copy.transform().scale(), 1.5);
        assert_eq!(copy.z_order(), 7);

        copy.deselect_layer(LayerId::Catalog(1));
        copy.reorder_layer(LayerId::Catalog(2), LayerMove::ToBottom)
            .unwrap();
        copy.components_mut().remove("badge").unwrap();

        assert_eq!(
            order(&original),
            vec![LayerId::Catalog(1), LayerId::Catalog(2)]
        );
        assert!(original.is_active(LayerId::Catalog(1)));
        assert!(original.components().get("badge").is_some());
    }
}

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use image::RgbaImage;
    use proptest::prelude::*;

    use super::*;
    use crate::geometry::Size;

    #[derive(Debug, Clone)]
    enum Op {
        Select(u32),
        Deselect(u32),
        Reorder(u32, LayerMove),
        AddCustom(Option<i32>),
        DeselectCustom(u32),
    }

    // ===================
    // Strategies
    // ===================

    fn move_strategy() -> impl Strategy<Value = LayerMove> {
        prop_oneof![
            Just(LayerMove::Up),
            Just(LayerMove::Down),
            Just(LayerMove::ToTop),
            Just(LayerMove::ToBottom),
        ]
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..8).prop_map(Op::Select),
            (0u32..8).prop_map(Op::Deselect),
            (0u32..8, move_strategy()).prop_map(|(id, m)| Op::Reorder(id, m)),
            prop::option::of(-5i32..20).prop_map(Op::AddCustom),
            (1u32..6).prop_map(Op::DeselectCustom),
        ]
    }

    fn apply(instance: &mut CharacterInstance, op: &Op) {
        match op {
            Op::Select(n) => instance.select_layer(
                LayerDescriptor::new(
                    LayerId::Catalog(*n),
                    "part",
                    Point::default(),
                    Size::new(1.0, 1.0),
                )
                .with_z_order_hint(*n as i32 * 2),
            ),
            Op::Deselect(n) => {
                instance.deselect_layer(LayerId::Catalog(*n));
            }
            Op::Reorder(n, movement) => {
                let _ = instance.reorder_layer(LayerId::Catalog(*n), *movement);
            }
            Op::AddCustom(hint) => {
                instance.add_custom_layer(
                    "custom",
                    DecodedImage::new(RgbaImage::new(1, 1)),
                    Point::default(),
                    *hint,
                );
            }
            Op::DeselectCustom(n) => {
                instance.deselect_layer(LayerId::Custom(*n));
            }
        }
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Draw order and selection hold the same ids after any operation sequence.
    fn check_draw_order_matches_selection(ops: Vec<Op>) -> Result<(), TestCaseError> {
        let mut instance = CharacterInstance::new("hero", SizeVariant::S, 0);

        for op in &ops {
            apply(&mut instance, op);

            let ordered: HashSet<LayerId> = instance.draw_order().iter().copied().collect();
            let active: HashSet<LayerId> = instance.active_layers().map(|l| l.id()).collect();
            prop_assert_eq!(ordered.len(), instance.draw_order().len(), "duplicate ids");
            prop_assert_eq!(&ordered, &active);
        }
        Ok(())
    }

    /// Reordering never changes the multiset of ids.
    fn check_reorder_is_permutation(
        count: u32,
        target: u32,
        movement: LayerMove,
    ) -> Result<(), TestCaseError> {
        let mut instance = CharacterInstance::new("hero", SizeVariant::S, 0);
        for n in 0..count {
            apply(&mut instance, &Op::Select(n));
        }
        let mut before = instance.draw_order().to_vec();

        let _ = instance.reorder_layer(LayerId::Catalog(target % count), movement);
        let mut after = instance.draw_order().to_vec();

        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn draw_order_matches_selection(ops in prop::collection::vec(op_strategy(), 0..40)) {
            check_draw_order_matches_selection(ops)?;
        }

        #[test]
        fn reorder_is_permutation(count in 1u32..8, target in 0u32..8, movement in move_strategy()) {
            check_reorder_is_permutation(count, target, movement)?;
        }
    }
}
