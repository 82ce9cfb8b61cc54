//! Free-standing image overlays attached to one character instance.
//!
//! A [`CustomComponentSet`] keeps its components in insertion order and
//! hands out z-indices from a running counter that starts at
//! [`COMPONENT_Z_BASELINE`], so a freshly added overlay draws above every
//! catalog layer of its instance.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::{
    bitmap::DecodedImage,
    error::ModelError,
    geometry::{Bounds, Point, Size},
};

/// First z-index handed out to auto-placed components
pub const COMPONENT_Z_BASELINE: i32 = 10000;

/// A user-supplied overlay image with its own placement and z-index.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomComponent {
    name: String,
    source_path: PathBuf,
    position: Point,
    scale: f32,
    z_index: i32,
    visible: bool,
    image: Option<DecodedImage>,
}

impl CustomComponent {
    /// Creates a visible component at the local origin with unit scale.
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>, z_index: i32) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            position: Point::default(),
            scale: 1.0,
            z_index,
            visible: true,
            image: None,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the scale factor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidScale`] unless `scale` is positive and finite.
    pub fn with_scale(mut self, scale: f32) -> Result<Self, ModelError> {
        self.set_scale(scale)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Updates the scale factor, leaving it untouched on error.
    pub fn set_scale(&mut self, scale: f32) -> Result<(), ModelError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ModelError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    pub fn set_image(&mut self, image: DecodedImage) {
        self.image = Some(image);
    }

    /// Scaled image size, if the image has been decoded
    pub fn size(&self) -> Option<Size> {
        self.image.as_ref().map(|image| image.size().scale(self.scale))
    }

    /// Box from `position` to `position + image_size * scale`.
    pub fn bounds(&self) -> Option<Bounds> {
        self.size()
            .map(|size| Bounds::new_from_top_left(self.position, size))
    }
}

/// The overlays owned by one character instance, unique by name.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomComponentSet {
    components: IndexMap<String, CustomComponent>,
    next_z: i32,
}

impl Default for CustomComponentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomComponentSet {
    pub fn new() -> Self {
        Self {
            components: IndexMap::new(),
            next_z: COMPONENT_Z_BASELINE,
        }
    }

    /// Adds a component. Without an explicit `z_index` it takes the running
    /// counter value and the counter advances.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateComponent`] if the name is taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use tachie_core::component::CustomComponentSet;
    ///
    /// let mut set = CustomComponentSet::new();
    /// set.add("ribbon", "ribbon.png", None).unwrap();
    /// set.add("badge", "badge.png", None).unwrap();
    ///
    /// assert_eq!(set.get("ribbon").unwrap().z_index(), 10000);
    /// assert_eq!(set.get("badge").unwrap().z_index(), 10001);
    /// assert!(set.add("badge", "other.png", None).is_err());
    /// ```
    pub fn add(
        &mut self,
        name: &str,
        source_path: impl Into<PathBuf>,
        z_index: Option<i32>,
    ) -> Result<&mut CustomComponent, ModelError> {
        if self.components.contains_key(name) {
            return Err(ModelError::DuplicateComponent(name.to_string()));
        }

        let z_index = match z_index {
            Some(z) => z,
            None => {
                let z = self.next_z;
                self.next_z += 1;
                z
            }
        };

        let entry = self
            .components
            .entry(name.to_string())
            .or_insert_with(|| CustomComponent::new(name, source_path, z_index));
        Ok(entry)
    }

    /// Removes a component by name, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Result<CustomComponent, ModelError> {
        self.components
            .shift_remove(name)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))
    }

    /// Removes every component and resets the z-index counter.
    pub fn remove_all(&mut self) {
        self.components.clear();
        self.next_z = COMPONENT_Z_BASELINE;
    }

    pub fn get(&self, name: &str) -> Option<&CustomComponent> {
        self.components.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CustomComponent> {
        self.components.get_mut(name)
    }

    /// Components in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CustomComponent> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The z-index the next auto-placed component will receive
    pub fn next_z_index(&self) -> i32 {
        self.next_z
    }

    /// Sets an explicit z-index and keeps the counter above it.
    pub fn set_z_index(&mut self, name: &str, value: i32) -> Result<(), ModelError> {
        self.component_mut(name)?.z_index = value;
        self.next_z = self.next_z.max(value.saturating_add(1));
        Ok(())
    }

    /// Raises the component by one step.
    pub fn move_up(&mut self, name: &str) -> Result<(), ModelError> {
        let component = self.component_mut(name)?;
        component.z_index = component.z_index.saturating_add(1);
        Ok(())
    }

    /// Lowers the component by one step, never below zero.
    pub fn move_down(&mut self, name: &str) -> Result<(), ModelError> {
        let component = self.component_mut(name)?;
        component.z_index = component.z_index.saturating_sub(1).max(0);
        Ok(())
    }

    /// Places the component strictly above every other component.
    pub fn move_to_front(&mut self, name: &str) -> Result<(), ModelError> {
        let max_z = self.iter().map(|c| c.z_index).max().unwrap_or(0);
        self.set_z_index(name, max_z.saturating_add(1))
    }

    /// Places the component strictly below every other component.
    pub fn move_to_back(&mut self, name: &str) -> Result<(), ModelError> {
        let min_z = self.iter().map(|c| c.z_index).min().unwrap_or(0);
        self.component_mut(name)?.z_index = min_z.saturating_sub(1);
        Ok(())
    }

    /// Components sorted by ascending z-index, ties in insertion order.
    pub fn ordered_by_z(&self) -> Vec<&CustomComponent> {
        let mut ordered: Vec<&CustomComponent> = self.components.values().collect();
        ordered.sort_by_key(|c| c.z_index);
        ordered
    }

    /// Returns the topmost visible component whose box contains `point`.
    ///
    /// Components without a decoded image have no box and are never hit.
    pub fn hit_test(&self, point: Point) -> Option<&CustomComponent> {
        self.ordered_by_z()
            .into_iter()
            .rev()
            .filter(|c| c.visible)
            .find(|c| c.bounds().is_some_and(|b| b.contains(point)))
    }

    /// Lowest and highest z-index, or the counter value twice when empty.
    pub fn z_range(&self) -> (i32, i32) {
        let min = self.iter().map(|c| c.z_index).min();
        let max = self.iter().map(|c| c.z_index).max();
        match (min, max) {
            (Some(min), Some(max)) => (min, max),
            _ => (self.next_z, self.next_z),
        }
    }

    /// Attaches a decoded image, returning false if the component is gone.
    pub fn apply_image(&mut self, name: &str, image: DecodedImage) -> bool {
        match self.components.get_mut(name) {
            Some(component) => {
                component.set_image(image);
                true
            }
            None => false,
        }
    }

    /// Rebuilds a set from previously saved components.
    ///
    /// The counter continues above the highest restored z-index, or starts at
    /// the baseline when nothing is restored. Fails without building anything
    /// on a duplicate name.
    pub fn restore(
        components: impl IntoIterator<Item = CustomComponent>,
    ) -> Result<Self, ModelError> {
        let mut set = Self::new();
        for component in components {
            if set.components.contains_key(component.name()) {
                return Err(ModelError::DuplicateComponent(component.name));
            }
            set.components.insert(component.name.clone(), component);
        }
        if let Some(max_z) = set.iter().map(|c| c.z_index).max() {
            set.next_z = max_z.saturating_add(1);
        }
        Ok(set)
    }

    fn component_mut(&mut self, name: &str) -> Result<&mut CustomComponent, ModelError> {
        self.components
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownComponent(name.to_string()))
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn z_values_strategy() -> impl Strategy<Value = Vec<Option<i32>>> {
        prop::collection::vec(prop::option::of(-50i32..50), 1..12)
    }

    fn build_set(z_values: &[Option<i32>]) -> CustomComponentSet {
        let mut set = CustomComponentSet::new();
        for (i, z) in z_values.iter().enumerate() {
            set.add(&format!("c{i}"), format!("c{i}.png"), *z).unwrap();
        }
        set
    }

    // ===================
    // Property Test Functions
    // ===================

    /// `move_to_front` puts the target last in z order.
    fn check_move_to_front_is_last(
        z_values: Vec<Option<i32>>,
        pick: prop::sample::Index,
    ) -> Result<(), TestCaseError> {
        let mut set = build_set(&z_values);
        let target = format!("c{}", pick.index(z_values.len()));

        set.move_to_front(&target).unwrap();
        let ordered = set.ordered_by_z();
        prop_assert_eq!(ordered.len(), z_values.len());
        prop_assert_eq!(ordered[ordered.len() - 1].name(), target.as_str());
        Ok(())
    }

    /// `move_to_back` puts the target first in z order.
    fn check_move_to_back_is_first(
        z_values: Vec<Option<i32>>,
        pick: prop::sample::Index,
    ) -> Result<(), TestCaseError> {
        let mut set = build_set(&z_values);
        let target = format!("c{}", pick.index(z_values.len()));

        set.move_to_back(&target).unwrap();
        prop_assert_eq!(set.ordered_by_z()[0].name(), target.as_str());
        Ok(())
    }

    /// Auto-assigned components always land above every existing z-index.
    fn check_auto_z_above_existing(z_values: Vec<Option<i32>>) -> Result<(), TestCaseError> {
        let mut set = build_set(&z_values);
        let (_, max_before) = set.z_range();

        let added = set.add("fresh", "fresh.png", None).unwrap().z_index();
        prop_assert!(added >= COMPONENT_Z_BASELINE);
        prop_assert!(added > max_before);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn move_to_front_is_last(z_values in z_values_strategy(), pick in any::<prop::sample::Index>()) {
            check_move_to_front_is_last(z_values, pick)?;
        }

        #[test]
        fn move_to_back_is_first(z_values in z_values_strategy(), pick in any::<prop::sample::Index>()) {
            check_move_to_back_is_first(z_values, pick)?;
        }

        #[test]
        fn auto_z_above_existing(z_values in z_values_strategy()) {
            check_auto_z_above_existing(z_values)?;
        }
    }
}
