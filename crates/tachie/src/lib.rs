//! Tachie - Layered character illustration compositor.
//!
//! Character archetypes are assembled from toggleable catalog layers,
//! placed on a shared canvas, decorated with imported overlays, saved as
//! scene files and exported as raster or SVG images.
//!
//! [`Composer`] ties the pieces together: the read-only layer catalog, the
//! [`compositor::SceneCompositor`] that owns every instance, the
//! [`alignment::AlignmentAdvisor`] that places imported images and the
//! [`loader::DecodeWorker`] that decodes layer images in the background.

pub mod alignment;
pub mod compositor;
pub mod config;
pub mod export;
pub mod loader;
pub mod persist;

mod error;

pub use tachie_core::{bitmap, catalog, color, component, geometry, identifier, instance, layer};

pub use error::TachieError;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use alignment::{AlignmentAdvisor, AlignmentTable, SuggestRequest};
use catalog::{CatalogError, LayerCatalog};
use compositor::{Background, DrawItem, SceneCompositor};
use config::AppConfig;
use export::{ExportScale, Exporter, Frame, raster::RasterExporter, svg::SvgExporter};
use geometry::Point;
use identifier::{InstanceId, LayerId};
use instance::{CharacterInstance, LayerMove};
use layer::{AlignmentPoint, Category, LayerDescriptor, SizeVariant};
use loader::{DecodeEvent, DecodeTarget, DecodeWorker, FileDecoder, ImageDecoder};
use persist::{DroppedLayer, InstanceRecord, SceneFile};
use tachie_core::{ModelError, bitmap::DecodedImage};

/// Scene editing session.
///
/// All scene state is owned here and only mutated from the thread that owns
/// the composer. Decoded images arrive through [`Composer::poll`] or
/// [`Composer::wait_idle`].
///
/// # Examples
///
/// ```rust,no_run
/// use tachie::{Composer, config::AppConfig, export::ExportScale, layer::SizeVariant, identifier::LayerId};
///
/// let mut composer = Composer::open(AppConfig::default()).expect("catalog");
/// let hero = composer.add_character("hero", SizeVariant::M).expect("archetype");
/// composer.select_layer(hero, LayerId::Catalog(0)).expect("layer");
/// composer.wait_idle();
/// composer.export("hero.png", ExportScale::X2).expect("export");
/// ```
pub struct Composer {
    config: AppConfig,
    catalog: LayerCatalog,
    compositor: SceneCompositor,
    advisor: AlignmentAdvisor,
    worker: DecodeWorker,
    importer: Box<dyn ImageDecoder>,
    background: Option<DecodedImage>,
    progress: Option<(usize, usize)>,
}

impl Composer {
    /// Reads the catalog named by `config` and starts a session.
    ///
    /// # Errors
    ///
    /// Returns [`TachieError::Catalog`] if the catalog cannot be read or
    /// parsed, or any error from [`Composer::new`].
    pub fn open(config: AppConfig) -> Result<Self, TachieError> {
        let catalog: LayerCatalog =
            persist::read_json(config.catalog().path()).map_err(|err| match err {
                TachieError::Persistence { path, cause } => {
                    TachieError::Catalog(CatalogError::Unreadable { path, cause })
                }
                other => other,
            })?;
        info!(
            path:? = config.catalog().path(),
            archetypes = catalog.archetype_names().count();
            "Catalog loaded"
        );
        Self::new(config, catalog)
    }

    /// Starts a session that decodes files from disk.
    ///
    /// A configured alignment table is loaded when its file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the decode thread cannot start or the alignment
    /// table exists but cannot be read.
    pub fn new(config: AppConfig, catalog: LayerCatalog) -> Result<Self, TachieError> {
        Self::with_decoder(config, catalog, FileDecoder)
    }

    /// Starts a session with a custom decoder, used for layer images and imports.
    pub fn with_decoder<D>(
        config: AppConfig,
        catalog: LayerCatalog,
        decoder: D,
    ) -> Result<Self, TachieError>
    where
        D: ImageDecoder + Clone,
    {
        let worker = DecodeWorker::spawn(decoder.clone(), config.loader().queue_capacity())?;

        let advisor = match config.alignment().table_path() {
            Some(path) if path.exists() => {
                AlignmentAdvisor::new(persist::read_json::<AlignmentTable>(path)?)
            }
            Some(path) => {
                debug!(path:?; "Alignment table not found, using built-in zones");
                AlignmentAdvisor::default()
            }
            None => AlignmentAdvisor::default(),
        };

        Ok(Self {
            compositor: SceneCompositor::new(config.canvas().size()),
            config,
            catalog,
            advisor,
            worker,
            importer: Box::new(decoder),
            background: None,
            progress: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    pub fn compositor(&self) -> &SceneCompositor {
        &self.compositor
    }

    /// Direct access for transforms, visibility and instance z-ordering.
    pub fn compositor_mut(&mut self) -> &mut SceneCompositor {
        &mut self.compositor
    }

    pub fn advisor(&self) -> &AlignmentAdvisor {
        &self.advisor
    }

    pub fn background_image(&self) -> Option<&DecodedImage> {
        self.background.as_ref()
    }

    /// Last progress report of the decode worker as `(completed, total)`.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.progress
    }

    /// Places a new, empty instance above every existing one.
    ///
    /// # Errors
    ///
    /// Returns [`TachieError::Catalog`] if the catalog has no layers for the
    /// archetype at that size.
    pub fn add_character(
        &mut self,
        archetype: &str,
        size: SizeVariant,
    ) -> Result<InstanceId, TachieError> {
        self.catalog.layers(archetype, size)?;
        let id = self.compositor.add_instance(archetype, size);
        info!(instance_id:% = id, archetype = archetype, size:% = size; "Character added");
        Ok(id)
    }

    /// Selects a catalog layer and queues its image.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the instance is unknown or the
    /// layer is not in its catalog set.
    pub fn select_layer(&mut self, instance: InstanceId, layer: LayerId) -> Result<(), TachieError> {
        let target = self
            .compositor
            .get(instance)
            .ok_or(ModelError::UnknownInstance(instance))?;
        let layers = self.catalog.layers(target.archetype(), target.size())?;
        let (archetype, size) = (target.archetype().to_string(), target.size());

        let descriptor = self
            .compositor
            .instance_mut(instance)?
            .select_from(layers, layer)?
            .clone();
        self.request_layer(instance, &archetype, size, &descriptor)
    }

    /// Deselects a layer. Returns false if it was not selected.
    pub fn deselect_layer(&mut self, instance: InstanceId, layer: LayerId) -> Result<bool, TachieError> {
        Ok(self.compositor.instance_mut(instance)?.deselect_layer(layer))
    }

    /// Moves a layer within its instance. Returns false at the ends.
    pub fn reorder_layer(
        &mut self,
        instance: InstanceId,
        layer: LayerId,
        movement: LayerMove,
    ) -> Result<bool, TachieError> {
        Ok(self
            .compositor
            .instance_mut(instance)?
            .reorder_layer(layer, movement)?)
    }

    pub fn duplicate(&mut self, instance: InstanceId) -> Result<InstanceId, TachieError> {
        let copy = self.compositor.duplicate_instance(instance)?;
        info!(source:% = instance, instance_id:% = copy; "Character duplicated");
        Ok(copy)
    }

    pub fn remove(&mut self, instance: InstanceId) -> Result<CharacterInstance, TachieError> {
        let removed = self
            .compositor
            .remove_instance(instance)
            .ok_or(ModelError::UnknownInstance(instance))?;
        info!(instance_id:% = instance; "Character removed");
        Ok(removed)
    }

    /// Removes every instance and the background.
    pub fn clear_all(&mut self) {
        self.compositor.clear();
        self.background = None;
        info!("Scene cleared");
    }

    /// Sets or clears the background, queuing its image from the background directory.
    pub fn set_background(&mut self, name: Option<&str>) -> Result<(), TachieError> {
        self.background = None;
        let Some(name) = name.filter(|name| !name.is_empty()) else {
            self.compositor.set_background(None);
            return Ok(());
        };

        self.compositor.set_background(Some(Background::new(name)));
        let path = self.config.canvas().background_dir().join(name);
        self.worker.submit(
            DecodeTarget::Background {
                name: name.to_string(),
            },
            path,
        )
    }

    /// Imports an image file as a custom layer placed by the alignment advisor.
    ///
    /// The file is decoded right away. `category` overrides the category
    /// inferred from the file name and pixel size. `z_order_hint` places the
    /// layer among the others; catalog layers count as hint 0.
    ///
    /// # Errors
    ///
    /// Returns [`TachieError::Decode`] if the file cannot be decoded, or a
    /// model error for an unknown instance. Nothing changes on failure.
    pub fn import_custom_layer(
        &mut self,
        instance: InstanceId,
        path: &Path,
        category: Option<Category>,
        z_order_hint: Option<i32>,
    ) -> Result<LayerId, TachieError> {
        let target = self
            .compositor
            .get(instance)
            .ok_or(ModelError::UnknownInstance(instance))?;
        let image = self.importer.decode(path)?;

        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let profile = self
            .catalog
            .layers(target.archetype(), target.size())
            .ok()
            .map(AlignmentAdvisor::profile);
        let suggestion = self.advisor.suggest(&SuggestRequest {
            label: &label,
            size: image.size(),
            category,
            profile: profile.as_ref(),
        });

        let (position, anchor) = if suggestion.position.is_finite() {
            (suggestion.position, suggestion.anchor)
        } else {
            warn!(label = label.as_str(); "No usable alignment, centering the layer");
            let anchor = AlignmentPoint::centered(Point::default());
            (anchor.top_left(image.size()), anchor)
        };

        let mut descriptor =
            LayerDescriptor::new(LayerId::Custom(0), label.as_str(), position, image.size())
                .with_source_path(path.to_string_lossy())
                .with_category(suggestion.category)
                .with_alignment_point(anchor);
        if let Some(hint) = z_order_hint {
            descriptor = descriptor.with_z_order_hint(hint);
        }
        let id = self
            .compositor
            .instance_mut(instance)?
            .insert_custom_layer(descriptor, Some(image));

        info!(
            instance_id:% = instance,
            layer:% = id,
            category:% = suggestion.category,
            zone = suggestion.zone.as_str();
            "Custom layer imported"
        );
        Ok(id)
    }

    /// Adds an overlay to an instance and queues its image.
    pub fn add_component(
        &mut self,
        instance: InstanceId,
        name: &str,
        path: impl Into<PathBuf>,
        z_index: Option<i32>,
    ) -> Result<(), TachieError> {
        let path = path.into();
        self.compositor
            .instance_mut(instance)?
            .components_mut()
            .add(name, path.clone(), z_index)?;
        self.worker.submit(
            DecodeTarget::Component {
                instance,
                name: name.to_string(),
            },
            path,
        )
    }

    /// Applies every decode result received so far. Returns how many images were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.worker.try_next() {
            applied += usize::from(self.apply(event));
        }
        applied
    }

    /// Blocks until every queued image has been decoded and applied.
    pub fn wait_idle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.worker.next_blocking() {
            applied += usize::from(self.apply(event));
        }
        applied
    }

    /// Draw list of the whole scene at `multiplier` times the canvas resolution.
    pub fn build_draw_list(&self, multiplier: f32) -> Vec<DrawItem> {
        self.compositor.build_draw_list(multiplier)
    }

    pub fn save_scene(&self, path: &Path) -> Result<(), TachieError> {
        persist::write_json(path, &SceneFile::capture(&self.compositor))?;
        info!(path:?, instances = self.compositor.len(); "Scene saved");
        Ok(())
    }

    /// Replaces the scene with a saved one and queues all of its images.
    ///
    /// Returns the layer ids the catalog no longer has. The current scene is
    /// kept if the file cannot be read or rebuilt. Once it is replaced,
    /// images that cannot be queued are logged like decode failures.
    pub fn load_scene(&mut self, path: &Path) -> Result<Vec<DroppedLayer>, TachieError> {
        let file: SceneFile = persist::read_json(path)?;
        let load = file.restore(&self.catalog)?;

        self.clear_all();
        let ids: Vec<InstanceId> = load
            .instances
            .into_iter()
            .map(|instance| self.compositor.insert_instance(instance))
            .collect();
        for id in ids {
            if let Err(err) = self.request_instance(id) {
                warn!(instance_id:% = id, err:err; "Scene images could not be queued");
            }
        }
        if let Err(err) = self.set_background(load.background.as_deref()) {
            warn!(err:err; "Background image could not be queued");
        }

        info!(
            path:?,
            instances = self.compositor.len(),
            dropped = load.dropped.len();
            "Scene loaded"
        );
        Ok(load.dropped)
    }

    /// Writes one instance, custom layers and overlays included.
    pub fn export_instance(&self, instance: InstanceId, path: &Path) -> Result<(), TachieError> {
        let target = self
            .compositor
            .get(instance)
            .ok_or(ModelError::UnknownInstance(instance))?;
        persist::write_json(path, &InstanceRecord::capture(target))
    }

    /// Adds a previously exported instance on top of the scene.
    ///
    /// The saved id is kept unless the scene already has it.
    pub fn import_instance(&mut self, path: &Path) -> Result<InstanceId, TachieError> {
        let mut record: InstanceRecord = persist::read_json(path)?;
        if InstanceId::parse(&record.instance_id).is_some_and(|id| self.compositor.contains(id)) {
            record.instance_id.clear();
        }
        let mut instance = record.restore()?;
        instance.set_z_order(self.compositor.next_z_order());

        let id = self.compositor.insert_instance(instance);
        self.request_instance(id)?;
        info!(instance_id:% = id, path:?; "Character imported");
        Ok(id)
    }

    pub fn save_alignment(&self, path: &Path) -> Result<(), TachieError> {
        persist::write_json(path, self.advisor.table())
    }

    pub fn load_alignment(&mut self, path: &Path) -> Result<(), TachieError> {
        let table: AlignmentTable = persist::read_json(path)?;
        self.advisor = AlignmentAdvisor::new(table);
        Ok(())
    }

    /// Feeds a manual correction back into the alignment table.
    pub fn learn_placement(&mut self, category: Category, zone: &str, observed: Point) {
        self.advisor = AlignmentAdvisor::new(self.advisor.learn(category, zone, observed));
    }

    /// Writes the scene at `scale` times the canvas size.
    ///
    /// The format follows the extension: `svg`, `png`, `jpg` or `jpeg`.
    /// Images still decoding are left out.
    pub fn export(&self, path: impl AsRef<Path>, scale: ExportScale) -> Result<(), TachieError> {
        let path = path.as_ref();
        let multiplier = scale.factor();
        let items = self.compositor.build_draw_list(multiplier);
        let frame = Frame {
            canvas: self.compositor.canvas_size().scale(multiplier),
            fill: self
                .config
                .style()
                .background_color()
                .map_err(TachieError::Config)?,
            background: self.background.as_ref(),
            items: &items,
        };

        info!(path:?, scale:% = scale, items = items.len(); "Exporting scene");
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            SvgExporter::new(path).export_frame(&frame)?;
        } else {
            RasterExporter::new(path)?.export_frame(&frame)?;
        }
        Ok(())
    }

    fn request_layer(
        &mut self,
        instance: InstanceId,
        archetype: &str,
        size: SizeVariant,
        layer: &LayerDescriptor,
    ) -> Result<(), TachieError> {
        let path = match (layer.id(), layer.source_path()) {
            (_, Some(source)) => PathBuf::from(source),
            (LayerId::Catalog(_), None) if layer.has_image() => {
                LayerCatalog::asset_path(self.config.catalog().asset_dir(), archetype, size, layer.id())
            }
            _ => {
                debug!(instance_id:% = instance, layer:% = layer.id(); "Layer has no image");
                return Ok(());
            }
        };
        self.worker.submit(
            DecodeTarget::Layer {
                instance,
                layer: layer.id(),
            },
            path,
        )
    }

    /// Queues every image a freshly inserted instance needs.
    fn request_instance(&mut self, id: InstanceId) -> Result<(), TachieError> {
        let Some(instance) = self.compositor.get(id) else {
            return Ok(());
        };
        let archetype = instance.archetype().to_string();
        let size = instance.size();
        let layers: Vec<LayerDescriptor> = instance.active_layers().cloned().collect();
        let components: Vec<(String, PathBuf)> = instance
            .components()
            .iter()
            .map(|component| (component.name().to_string(), component.source_path().to_path_buf()))
            .collect();

        for layer in &layers {
            self.request_layer(id, &archetype, size, layer)?;
        }
        for (name, path) in components {
            self.worker
                .submit(DecodeTarget::Component { instance: id, name }, path)?;
        }
        Ok(())
    }

    /// Applies one decode result if its target still exists.
    fn apply(&mut self, event: DecodeEvent) -> bool {
        match event {
            DecodeEvent::Progress { completed, total } => {
                self.progress = Some((completed, total));
                false
            }
            DecodeEvent::Failed { target, path, reason } => {
                warn!(target:?, path:?, reason = reason.as_str(); "Image could not be decoded");
                false
            }
            DecodeEvent::Decoded { target, image } => match target {
                DecodeTarget::Layer { instance, layer } => self
                    .compositor
                    .get_mut(instance)
                    .is_some_and(|target| target.apply_decoded(layer, image)),
                DecodeTarget::Component { instance, name } => self
                    .compositor
                    .get_mut(instance)
                    .is_some_and(|target| target.components_mut().apply_image(&name, image)),
                DecodeTarget::Background { name } => {
                    if !self.compositor.set_background_size(&name, image.size()) {
                        return false;
                    }
                    self.background = Some(image);
                    true
                }
            },
        }
    }
}
