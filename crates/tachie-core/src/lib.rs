//! Tachie Core Types and Definitions
//!
//! This crate provides the data model of the Tachie character compositor.
//! It performs no I/O. It includes:
//!
//! - **Geometry**: Points, sizes and bounds ([`geometry`] module)
//! - **Identifiers**: Instance and layer identifiers ([`identifier`] module)
//! - **Layers**: Layer descriptors and their vocabularies ([`layer`] module)
//! - **Catalog**: The read-only layer catalog ([`catalog::LayerCatalog`])
//! - **Components**: Per-instance image overlays ([`component::CustomComponentSet`])
//! - **Instances**: Placed characters ([`instance::CharacterInstance`])

pub mod bitmap;
pub mod catalog;
pub mod color;
pub mod component;
pub mod error;
pub mod geometry;
pub mod identifier;
pub mod instance;
pub mod layer;

pub use error::ModelError;
