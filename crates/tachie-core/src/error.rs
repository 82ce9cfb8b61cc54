//! Validation errors raised by the data model.

use thiserror::Error;

use crate::identifier::{InstanceId, LayerId};

/// A rejected model operation. No state is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("custom component `{0}` already exists")]
    DuplicateComponent(String),

    #[error("custom component `{0}` not found")]
    UnknownComponent(String),

    #[error("layer {0} is not available")]
    UnknownLayer(LayerId),

    #[error("scale must be a positive finite number, got {0}")]
    InvalidScale(f32),

    #[error("offset must be finite, got ({0}, {1})")]
    InvalidOffset(f32, f32),

    #[error("unknown size variant `{0}`")]
    UnknownSizeVariant(String),

    #[error("character instance {0} not found")]
    UnknownInstance(InstanceId),

    #[error("layer id {0} is out of range")]
    LayerIdOutOfRange(i64),
}
