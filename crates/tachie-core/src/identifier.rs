//! Identifiers for character instances and layers.
//!
//! [`InstanceId`] names a placed character and is generated once at creation.
//! [`LayerId`] names a layer inside one instance and distinguishes catalog
//! layers from layers imported into that instance only.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Globally unique identifier of a character instance.
///
/// Ordering follows the lexicographic order of the hyphenated string form,
/// which keeps draw-order tie breaks reproducible.
///
/// # Examples
///
/// ```
/// use tachie_core::identifier::InstanceId;
///
/// let a = InstanceId::generate();
/// let b = InstanceId::generate();
/// assert_ne!(a, b);
/// assert_eq!(a.short().len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its hyphenated string form.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    /// Returns the first eight characters of the hyphenated form.
    pub fn short(&self) -> String {
        let mut text = self.0.hyphenated().to_string();
        text.truncate(8);
        text
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Identifier of a layer within one character instance.
///
/// Catalog layers keep the id the catalog assigned. Custom layers are numbered
/// per instance starting at 1. In persisted form both share one integer space:
/// catalog ids are non-negative and custom id `n` is written as `-n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum LayerId {
    Catalog(u32),
    Custom(u32),
}

impl LayerId {
    /// Returns true for layers that did not come from the catalog
    pub fn is_custom(self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl TryFrom<i64> for LayerId {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value >= 0 {
            u32::try_from(value)
                .map(Self::Catalog)
                .map_err(|_| ModelError::LayerIdOutOfRange(value))
        } else {
            value
                .checked_neg()
                .and_then(|n| u32::try_from(n).ok())
                .map(Self::Custom)
                .ok_or(ModelError::LayerIdOutOfRange(value))
        }
    }
}

impl From<LayerId> for i64 {
    fn from(id: LayerId) -> Self {
        match id {
            LayerId::Catalog(n) => i64::from(n),
            LayerId::Custom(n) => -i64::from(n),
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(n) => write!(f, "{n}"),
            Self::Custom(n) => write!(f, "custom-{n}"),
        }
    }
}
