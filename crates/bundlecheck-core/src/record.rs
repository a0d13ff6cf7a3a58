//! Bundle snapshot records.
//!
//! A [`BundleRecord`] is one observation of a kthread's LAME bundle, exactly as
//! the runtime logged it. Records are built once by the line parser and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

/// Identifier of the kthread that owns a bundle.
pub type OwnerKey = u64;

/// One slot of a bundle's uthread list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "addr", rename_all = "lowercase")]
pub enum Slot {
    /// The `(nil)` sentinel.
    Empty,
    /// An address-like token such as `0x7f00dead0000`.
    Occupied(String),
}

impl Slot {
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied(_))
    }
}

/// One observed bundle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    /// Declared capacity.
    pub size: u32,
    /// Declared number of occupied slots.
    pub used: u32,
    /// Index of the running uthread. Informational only.
    pub active: Option<i64>,
    /// Runtime enable flag. Informational only.
    pub enabled: Option<i64>,
    /// The bracketed list exactly as logged, e.g. `<0xAA,(nil)`.
    pub raw_bundle_text: String,
    /// Recognized slots in list order. Unrecognized tokens are not slots.
    pub slots: Vec<Slot>,
    /// Number of tokens the tokenizer dropped as unrecognized.
    #[serde(default)]
    pub dropped_tokens: usize,
}

impl BundleRecord {
    /// Number of slots holding an address token.
    #[must_use]
    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }
}
