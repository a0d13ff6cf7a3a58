//! Intra-record consistency checks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::BundleRecord;

/// A broken intra-record invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordViolation {
    /// `used` is larger than the declared capacity.
    UsedExceedsSize { used: u32, size: u32 },
    /// The bundle list does not hold exactly `used` occupied slots.
    OccupancyMismatch { observed: usize, declared: u32 },
}

impl RecordViolation {
    /// Stable code used in structured event logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UsedExceedsSize { .. } => "record.used_exceeds_size",
            Self::OccupancyMismatch { .. } => "record.occupancy_mismatch",
        }
    }
}

impl fmt::Display for RecordViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsedExceedsSize { used, size } => {
                write!(f, "used ({used}) > size ({size})")
            }
            Self::OccupancyMismatch { observed, declared } => write!(
                f,
                "bundle has {observed} non-nil uthreads but used={declared}"
            ),
        }
    }
}

/// Outcome of [`validate_record`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCheck {
    pub violations: Vec<RecordViolation>,
}

impl RecordCheck {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable diagnostics, one per violation, in check order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Check `used <= size` and that exactly `used` slots are occupied.
///
/// Both rules are always evaluated, so one record can carry two diagnostics.
#[must_use]
pub fn validate_record(record: &BundleRecord) -> RecordCheck {
    let mut violations = Vec::new();

    if record.used > record.size {
        violations.push(RecordViolation::UsedExceedsSize {
            used: record.used,
            size: record.size,
        });
    }

    let observed = record.occupied_slots();
    if u32::try_from(observed).ok() != Some(record.used) {
        violations.push(RecordViolation::OccupancyMismatch {
            observed,
            declared: record.used,
        });
    }

    RecordCheck { violations }
}
