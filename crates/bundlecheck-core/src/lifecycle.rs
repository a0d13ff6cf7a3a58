//! Temporal checks over one kthread's complete bundle history.
//!
//! These rules only make sense over a finished sequence: "the last entry" and
//! "a run of growth" change meaning if more records may still arrive. Callers
//! must not run them on a truncated history.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::history::OwnerHistory;

/// Strict `used` increases allowed in a row before the next one is a violation.
pub const MAX_CONSECUTIVE_GROWTH: u32 = 2;

/// A broken temporal invariant, anchored to an entry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleViolation {
    /// `used` grew `run` times in a row, ending at entry `index`.
    GrowthRun { index: usize, run: u32 },
    /// The final entry still holds uthreads.
    NotTerminallyEmpty { index: usize, used: u32 },
}

impl LifecycleViolation {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::GrowthRun { index, .. } | Self::NotTerminallyEmpty { index, .. } => *index,
        }
    }

    /// Stable code used in structured event logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::GrowthRun { .. } => "lifecycle.growth_run",
            Self::NotTerminallyEmpty { .. } => "lifecycle.not_terminally_empty",
        }
    }
}

impl fmt::Display for LifecycleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GrowthRun { index, run } => write!(
                f,
                "bundle grew for {run} consecutive times (entry {})",
                index + 1
            ),
            Self::NotTerminallyEmpty { used, .. } => write!(
                f,
                "bundle does not end empty (used={used} in last entry)"
            ),
        }
    }
}

/// Outcome of [`validate_lifecycle`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleVerdict {
    /// Violations in detection order: growth runs first, then the terminal check.
    pub violations: Vec<LifecycleViolation>,
    /// Union of the violating entry indices.
    pub flagged: BTreeSet<usize>,
}

impl LifecycleVerdict {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.violations.is_empty()
    }

    fn flag(&mut self, violation: LifecycleViolation) {
        self.flagged.insert(violation.index());
        self.violations.push(violation);
    }
}

/// Check bounded consecutive growth and terminal emptiness.
///
/// Histories shorter than two entries pass trivially. A flat or shrinking step
/// resets the growth counter to zero.
#[must_use]
pub fn validate_lifecycle(history: &OwnerHistory) -> LifecycleVerdict {
    let mut verdict = LifecycleVerdict::default();
    let entries = history.entries();
    if entries.len() < 2 {
        return verdict;
    }

    let mut run = 0u32;
    for (i, pair) in entries.windows(2).enumerate() {
        let index = i + 1;
        if pair[1].record.used > pair[0].record.used {
            run += 1;
            if run > MAX_CONSECUTIVE_GROWTH {
                verdict.flag(LifecycleViolation::GrowthRun { index, run });
            }
        } else {
            run = 0;
        }
    }

    let last_index = entries.len() - 1;
    let last_used = entries[last_index].record.used;
    if last_used != 0 {
        verdict.flag(LifecycleViolation::NotTerminallyEmpty {
            index: last_index,
            used: last_used,
        });
    }

    if !verdict.ok() {
        tracing::debug!(
            kthread = history.owner,
            flagged = ?verdict.flagged,
            "lifecycle check failed"
        );
    }
    verdict
}
