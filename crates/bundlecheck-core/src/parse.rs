//! Line parser for `[LAME][BUNDLE]` log records.
//!
//! A record line looks like:
//!
//! ```text
//! [LAME][BUNDLE][kthread:1][size:4][used:2][active:1][enabled:1][bundle:<0xAA,0xBB,(nil),(nil)]
//! ```
//!
//! Fields are `[tag:value]` groups in any order. `kthread`, `size`, `used` and
//! `bundle` are mandatory; `active` and `enabled` are informational. Lines
//! without the marker are not records at all, and marker lines with a missing
//! or negative mandatory field are skipped rather than treated as fatal.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::record::{BundleRecord, OwnerKey, Slot};

/// Substring identifying a bundle-lifecycle record line.
pub const BUNDLE_MARKER: &str = "[LAME][BUNDLE]";
/// Token logged for an empty bundle slot.
pub const EMPTY_SLOT: &str = "(nil)";
/// Prefix of an occupied slot's uthread address.
pub const ADDRESS_PREFIX: &str = "0x";
/// Leading delimiter of the logged bundle list.
const LIST_OPEN: char = '<';

/// Tagged fields of a record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Kthread,
    Size,
    Used,
    Active,
    Enabled,
    Bundle,
}

impl Field {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Kthread => "kthread",
            Self::Size => "size",
            Self::Used => "used",
            Self::Active => "active",
            Self::Enabled => "enabled",
            Self::Bundle => "bundle",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Why a line did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("line does not carry the [LAME][BUNDLE] marker")]
    NotBundleLine,
    #[error("mandatory field '{field}' is missing")]
    MissingField { field: Field },
    #[error("mandatory field '{field}' is negative ({value})")]
    NegativeField { field: Field, value: i64 },
    #[error("field '{field}' has unparseable value '{raw}'")]
    InvalidField { field: Field, raw: String },
}

impl SkipReason {
    /// Stable machine-readable code for aggregation.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotBundleLine => "not_bundle_line",
            Self::MissingField { .. } => "missing_field",
            Self::NegativeField { .. } => "negative_field",
            Self::InvalidField { .. } => "invalid_field",
        }
    }
}

/// A successfully parsed record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub owner: OwnerKey,
    pub record: BundleRecord,
}

/// Classified piece of a logged bundle list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleToken<'a> {
    Empty,
    Address(&'a str),
    /// Anything else. Dropped, never counted as a slot.
    Unrecognized(&'a str),
}

/// Split a logged bundle list into classified tokens.
///
/// A single leading `<` is stripped, the rest is split on commas and each piece
/// is trimmed before classification.
pub fn tokenize_bundle(text: &str) -> impl Iterator<Item = BundleToken<'_>> {
    let body = text.strip_prefix(LIST_OPEN).unwrap_or(text);
    body.split(',').map(|piece| {
        let piece = piece.trim();
        if piece == EMPTY_SLOT {
            BundleToken::Empty
        } else if piece.starts_with(ADDRESS_PREFIX) {
            BundleToken::Address(piece)
        } else {
            BundleToken::Unrecognized(piece)
        }
    })
}

/// Parse one raw line. `None` means the line is not a usable bundle record.
#[must_use]
pub fn parse_line(line: &str) -> Option<(OwnerKey, BundleRecord)> {
    parse_line_detailed(line)
        .ok()
        .map(|parsed| (parsed.owner, parsed.record))
}

/// Parse one raw line, explaining why it was skipped when it was.
pub fn parse_line_detailed(line: &str) -> Result<ParsedLine, SkipReason> {
    if !line.contains(BUNDLE_MARKER) {
        return Err(SkipReason::NotBundleLine);
    }

    let owner = mandatory_int(line, Field::Kthread)?;
    let owner = OwnerKey::try_from(owner).map_err(|_| SkipReason::InvalidField {
        field: Field::Kthread,
        raw: owner.to_string(),
    })?;
    let size = mandatory_u32(line, Field::Size)?;
    let used = mandatory_u32(line, Field::Used)?;
    let raw_bundle_text = tagged_values(line, Field::Bundle)
        .next()
        .ok_or(SkipReason::MissingField {
            field: Field::Bundle,
        })?
        .to_string();

    let mut slots = Vec::new();
    let mut dropped_tokens = 0;
    for token in tokenize_bundle(&raw_bundle_text) {
        match token {
            BundleToken::Empty => slots.push(Slot::Empty),
            BundleToken::Address(addr) => slots.push(Slot::Occupied(addr.to_string())),
            BundleToken::Unrecognized(_) => dropped_tokens += 1,
        }
    }

    Ok(ParsedLine {
        owner,
        record: BundleRecord {
            size,
            used,
            active: optional_int(line, Field::Active),
            enabled: optional_int(line, Field::Enabled),
            raw_bundle_text,
            slots,
            dropped_tokens,
        },
    })
}

/// Non-empty values of every `[tag:value]` group for `field`, in line order.
fn tagged_values(line: &str, field: Field) -> impl Iterator<Item = &str> {
    let open = format!("[{}:", field.tag());
    let mut rest = line;
    std::iter::from_fn(move || {
        while let Some(start) = rest.find(&open) {
            let after = &rest[start + open.len()..];
            let end = after.find(']')?;
            rest = &after[end..];
            let value = &after[..end];
            if !value.is_empty() {
                return Some(value);
            }
        }
        None
    })
}

fn parse_int(field: Field, raw: &str) -> Result<i64, SkipReason> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SkipReason::InvalidField {
            field,
            raw: raw.to_string(),
        });
    }
    raw.parse::<i64>().map_err(|_| SkipReason::InvalidField {
        field,
        raw: raw.to_string(),
    })
}

/// First well-formed non-negative occurrence of `field`.
///
/// Malformed occurrences are passed over; when none is usable the first
/// problem found is reported.
fn mandatory_int(line: &str, field: Field) -> Result<i64, SkipReason> {
    let mut first_problem = None;
    for raw in tagged_values(line, field) {
        match parse_int(field, raw) {
            Ok(value) if value >= 0 => return Ok(value),
            Ok(value) => {
                first_problem.get_or_insert(SkipReason::NegativeField { field, value });
            }
            Err(reason) => {
                first_problem.get_or_insert(reason);
            }
        }
    }
    Err(first_problem.unwrap_or(SkipReason::MissingField { field }))
}

/// `size` and `used` are capped at `u32::MAX`; larger values skip the line.
fn mandatory_u32(line: &str, field: Field) -> Result<u32, SkipReason> {
    let value = mandatory_int(line, field)?;
    u32::try_from(value).map_err(|_| SkipReason::InvalidField {
        field,
        raw: value.to_string(),
    })
}

fn optional_int(line: &str, field: Field) -> Option<i64> {
    tagged_values(line, field).find_map(|raw| match parse_int(field, raw) {
        Ok(value) if value >= 0 => Some(value),
        _ => {
            tracing::trace!(%field, raw, "ignoring informational value");
            None
        }
    })
}
