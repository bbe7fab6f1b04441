//! Identifier newtypes shared across the crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of an entity (account, person, group) in the
/// surrounding system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque numeric code naming a category of quarantine (e.g. "nologin").
///
/// Codes are assigned by the constant registry; the engine only compares
/// them. When rules carry no explicit `sort_num`, matches are ordered by
/// this raw code value, which follows whatever order codes were assigned
/// in — deterministic for a fixed registry, but not meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineType(pub u32);

impl fmt::Display for QuarantineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque numeric code naming a context ("spread") an entity participates
/// in (e.g. an AD account, an email system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadId(pub u32);

impl fmt::Display for SpreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spread pattern a compiled rule applies to: one specific spread, or the
/// `*` wildcard that matches regardless of requested spreads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpreadSelector {
    Spread(SpreadId),
    Any,
}

impl From<SpreadId> for SpreadSelector {
    fn from(spread: SpreadId) -> Self {
        Self::Spread(spread)
    }
}
