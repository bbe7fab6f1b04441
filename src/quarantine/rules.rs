//! Compiling the declarative rule source into the process-wide rule table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::error::{CerebrumError, Result};
use crate::registry::ConstantRegistry;
use crate::types::{QuarantineRules, QuarantineType, RuleSettings, SpreadSelector};

/// Compiled, immutable quarantine rule table.
///
/// Maps a quarantine type to the settings registered per spread (with the
/// `*` wildcard as its own key). Built once from the declarative source;
/// evaluation only reads it. Registering more than one rule for the same
/// (type, spread) pair is tolerated — the last one wins.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: BTreeMap<QuarantineType, BTreeMap<SpreadSelector, RuleSettings>>,
    explicit_sort: bool,
}

impl RuleTable {
    /// Compile `source` against `registry`.
    ///
    /// Fails when a rule names an unregistered quarantine type or spread,
    /// or when `sort_num` is used on some rules but not all (it must be
    /// all-or-nothing and unique across the whole table).
    pub fn build(source: &QuarantineRules, registry: &ConstantRegistry) -> Result<Self> {
        let mut rules: BTreeMap<QuarantineType, BTreeMap<SpreadSelector, RuleSettings>> =
            BTreeMap::new();
        let mut observed_sort_nums: Vec<Option<i64>> = Vec::new();

        for (name, specs) in &source.0 {
            let qtype = registry.quarantine_type(name)?;
            let per_spread = rules.entry(qtype).or_default();
            for spec in specs.as_slice() {
                observed_sort_nums.push(spec.sort_num);
                let settings = RuleSettings::from(spec);
                match spec.spread.as_ref() {
                    None => {
                        per_spread.insert(SpreadSelector::Any, settings);
                    }
                    Some(spreads) => {
                        for spread_name in spreads.as_slice() {
                            let selector = if spread_name == "*" {
                                SpreadSelector::Any
                            } else {
                                SpreadSelector::Spread(registry.spread(spread_name)?)
                            };
                            per_spread.insert(selector, settings.clone());
                        }
                    }
                }
            }
        }

        // sort_num must be unique if used, and used everywhere if used at all.
        let defined: BTreeSet<i64> = observed_sort_nums.iter().copied().flatten().collect();
        if !defined.is_empty() && defined.len() != observed_sort_nums.len() {
            return Err(CerebrumError::InvalidRules {
                reason: "sort_num must be set on every rule and unique when used".to_string(),
            });
        }
        let explicit_sort = !defined.is_empty();

        tracing::debug!(
            quarantine_types = rules.len(),
            explicit_sort,
            "compiled quarantine rule table"
        );
        Ok(Self {
            rules,
            explicit_sort,
        })
    }

    /// Whether matches are ordered by `sort_num` rather than raw type code.
    #[must_use]
    pub fn explicit_sort(&self) -> bool {
        self.explicit_sort
    }

    /// Number of quarantine types the table has rules for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn settings_for(
        &self,
        qtype: QuarantineType,
    ) -> Option<&BTreeMap<SpreadSelector, RuleSettings>> {
        self.rules.get(&qtype)
    }
}

static SHARED_TABLE: Lazy<RwLock<Option<Arc<RuleTable>>>> = Lazy::new(|| RwLock::new(None));

/// Build and cache the process-wide rule table.
///
/// The first call compiles `source`; later calls return the cached table
/// without rebuilding, so the table can only change through
/// [`reset_shared_rules`] followed by a fresh install.
pub fn install_shared_rules(
    source: &QuarantineRules,
    registry: &ConstantRegistry,
) -> Result<Arc<RuleTable>> {
    let mut slot = SHARED_TABLE.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = slot.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let table = Arc::new(RuleTable::build(source, registry)?);
    *slot = Some(Arc::clone(&table));
    Ok(table)
}

/// Read the cached process-wide table, if one has been installed.
#[must_use]
pub fn shared_rules() -> Option<Arc<RuleTable>> {
    SHARED_TABLE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Drop the cached table so the next install compiles again.
pub fn reset_shared_rules() {
    *SHARED_TABLE.write().unwrap_or_else(PoisonError::into_inner) = None;
}
