//! Matching an entity's active quarantines against the rule table.

use smallvec::SmallVec;

use crate::types::{QuarantineEffect, QuarantineType, RuleSettings, SpreadId, SpreadSelector};

use super::rules::RuleTable;

/// Resolves the effective policy for one entity's active quarantines,
/// optionally scoped to the spreads the evaluation is performed for.
///
/// `quarantines` must already be filtered to the currently active set; the
/// handler does no date arithmetic. Quarantine types without a rule table
/// entry contribute nothing, so unknown types are inert rather than errors.
#[derive(Debug, Clone)]
pub struct QuarantineHandler<'a> {
    table: &'a RuleTable,
    quarantines: Vec<QuarantineType>,
    spreads: SmallVec<[SpreadSelector; 4]>,
}

impl<'a> QuarantineHandler<'a> {
    /// An empty `spreads` list means only wildcard rules can match.
    #[must_use]
    pub fn new<Q, S>(table: &'a RuleTable, quarantines: Q, spreads: S) -> Self
    where
        Q: IntoIterator<Item = QuarantineType>,
        S: IntoIterator<Item = SpreadId>,
    {
        let mut selectors: SmallVec<[SpreadSelector; 4]> =
            spreads.into_iter().map(SpreadSelector::Spread).collect();
        // The wildcard is checked last so a spread-specific rule wins over
        // the default for the same quarantine type.
        selectors.push(SpreadSelector::Any);
        Self {
            table,
            quarantines: quarantines.into_iter().collect(),
            spreads: selectors,
        }
    }

    /// Ordered rule settings matching this handler's quarantines.
    ///
    /// Each quarantine occurrence contributes at most one settings object:
    /// the first requested spread with an entry for it. Taking only the
    /// first match is what lets a quarantine avoid locking an account for
    /// one specific spread while the wildcard rule locks everywhere else.
    fn matches(&self) -> SmallVec<[(&'a RuleSettings, QuarantineType); 4]> {
        let mut matched: SmallVec<[(&'a RuleSettings, QuarantineType); 4]> = SmallVec::new();
        for &qtype in &self.quarantines {
            let Some(per_spread) = self.table.settings_for(qtype) else {
                continue;
            };
            for selector in &self.spreads {
                if let Some(settings) = per_spread.get(selector) {
                    matched.push((settings, qtype));
                    break;
                }
            }
        }
        if self.table.explicit_sort() {
            matched.sort_by_key(|&(settings, _)| settings.sort_num.unwrap_or(i64::MAX));
        } else {
            // Without sort_num the raw type code decides, which follows
            // whatever order codes were assigned in.
            matched.sort_by_key(|&(_, qtype)| qtype);
        }
        matched
    }

    /// The shell override from the first match that names one, independent
    /// of which match decides locking.
    #[must_use]
    pub fn shell(&self) -> Option<&'a str> {
        self.matches()
            .into_iter()
            .find_map(|(settings, _)| settings.shell.as_deref())
    }

    /// Whether any selected rule asks for the entity to be skipped entirely.
    #[must_use]
    pub fn should_skip(&self) -> bool {
        self.matches().iter().any(|&(settings, _)| settings.skip)
    }

    /// Whether any selected rule locks the entity. The entity stays known
    /// to consumers; locked only gates authentication.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.matches().iter().any(|&(settings, _)| settings.lock)
    }

    /// All three outcomes resolved over one match pass.
    #[must_use]
    pub fn effect(&self) -> QuarantineEffect {
        let matches = self.matches();
        QuarantineEffect {
            is_locked: matches.iter().any(|&(settings, _)| settings.lock),
            shell: matches
                .iter()
                .find_map(|&(settings, _)| settings.shell.clone()),
            should_skip: matches.iter().any(|&(settings, _)| settings.skip),
        }
    }

    /// The matched settings in evaluation order, for callers that interpret
    /// opaque rule keys themselves.
    #[must_use]
    pub fn matched_settings(&self) -> Vec<&'a RuleSettings> {
        self.matches()
            .into_iter()
            .map(|(settings, _)| settings)
            .collect()
    }
}
