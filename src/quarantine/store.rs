//! Per-entity quarantine bookkeeping and bulk lock queries.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::types::{EntityId, QuarantineRecord, QuarantineType, SpreadId};

use super::handler::QuarantineHandler;
use super::rules::RuleTable;

/// In-memory register of quarantines placed on entities.
///
/// Holds at most one record per (entity, quarantine type); adding again
/// replaces the earlier record. The store owns activity-window filtering so
/// the rule engine only ever sees currently active quarantine types.
#[derive(Debug, Clone, Default)]
pub struct QuarantineStore {
    by_entity: BTreeMap<EntityId, Vec<QuarantineRecord>>,
}

/// Filters for [`QuarantineStore::locked_entities`].
#[derive(Debug, Clone)]
pub struct LockedEntitiesQuery {
    /// Restrict the query to these entities; empty means every entity the
    /// store knows.
    pub entity_ids: Vec<EntityId>,
    /// Quarantine types left out of the evaluation entirely.
    pub ignore_quarantine_types: Vec<QuarantineType>,
    /// When false, records outside their activity window count too.
    pub only_active: bool,
}

impl Default for LockedEntitiesQuery {
    fn default() -> Self {
        Self {
            entity_ids: Vec::new(),
            ignore_quarantine_types: Vec::new(),
            only_active: true,
        }
    }
}

impl QuarantineStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a quarantine on an entity, replacing any earlier record of the
    /// same type.
    pub fn add_quarantine(&mut self, entity: EntityId, record: QuarantineRecord) {
        let records = self.by_entity.entry(entity).or_default();
        records.retain(|existing| existing.quarantine_type != record.quarantine_type);
        records.push(record);
    }

    /// Lift a quarantine until `until` passes. Returns false when the
    /// entity has no record of that type.
    pub fn disable_quarantine(
        &mut self,
        entity: EntityId,
        qtype: QuarantineType,
        until: DateTime<Utc>,
    ) -> bool {
        let Some(records) = self.by_entity.get_mut(&entity) else {
            return false;
        };
        let Some(record) = records
            .iter_mut()
            .find(|record| record.quarantine_type == qtype)
        else {
            return false;
        };
        record.disable_until = Some(until);
        true
    }

    /// Remove a quarantine record. Returns false when nothing was removed.
    pub fn delete_quarantine(&mut self, entity: EntityId, qtype: QuarantineType) -> bool {
        let Some(records) = self.by_entity.get_mut(&entity) else {
            return false;
        };
        let before = records.len();
        records.retain(|record| record.quarantine_type != qtype);
        if records.is_empty() {
            self.by_entity.remove(&entity);
        }
        before != self.by_entity.get(&entity).map_or(0, Vec::len)
    }

    /// The entity's quarantine records, optionally restricted to those
    /// active at `now`.
    #[must_use]
    pub fn quarantines(
        &self,
        entity: EntityId,
        only_active: bool,
        now: DateTime<Utc>,
    ) -> Vec<&QuarantineRecord> {
        let records = match self.by_entity.get(&entity) {
            Some(records) => records.as_slice(),
            None => &[],
        };
        records
            .iter()
            .filter(|record| !only_active || record.is_active(now))
            .collect()
    }

    /// Quarantine types active on the entity at `now`, ready for the rule
    /// engine.
    #[must_use]
    pub fn active_types(&self, entity: EntityId, now: DateTime<Utc>) -> Vec<QuarantineType> {
        self.quarantines(entity, true, now)
            .into_iter()
            .map(|record| record.quarantine_type)
            .collect()
    }

    /// Handler over the entity's active quarantines, scoped to `spreads`.
    #[must_use]
    pub fn handler_for<'a>(
        &self,
        table: &'a RuleTable,
        entity: EntityId,
        spreads: &[SpreadId],
        now: DateTime<Utc>,
    ) -> QuarantineHandler<'a> {
        QuarantineHandler::new(table, self.active_types(entity, now), spreads.iter().copied())
    }

    /// Entities whose quarantines evaluate to locked with no spread scoping.
    ///
    /// Exactly equivalent to building a spread-less handler per entity and
    /// keeping those where `is_locked()` holds; the batch form only saves
    /// the per-entity record walks.
    #[must_use]
    pub fn locked_entities(
        &self,
        table: &RuleTable,
        query: &LockedEntitiesQuery,
        now: DateTime<Utc>,
    ) -> BTreeSet<EntityId> {
        let mut candidates: BTreeMap<EntityId, Vec<QuarantineType>> = BTreeMap::new();
        for (&entity, records) in &self.by_entity {
            if !query.entity_ids.is_empty() && !query.entity_ids.contains(&entity) {
                continue;
            }
            let types: Vec<QuarantineType> = records
                .iter()
                .filter(|record| !query.only_active || record.is_active(now))
                .map(|record| record.quarantine_type)
                .filter(|qtype| !query.ignore_quarantine_types.contains(qtype))
                .collect();
            if !types.is_empty() {
                candidates.insert(entity, types);
            }
        }

        let locked: BTreeSet<EntityId> = candidates
            .into_iter()
            .filter(|(_, types)| {
                QuarantineHandler::new(table, types.iter().copied(), []).is_locked()
            })
            .map(|(entity, _)| entity)
            .collect();
        tracing::debug!(locked = locked.len(), "resolved locked entities");
        locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConstantRegistry;
    use crate::types::{QuarantineRules, RuleSpec};
    use chrono::TimeZone;

    const NOLOGIN: QuarantineType = QuarantineType(1);
    const SYSTEM: QuarantineType = QuarantineType(2);
    const ALICE: EntityId = EntityId(1001);
    const BOB: EntityId = EntityId(1002);
    const CAROL: EntityId = EntityId(1003);

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, hour, 0, 0).unwrap()
    }

    fn table() -> RuleTable {
        let mut registry = ConstantRegistry::new();
        registry.register_quarantine_type("nologin", NOLOGIN.0);
        registry.register_quarantine_type("system", SYSTEM.0);
        registry.register_spread("AD_account", 10);
        let source = QuarantineRules::new()
            .with_rule("nologin", RuleSpec::builder().lock(true).build())
            .with_rules(
                "system",
                vec![
                    RuleSpec::builder().shell("sys-shell").build(),
                    RuleSpec::builder().spread("AD_account").lock(true).build(),
                ],
            );
        RuleTable::build(&source, &registry).unwrap()
    }

    #[test]
    fn add_replaces_same_type() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)).comment("old"));
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(9)).comment("new"));

        let records = store.quarantines(ALICE, false, at(12));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].comment.as_deref(), Some("new"));
    }

    #[test]
    fn active_filtering_honors_dates() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)));
        store.add_quarantine(ALICE, QuarantineRecord::new(SYSTEM, at(18)));

        assert_eq!(store.active_types(ALICE, at(12)), vec![NOLOGIN]);
        assert_eq!(store.quarantines(ALICE, false, at(12)).len(), 2);
    }

    #[test]
    fn disable_suppresses_until_deadline() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)));
        assert!(store.disable_quarantine(ALICE, NOLOGIN, at(14)));

        assert!(store.active_types(ALICE, at(12)).is_empty());
        assert_eq!(store.active_types(ALICE, at(15)), vec![NOLOGIN]);
    }

    #[test]
    fn disable_unknown_record_reports_false() {
        let mut store = QuarantineStore::new();
        assert!(!store.disable_quarantine(ALICE, NOLOGIN, at(14)));
    }

    #[test]
    fn delete_removes_record() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)));
        assert!(store.delete_quarantine(ALICE, NOLOGIN));
        assert!(!store.delete_quarantine(ALICE, NOLOGIN));
        assert!(store.quarantines(ALICE, false, at(12)).is_empty());
    }

    #[test]
    fn handler_for_scopes_to_spreads() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(SYSTEM, at(8)));
        let table = table();

        assert!(!store.handler_for(&table, ALICE, &[], at(12)).is_locked());
        assert!(
            store
                .handler_for(&table, ALICE, &[SpreadId(10)], at(12))
                .is_locked()
        );
    }

    #[test]
    fn locked_entities_matches_per_entity_evaluation() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)));
        store.add_quarantine(BOB, QuarantineRecord::new(SYSTEM, at(8)));
        store.add_quarantine(CAROL, QuarantineRecord::new(NOLOGIN, at(18))); // not yet active
        let table = table();
        let now = at(12);

        let bulk = store.locked_entities(&table, &LockedEntitiesQuery::default(), now);

        let mut per_entity = BTreeSet::new();
        for entity in [ALICE, BOB, CAROL] {
            if store.handler_for(&table, entity, &[], now).is_locked() {
                per_entity.insert(entity);
            }
        }
        assert_eq!(bulk, per_entity);
        assert_eq!(bulk, BTreeSet::from([ALICE]));
    }

    #[test]
    fn locked_entities_honors_filters() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(ALICE, QuarantineRecord::new(NOLOGIN, at(8)));
        store.add_quarantine(BOB, QuarantineRecord::new(NOLOGIN, at(8)));
        let table = table();
        let now = at(12);

        let scoped = store.locked_entities(
            &table,
            &LockedEntitiesQuery {
                entity_ids: vec![BOB],
                ..LockedEntitiesQuery::default()
            },
            now,
        );
        assert_eq!(scoped, BTreeSet::from([BOB]));

        let ignored = store.locked_entities(
            &table,
            &LockedEntitiesQuery {
                ignore_quarantine_types: vec![NOLOGIN],
                ..LockedEntitiesQuery::default()
            },
            now,
        );
        assert!(ignored.is_empty());
    }

    #[test]
    fn locked_entities_can_include_inactive_records() {
        let mut store = QuarantineStore::new();
        store.add_quarantine(CAROL, QuarantineRecord::new(NOLOGIN, at(18)));
        let table = table();
        let now = at(12);

        assert!(
            store
                .locked_entities(&table, &LockedEntitiesQuery::default(), now)
                .is_empty()
        );
        let all = store.locked_entities(
            &table,
            &LockedEntitiesQuery {
                only_active: false,
                ..LockedEntitiesQuery::default()
            },
            now,
        );
        assert_eq!(all, BTreeSet::from([CAROL]));
    }
}
