//! Declarative quarantine rule source and compiled rule settings.
//!
//! The rule source maps a quarantine-type name to one rule spec or an
//! ordered list of rule specs. Each spec may name the spreads it applies to
//! (`spread` as a single name or a list; absent means the `*` wildcard) and
//! carries the outcome keys the engine interprets — `lock`, `shell`, `skip`,
//! `sort_num` — plus arbitrary opaque keys passed through to callers.

use std::collections::BTreeMap;
use std::path::Path;
use std::slice;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One value or a list of values; lets the rule source write a single spec
/// or spread name where a list is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => slice::from_ref(value),
            Self::Many(values) => values.as_slice(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

/// A single rule as written in the declarative source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Lock the entity out when this rule is selected.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lock: bool,
    /// Shell override reported when this rule is the first to name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Skip the entity entirely (caller-defined, e.g. leave out of exports).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,
    /// Explicit ordering key. If any rule in the table sets this, every rule
    /// must, with unique values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_num: Option<i64>,
    /// Spread names this rule applies to; absent means the `*` wildcard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<OneOrMany<String>>,
    /// Opaque pass-through keys the engine stores but never interprets.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RuleSpec {
    /// Start a fluent builder for `RuleSpec`.
    #[must_use]
    pub fn builder() -> RuleSpecBuilder {
        RuleSpecBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSpecBuilder {
    inner: RuleSpec,
}

impl RuleSpecBuilder {
    #[must_use]
    pub fn lock(mut self, lock: bool) -> Self {
        self.inner.lock = lock;
        self
    }

    pub fn shell<S: Into<String>>(mut self, shell: S) -> Self {
        self.inner.shell = Some(shell.into());
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: bool) -> Self {
        self.inner.skip = skip;
        self
    }

    #[must_use]
    pub fn sort_num(mut self, sort_num: i64) -> Self {
        self.inner.sort_num = Some(sort_num);
        self
    }

    /// Restrict the rule to a single named spread (use `"*"` for the
    /// wildcard).
    pub fn spread<S: Into<String>>(mut self, spread: S) -> Self {
        self.inner.spread = Some(OneOrMany::One(spread.into()));
        self
    }

    pub fn spreads<I, S>(mut self, spreads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.spread = Some(OneOrMany::Many(
            spreads.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Attach an opaque key the engine passes through uninterpreted.
    pub fn extra<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.inner.extra.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn build(self) -> RuleSpec {
        self.inner
    }
}

/// The declarative rule source: quarantine-type name to one or many rule
/// specs, in evaluation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineRules(pub BTreeMap<String, OneOrMany<RuleSpec>>);

impl QuarantineRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a rule source from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a rule source from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs_err::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Add a single rule for a quarantine type, replacing any earlier entry
    /// under the same name.
    pub fn with_rule<S: Into<String>>(mut self, name: S, spec: RuleSpec) -> Self {
        self.0.insert(name.into(), OneOrMany::One(spec));
        self
    }

    /// Add an ordered list of rules for a quarantine type.
    pub fn with_rules<S: Into<String>>(mut self, name: S, specs: Vec<RuleSpec>) -> Self {
        self.0.insert(name.into(), OneOrMany::Many(specs));
        self
    }
}

/// Effective settings compiled from one `RuleSpec`, with the spread pattern
/// stripped off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    pub lock: bool,
    pub shell: Option<String>,
    pub skip: bool,
    pub sort_num: Option<i64>,
    /// Opaque keys carried over from the spec, retrievable by callers.
    pub extra: BTreeMap<String, Value>,
}

impl From<&RuleSpec> for RuleSettings {
    fn from(spec: &RuleSpec) -> Self {
        Self {
            lock: spec.lock,
            shell: spec.shell.clone(),
            skip: spec.skip,
            sort_num: spec.sort_num,
            extra: spec.extra.clone(),
        }
    }
}

/// Aggregate outcome of evaluating an entity's quarantines.
///
/// Each field is resolved independently against the ordered matches: a
/// lower-ranked rule's shell still applies when a higher-ranked rule locked
/// the entity without naming one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEffect {
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    pub should_skip: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_spec_and_list_both_parse() {
        let rules = QuarantineRules::from_json_str(
            r#"{
                "nologin": {"lock": true, "shell": "nologin-shell", "sort_num": 10},
                "system": [
                    {"lock": true, "shell": "nologin-shell2", "sort_num": 2},
                    {"spread": "AD_account", "shell": "ad-shell", "sort_num": 3}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(rules.0.len(), 2);
        assert_eq!(rules.0["nologin"].as_slice().len(), 1);
        assert_eq!(rules.0["system"].as_slice().len(), 2);
        assert_eq!(
            rules.0["system"].as_slice()[1].spread.as_ref().unwrap().as_slice(),
            ["AD_account".to_string()]
        );
    }

    #[test]
    fn spread_accepts_single_name_or_list() {
        let rules = QuarantineRules::from_json_str(
            r#"{"q": {"lock": true, "spread": ["AD_account", "email"]}}"#,
        )
        .unwrap();
        assert_eq!(
            rules.0["q"].as_slice()[0].spread.as_ref().unwrap().as_slice().len(),
            2
        );
    }

    #[test]
    fn unknown_keys_are_preserved_as_extras() {
        let rules = QuarantineRules::from_json_str(
            r#"{"q": {"lock": true, "reason": "cleanup", "priority": 4}}"#,
        )
        .unwrap();
        let spec = &rules.0["q"].as_slice()[0];
        assert_eq!(spec.extra["reason"], Value::from("cleanup"));
        assert_eq!(spec.extra["priority"], Value::from(4));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = QuarantineRules::from_json_str(r#"{"q": {"lock": "#).unwrap_err();
        assert!(matches!(err, crate::CerebrumError::RulesParse { .. }));
    }

    #[test]
    fn builder_round_trips_through_settings() {
        let spec = RuleSpec::builder()
            .lock(true)
            .shell("nologin-shell")
            .sort_num(10)
            .extra("reason", Value::from("expired"))
            .build();
        let settings = RuleSettings::from(&spec);
        assert!(settings.lock);
        assert_eq!(settings.shell.as_deref(), Some("nologin-shell"));
        assert_eq!(settings.sort_num, Some(10));
        assert_eq!(settings.extra["reason"], Value::from("expired"));
    }
}
