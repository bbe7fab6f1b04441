//! Quarantine records and their activity window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::QuarantineType;

/// A quarantine placed on an entity.
///
/// A record is *active* when its start date has passed, its end date (if
/// any) has not, and it is not temporarily disabled via `disable_until`.
/// Only active records feed the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub quarantine_type: QuarantineType,
    /// Who placed the quarantine, for bookkeeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Lifts the quarantine until this instant passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_until: Option<DateTime<Utc>>,
}

impl QuarantineRecord {
    #[must_use]
    pub fn new(quarantine_type: QuarantineType, start_date: DateTime<Utc>) -> Self {
        Self {
            quarantine_type,
            creator: None,
            comment: None,
            start_date,
            end_date: None,
            disable_until: None,
        }
    }

    pub fn creator<S: Into<String>>(mut self, creator: S) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn disable_until(mut self, disable_until: DateTime<Utc>) -> Self {
        self.disable_until = Some(disable_until);
        self
    }

    /// Whether the quarantine is in effect at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.start_date > now {
            return false;
        }
        if self.end_date.is_some_and(|end| end <= now) {
            return false;
        }
        !self.disable_until.is_some_and(|until| until > now)
    }
}
