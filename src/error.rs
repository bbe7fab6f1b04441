//! Error types shared across the crate.

use thiserror::Error;

/// Convenience alias used by all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, CerebrumError>;

/// Errors raised while loading or compiling quarantine rules.
///
/// Evaluation itself never fails; every variant here is a configuration-time
/// condition surfaced before the first policy decision is made.
#[derive(Debug, Error)]
pub enum CerebrumError {
    /// The declarative rule source violates a structural invariant.
    #[error("invalid quarantine rules: {reason}")]
    InvalidRules { reason: String },

    /// A rule names a quarantine type the constant registry does not know.
    #[error("unknown quarantine type '{name}' in quarantine rules")]
    UnknownQuarantineType { name: String },

    /// A rule names a spread the constant registry does not know.
    #[error("unknown spread '{name}' in quarantine rules")]
    UnknownSpread { name: String },

    /// Reading the rule source file failed.
    #[error("failed to read quarantine rules: {source}")]
    RulesIo {
        #[from]
        source: std::io::Error,
    },

    /// The rule source was not valid JSON for the expected schema.
    #[error("failed to parse quarantine rules: {source}")]
    RulesParse {
        #[from]
        source: serde_json::Error,
    },
}
