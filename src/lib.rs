#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(test, allow(clippy::useless_vec, clippy::uninlined_format_args))]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions - these are allowed project-wide for pragmatic reasons:
//
// Documentation lints: Many internal/self-documenting functions don't need extensive docs.
// Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Performance/ergonomics trade-offs that are acceptable for this codebase:
#![allow(clippy::needless_pass_by_value)] // Builders take owned values intentionally
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't need must_use on every method
//
// Return value wrapping: Some functions use Result for consistency even when they
// currently can't fail, allowing future error conditions to be added without breaking API.
#![allow(clippy::unnecessary_wraps)]

/// The cerebrum-core crate version (matches `Cargo.toml`).
pub const CEREBRUM_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod quarantine;
pub mod registry;
pub mod types;

pub use error::{CerebrumError, Result};
pub use quarantine::{
    LockedEntitiesQuery, QuarantineHandler, QuarantineStore, RuleTable, install_shared_rules,
    reset_shared_rules, shared_rules,
};
pub use registry::ConstantRegistry;
pub use types::{
    EntityId, OneOrMany, QuarantineEffect, QuarantineRecord, QuarantineRules, QuarantineType,
    RuleSettings, RuleSpec, RuleSpecBuilder, SpreadId, SpreadSelector,
};

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
#[allow(clippy::non_std_lazy_statics)]
static SERIAL_TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Tests touching the process-wide rule table cache must not interleave.
#[cfg(test)]
pub(crate) fn run_serial_test<T>(f: impl FnOnce() -> T) -> T {
    let _guard = SERIAL_TEST_MUTEX
        .lock()
        .expect("cerebrum-core serial test mutex poisoned");
    f()
}
