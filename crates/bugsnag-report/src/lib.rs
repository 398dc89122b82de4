//! # bugsnag-report - Report Assembly
//!
//! Builds on `bugsnag-core` with the pieces that need notifier configuration:
//!
//! - [`Configuration`] - API key, endpoint, release-stage filters and
//!   classification lists, with `BUGSNAG_*` environment overrides
//! - [`classify()`] / [`classify_trace()`] - mark stack trace lines that belong
//!   to the application's own code
//! - [`FragmentBuilder`] - merge metadata sources and classify the stack trace
//!   into [`ReportFragments`]

pub mod classify;
pub mod config;
pub mod report;

pub use classify::{classify, classify_trace, ProjectConfig};
pub use config::{split_list, Configuration, DEFAULT_ENDPOINT, ENV_PREFIX};
pub use report::{FragmentBuilder, ReportFragments};
