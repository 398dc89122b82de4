//! # bugsnag-core - Error Report Payload Core
//!
//! Shapes the two loosely structured inputs of an error report into payload
//! fragments: user-supplied diagnostic metadata and a captured call stack.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, serde_json, thiserror, regex, backtrace, tracing).
//!
//! ## Public API
//!
//! ### Metadata (`metadata`)
//! - [`Metadata`] - Tab → key → value store with precedence-ranked merge
//! - [`DEFAULT_TAB_NAME`] - Tab used when the caller omits one
//!
//! ### Stack Traces (`stack_trace`)
//! - [`StackTrace`] - Snapshot of raw frames, projected lazily into lines
//! - [`StackTraceLine`] - Serializable per-frame record with extension fields
//! - [`RawFrame`] - One runtime frame, possibly unresolved
//! - [`friendly_method_name()`] - Display rendering of demangled symbols
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Errors of the configuration and logging layers
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding logged error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use bugsnag_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod metadata;
pub mod stack_trace;

/// Prelude for common imports used throughout the notifier crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use metadata::{Metadata, Tab, DEFAULT_TAB_NAME, DEFAULT_VALUE_KEY};
pub use stack_trace::{
    friendly_method_name, Lines, RawFrame, StackTrace, StackTraceLine, RESERVED_FIELDS,
    UNKNOWN_FILE, UNKNOWN_LINE_NUMBER,
};
