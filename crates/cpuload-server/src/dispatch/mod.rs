//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and its request/outcome types so the HTTP layer
//! and tests can depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{function_label, Dispatcher, RunOutcome, RunQuery, RUN_HANDLER, UNKNOWN_FUNCTION_LABEL};
