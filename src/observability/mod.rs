//! Structured logging for the table store
//!
//! Synchronous JSON lines, one event per line, deterministic key order.
//! Observability is read-only: logging never affects the outcome of the
//! call that emits it.

mod logger;

pub use logger::{Logger, Severity};
