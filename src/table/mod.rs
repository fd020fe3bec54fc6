//! Table engine
//!
//! A table is a schema-shaped, permission-guarded columnar dataset bound to
//! a backing file in a repository. Handles move through a small state
//! machine:
//!
//! ```text
//! Uninitialized -> Initialized -> (Closed | Deleted)
//! ```
//!
//! # Invariants Enforced
//!
//! - The schema is set exactly once by `initialize`; `add_column` is legal
//!   only while the table holds zero rows.
//! - Every column holds the identical row count between calls.
//! - Each call fully succeeds or fully fails: guard and validation checks
//!   run before any mutation, and a mutated state replaces the live one only
//!   after it has been persisted.
//! - Readers of one table see a consistent snapshot; writers of one table
//!   are serialized; distinct tables share no lock.

mod data;
mod engine;
mod schema;
mod state;

pub use data::Data;
pub use engine::Table;
pub use schema::Schema;
pub use state::TableState;
