//! gridstore - a permission-guarded columnar table store
//!
//! Clients define strongly typed tabular datasets, persist them inside
//! permission-controlled shared files, append and update rows, and query
//! them with a small conditional expression language bound to
//! caller-supplied variables. Transport and the durable binary layout are
//! collaborators, not part of this crate.

pub mod access;
pub mod backend;
pub mod column;
pub mod error;
pub mod metadata;
pub mod observability;
pub mod query;
pub mod service;
pub mod table;

pub use error::{TableError, TableResult};
pub use service::TableService;
