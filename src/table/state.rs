//! Persisted per-table state
//!
//! `TableState` is the unit the persistence backend stores and loads: the
//! schema, all column data, the row count, the structural version, the
//! initialized flag, and the metadata map. The reserved metadata keys mirror
//! the flag and version so a caller enumerating metadata sees them.

use serde::{Deserialize, Serialize};

use crate::column::ColumnValues;
use crate::metadata::{MetaValue, MetadataStore, KEY_INITIALIZED, KEY_VERSION};

use super::Schema;

/// Complete in-memory and on-disk state of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// Ordered column definitions; empty until `initialize`
    pub schema: Schema,
    /// Column storage, index-aligned with the schema
    pub data: Vec<ColumnValues>,
    /// Current number of rows, identical across all columns
    pub row_count: usize,
    /// Structural version: 1 after `initialize`, incremented by every
    /// structural mutation
    pub version: u64,
    /// Whether `initialize` has run
    pub initialized: bool,
    /// Annotation map, reserved keys included
    pub metadata: MetadataStore,
}

impl Default for TableState {
    /// A fresh, uninitialized table. The reserved metadata keys are present
    /// from the start, mirroring the zero-valued structural fields.
    fn default() -> Self {
        let mut state = Self {
            schema: Schema::default(),
            data: Vec::new(),
            row_count: 0,
            version: 0,
            initialized: false,
            metadata: MetadataStore::new(),
        };
        state.sync_reserved_metadata();
        state
    }
}

impl TableState {
    /// Rewrites the reserved metadata keys from the structural fields.
    /// Called after every mutation so enumeration stays truthful.
    pub(crate) fn sync_reserved_metadata(&mut self) {
        self.metadata
            .set_reserved(KEY_INITIALIZED, MetaValue::Bool(self.initialized));
        self.metadata
            .set_reserved(KEY_VERSION, MetaValue::Long(self.version as i64));
    }
}
