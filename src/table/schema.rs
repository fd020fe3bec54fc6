//! Ordered, initialize-once column schema

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnDef};
use crate::error::{TableError, TableResult};

/// The ordered column set defining a table's shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    defs: Vec<ColumnDef>,
}

impl Schema {
    /// Builds a schema from the columns of an `initialize` call.
    ///
    /// # Errors
    ///
    /// Usage error for an empty column set or a duplicate column name.
    pub fn from_columns(columns: &[Column]) -> TableResult<Self> {
        if columns.is_empty() {
            return Err(TableError::usage("cannot initialize with no columns"));
        }
        let mut schema = Schema::default();
        for column in columns {
            schema.add(column.def())?;
        }
        Ok(schema)
    }

    /// Appends one column definition.
    ///
    /// # Errors
    ///
    /// Usage error when the name is already taken.
    pub fn add(&mut self, def: ColumnDef) -> TableResult<()> {
        if self.index_of(&def.name).is_some() {
            return Err(TableError::usage(format!(
                "duplicate column name '{}'",
                def.name
            )));
        }
        self.defs.push(def);
        Ok(())
    }

    /// Position of the named column, if present
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.defs.iter().position(|d| d.name == name)
    }

    /// The definitions in declaration order
    pub fn defs(&self) -> &[ColumnDef] {
        &self.defs
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
