//! The table handle and its operations
//!
//! Every mutating operation consults the access guard first, then applies
//! its change to a copy of the table state, persists the copy, and only then
//! swaps it in. A failed validation, denied call or backend failure leaves
//! both the live state and the stored bytes untouched.
//!
//! Read operations take the shared lock and see a consistent snapshot; they
//! are not re-checked against the guard once the handle is open.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::access::{AccessGuard, Identity};
use crate::backend::{FileInfo, FileRepository};
use crate::column::{Column, ColumnValues, Scalar};
use crate::error::{TableError, TableResult};
use crate::metadata::MetaValue;
use crate::observability::Logger;
use crate::query;

use super::{Data, Schema, TableState};

fn read_lock(core: &RwLock<TableState>) -> RwLockReadGuard<'_, TableState> {
    // A poisoned lock means a panic mid-call; the swap-on-success discipline
    // keeps the state itself consistent.
    core.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock(core: &RwLock<TableState>) -> RwLockWriteGuard<'_, TableState> {
    core.write().unwrap_or_else(|e| e.into_inner())
}

/// An open handle to one table
pub struct Table {
    repo: Arc<dyn FileRepository>,
    guard: AccessGuard,
    caller: Identity,
    info: FileInfo,
    /// None once closed or deleted
    core: Option<Arc<RwLock<TableState>>>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("file_id", &self.info.id)
            .field("caller", &self.caller.user_id)
            .field("open", &self.core.is_some())
            .finish_non_exhaustive()
    }
}

impl Table {
    pub(crate) fn new(
        repo: Arc<dyn FileRepository>,
        guard: AccessGuard,
        caller: Identity,
        info: FileInfo,
        core: Arc<RwLock<TableState>>,
    ) -> Self {
        Self {
            repo,
            guard,
            caller,
            info,
            core: Some(core),
        }
    }

    /// Id of the backing file
    pub fn file_id(&self) -> i64 {
        self.info.id
    }

    fn core(&self) -> TableResult<&Arc<RwLock<TableState>>> {
        self.core
            .as_ref()
            .ok_or_else(|| TableError::usage("table handle has been closed"))
    }

    fn check_write(&self) -> TableResult<()> {
        self.guard
            .check_write(&self.info.ownership(), &self.caller)
            .map_err(|e| {
                Logger::warn(
                    "permission_denied",
                    &[
                        ("file_id", &self.info.id.to_string()),
                        ("user_id", &self.caller.user_id.to_string()),
                    ],
                );
                e
            })
    }

    /// Applies `mutation` to a copy of the state, persists it, and swaps it
    /// in on success.
    fn mutate<F>(&self, mutation: F) -> TableResult<()>
    where
        F: FnOnce(&mut TableState) -> TableResult<()>,
    {
        let core = self.core()?;
        let mut state = write_lock(core);
        let mut next = state.clone();
        mutation(&mut next)?;
        next.sync_reserved_metadata();
        self.repo.save(self.info.id, &next)?;
        *state = next;
        Ok(())
    }

    fn require_initialized(state: &TableState) -> TableResult<()> {
        if state.initialized {
            Ok(())
        } else {
            Err(TableError::usage("table has not been initialized"))
        }
    }

    // ------------------------------------------------------------------
    // Schema lifecycle
    // ------------------------------------------------------------------

    /// Sets the table's schema. Legal exactly once.
    ///
    /// # Errors
    ///
    /// Permission denied without write access; usage error when already
    /// initialized, or for an empty or duplicate-name column set.
    pub fn initialize(&self, columns: &[Column]) -> TableResult<()> {
        self.check_write()?;
        self.mutate(|state| {
            if state.initialized {
                return Err(TableError::usage("table is already initialized"));
            }
            let schema = Schema::from_columns(columns)?;
            state.data = schema
                .defs()
                .iter()
                .map(|d| ColumnValues::empty_of(&d.kind))
                .collect();
            state.schema = schema;
            state.row_count = 0;
            state.version = 1;
            state.initialized = true;
            Ok(())
        })?;
        Logger::info(
            "table_initialized",
            &[
                ("file_id", &self.info.id.to_string()),
                ("columns", &columns.len().to_string()),
            ],
        );
        Ok(())
    }

    /// Appends one column to the schema. Legal only while the table holds
    /// zero rows.
    pub fn add_column(&self, column: &Column) -> TableResult<()> {
        self.check_write()?;
        self.mutate(|state| {
            Self::require_initialized(state)?;
            if state.row_count > 0 {
                return Err(TableError::usage(
                    "cannot add a column once the table holds data",
                ));
            }
            let def = column.def();
            let kind = def.kind.clone();
            state.schema.add(def)?;
            state.data.push(ColumnValues::empty_of(&kind));
            state.version += 1;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Row mutation
    // ------------------------------------------------------------------

    /// Appends the supplied rows atomically. Every schema column must be
    /// supplied exactly once with equal-length values; validation runs fully
    /// before anything is stored, so a failure commits no partial row.
    pub fn add_data(&self, columns: &[Column]) -> TableResult<()> {
        self.check_write()?;
        let mut appended = 0;
        self.mutate(|state| {
            Self::require_initialized(state)?;
            if columns.is_empty() {
                return Err(TableError::usage("add_data requires at least one column"));
            }

            let row_count = columns[0].values.len();
            let mut resolved: Vec<(usize, &Column)> = Vec::with_capacity(columns.len());
            let mut seen = vec![false; state.schema.len()];
            for column in columns {
                let idx = state.schema.index_of(&column.name).ok_or_else(|| {
                    TableError::usage(format!("no column named '{}' in schema", column.name))
                })?;
                if seen[idx] {
                    return Err(TableError::usage(format!(
                        "column '{}' supplied twice",
                        column.name
                    )));
                }
                seen[idx] = true;
                if column.values.len() != row_count {
                    return Err(TableError::usage(format!(
                        "column '{}' supplies {} values but '{}' supplies {}",
                        column.name,
                        column.values.len(),
                        columns[0].name,
                        row_count,
                    )));
                }
                resolved.push((idx, column));
            }
            // The per-column row-count invariant forces complete rows.
            if !seen.iter().all(|&s| s) {
                return Err(TableError::usage(
                    "add_data must supply every column of the schema",
                ));
            }

            for (idx, column) in &resolved {
                state.schema.defs()[*idx]
                    .kind
                    .validate(&column.name, &column.values)?;
            }
            for (idx, column) in &resolved {
                state.data[*idx].append_from(&column.values)?;
            }
            state.row_count += row_count;
            state.version += 1;
            appended = row_count;
            Ok(())
        })?;
        Logger::info(
            "rows_appended",
            &[
                ("file_id", &self.info.id.to_string()),
                ("rows", &appended.to_string()),
            ],
        );
        Ok(())
    }

    /// Rewrites the targeted cells only: row `row_numbers[i]` of each
    /// supplied column gets that column's `i`-th value. Every other cell is
    /// left untouched.
    pub fn update(&self, row_numbers: &[usize], columns: &[Column]) -> TableResult<()> {
        self.check_write()?;
        if row_numbers.is_empty() && columns.is_empty() {
            // Nothing to rewrite; leave the version and the stored bytes alone.
            let core = self.core()?;
            Self::require_initialized(&read_lock(core))?;
            return Ok(());
        }
        self.mutate(|state| {
            Self::require_initialized(state)?;
            for &row in row_numbers {
                if row >= state.row_count {
                    return Err(TableError::usage(format!(
                        "row index {} out of range for {} rows",
                        row, state.row_count
                    )));
                }
            }

            let mut resolved: Vec<(usize, &Column)> = Vec::with_capacity(columns.len());
            for column in columns {
                let idx = state.schema.index_of(&column.name).ok_or_else(|| {
                    TableError::usage(format!("no column named '{}' in schema", column.name))
                })?;
                if column.values.len() != row_numbers.len() {
                    return Err(TableError::usage(format!(
                        "update targets {} rows but column '{}' supplies {} values",
                        row_numbers.len(),
                        column.name,
                        column.values.len(),
                    )));
                }
                state.schema.defs()[idx]
                    .kind
                    .validate(&column.name, &column.values)?;
                resolved.push((idx, column));
            }

            for (idx, column) in &resolved {
                state.data[*idx].overwrite_from(row_numbers, &column.values)?;
            }
            state.version += 1;
            Ok(())
        })?;
        Logger::info(
            "rows_updated",
            &[
                ("file_id", &self.info.id.to_string()),
                ("rows", &row_numbers.len().to_string()),
            ],
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Reads the requested rows restricted to the `[start, stop)` window.
    /// `(0, 0)` is the wire sentinel for the full available range, not an
    /// empty one. `None` for `row_numbers` reads the whole window.
    pub fn read(
        &self,
        row_numbers: Option<&[usize]>,
        start: usize,
        stop: usize,
    ) -> TableResult<Data> {
        let core = self.core()?;
        let state = read_lock(core);
        Self::require_initialized(&state)?;

        let (start, stop, _) = query::resolve_range(start, stop, 1, state.row_count);
        let rows: Vec<usize> = match row_numbers {
            Some(requested) => {
                Self::check_rows(requested, state.row_count)?;
                requested
                    .iter()
                    .copied()
                    .filter(|r| (start..stop).contains(r))
                    .collect()
            }
            None => (start..stop).collect(),
        };
        Ok(Self::project(&state, None, &rows))
    }

    /// Projects a subset of columns and/or rows. An empty `row_numbers`
    /// selects zero rows (this is not the `read` sentinel); an empty
    /// `column_indices` selects every column.
    pub fn slice(&self, column_indices: &[usize], row_numbers: &[usize]) -> TableResult<Data> {
        let core = self.core()?;
        let state = read_lock(core);
        Self::require_initialized(&state)?;

        for &idx in column_indices {
            if idx >= state.schema.len() {
                return Err(TableError::usage(format!(
                    "column index {} out of range for {} columns",
                    idx,
                    state.schema.len()
                )));
            }
        }
        Self::check_rows(row_numbers, state.row_count)?;

        let columns = if column_indices.is_empty() {
            None
        } else {
            Some(column_indices)
        };
        Ok(Self::project(&state, columns, row_numbers))
    }

    /// Random row gather: values come back in the caller's order, which may
    /// be unsorted.
    pub fn read_coordinates(&self, row_numbers: &[usize]) -> TableResult<Data> {
        let core = self.core()?;
        let state = read_lock(core);
        Self::require_initialized(&state)?;
        Self::check_rows(row_numbers, state.row_count)?;
        Ok(Self::project(&state, None, row_numbers))
    }

    /// Evaluates a where-condition over the `(start, stop, step)`-restricted
    /// row range and returns matching row indices in ascending order.
    pub fn get_where_list(
        &self,
        condition: &str,
        variables: &HashMap<String, Scalar>,
        start: usize,
        stop: usize,
        step: usize,
    ) -> TableResult<Vec<usize>> {
        let core = self.core()?;
        let state = read_lock(core);
        Self::require_initialized(&state)?;
        query::get_where_list(
            condition,
            variables,
            state.schema.defs(),
            &state.data,
            state.row_count,
            start,
            stop,
            step,
        )
    }

    /// Current row count; 0 before `initialize`
    pub fn get_number_of_rows(&self) -> TableResult<usize> {
        let core = self.core()?;
        Ok(read_lock(core).row_count)
    }

    /// The backing file's current record, size and content hash included
    pub fn get_original_file(&self) -> TableResult<FileInfo> {
        self.core()?;
        Ok(self.repo.stat(self.info.id)?)
    }

    fn check_rows(rows: &[usize], row_count: usize) -> TableResult<()> {
        for &row in rows {
            if row >= row_count {
                return Err(TableError::usage(format!(
                    "row index {} out of range for {} rows",
                    row, row_count
                )));
            }
        }
        Ok(())
    }

    fn project(state: &TableState, column_indices: Option<&[usize]>, rows: &[usize]) -> Data {
        let all: Vec<usize> = (0..state.schema.len()).collect();
        let selected = column_indices.unwrap_or(&all);
        let columns = selected
            .iter()
            .map(|&idx| {
                let def = &state.schema.defs()[idx];
                Column {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    values: state.data[idx].gather(rows),
                }
            })
            .collect();
        Data {
            row_numbers: rows.to_vec(),
            columns,
        }
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Sets one user metadata entry
    pub fn set_metadata(&self, key: &str, value: MetaValue) -> TableResult<()> {
        self.check_write()?;
        self.mutate(|state| state.metadata.set(key, value.clone()))
    }

    /// Reads one metadata entry, reserved keys included
    pub fn get_metadata(&self, key: &str) -> TableResult<MetaValue> {
        let core = self.core()?;
        read_lock(core).metadata.get(key)
    }

    /// Replaces all user metadata entries, leaving the reserved keys intact
    pub fn set_all_metadata(&self, entries: &BTreeMap<String, MetaValue>) -> TableResult<()> {
        self.check_write()?;
        self.mutate(|state| state.metadata.set_all(entries))
    }

    /// Every metadata entry. The reserved `initialized` and `version` keys
    /// are present; callers comparing user metadata strip them first.
    pub fn get_all_metadata(&self) -> TableResult<BTreeMap<String, MetaValue>> {
        let core = self.core()?;
        Ok(read_lock(core).metadata.all())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Removes the table's entire backing storage. Owner or admin only.
    pub fn delete(&mut self) -> TableResult<()> {
        self.core()?;
        self.guard
            .check_delete(&self.info.ownership(), &self.caller)?;
        self.repo.delete(self.info.id)?;
        self.core = None;
        Logger::info("table_deleted", &[("file_id", &self.info.id.to_string())]);
        Ok(())
    }

    /// Releases the in-memory handle. Storage persists; every mutation was
    /// already persisted when it ran. Safe to call on every exit path,
    /// including after a failed operation or a `delete`.
    pub fn close(&mut self) {
        self.core = None;
    }
}
