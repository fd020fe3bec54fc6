//! Column value storage
//!
//! `ColumnValues` is the per-kind payload of a column: one vector of rows,
//! variant-per-kind. The engine drives the three storage primitives —
//! `append_from`, `overwrite_from`, `gather` — after validation has already
//! run, so variant mismatches at this layer are internal errors surfaced as
//! usage errors rather than panics.

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

use super::{ColumnKind, MaskValue, Scalar};

/// Per-kind column payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnValues {
    Long(Vec<i64>),
    Double(Vec<f64>),
    Float(Vec<f32>),
    Bool(Vec<bool>),
    String {
        max_length: usize,
        values: Vec<String>,
    },
    File(Vec<i64>),
    Image(Vec<i64>),
    Roi(Vec<i64>),
    Well(Vec<i64>),
    Plate(Vec<i64>),
    Mask(Vec<MaskValue>),
    LongArray {
        width: usize,
        values: Vec<Vec<i64>>,
    },
    FloatArray {
        width: usize,
        values: Vec<Vec<f32>>,
    },
    DoubleArray {
        width: usize,
        values: Vec<Vec<f64>>,
    },
}

impl ColumnValues {
    /// The kind these values declare, constraint included
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Long(_) => ColumnKind::Long,
            ColumnValues::Double(_) => ColumnKind::Double,
            ColumnValues::Float(_) => ColumnKind::Float,
            ColumnValues::Bool(_) => ColumnKind::Bool,
            ColumnValues::String { max_length, .. } => ColumnKind::String {
                max_length: *max_length,
            },
            ColumnValues::File(_) => ColumnKind::File,
            ColumnValues::Image(_) => ColumnKind::Image,
            ColumnValues::Roi(_) => ColumnKind::Roi,
            ColumnValues::Well(_) => ColumnKind::Well,
            ColumnValues::Plate(_) => ColumnKind::Plate,
            ColumnValues::Mask(_) => ColumnKind::Mask,
            ColumnValues::LongArray { width, .. } => ColumnKind::LongArray { width: *width },
            ColumnValues::FloatArray { width, .. } => ColumnKind::FloatArray { width: *width },
            ColumnValues::DoubleArray { width, .. } => ColumnKind::DoubleArray { width: *width },
        }
    }

    /// Number of rows held
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Long(v)
            | ColumnValues::File(v)
            | ColumnValues::Image(v)
            | ColumnValues::Roi(v)
            | ColumnValues::Well(v)
            | ColumnValues::Plate(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::String { values, .. } => values.len(),
            ColumnValues::Mask(v) => v.len(),
            ColumnValues::LongArray { values, .. } => values.len(),
            ColumnValues::FloatArray { values, .. } => values.len(),
            ColumnValues::DoubleArray { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty payload of the given kind, used to seed freshly initialized
    /// column storage
    pub fn empty_of(kind: &ColumnKind) -> Self {
        match kind {
            ColumnKind::Long => ColumnValues::Long(Vec::new()),
            ColumnKind::Double => ColumnValues::Double(Vec::new()),
            ColumnKind::Float => ColumnValues::Float(Vec::new()),
            ColumnKind::Bool => ColumnValues::Bool(Vec::new()),
            ColumnKind::String { max_length } => ColumnValues::String {
                max_length: *max_length,
                values: Vec::new(),
            },
            ColumnKind::File => ColumnValues::File(Vec::new()),
            ColumnKind::Image => ColumnValues::Image(Vec::new()),
            ColumnKind::Roi => ColumnValues::Roi(Vec::new()),
            ColumnKind::Well => ColumnValues::Well(Vec::new()),
            ColumnKind::Plate => ColumnValues::Plate(Vec::new()),
            ColumnKind::Mask => ColumnValues::Mask(Vec::new()),
            ColumnKind::LongArray { width } => ColumnValues::LongArray {
                width: *width,
                values: Vec::new(),
            },
            ColumnKind::FloatArray { width } => ColumnValues::FloatArray {
                width: *width,
                values: Vec::new(),
            },
            ColumnKind::DoubleArray { width } => ColumnValues::DoubleArray {
                width: *width,
                values: Vec::new(),
            },
        }
    }

    /// Appends all rows of `other` to this payload, order-preserving.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the payload variants differ; the engine
    /// validates kinds before storage runs, so hitting this means a caller
    /// bypassed validation.
    pub fn append_from(&mut self, other: &ColumnValues) -> TableResult<()> {
        match (self, other) {
            (ColumnValues::Long(dst), ColumnValues::Long(src))
            | (ColumnValues::File(dst), ColumnValues::File(src))
            | (ColumnValues::Image(dst), ColumnValues::Image(src))
            | (ColumnValues::Roi(dst), ColumnValues::Roi(src))
            | (ColumnValues::Well(dst), ColumnValues::Well(src))
            | (ColumnValues::Plate(dst), ColumnValues::Plate(src)) => {
                dst.extend_from_slice(src);
                Ok(())
            }
            (ColumnValues::Double(dst), ColumnValues::Double(src)) => {
                dst.extend_from_slice(src);
                Ok(())
            }
            (ColumnValues::Float(dst), ColumnValues::Float(src)) => {
                dst.extend_from_slice(src);
                Ok(())
            }
            (ColumnValues::Bool(dst), ColumnValues::Bool(src)) => {
                dst.extend_from_slice(src);
                Ok(())
            }
            (
                ColumnValues::String { values: dst, .. },
                ColumnValues::String { values: src, .. },
            ) => {
                dst.extend(src.iter().cloned());
                Ok(())
            }
            (ColumnValues::Mask(dst), ColumnValues::Mask(src)) => {
                dst.extend(src.iter().cloned());
                Ok(())
            }
            (
                ColumnValues::LongArray { values: dst, .. },
                ColumnValues::LongArray { values: src, .. },
            ) => {
                dst.extend(src.iter().cloned());
                Ok(())
            }
            (
                ColumnValues::FloatArray { values: dst, .. },
                ColumnValues::FloatArray { values: src, .. },
            ) => {
                dst.extend(src.iter().cloned());
                Ok(())
            }
            (
                ColumnValues::DoubleArray { values: dst, .. },
                ColumnValues::DoubleArray { values: src, .. },
            ) => {
                dst.extend(src.iter().cloned());
                Ok(())
            }
            _ => Err(TableError::usage("column payload variant mismatch")),
        }
    }

    /// Overwrites the rows at `rows` with the rows of `other`, positionally:
    /// row `rows[i]` gets value `other[i]`. Indices must already be
    /// range-checked by the engine; `rows.len()` must equal `other.len()`.
    pub fn overwrite_from(&mut self, rows: &[usize], other: &ColumnValues) -> TableResult<()> {
        if rows.len() != other.len() {
            return Err(TableError::usage(format!(
                "update supplied {} rows but {} values",
                rows.len(),
                other.len()
            )));
        }

        fn write<T: Clone>(dst: &mut [T], rows: &[usize], src: &[T]) {
            for (i, &row) in rows.iter().enumerate() {
                dst[row] = src[i].clone();
            }
        }

        match (self, other) {
            (ColumnValues::Long(dst), ColumnValues::Long(src))
            | (ColumnValues::File(dst), ColumnValues::File(src))
            | (ColumnValues::Image(dst), ColumnValues::Image(src))
            | (ColumnValues::Roi(dst), ColumnValues::Roi(src))
            | (ColumnValues::Well(dst), ColumnValues::Well(src))
            | (ColumnValues::Plate(dst), ColumnValues::Plate(src)) => {
                write(dst, rows, src);
                Ok(())
            }
            (ColumnValues::Double(dst), ColumnValues::Double(src)) => {
                write(dst, rows, src);
                Ok(())
            }
            (ColumnValues::Float(dst), ColumnValues::Float(src)) => {
                write(dst, rows, src);
                Ok(())
            }
            (ColumnValues::Bool(dst), ColumnValues::Bool(src)) => {
                write(dst, rows, src);
                Ok(())
            }
            (
                ColumnValues::String { values: dst, .. },
                ColumnValues::String { values: src, .. },
            ) => {
                write(dst, rows, src);
                Ok(())
            }
            (ColumnValues::Mask(dst), ColumnValues::Mask(src)) => {
                write(dst, rows, src);
                Ok(())
            }
            (
                ColumnValues::LongArray { values: dst, .. },
                ColumnValues::LongArray { values: src, .. },
            ) => {
                write(dst, rows, src);
                Ok(())
            }
            (
                ColumnValues::FloatArray { values: dst, .. },
                ColumnValues::FloatArray { values: src, .. },
            ) => {
                write(dst, rows, src);
                Ok(())
            }
            (
                ColumnValues::DoubleArray { values: dst, .. },
                ColumnValues::DoubleArray { values: src, .. },
            ) => {
                write(dst, rows, src);
                Ok(())
            }
            _ => Err(TableError::usage("column payload variant mismatch")),
        }
    }

    /// Returns the values at `rows` in the caller's order. Indices must
    /// already be range-checked by the engine.
    pub fn gather(&self, rows: &[usize]) -> ColumnValues {
        fn pick<T: Clone>(src: &[T], rows: &[usize]) -> Vec<T> {
            rows.iter().map(|&r| src[r].clone()).collect()
        }

        match self {
            ColumnValues::Long(v) => ColumnValues::Long(pick(v, rows)),
            ColumnValues::Double(v) => ColumnValues::Double(pick(v, rows)),
            ColumnValues::Float(v) => ColumnValues::Float(pick(v, rows)),
            ColumnValues::Bool(v) => ColumnValues::Bool(pick(v, rows)),
            ColumnValues::String { max_length, values } => ColumnValues::String {
                max_length: *max_length,
                values: pick(values, rows),
            },
            ColumnValues::File(v) => ColumnValues::File(pick(v, rows)),
            ColumnValues::Image(v) => ColumnValues::Image(pick(v, rows)),
            ColumnValues::Roi(v) => ColumnValues::Roi(pick(v, rows)),
            ColumnValues::Well(v) => ColumnValues::Well(pick(v, rows)),
            ColumnValues::Plate(v) => ColumnValues::Plate(pick(v, rows)),
            ColumnValues::Mask(v) => ColumnValues::Mask(pick(v, rows)),
            ColumnValues::LongArray { width, values } => ColumnValues::LongArray {
                width: *width,
                values: pick(values, rows),
            },
            ColumnValues::FloatArray { width, values } => ColumnValues::FloatArray {
                width: *width,
                values: pick(values, rows),
            },
            ColumnValues::DoubleArray { width, values } => ColumnValues::DoubleArray {
                width: *width,
                values: pick(values, rows),
            },
        }
    }

    /// The cell at `row` as a comparable scalar, or `None` for composite
    /// kinds (mask, arrays) that the query language cannot compare
    pub fn scalar_at(&self, row: usize) -> Option<Scalar> {
        match self {
            ColumnValues::Long(v)
            | ColumnValues::File(v)
            | ColumnValues::Image(v)
            | ColumnValues::Roi(v)
            | ColumnValues::Well(v)
            | ColumnValues::Plate(v) => Some(Scalar::Long(v[row])),
            ColumnValues::Double(v) => Some(Scalar::Double(v[row])),
            ColumnValues::Float(v) => Some(Scalar::Double(f64::from(v[row]))),
            ColumnValues::Bool(v) => Some(Scalar::Bool(v[row])),
            ColumnValues::String { values, .. } => Some(Scalar::Text(values[row].clone())),
            ColumnValues::Mask(_)
            | ColumnValues::LongArray { .. }
            | ColumnValues::FloatArray { .. }
            | ColumnValues::DoubleArray { .. } => None,
        }
    }
}
