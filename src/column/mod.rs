//! Typed column kinds for the table store
//!
//! A column is a named, described, typed vector of per-row values. The set of
//! kinds is closed: scalars (long, double, float, bool, bounded string),
//! entity references (file, image, roi, well, plate — longs tagged with the
//! entity kind they point at), the composite mask kind, and fixed-width
//! numeric arrays. New kinds are new enum variants with exhaustive-match
//! dispatch, not runtime type lookup.
//!
//! # Invariants Enforced
//!
//! - Every column of one table holds the identical row count between calls.
//! - Constraints (string max length, array width) are checked at write time,
//!   never at schema declaration time.
//! - Mask blobs are independent variable-length byte sequences; rows are not
//!   padded to a common length.

mod values;

use serde::{Deserialize, Serialize};

use crate::error::{TableResult, ValidationDetails};

pub use values::ColumnValues;

/// Declared type of a column, including its kind-specific constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// 64-bit signed integer
    Long,
    /// 64-bit floating point
    Double,
    /// 32-bit floating point
    Float,
    /// Boolean
    Bool,
    /// UTF-8 string bounded by a per-column maximum length (in characters)
    String { max_length: usize },
    /// Reference to a stored file
    File,
    /// Reference to an image
    Image,
    /// Reference to a region of interest
    Roi,
    /// Reference to a well
    Well,
    /// Reference to a plate
    Plate,
    /// Per-row mask geometry plus a variable-length byte blob
    Mask,
    /// Fixed-width array of 64-bit integers
    LongArray { width: usize },
    /// Fixed-width array of 32-bit floats
    FloatArray { width: usize },
    /// Fixed-width array of 64-bit floats
    DoubleArray { width: usize },
}

impl ColumnKind {
    /// Returns the kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            ColumnKind::Long => "long",
            ColumnKind::Double => "double",
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::String { .. } => "string",
            ColumnKind::File => "file",
            ColumnKind::Image => "image",
            ColumnKind::Roi => "roi",
            ColumnKind::Well => "well",
            ColumnKind::Plate => "plate",
            ColumnKind::Mask => "mask",
            ColumnKind::LongArray { .. } => "long_array",
            ColumnKind::FloatArray { .. } => "float_array",
            ColumnKind::DoubleArray { .. } => "double_array",
        }
    }

    /// Validates supplied values against this kind's declared constraint.
    ///
    /// Checks that the payload variant matches the kind, that every string
    /// fits the declared maximum length, and that every array row has
    /// exactly the declared width. Mask blobs are unconstrained.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Validation` on any constraint violation.
    pub fn validate(&self, column_name: &str, values: &ColumnValues) -> TableResult<()> {
        if values.kind() != *self && !self.accepts(values) {
            return Err(ValidationDetails::kind_mismatch(
                column_name,
                self.kind_name(),
                values.kind().kind_name(),
            )
            .into());
        }
        match (self, values) {
            (ColumnKind::String { max_length }, ColumnValues::String { values, .. }) => {
                for v in values {
                    let len = v.chars().count();
                    if len > *max_length {
                        return Err(ValidationDetails::string_too_long(
                            column_name,
                            *max_length,
                            len,
                        )
                        .into());
                    }
                }
            }
            (ColumnKind::LongArray { width }, ColumnValues::LongArray { values, .. }) => {
                for row in values {
                    if row.len() != *width {
                        return Err(ValidationDetails::width_mismatch(
                            column_name,
                            *width,
                            row.len(),
                        )
                        .into());
                    }
                }
            }
            (ColumnKind::FloatArray { width }, ColumnValues::FloatArray { values, .. }) => {
                for row in values {
                    if row.len() != *width {
                        return Err(ValidationDetails::width_mismatch(
                            column_name,
                            *width,
                            row.len(),
                        )
                        .into());
                    }
                }
            }
            (ColumnKind::DoubleArray { width }, ColumnValues::DoubleArray { values, .. }) => {
                for row in values {
                    if row.len() != *width {
                        return Err(ValidationDetails::width_mismatch(
                            column_name,
                            *width,
                            row.len(),
                        )
                        .into());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether a payload variant is storable under this kind, ignoring the
    /// kind-specific constraint (length and width checks happen separately;
    /// a client-declared string max or array width never overrides the
    /// schema's).
    fn accepts(&self, values: &ColumnValues) -> bool {
        matches!(
            (self, values),
            (ColumnKind::Long, ColumnValues::Long(_))
                | (ColumnKind::Double, ColumnValues::Double(_))
                | (ColumnKind::Float, ColumnValues::Float(_))
                | (ColumnKind::Bool, ColumnValues::Bool(_))
                | (ColumnKind::String { .. }, ColumnValues::String { .. })
                | (ColumnKind::File, ColumnValues::File(_))
                | (ColumnKind::Image, ColumnValues::Image(_))
                | (ColumnKind::Roi, ColumnValues::Roi(_))
                | (ColumnKind::Well, ColumnValues::Well(_))
                | (ColumnKind::Plate, ColumnValues::Plate(_))
                | (ColumnKind::Mask, ColumnValues::Mask(_))
                | (ColumnKind::LongArray { .. }, ColumnValues::LongArray { .. })
                | (ColumnKind::FloatArray { .. }, ColumnValues::FloatArray { .. })
                | (ColumnKind::DoubleArray { .. }, ColumnValues::DoubleArray { .. })
        )
    }
}

/// Schema entry: a column's identity without its values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name, unique within a table
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Declared kind and constraint
    pub kind: ColumnKind,
}

/// A column as it travels in requests and results: identity plus values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub description: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        values: ColumnValues,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            values,
        }
    }

    /// Long column
    pub fn long(name: impl Into<String>, description: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, description, ColumnValues::Long(values))
    }

    /// Double column
    pub fn double(
        name: impl Into<String>,
        description: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Self::new(name, description, ColumnValues::Double(values))
    }

    /// Bool column
    pub fn bool(name: impl Into<String>, description: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, description, ColumnValues::Bool(values))
    }

    /// Bounded string column
    pub fn string(
        name: impl Into<String>,
        description: impl Into<String>,
        max_length: usize,
        values: Vec<String>,
    ) -> Self {
        Self::new(
            name,
            description,
            ColumnValues::String { max_length, values },
        )
    }

    /// The schema entry this column declares
    pub fn def(&self) -> ColumnDef {
        ColumnDef {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.values.kind(),
        }
    }
}

/// One row of a mask column: geometry plus an unpadded byte blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskValue {
    /// Image the mask belongs to
    pub image_id: i64,
    /// Z section
    pub z: i32,
    /// Timepoint
    pub t: i32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Variable-length mask bytes
    pub bytes: Vec<u8>,
}

/// A single typed cell or binding value, as seen by the query evaluator and
/// carried in variable bindings
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Long(i64),
    Double(f64),
    Bool(bool),
    Text(String),
}
