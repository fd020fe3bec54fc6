//! Row-wise evaluation of a parsed condition
//!
//! Identifiers are resolved once, before the row loop: column names take
//! precedence over variable bindings, and an identifier matching neither is
//! an unbound-variable usage error even when no row is ever visited.

use std::collections::HashMap;

use crate::column::{ColumnDef, ColumnKind, ColumnValues, Scalar};
use crate::error::{TableError, TableResult};

use super::compare;
use super::parser::{CmpOp, Expr, Operand};

/// A comparison operand after name resolution
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    /// Index of a column in the table's schema
    Column(usize),
    /// A literal or substituted variable value
    Value(Scalar),
}

/// A condition tree with every identifier resolved
#[derive(Debug, Clone)]
pub(crate) enum Bound {
    Cmp(Resolved, CmpOp, Resolved),
    And(Box<Bound>, Box<Bound>),
    Or(Box<Bound>, Box<Bound>),
}

impl Bound {
    /// Resolves every identifier of `expr` against the schema, then against
    /// the variable bindings.
    ///
    /// # Errors
    ///
    /// Usage error for an unbound identifier or for a column whose kind the
    /// language cannot compare (mask, arrays).
    pub(crate) fn bind(
        expr: &Expr,
        defs: &[ColumnDef],
        variables: &HashMap<String, Scalar>,
    ) -> TableResult<Bound> {
        match expr {
            Expr::Cmp(lhs, op, rhs) => Ok(Bound::Cmp(
                resolve(lhs, defs, variables)?,
                *op,
                resolve(rhs, defs, variables)?,
            )),
            Expr::And(lhs, rhs) => Ok(Bound::And(
                Box::new(Bound::bind(lhs, defs, variables)?),
                Box::new(Bound::bind(rhs, defs, variables)?),
            )),
            Expr::Or(lhs, rhs) => Ok(Bound::Or(
                Box::new(Bound::bind(lhs, defs, variables)?),
                Box::new(Bound::bind(rhs, defs, variables)?),
            )),
        }
    }

    /// Whether the condition holds for `row`
    pub(crate) fn matches(&self, data: &[ColumnValues], row: usize) -> TableResult<bool> {
        match self {
            Bound::Cmp(lhs, op, rhs) => {
                let lhs = cell(lhs, data, row);
                let rhs = cell(rhs, data, row);
                compare(*op, &lhs, &rhs)
            }
            Bound::And(lhs, rhs) => Ok(lhs.matches(data, row)? && rhs.matches(data, row)?),
            Bound::Or(lhs, rhs) => Ok(lhs.matches(data, row)? || rhs.matches(data, row)?),
        }
    }
}

fn resolve(
    operand: &Operand,
    defs: &[ColumnDef],
    variables: &HashMap<String, Scalar>,
) -> TableResult<Resolved> {
    match operand {
        Operand::Literal(v) => Ok(Resolved::Value(v.clone())),
        Operand::Ident(name) => {
            if let Some(idx) = defs.iter().position(|d| d.name == *name) {
                if !comparable(&defs[idx].kind) {
                    return Err(TableError::usage(format!(
                        "column '{}' of kind {} cannot appear in a condition",
                        name,
                        defs[idx].kind.kind_name()
                    )));
                }
                return Ok(Resolved::Column(idx));
            }
            variables
                .get(name)
                .map(|v| Resolved::Value(v.clone()))
                .ok_or_else(|| {
                    TableError::usage(format!(
                        "'{}' is neither a column nor a bound variable",
                        name
                    ))
                })
        }
    }
}

fn comparable(kind: &ColumnKind) -> bool {
    !matches!(
        kind,
        ColumnKind::Mask
            | ColumnKind::LongArray { .. }
            | ColumnKind::FloatArray { .. }
            | ColumnKind::DoubleArray { .. }
    )
}

fn cell(resolved: &Resolved, data: &[ColumnValues], row: usize) -> Scalar {
    match resolved {
        Resolved::Value(v) => v.clone(),
        Resolved::Column(idx) => data[*idx]
            .scalar_at(row)
            .unwrap_or_else(|| Scalar::Long(0)),
    }
}
