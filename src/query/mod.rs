//! Where-expression mini-language
//!
//! Conditions supplied by callers are evaluated row-by-row to select
//! matching row indices. The language is closed and hand-built (tokenizer →
//! AST → evaluator); no caller-supplied string is ever handed to a host
//! evaluator, so a condition cannot execute code.
//!
//! # Grammar
//!
//! ```text
//! expr    := or
//! or      := and (("|" | "||") and)*
//! and     := cmp (("&" | "&&") cmp)*
//! cmp     := operand (("==" | "!=" | "<" | "<=" | ">" | ">=") operand)
//!          | "(" expr ")"
//! operand := identifier | int | float | string-literal | "true" | "false"
//! ```
//!
//! Identifiers resolve to a column of the table first, then to a bound
//! variable; anything else is an unbound-variable usage error. Comparisons
//! mix long and double freely (promoted to double), compare strings
//! lexicographically, and allow only `==`/`!=` on booleans. Mask and array
//! columns cannot appear in conditions.
//!
//! The long-to-double promotion is lossy above 2^53: longs beyond f64's
//! exact-integer range round to the nearest representable double before the
//! comparison, so a mixed `==` can match values the exact integers would
//! distinguish. Compare longs against long literals to avoid this.

mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;

use crate::column::{ColumnDef, ColumnValues, Scalar};
use crate::error::{TableError, TableResult};

use eval::Bound;

/// Row-range restriction with the wire sentinel: `(0, 0)` means the full
/// available range, and a step of 0 means 1.
pub(crate) fn resolve_range(
    start: usize,
    stop: usize,
    step: usize,
    row_count: usize,
) -> (usize, usize, usize) {
    let (start, stop) = if start == 0 && stop == 0 {
        (0, row_count)
    } else {
        (start, stop.min(row_count))
    };
    (start, stop, if step == 0 { 1 } else { step })
}

/// Evaluates `condition` over the table's rows and returns the matching row
/// indices in ascending order.
///
/// `defs` and `data` are the table's schema and column storage, index-aligned.
/// The `(start, stop, step)` triple restricts the scanned range with the
/// `(0, 0)` full-range sentinel.
///
/// # Errors
///
/// Usage errors for syntax errors, unbound variables, non-comparable column
/// kinds, and type-mismatched comparisons.
pub fn get_where_list(
    condition: &str,
    variables: &HashMap<String, Scalar>,
    defs: &[ColumnDef],
    data: &[ColumnValues],
    row_count: usize,
    start: usize,
    stop: usize,
    step: usize,
) -> TableResult<Vec<usize>> {
    let tokens = lexer::tokenize(condition)?;
    let expr = parser::parse(&tokens)?;
    let bound = Bound::bind(&expr, defs, variables)?;

    let (start, stop, step) = resolve_range(start, stop, step, row_count);

    let mut matches = Vec::new();
    let mut row = start;
    while row < stop {
        if bound.matches(data, row)? {
            matches.push(row);
        }
        row += step;
    }
    Ok(matches)
}

/// Compares two scalars under one comparison operator.
///
/// # Errors
///
/// Usage error for cross-type comparisons (other than long/double mixing)
/// and for ordering comparisons on booleans.
pub(crate) fn compare(op: parser::CmpOp, lhs: &Scalar, rhs: &Scalar) -> TableResult<bool> {
    use parser::CmpOp;

    fn ordering_allowed(op: CmpOp) -> bool {
        !matches!(op, CmpOp::Eq | CmpOp::Ne)
    }

    match (lhs, rhs) {
        (Scalar::Long(a), Scalar::Long(b)) => Ok(op.holds_for(a.cmp(b))),
        (Scalar::Long(a), Scalar::Double(b)) => cmp_f64(op, *a as f64, *b),
        (Scalar::Double(a), Scalar::Long(b)) => cmp_f64(op, *a, *b as f64),
        (Scalar::Double(a), Scalar::Double(b)) => cmp_f64(op, *a, *b),
        (Scalar::Text(a), Scalar::Text(b)) => Ok(op.holds_for(a.cmp(b))),
        (Scalar::Bool(a), Scalar::Bool(b)) => {
            if ordering_allowed(op) {
                Err(TableError::usage(
                    "booleans support only == and != comparisons",
                ))
            } else {
                Ok(op.holds_for(a.cmp(b)))
            }
        }
        _ => Err(TableError::usage(format!(
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn cmp_f64(op: parser::CmpOp, a: f64, b: f64) -> TableResult<bool> {
    use parser::CmpOp;
    Ok(match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    })
}

impl Scalar {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Long(_) => "long",
            Scalar::Double(_) => "double",
            Scalar::Bool(_) => "bool",
            Scalar::Text(_) => "string",
        }
    }
}
