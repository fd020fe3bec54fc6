//! Column-major result shape for read operations

use crate::column::Column;

/// The rows and columns a read-style call returned: column order matches the
/// request, and `row_numbers` names the absolute table rows the values came
/// from, in result order.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub row_numbers: Vec<usize>,
    pub columns: Vec<Column>,
}

impl Data {
    /// Number of rows carried
    pub fn row_count(&self) -> usize {
        self.row_numbers.len()
    }
}
