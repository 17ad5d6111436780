//! Dataset boundary.
//!
//! Derivations read tabular data through [`DataSource`]. The engine never
//! writes to it; loading and refreshing data is the host application's job.

use indexmap::IndexMap;

use crate::error::{ReactiveError, Result};
use crate::value::Value;

/// Read-only access to named columns.
pub trait DataSource: Send + Sync {
    /// All values of one column, in row order.
    fn column(&self, name: &str) -> Result<&[Value]>;

    fn column_names(&self) -> Vec<&str>;

    fn row_count(&self) -> usize;

    /// A column as numbers. Fails on the first non-numeric cell.
    fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)?.iter().map(Value::as_f64).collect()
    }
}

/// In-memory column store.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: IndexMap<String, Vec<Value>>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. All columns must have the same length.
    pub fn with_column<I, V>(mut self, name: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        if !self.columns.is_empty() && values.len() != self.rows {
            return Err(ReactiveError::Config(format!(
                "column `{name}` has {} rows, table has {}",
                values.len(),
                self.rows
            )));
        }
        if self.columns.contains_key(&name) {
            return Err(ReactiveError::Config(format!("column `{name}` already exists")));
        }

        self.rows = values.len();
        self.columns.insert(name, values);
        Ok(self)
    }
}

impl DataSource for Table {
    fn column(&self, name: &str) -> Result<&[Value]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ReactiveError::UnknownColumn(name.to_string()))
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    fn row_count(&self) -> usize {
        self.rows
    }
}
