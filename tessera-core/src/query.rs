use crate::{AsValue, Error, Result, Value, truncate_long};
use indexmap::IndexMap;
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Column values keyed by column name, in column order.
pub type Values = IndexMap<String, Value>;

/// Sql text together with the values bound to its placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
    pub fn with_param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
    /// Stores a parameter and returns its 1-based position.
    pub fn bind(&mut self, value: Value) -> usize {
        self.params.push(value);
        self.params.len()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Outcome of a statement run for its side effects.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
}

/// Column names shared by every row of one result.
pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

/// One fetched row, `values` aligned with `labels`.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        let index = self.labels.iter().position(|v| v == name)?;
        self.values.get(index)
    }
    /// Typed read of a column that must be present in the row.
    pub fn get<T: AsValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get_column(name)
            .ok_or_else(|| Error::msg(format!("The row has no column `{}`", name)))?;
        T::try_from_value(value.clone())
    }
    pub fn into_values(self) -> Values {
        self.labels
            .iter()
            .cloned()
            .zip(self.values.into_vec())
            .collect()
    }
}
