//! Module: row
//! Responsibility: the row and row-source boundary consumed by scans.
//! Does not own: query execution, connection lifecycle, or cursor internals.
//!
//! Invariants:
//! - A row source is advanced one row at a time and closed exactly once by
//!   the scan that consumes it.
//! - `Row::get` distinguishes a missing column from a SQL NULL.

mod memory;


use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use std::error::Error as StdError;

// re-exports
pub use memory::{IterRows, MemoryRows, MemoryRowsError};

///
/// Row
///
/// Ordered column-name → value mapping for one step of a row source.
/// Column names are unique; inserting an existing name replaces its value.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
pub struct Row(#[into_iterator(owned, ref)] Vec<(String, Value)>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Value of `column`; `None` when the column is absent from the row.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Set `column`, replacing any previous value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();

        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    /// Builder form of `insert`.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Column names in row order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl<C, V> FromIterator<(C, V)> for Row
where
    C: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.insert(column, value);
        }

        row
    }
}

impl<C, V> From<Vec<(C, V)>> for Row
where
    C: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: Vec<(C, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

///
/// RowSource
///
/// Sequential, closable cursor over tabular query results.
///
/// Errors are surfaced to the caller unchanged (`MapError::Upstream`).
///

pub trait RowSource {
    type Error: StdError + Send + Sync + 'static;

    /// Advance to the next row; `Ok(None)` once exhausted.
    fn next_row(&mut self) -> Result<Option<Row>, Self::Error>;

    /// Release the underlying cursor. Must tolerate repeated calls.
    fn close(&mut self);
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    type Error = S::Error;

    fn next_row(&mut self) -> Result<Option<Row>, Self::Error> {
        (**self).next_row()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    type Error = S::Error;

    fn next_row(&mut self) -> Result<Option<Row>, Self::Error> {
        (**self).next_row()
    }

    fn close(&mut self) {
        (**self).close();
    }
}
