use crate::{
    row::{Row, RowSource},
    value::Value,
};
use std::collections::VecDeque;
use thiserror::Error as ThisError;

///
/// MemoryRowsError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MemoryRowsError {
    #[error("row source is closed")]
    Closed,

    #[error("injected failure at row {index}")]
    Injected { index: usize },
}

///
/// MemoryRows
///
/// In-memory row source for tests and for callers that already hold a
/// fully fetched result set.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryRows {
    rows: VecDeque<Row>,
    position: usize,
    fail_at: Option<usize>,
    closed: bool,
}

impl MemoryRows {
    pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Build rows from a column header and value tuples, the way a driver
    /// presents a result set.
    pub fn from_table<R, V>(columns: &[&str], tuples: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rows = tuples.into_iter().map(|tuple| {
            columns
                .iter()
                .map(|column| (*column).to_string())
                .zip(tuple.into_iter().map(Into::into))
                .collect::<Row>()
        });

        Self::new(rows)
    }

    /// Fail with `MemoryRowsError::Injected` when row `index` is requested.
    #[must_use]
    pub const fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for MemoryRows {
    type Error = MemoryRowsError;

    fn next_row(&mut self) -> Result<Option<Row>, Self::Error> {
        if self.closed {
            return Err(MemoryRowsError::Closed);
        }
        if self.fail_at == Some(self.position) {
            return Err(MemoryRowsError::Injected {
                index: self.position,
            });
        }

        let row = self.rows.pop_front();
        if row.is_some() {
            self.position += 1;
        }

        Ok(row)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

///
/// IterRows
///
/// Adapts a fallible row iterator into a row source. Closing drops the
/// iterator.
///

pub struct IterRows<I> {
    iter: Option<I>,
}

impl<I> IterRows<I> {
    pub const fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.iter.is_none()
    }
}

impl<I, E> RowSource for IterRows<I>
where
    I: Iterator<Item = Result<Row, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn next_row(&mut self) -> Result<Option<Row>, Self::Error> {
        match self.iter.as_mut() {
            Some(iter) => iter.next().transpose(),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.iter = None;
    }
}
