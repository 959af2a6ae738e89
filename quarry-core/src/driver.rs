use crate::{Result, Value};
use std::future::Future;

/// Statement parameter, name and value.
///
/// Positional dialects bind them in order, named dialects by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted, `None` when the driver cannot tell.
    pub rows_affected: Option<u64>,
    /// Backend-specific last inserted / affected identifier when available.
    pub last_affected_id: Option<i64>,
}

impl RowsAffected {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            last_affected_id: None,
        }
    }
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected = match (self.rows_affected, elem.rows_affected) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Outcome of one statement sent to the driver.
#[derive(Debug)]
pub enum Execution<C> {
    /// A result set.
    Rows(C),
    /// No result set.
    Affected(RowsAffected),
}

/// Access to the current row of a cursor, shared by the blocking and async cursors.
pub trait RowSource {
    fn field_count(&self) -> usize;
    fn column_name(&self, index: usize) -> Result<&str>;
    /// Value of the column in the current row.
    fn value(&self, index: usize) -> Result<Value>;
    fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.value(index)?.is_null())
    }
}

/// Forward-only blocking cursor.
pub trait Cursor: RowSource {
    /// Moves to the next row, false once exhausted.
    fn advance(&mut self) -> Result<bool>;
    /// Releases the result set, further reads are invalid.
    fn close(&mut self) {}
}

/// Forward-only cursor advanced asynchronously.
pub trait AsyncCursor: RowSource + Send {
    fn advance(&mut self) -> impl Future<Output = Result<bool>> + Send;
    fn close(&mut self) {}
}

/// Blocking wire-level driver.
pub trait Driver {
    type Cursor: Cursor;

    fn execute(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Execution<Self::Cursor>>;
}

/// Asynchronous wire-level driver.
///
/// Cancellation is honored by the callers at the await points, the driver only has to be
/// safe to drop mid operation.
pub trait AsyncDriver: Send {
    type Cursor: AsyncCursor + 'static;

    fn execute(
        &mut self,
        sql: &str,
        parameters: &[Parameter],
    ) -> impl Future<Output = Result<Execution<Self::Cursor>>> + Send;
}
