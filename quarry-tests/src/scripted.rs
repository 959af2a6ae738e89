use quarry_core::{
    AsyncCursor, AsyncDriver, Cursor, Driver, Error, Execution, Parameter, Result, RowSource,
    RowsAffected, Value,
};
use std::{
    collections::VecDeque,
    future::{self, Future},
    sync::{Arc, Mutex, MutexGuard},
};

enum Outcome {
    Rows {
        labels: Vec<String>,
        rows: Vec<Vec<Value>>,
        stall_after: Option<usize>,
    },
    Affected(RowsAffected),
    Error(String),
}

/// What happened to a cursor handed out by the driver.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStats {
    /// Successful advances.
    pub rows_read: usize,
    pub rows_total: usize,
    pub closed: bool,
    pub dropped: bool,
}

impl CursorStats {
    /// Every row was read.
    pub fn exhausted(&self) -> bool {
        self.rows_read == self.rows_total
    }
}

#[derive(Default)]
struct State {
    outcomes: VecDeque<Outcome>,
    executed: Vec<(String, Vec<Parameter>)>,
    cursors: Vec<Arc<Mutex<CursorStats>>>,
}

/// In memory driver replaying queued outcomes and recording every statement it receives.
///
/// Clones share the same script, keep one to inspect the driver moved into a session.
#[derive(Default, Clone)]
pub struct ScriptedDriver {
    state: Arc<Mutex<State>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Default::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a result set.
    pub fn rows<L, S>(&self, labels: L, rows: Vec<Vec<Value>>) -> &Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().outcomes.push_back(Outcome::Rows {
            labels: labels.into_iter().map(Into::into).collect(),
            rows,
            stall_after: None,
        });
        self
    }

    /// Queues a result set whose async cursor never completes the read after `rows.len()`.
    pub fn stalled_rows<L, S>(&self, labels: L, rows: Vec<Vec<Value>>) -> &Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stall_after = Some(rows.len());
        self.state().outcomes.push_back(Outcome::Rows {
            labels: labels.into_iter().map(Into::into).collect(),
            rows,
            stall_after,
        });
        self
    }

    pub fn affected(&self, rows_affected: u64, last_affected_id: Option<i64>) -> &Self {
        self.state()
            .outcomes
            .push_back(Outcome::Affected(RowsAffected {
                rows_affected: Some(rows_affected),
                last_affected_id,
            }));
        self
    }

    /// Queues a write whose driver cannot tell the row count.
    pub fn affected_unknown(&self) -> &Self {
        self.state()
            .outcomes
            .push_back(Outcome::Affected(RowsAffected::default()));
        self
    }

    pub fn error(&self, message: impl Into<String>) -> &Self {
        self.state().outcomes.push_back(Outcome::Error(message.into()));
        self
    }

    /// Statements received so far, with their parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Parameter>)> {
        self.state().executed.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.state()
            .executed
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    /// Outcomes not consumed yet.
    pub fn pending(&self) -> usize {
        self.state().outcomes.len()
    }

    pub fn cursors(&self) -> Vec<CursorStats> {
        self.state()
            .cursors
            .iter()
            .map(|v| *v.lock().unwrap_or_else(|e| e.into_inner()))
            .collect()
    }

    fn next(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Execution<ScriptedCursor>> {
        let mut state = self.state();
        state.executed.push((sql.to_owned(), parameters.to_vec()));
        let Some(outcome) = state.outcomes.pop_front() else {
            return Err(Error::msg(format!("No scripted outcome for `{sql}`")));
        };
        match outcome {
            Outcome::Rows {
                labels,
                rows,
                stall_after,
            } => {
                let stats = Arc::new(Mutex::new(CursorStats {
                    rows_total: rows.len(),
                    ..Default::default()
                }));
                state.cursors.push(stats.clone());
                Ok(Execution::Rows(ScriptedCursor {
                    labels,
                    rows: rows.into(),
                    current: None,
                    stall_after,
                    stats,
                }))
            }
            Outcome::Affected(result) => Ok(Execution::Affected(result)),
            Outcome::Error(message) => Err(Error::msg(message)),
        }
    }
}

impl Driver for ScriptedDriver {
    type Cursor = ScriptedCursor;
    fn execute(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Execution<Self::Cursor>> {
        self.next(sql, parameters)
    }
}

impl AsyncDriver for ScriptedDriver {
    type Cursor = ScriptedCursor;
    fn execute(
        &mut self,
        sql: &str,
        parameters: &[Parameter],
    ) -> impl Future<Output = Result<Execution<Self::Cursor>>> + Send {
        future::ready(self.next(sql, parameters))
    }
}

/// Cursor over scripted rows.
pub struct ScriptedCursor {
    labels: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    stall_after: Option<usize>,
    stats: Arc<Mutex<CursorStats>>,
}

impl ScriptedCursor {
    fn stats(&self) -> MutexGuard<'_, CursorStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn step(&mut self) -> Result<bool> {
        if self.stats().closed {
            return Err(Error::msg("The cursor is closed"));
        }
        self.current = self.rows.pop_front();
        if self.current.is_some() {
            self.stats().rows_read += 1;
        }
        Ok(self.current.is_some())
    }

    fn release(&mut self) {
        self.current = None;
        self.stats().closed = true;
    }
}

impl RowSource for ScriptedCursor {
    fn field_count(&self) -> usize {
        self.labels.len()
    }
    fn column_name(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::msg(format!("No column at {index}")))
    }
    fn value(&self, index: usize) -> Result<Value> {
        let Some(row) = &self.current else {
            return Err(Error::msg("The cursor is not positioned on a row"));
        };
        Ok(row.get(index).cloned().unwrap_or_default())
    }
}

impl Cursor for ScriptedCursor {
    fn advance(&mut self) -> Result<bool> {
        self.step()
    }
    fn close(&mut self) {
        self.release();
    }
}

impl AsyncCursor for ScriptedCursor {
    fn advance(&mut self) -> impl Future<Output = Result<bool>> + Send {
        let stall = self
            .stall_after
            .is_some_and(|n| self.stats().rows_read >= n);
        let result = if stall { Ok(false) } else { self.step() };
        async move {
            if stall {
                future::pending::<()>().await;
            }
            result
        }
    }
    fn close(&mut self) {
        self.release();
    }
}

impl Drop for ScriptedCursor {
    fn drop(&mut self) {
        self.stats().dropped = true;
    }
}
