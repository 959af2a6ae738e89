use crate::{Parameter, Result, RowsAffected, Value, truncate_long};
use std::fmt::{self, Display};

/// How the driver outcome of a statement is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Produces a result set.
    Query,
    /// Produces a row count.
    NonQuery,
    /// Produces a row count, the reported last identity is bound to `parameter` of the next
    /// statement.
    Forward { parameter: String },
}

/// Finalized SQL text with its parameters, ready for the driver.
///
/// A statement may carry a chained `next` statement, executed after it (read back of
/// generated values).
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub mode: ExecutionMode,
    pub next: Option<Box<BuiltStatement>>,
    /// Row count a `NonQuery` must report.
    pub expected_rows: Option<u64>,
}

impl BuiltStatement {
    pub fn new(sql: String, parameters: Vec<Parameter>, mode: ExecutionMode) -> Self {
        Self {
            sql,
            parameters,
            mode,
            next: None,
            expected_rows: None,
        }
    }
    /// Raw query, its parameters are supplied by the caller.
    pub fn query(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self::new(sql.into(), parameters, ExecutionMode::Query)
    }
    pub fn non_query(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self::new(sql.into(), parameters, ExecutionMode::NonQuery)
    }
    pub fn then(mut self, next: BuiltStatement) -> Self {
        self.next = Some(Box::new(next));
        self
    }
    pub fn expect_rows(mut self, rows: u64) -> Self {
        self.expected_rows = Some(rows);
        self
    }
    /// Replaces the value of every parameter named `name`.
    pub fn bind(&mut self, name: &str, value: Value) -> bool {
        let mut found = false;
        for parameter in self.parameters.iter_mut().filter(|p| p.name == name) {
            parameter.value = value.clone();
            found = true;
        }
        found
    }
    /// Statements of the chain, in execution order.
    pub fn chain(&self) -> impl Iterator<Item = &BuiltStatement> {
        std::iter::successors(Some(self), |v| v.next.as_deref())
    }
    /// True when the last statement of the chain returns rows.
    pub fn returns_rows(&self) -> bool {
        self.chain()
            .last()
            .is_some_and(|v| v.mode == ExecutionMode::Query)
    }
}

impl Display for BuiltStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.chain().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", truncate_long!(statement.sql))?;
        }
        Ok(())
    }
}

/// Receives notifications around statement execution.
///
/// Observers are synchronous and side-effect only, they cannot alter the statement.
pub trait StatementObserver: Send + Sync {
    /// Called right before the statement is sent to the driver.
    fn prepared(&self, _statement: &BuiltStatement) {}
    /// Called after a statement that reports a row count.
    fn executed(&self, _statement: &BuiltStatement, _result: &RowsAffected) {}
}

/// Anything that produces a statement: a builder or an already built statement.
pub trait IntoStatement {
    fn into_statement(self) -> Result<BuiltStatement>;
}

impl IntoStatement for BuiltStatement {
    fn into_statement(self) -> Result<BuiltStatement> {
        Ok(self)
    }
}
