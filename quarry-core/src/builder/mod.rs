mod columns;
mod delete;
mod filter;
mod insert;
mod limit;
mod select;
mod sort;
mod update;
mod upsert;

pub use columns::*;
pub use delete::*;
pub use filter::*;
pub use insert::*;
pub use limit::*;
pub use select::*;
pub use sort::*;
pub use update::*;
pub use upsert::*;

use crate::{
    Argument, ArgumentValues, Binding, BuiltStatement, ColumnDef, Error, IntoStatement, Result,
    SqlWriter, TableDef,
    writer::{Projection, RawPredicate, SelectPlan, WhereClause},
};
use std::sync::Arc;

/// Table, dialect and mode shared by every builder.
#[derive(Clone)]
pub struct Target {
    pub table: Arc<TableDef>,
    pub writer: Arc<dyn SqlWriter>,
    /// Strict mode: unknown members are errors and paging must be ordered.
    pub strict: bool,
}

impl Target {
    pub fn new(table: Arc<TableDef>, writer: Arc<dyn SqlWriter>, strict: bool) -> Self {
        Self {
            table,
            writer,
            strict,
        }
    }
}

/// First error hit while chaining the builder methods, returned by `build`.
#[derive(Default, Debug)]
pub(crate) struct Pending(Option<Error>);

impl Pending {
    pub(crate) fn capture(&mut self, argument: &dyn Argument) -> ArgumentValues {
        match ArgumentValues::capture(argument) {
            Ok(values) => values,
            Err(error) => {
                self.0.get_or_insert(error);
                Default::default()
            }
        }
    }
    pub(crate) fn check(self) -> Result<()> {
        match self.0 {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// `SELECT columns FROM table WHERE key = :key` reading back a written row.
pub(crate) fn select_by_keys<'t>(
    writer: &dyn SqlWriter,
    table: &'t TableDef,
    keys: Vec<Binding<'t>>,
    columns: Vec<&'t ColumnDef>,
) -> BuiltStatement {
    select_where(
        writer,
        table,
        WhereClause {
            equals: keys,
            ..Default::default()
        },
        columns,
    )
}

/// Read back filtered by a dialect predicate like `"rowid" = last_insert_rowid()`.
pub(crate) fn select_by_predicate<'t>(
    writer: &dyn SqlWriter,
    table: &'t TableDef,
    predicate: &str,
    columns: Vec<&'t ColumnDef>,
) -> BuiltStatement {
    select_where(
        writer,
        table,
        WhereClause {
            raw: Some(RawPredicate::new(predicate, Vec::new())),
            ..Default::default()
        },
        columns,
    )
}

fn select_where<'t>(
    writer: &dyn SqlWriter,
    table: &'t TableDef,
    filter: WhereClause<'t>,
    columns: Vec<&'t ColumnDef>,
) -> BuiltStatement {
    let mut sql = String::new();
    let mut parameters = Vec::new();
    writer.write_select(
        &mut sql,
        &mut parameters,
        &SelectPlan {
            table,
            projection: Projection::Columns(columns),
            filter,
            order: Vec::new(),
            limit: None,
        },
    );
    BuiltStatement::query(sql, parameters)
}

macro_rules! impl_into_statement {
    ($($builder:ty),+ $(,)?) => {
        $(
            impl IntoStatement for $builder {
                fn into_statement(self) -> Result<BuiltStatement> {
                    self.build()
                }
            }
        )+
    };
}

impl_into_statement!(
    SelectBuilder,
    InsertBuilder,
    UpdateBuilder,
    DeleteBuilder,
    UpsertBuilder,
);
