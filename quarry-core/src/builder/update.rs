use crate::{
    Argument, ArgumentMapper, ArgumentValues, Binding, BuiltStatement, ColumnDef, Columns,
    Criteria, Filter, MapOptions, MappingError, Result, SqlWriter, TableDef, Target, Value,
    WhereSql,
    builder::{Pending, select_by_keys},
    writer::{IdentityFetch, UpdatePlan, WhereClause},
};

/// `UPDATE` of the non key members of an argument.
///
/// Without a filter the row is addressed by the key members of the values, an update of
/// every row must be requested with [`UpdateBuilder::all_rows`].
pub struct UpdateBuilder {
    target: Target,
    values: ArgumentValues,
    criteria: Criteria,
    changed_only: bool,
    key_columns: Option<Vec<String>>,
    returning: Columns,
    old_values: bool,
    all_rows: bool,
    pending: Pending,
}

impl UpdateBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            values: Default::default(),
            criteria: Default::default(),
            changed_only: false,
            key_columns: None,
            returning: Columns::None,
            old_values: false,
            all_rows: false,
            pending: Default::default(),
        }
    }

    pub fn set(mut self, values: impl Argument) -> Self {
        self.values = self.pending.capture(&values);
        self
    }

    pub fn filter(mut self, filter: impl Argument) -> Self {
        self.criteria.filter = Filter::Object(self.pending.capture(&filter));
        self
    }

    pub fn ignore_null(mut self, ignore_null: bool) -> Self {
        self.criteria.ignore_null = ignore_null;
        self
    }

    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.criteria.filter = Filter::Key(key.into());
        self
    }

    pub fn keys<I, V>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.criteria.filter = Filter::Keys(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn where_sql(mut self, sql: impl Into<String>, arguments: impl Argument) -> Self {
        self.criteria.raw = Some(WhereSql {
            sql: sql.into(),
            arguments: self.pending.capture(&arguments),
        });
        self
    }

    /// Only the members reported as changed by the values are written.
    pub fn changed_only(mut self, changed_only: bool) -> Self {
        self.changed_only = changed_only;
        self
    }

    /// Columns addressing the row instead of the primary key.
    pub fn key_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn returning(mut self, columns: impl Into<Columns>) -> Self {
        self.returning = columns.into();
        self
    }

    /// The returned rows hold the values before the update.
    pub fn old_values(mut self, old_values: bool) -> Self {
        self.old_values = old_values;
        self
    }

    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }

    pub fn build(self) -> Result<BuiltStatement> {
        self.pending.check()?;
        let table = self.target.table.as_ref();
        let strict = self.target.strict;
        let options = MapOptions {
            changed_only: self.changed_only,
            key_columns: self.key_columns.clone(),
            strict,
            ..Default::default()
        };
        let binding = ArgumentMapper::map(&self.values, table, &options)?;
        let set: Vec<Binding> = binding
            .non_key_entries()
            .filter(|v| v.column.is_writable(false))
            .cloned()
            .collect();
        let (filter, keys) = if self.criteria.is_empty() {
            let addressed =
                !binding.key_columns.is_empty() && binding.keys.len() == binding.key_columns.len();
            if addressed {
                let filter = WhereClause {
                    equals: binding.keys.clone(),
                    ..Default::default()
                };
                (filter, Some(binding.keys.clone()))
            } else {
                (WhereClause::default(), None)
            }
        } else {
            let filter = self.criteria.resolve(table, strict, &set)?;
            let keys = self.criteria.is_by_key().then(|| filter.equals.clone());
            (filter, keys)
        };
        if filter.is_empty() && !self.all_rows {
            return Err(MappingError::configuration(format!(
                "The update of `{}` has no filter and the values carry no key, call `all_rows` to update every row",
                table.table_ref
            ))
            .into());
        }
        let returning = self.returning.resolve(table)?;
        update_statement(
            self.target.writer.as_ref(),
            table,
            set,
            filter,
            keys,
            returning,
            self.old_values,
        )
    }
}

/// Update of the row addressed by `keys` (when known) or of every row matching `filter`.
pub(crate) fn update_statement<'t>(
    writer: &dyn SqlWriter,
    table: &'t TableDef,
    set: Vec<Binding<'t>>,
    filter: WhereClause<'t>,
    keys: Option<Vec<Binding<'t>>>,
    returning: Vec<&'t ColumnDef>,
    old_values: bool,
) -> Result<BuiltStatement> {
    if set.is_empty() {
        return Err(MappingError::configuration(format!(
            "The update of `{}` has no column to set",
            table.table_ref
        ))
        .into());
    }
    if old_values && !returning.is_empty() && !writer.supports_old_values() {
        return Err(MappingError::configuration(format!(
            "{} cannot return the values before an update",
            writer.dialect()
        ))
        .into());
    }
    let expected = keys.as_ref().map(|_| 1);
    let mut plan = UpdatePlan {
        table,
        set,
        filter,
        returning: Vec::new(),
        old_values,
    };
    let mut sql = String::new();
    let mut parameters = Vec::new();
    let finish = |statement: BuiltStatement| match expected {
        Some(rows) => statement.expect_rows(rows),
        None => statement,
    };
    if returning.is_empty() {
        writer.write_update(&mut sql, &mut parameters, &plan);
        return Ok(finish(BuiltStatement::non_query(sql, parameters)));
    }
    match (writer.identity_fetch(), keys) {
        (IdentityFetch::Returning | IdentityFetch::OutputClause, _) => {
            plan.returning = returning;
            writer.write_update(&mut sql, &mut parameters, &plan);
            Ok(BuiltStatement::query(sql, parameters))
        }
        (_, Some(keys)) => {
            writer.write_update(&mut sql, &mut parameters, &plan);
            Ok(finish(BuiltStatement::non_query(sql, parameters))
                .then(select_by_keys(writer, table, keys, returning)))
        }
        (_, None) => Err(MappingError::configuration(format!(
            "{} can read back only the updated rows addressed by key",
            writer.dialect()
        ))
        .into()),
    }
}
