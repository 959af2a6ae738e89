use crate::{
    Argument, ArgumentBinding, ArgumentMapper, ArgumentValues, Binding, BuiltStatement,
    ColumnDef, Columns, ExecutionMode, MapOptions, MappingError, Result, SqlWriter, TableDef,
    Target, Value,
    builder::{Pending, select_by_keys, select_by_predicate},
    writer::{IdentityFetch, InsertPlan},
};

/// `INSERT` of one row, optionally reading back the generated values.
pub struct InsertBuilder {
    target: Target,
    values: ArgumentValues,
    returning: Columns,
    identity_insert: bool,
    pending: Pending,
}

impl InsertBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            values: Default::default(),
            returning: Columns::None,
            identity_insert: false,
            pending: Default::default(),
        }
    }

    pub fn values(mut self, values: impl Argument) -> Self {
        self.values = self.pending.capture(&values);
        self
    }

    /// Columns read back after the insert, `Columns::None` by default.
    pub fn returning(mut self, columns: impl Into<Columns>) -> Self {
        self.returning = columns.into();
        self
    }

    /// Writes the identity column with the supplied value.
    pub fn identity_insert(mut self, identity_insert: bool) -> Self {
        self.identity_insert = identity_insert;
        self
    }

    pub fn build(self) -> Result<BuiltStatement> {
        self.pending.check()?;
        let table = self.target.table.as_ref();
        let options = MapOptions {
            identity_insert: self.identity_insert,
            strict: self.target.strict,
            ..Default::default()
        };
        let binding = ArgumentMapper::map(&self.values, table, &options)?;
        let returning = self.returning.resolve(table)?;
        insert_statement(
            self.target.writer.as_ref(),
            table,
            &binding,
            returning,
            self.identity_insert,
        )
    }
}

/// Insert followed, when columns are requested, by the read back strategy of the dialect.
pub(crate) fn insert_statement<'t>(
    writer: &dyn SqlWriter,
    table: &'t TableDef,
    binding: &ArgumentBinding<'t>,
    returning: Vec<&'t ColumnDef>,
    identity_insert: bool,
) -> Result<BuiltStatement> {
    let values: Vec<Binding> = binding
        .entries
        .iter()
        .filter(|v| v.column.is_writable(identity_insert))
        .cloned()
        .collect();
    let mut plan = InsertPlan {
        table,
        values,
        returning: Vec::new(),
        identity_insert,
    };
    let mut sql = String::new();
    let mut parameters = Vec::new();
    if returning.is_empty() {
        writer.write_insert(&mut sql, &mut parameters, &plan);
        return Ok(BuiltStatement::non_query(sql, parameters).expect_rows(1));
    }
    let identity = table.identity_column().filter(|_| !identity_insert);
    match (writer.identity_fetch(), identity) {
        (IdentityFetch::Returning | IdentityFetch::OutputClause, _) => {
            plan.returning = returning;
            writer.write_insert(&mut sql, &mut parameters, &plan);
            Ok(BuiltStatement::query(sql, parameters))
        }
        (IdentityFetch::ReQuery(predicate), _) => {
            writer.write_insert(&mut sql, &mut parameters, &plan);
            Ok(BuiltStatement::non_query(sql, parameters)
                .expect_rows(1)
                .then(select_by_predicate(writer, table, predicate, returning)))
        }
        (IdentityFetch::ForwardLastIdentity, Some(identity)) => {
            writer.write_insert(&mut sql, &mut parameters, &plan);
            let read_back = select_by_keys(
                writer,
                table,
                vec![Binding {
                    column: identity,
                    parameter: identity.parameter_name.clone(),
                    // Replaced by the identity reported by the driver.
                    value: Value::Int64(Some(0)),
                }],
                returning,
            );
            let mut statement = BuiltStatement::new(
                sql,
                parameters,
                ExecutionMode::Forward {
                    parameter: identity.parameter_name.clone(),
                },
            );
            statement.expected_rows = Some(1);
            Ok(statement.then(read_back))
        }
        _ => {
            if !binding.has_key_values() {
                return Err(MappingError::configuration(format!(
                    "{} cannot read back the generated values of `{}` without a key value",
                    writer.dialect(),
                    table.table_ref
                ))
                .into());
            }
            writer.write_insert(&mut sql, &mut parameters, &plan);
            Ok(BuiltStatement::non_query(sql, parameters)
                .expect_rows(1)
                .then(select_by_keys(
                    writer,
                    table,
                    binding.keys.clone(),
                    returning,
                )))
        }
    }
}
