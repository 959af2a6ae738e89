use crate::{
    Binding, ColumnDef, DialectKind, Limit, LimitMode, MappingError, Parameter, Result, TableDef,
    TableRef, Value, possibly_parenthesized, separated_by,
    writer::{
        Context, DeletePlan, Fragment, InsertPlan, OrderBy, Projection, RawPredicate, SelectPlan,
        UpdatePlan, UpsertPlan, WhereClause,
    },
};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
pub(crate) use write_integer;

/// How a dialect reads back values generated by an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityFetch {
    /// No support, the values can only be read back through a supplied key.
    None,
    /// `RETURNING` clause at the end of the statement.
    Returning,
    /// `OUTPUT Inserted.*` clause inside the statement.
    OutputClause,
    /// Chained select filtered by this predicate.
    ReQuery(&'static str),
    /// The driver reports the identity, bound to a chained select.
    ForwardLastIdentity,
}

/// Dialect printer converting statement plans into concrete SQL strings.
///
/// Values never appear in the text, every value is written as a placeholder and appended to
/// the parameter list. Each dialect overrides the handful of methods where its syntax differs.
pub trait SqlWriter: Send + Sync {
    fn dialect(&self) -> DialectKind;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    fn write_table_ref(&self, context: &mut Context, out: &mut String, value: &TableRef) {
        if !value.schema.is_empty() {
            self.write_identifier_quoted(context, out, &value.schema);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, &value.name);
    }

    /// Column name, qualified when the fragment requires it.
    fn write_column(&self, context: &mut Context, out: &mut String, column: &ColumnDef) {
        if let Some(qualifier) = context.fragment.qualifier() {
            out.push_str(qualifier);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, &column.sql_name);
    }

    /// Parameters are bound by position instead of by name.
    fn positional_parameters(&self) -> bool {
        false
    }

    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, name: &str) {
        out.push(':');
        out.push_str(name);
    }

    fn write_parameter(
        &self,
        context: &mut Context,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        name: &str,
        value: &Value,
    ) {
        self.write_parameter_placeholder(context, out, name);
        if self.positional_parameters() || !parameters.iter().any(|p| p.name == name) {
            parameters.push(Parameter::new(name, value.clone()));
        }
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::None
    }

    fn supports_upsert(&self) -> bool {
        false
    }

    /// Update and delete can return the values before the change.
    fn supports_old_values(&self) -> bool {
        false
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        matches!(mode, LimitMode::Rows | LimitMode::RowsWithTies)
    }

    fn supports_skip(&self) -> bool {
        true
    }

    fn supports_seed(&self, _mode: LimitMode) -> bool {
        false
    }

    /// Right after `SELECT`.
    fn write_limit_prefix(&self, _context: &mut Context, _out: &mut String, _limit: &Limit) {}

    /// Right after the table in the `FROM` clause.
    fn write_table_sample(&self, _context: &mut Context, _out: &mut String, _limit: &Limit) {}

    fn write_random_order(&self, _context: &mut Context, out: &mut String, _seed: Option<u64>) {
        out.push_str("RANDOM()");
    }

    /// After `ORDER BY`.
    fn write_limit_suffix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        if let Some(skip) = limit.skip {
            out.push_str("\nOFFSET ");
            write_integer!(out, skip);
            out.push_str(" ROWS");
        }
        if let Some(take) = limit.take {
            out.push_str(if limit.skip.is_some() {
                "\nFETCH NEXT "
            } else {
                "\nFETCH FIRST "
            });
            write_integer!(out, take);
            out.push_str(if limit.mode.with_ties() {
                " ROWS WITH TIES"
            } else {
                " ROWS ONLY"
            });
        }
    }

    /// Clause inside the statement returning the affected rows (`OUTPUT`).
    fn write_output_clause(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _columns: &[&ColumnDef],
        _old_values: bool,
    ) {
    }

    /// Clause at the end of the statement returning the affected rows (`RETURNING`).
    fn write_returning_clause(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _columns: &[&ColumnDef],
    ) {
    }

    /// Enables or disables explicit values for identity columns around an insert.
    fn write_identity_insert(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _table: &TableRef,
        _enable: bool,
    ) {
    }

    fn write_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str("\nDEFAULT VALUES");
    }

    /// `WHERE` clause, nothing when the filter is empty.
    fn write_where(
        &self,
        context: &mut Context,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        filter: &WhereClause,
    ) {
        if filter.is_empty() {
            return;
        }
        out.push_str("\nWHERE ");
        separated_by(
            out,
            &filter.equals,
            |out, binding| {
                self.write_column(context, out, binding.column);
                if binding.value.is_null() {
                    out.push_str(" IS NULL");
                } else {
                    out.push_str(" = ");
                    self.write_parameter(
                        context,
                        out,
                        parameters,
                        &binding.parameter,
                        &binding.value,
                    );
                }
            },
            " AND ",
        );
        if let Some(keys) = &filter.key_list {
            if !filter.equals.is_empty() {
                out.push_str(" AND ");
            }
            self.write_column(context, out, keys.column);
            out.push_str(" IN (");
            separated_by(
                out,
                &keys.values,
                |out, v| self.write_parameter(context, out, parameters, &v.name, &v.value),
                ", ",
            );
            out.push(')');
        }
        if let Some(raw) = &filter.raw {
            if filter.len() > 1 {
                out.push_str(" AND ");
            }
            possibly_parenthesized!(
                out,
                filter.len() > 1,
                self.write_raw_predicate(context, out, parameters, raw)
            );
        }
    }

    /// Copies the predicate text, replacing the `:name` placeholders.
    fn write_raw_predicate(
        &self,
        context: &mut Context,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        raw: &RawPredicate,
    ) {
        let mut position = 0;
        for (span, name) in raw.placeholders() {
            out.push_str(&raw.sql[position..span.start]);
            let value = raw
                .parameter(name)
                .map(|p| p.value.clone())
                .unwrap_or_default();
            self.write_parameter(context, out, parameters, name, &value);
            position = span.end;
        }
        out.push_str(&raw.sql[position..]);
    }

    fn write_order_by(&self, context: &mut Context, out: &mut String, order: &[OrderBy]) {
        separated_by(
            out,
            order,
            |out, v| {
                self.write_column(context, out, v.column);
                if v.descending {
                    out.push_str(" DESC");
                }
            },
            ", ",
        );
    }

    /// Emit SELECT statement (projection, FROM, WHERE, ORDER, LIMIT).
    fn write_select(&self, out: &mut String, parameters: &mut Vec<Parameter>, plan: &SelectPlan) {
        out.reserve(128);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        let mut context = Context::new(Fragment::SqlSelect);
        if let Some(limit) = &plan.limit {
            self.write_limit_prefix(&mut context, out, limit);
        }
        match &plan.projection {
            Projection::Count => out.push_str("COUNT(*)"),
            Projection::Columns(columns) => separated_by(
                out,
                columns,
                |out, c| self.write_column(&mut context, out, c),
                ", ",
            ),
        }
        out.push_str("\nFROM ");
        {
            let mut from = context.switch_fragment(Fragment::SqlSelectFrom);
            self.write_table_ref(&mut from.current, out, &plan.table.table_ref);
            if let Some(limit) = &plan.limit {
                self.write_table_sample(&mut from.current, out, limit);
            }
        }
        self.write_where(
            &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
            out,
            parameters,
            &plan.filter,
        );
        let random = plan
            .limit
            .filter(|v| v.mode == LimitMode::RandomSampleRows);
        if let Some(limit) = random {
            out.push_str("\nORDER BY ");
            self.write_random_order(
                &mut context.switch_fragment(Fragment::SqlSelectOrderBy).current,
                out,
                limit.seed,
            );
        } else if !plan.order.is_empty() {
            out.push_str("\nORDER BY ");
            self.write_order_by(
                &mut context.switch_fragment(Fragment::SqlSelectOrderBy).current,
                out,
                &plan.order,
            );
        }
        if let Some(limit) = &plan.limit {
            self.write_limit_suffix(&mut context, out, limit);
        }
        out.push(';');
    }

    /// `INSERT INTO table (columns) VALUES (parameters)`, with the output clause in between.
    fn write_insert_into(
        &self,
        context: &mut Context,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        table: &TableDef,
        values: &[Binding],
        output: &[&ColumnDef],
    ) {
        out.push_str("INSERT INTO ");
        self.write_table_ref(context, out, &table.table_ref);
        if !values.is_empty() {
            out.push_str(" (");
            separated_by(
                out,
                values,
                |out, v| self.write_column(context, out, v.column),
                ", ",
            );
            out.push(')');
        }
        if !output.is_empty() {
            self.write_output_clause(context, out, output, false);
        }
        if values.is_empty() {
            self.write_default_values(context, out);
        } else {
            out.push_str("\nVALUES (");
            let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
            separated_by(
                out,
                values,
                |out, v| {
                    self.write_parameter(&mut context.current, out, parameters, &v.parameter, &v.value)
                },
                ", ",
            );
            out.push(')');
        }
    }

    /// Emit INSERT for one row.
    fn write_insert(&self, out: &mut String, parameters: &mut Vec<Parameter>, plan: &InsertPlan) {
        out.reserve(128 + plan.values.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto);
        if plan.identity_insert {
            self.write_identity_insert(&mut context, out, &plan.table.table_ref, true);
        }
        self.write_insert_into(
            &mut context,
            out,
            parameters,
            plan.table,
            &plan.values,
            &plan.returning,
        );
        if !plan.returning.is_empty() {
            self.write_returning_clause(&mut context, out, &plan.returning);
        }
        out.push(';');
        if plan.identity_insert {
            self.write_identity_insert(&mut context, out, &plan.table.table_ref, false);
        }
    }

    /// Emit UPDATE with SET list and WHERE clause.
    fn write_update(&self, out: &mut String, parameters: &mut Vec<Parameter>, plan: &UpdatePlan) {
        out.reserve(128 + plan.set.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        let mut context = Context::new(Fragment::SqlUpdate);
        self.write_table_ref(&mut context, out, &plan.table.table_ref);
        out.push_str("\nSET ");
        {
            let mut set = context.switch_fragment(Fragment::SqlUpdateSet);
            separated_by(
                out,
                &plan.set,
                |out, v| {
                    self.write_column(&mut set.current, out, v.column);
                    out.push_str(" = ");
                    self.write_parameter(&mut set.current, out, parameters, &v.parameter, &v.value);
                },
                ", ",
            );
        }
        if !plan.returning.is_empty() {
            self.write_output_clause(&mut context, out, &plan.returning, plan.old_values);
        }
        self.write_where(
            &mut context.switch_fragment(Fragment::SqlUpdateWhere).current,
            out,
            parameters,
            &plan.filter,
        );
        if !plan.returning.is_empty() {
            self.write_returning_clause(&mut context, out, &plan.returning);
        }
        out.push(';');
    }

    /// Emit DELETE statement with WHERE clause.
    fn write_delete(&self, out: &mut String, parameters: &mut Vec<Parameter>, plan: &DeletePlan) {
        out.reserve(128);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        let mut context = Context::new(Fragment::SqlDeleteFrom);
        self.write_table_ref(&mut context, out, &plan.table.table_ref);
        if !plan.returning.is_empty() {
            self.write_output_clause(&mut context, out, &plan.returning, true);
        }
        self.write_where(
            &mut context
                .switch_fragment(Fragment::SqlDeleteFromWhere)
                .current,
            out,
            parameters,
            &plan.filter,
        );
        if !plan.returning.is_empty() {
            self.write_returning_clause(&mut context, out, &plan.returning);
        }
        out.push(';');
    }

    /// Emit the native insert-or-update statement.
    fn write_upsert(
        &self,
        _out: &mut String,
        _parameters: &mut Vec<Parameter>,
        _plan: &UpsertPlan,
    ) -> Result<()> {
        Err(MappingError::configuration(format!(
            "{} does not support a native upsert",
            self.dialect()
        ))
        .into())
    }

    /// `INSERT ... ON CONFLICT (keys) DO UPDATE SET column = EXCLUDED.column`.
    fn write_insert_on_conflict(
        &self,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        plan: &UpsertPlan,
    ) {
        out.reserve(128 + plan.values.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto);
        self.write_insert_into(&mut context, out, parameters, plan.table, &plan.values, &[]);
        out.push_str("\nON CONFLICT (");
        {
            let mut conflict = context.switch_fragment(Fragment::SqlInsertIntoOnConflict);
            separated_by(
                out,
                &plan.keys,
                |out, v| self.write_column(&mut conflict.current, out, v),
                ", ",
            );
        }
        out.push(')');
        let mut updates = plan.updates().peekable();
        if updates.peek().is_none() {
            out.push_str(" DO NOTHING");
        } else {
            out.push_str(" DO UPDATE SET ");
            separated_by(
                out,
                updates,
                |out, v| {
                    self.write_column(&mut context, out, v.column);
                    out.push_str(" = ");
                    self.write_column(
                        &mut context.switch_fragment(Fragment::SqlInsertIntoExcluded).current,
                        out,
                        v.column,
                    );
                },
                ", ",
            );
        }
        if !plan.returning.is_empty() {
            self.write_returning_clause(&mut context, out, &plan.returning);
        }
        out.push(';');
    }
}

/// Fallback ANSI SQL writer.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::Generic
    }
}
