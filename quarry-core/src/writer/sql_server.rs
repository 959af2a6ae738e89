use super::sql_writer::write_integer;
use crate::{
    ColumnDef, DialectKind, Limit, LimitMode, Parameter, Result, SqlWriter, TableRef,
    separated_by,
    writer::{Context, Fragment, IdentityFetch, UpsertPlan},
};

/// SQL Server: `[name]` identifiers, `TOP`, `OUTPUT` and `MERGE`.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqlServerSqlWriter;

impl SqlWriter for SqlServerSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(context, out, value, ']', "]]");
        out.push(']');
    }

    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, name: &str) {
        out.push('@');
        out.push_str(name);
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::OutputClause
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn supports_old_values(&self) -> bool {
        true
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        mode != LimitMode::TableSampleBernoulliPercentage
    }

    fn supports_seed(&self, mode: LimitMode) -> bool {
        mode.is_table_sample()
    }

    fn write_limit_prefix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        let Some(take) = limit.take else {
            return;
        };
        let suffix = match limit.mode {
            LimitMode::Rows if limit.skip.is_some() => return,
            LimitMode::Rows | LimitMode::RandomSampleRows => ") ",
            LimitMode::RowsWithTies => ") WITH TIES ",
            LimitMode::Percentage => ") PERCENT ",
            LimitMode::PercentageWithTies => ") PERCENT WITH TIES ",
            _ => return,
        };
        out.push_str("TOP (");
        write_integer!(out, take);
        out.push_str(suffix);
    }

    fn write_table_sample(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        let unit = match limit.mode {
            LimitMode::TableSampleSystemRows => " ROWS)",
            LimitMode::TableSampleSystemPercentage => " PERCENT)",
            _ => return,
        };
        out.push_str(" TABLESAMPLE SYSTEM (");
        write_integer!(out, limit.take.unwrap_or_default());
        out.push_str(unit);
        if let Some(seed) = limit.seed {
            out.push_str(" REPEATABLE (");
            write_integer!(out, seed);
            out.push(')');
        }
    }

    fn write_random_order(&self, _context: &mut Context, out: &mut String, _seed: Option<u64>) {
        out.push_str("NEWID()");
    }

    fn write_limit_suffix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        if limit.mode != LimitMode::Rows {
            return;
        }
        let Some(skip) = limit.skip else {
            return;
        };
        out.push_str("\nOFFSET ");
        write_integer!(out, skip);
        out.push_str(" ROWS");
        if let Some(take) = limit.take {
            out.push_str("\nFETCH NEXT ");
            write_integer!(out, take);
            out.push_str(" ROWS ONLY");
        }
    }

    fn write_output_clause(
        &self,
        context: &mut Context,
        out: &mut String,
        columns: &[&ColumnDef],
        old_values: bool,
    ) {
        out.push_str("\nOUTPUT ");
        let mut context = context.switch_fragment(if old_values {
            Fragment::SqlOutputDeleted
        } else {
            Fragment::SqlOutputInserted
        });
        separated_by(
            out,
            columns,
            |out, c| self.write_column(&mut context.current, out, c),
            ", ",
        );
    }

    fn write_identity_insert(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &TableRef,
        enable: bool,
    ) {
        if !enable {
            out.push('\n');
        }
        out.push_str("SET IDENTITY_INSERT ");
        self.write_table_ref(context, out, table);
        out.push_str(if enable { " ON;\n" } else { " OFF;" });
    }

    fn write_upsert(
        &self,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        plan: &UpsertPlan,
    ) -> Result<()> {
        out.reserve(256 + plan.values.len() * 64);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto);
        if plan.identity_insert {
            self.write_identity_insert(&mut context, out, &plan.table.table_ref, true);
        }
        out.push_str("MERGE INTO ");
        self.write_table_ref(&mut context, out, &plan.table.table_ref);
        out.push_str(" AS target\nUSING (VALUES (");
        separated_by(
            out,
            &plan.values,
            |out, v| self.write_parameter(&mut context, out, parameters, &v.parameter, &v.value),
            ", ",
        );
        out.push_str(")) AS source (");
        separated_by(
            out,
            &plan.values,
            |out, v| self.write_column(&mut context, out, v.column),
            ", ",
        );
        out.push_str(")\nON ");
        separated_by(
            out,
            &plan.keys,
            |out, v| {
                self.write_column(
                    &mut context.switch_fragment(Fragment::SqlMergeTarget).current,
                    out,
                    v,
                );
                out.push_str(" = ");
                self.write_column(
                    &mut context.switch_fragment(Fragment::SqlMergeSource).current,
                    out,
                    v,
                );
            },
            " AND ",
        );
        let mut updates = plan.updates().peekable();
        if updates.peek().is_some() {
            out.push_str("\nWHEN MATCHED THEN UPDATE SET ");
            separated_by(
                out,
                updates,
                |out, v| {
                    self.write_column(
                        &mut context.switch_fragment(Fragment::SqlMergeTarget).current,
                        out,
                        v.column,
                    );
                    out.push_str(" = ");
                    self.write_column(
                        &mut context.switch_fragment(Fragment::SqlMergeSource).current,
                        out,
                        v.column,
                    );
                },
                ", ",
            );
        }
        let inserted = plan
            .values
            .iter()
            .filter(|v| v.column.is_writable(plan.identity_insert));
        out.push_str("\nWHEN NOT MATCHED THEN INSERT (");
        separated_by(
            out,
            inserted.clone(),
            |out, v| self.write_column(&mut context, out, v.column),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(
            out,
            inserted,
            |out, v| {
                self.write_column(
                    &mut context.switch_fragment(Fragment::SqlMergeSource).current,
                    out,
                    v.column,
                )
            },
            ", ",
        );
        out.push(')');
        if !plan.returning.is_empty() {
            self.write_output_clause(&mut context, out, &plan.returning, false);
        }
        out.push(';');
        if plan.identity_insert {
            self.write_identity_insert(&mut context, out, &plan.table.table_ref, false);
        }
        Ok(())
    }
}
