use super::sql_writer::write_integer;
use crate::{
    ColumnDef, DialectKind, Limit, LimitMode, Parameter, Result, SqlWriter, separated_by,
    writer::{Context, IdentityFetch, UpsertPlan},
};

/// PostgreSQL: `$n` placeholders, `RETURNING`, `ON CONFLICT` and table sampling.
#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresSqlWriter;

impl SqlWriter for PostgresSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn positional_parameters(&self) -> bool {
        true
    }

    fn write_parameter_placeholder(&self, context: &mut Context, out: &mut String, _name: &str) {
        context.counter += 1;
        out.push('$');
        write_integer!(out, context.counter);
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::Returning
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        !matches!(mode, LimitMode::Percentage | LimitMode::PercentageWithTies)
    }

    fn supports_seed(&self, mode: LimitMode) -> bool {
        matches!(
            mode,
            LimitMode::TableSampleSystemPercentage | LimitMode::TableSampleBernoulliPercentage
        )
    }

    fn write_table_sample(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        let method = match limit.mode {
            LimitMode::TableSampleSystemRows => " TABLESAMPLE SYSTEM_ROWS (",
            LimitMode::TableSampleSystemPercentage => " TABLESAMPLE SYSTEM (",
            LimitMode::TableSampleBernoulliPercentage => " TABLESAMPLE BERNOULLI (",
            _ => return,
        };
        out.push_str(method);
        write_integer!(out, limit.take.unwrap_or_default());
        out.push(')');
        if let Some(seed) = limit.seed {
            out.push_str(" REPEATABLE (");
            write_integer!(out, seed);
            out.push(')');
        }
    }

    fn write_random_order(&self, _context: &mut Context, out: &mut String, _seed: Option<u64>) {
        out.push_str("random()");
    }

    fn write_limit_suffix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        match limit.mode {
            LimitMode::Rows | LimitMode::RandomSampleRows => {
                if let Some(take) = limit.take {
                    out.push_str("\nLIMIT ");
                    write_integer!(out, take);
                }
                if let Some(skip) = limit.skip {
                    out.push_str("\nOFFSET ");
                    write_integer!(out, skip);
                }
            }
            LimitMode::RowsWithTies => {
                out.push_str("\nFETCH FIRST ");
                write_integer!(out, limit.take.unwrap_or_default());
                out.push_str(" ROWS WITH TIES");
            }
            _ => {}
        }
    }

    fn write_returning_clause(
        &self,
        context: &mut Context,
        out: &mut String,
        columns: &[&ColumnDef],
    ) {
        out.push_str("\nRETURNING ");
        separated_by(
            out,
            columns,
            |out, c| self.write_column(context, out, c),
            ", ",
        );
    }

    fn write_upsert(
        &self,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        plan: &UpsertPlan,
    ) -> Result<()> {
        self.write_insert_on_conflict(out, parameters, plan);
        Ok(())
    }
}
