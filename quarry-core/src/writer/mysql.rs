use super::sql_writer::write_integer;
use crate::{
    DialectKind, Limit, LimitMode, Parameter, Result, SqlWriter, separated_by,
    writer::{Context, Fragment, IdentityFetch, UpsertPlan},
};

/// MySQL and MariaDB.
#[derive(Default, Debug, Clone, Copy)]
pub struct MySQLSqlWriter;

impl SqlWriter for MySQLSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(context, out, value, '`', "``");
        out.push('`');
    }

    fn positional_parameters(&self) -> bool {
        true
    }

    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, _name: &str) {
        out.push('?');
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::ForwardLastIdentity
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        matches!(mode, LimitMode::Rows | LimitMode::RandomSampleRows)
    }

    fn supports_seed(&self, mode: LimitMode) -> bool {
        mode == LimitMode::RandomSampleRows
    }

    fn write_random_order(&self, _context: &mut Context, out: &mut String, seed: Option<u64>) {
        out.push_str("RAND(");
        if let Some(seed) = seed {
            write_integer!(out, seed);
        }
        out.push(')');
    }

    fn write_limit_suffix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        if limit.take.is_none() && limit.skip.is_none() {
            return;
        }
        out.push_str("\nLIMIT ");
        if let Some(skip) = limit.skip {
            write_integer!(out, skip);
            out.push_str(", ");
        }
        write_integer!(out, limit.take.unwrap_or(u64::MAX));
    }

    fn write_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" ()\nVALUES ()");
    }

    fn write_upsert(
        &self,
        out: &mut String,
        parameters: &mut Vec<Parameter>,
        plan: &UpsertPlan,
    ) -> Result<()> {
        out.reserve(128 + plan.values.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        let mut context = Context::new(Fragment::SqlInsertInto);
        self.write_insert_into(&mut context, out, parameters, plan.table, &plan.values, &[]);
        out.push_str("\nON DUPLICATE KEY UPDATE ");
        let mut updates = plan.updates().map(|v| v.column).peekable();
        if updates.peek().is_none() {
            // Keeps the existing row untouched.
            separated_by(
                out,
                plan.keys.iter().take(1),
                |out, v| {
                    self.write_column(&mut context, out, v);
                    out.push_str(" = ");
                    self.write_column(&mut context, out, v);
                },
                ", ",
            );
        } else {
            separated_by(
                out,
                updates,
                |out, v| {
                    self.write_column(&mut context, out, v);
                    out.push_str(" = VALUES(");
                    self.write_column(&mut context, out, v);
                    out.push(')');
                },
                ", ",
            );
        }
        out.push(';');
        Ok(())
    }
}
