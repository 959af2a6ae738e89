use super::sql_writer::write_integer;
use crate::{
    DialectKind, Limit, LimitMode, Parameter, Result, SqlWriter,
    writer::{Context, IdentityFetch, UpsertPlan},
};

#[derive(Default, Debug, Clone, Copy)]
pub struct SQLiteSqlWriter;

impl SqlWriter for SQLiteSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, name: &str) {
        out.push('@');
        out.push_str(name);
    }

    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::ReQuery("\"rowid\" = last_insert_rowid()")
    }

    fn supports_upsert(&self) -> bool {
        true
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        matches!(mode, LimitMode::Rows | LimitMode::RandomSampleRows)
    }

    fn write_limit_suffix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        match (limit.take, limit.skip) {
            (Some(take), skip) => {
                out.push_str("\nLIMIT ");
                write_integer!(out, take);
                if let Some(skip) = skip {
                    out.push_str(" OFFSET ");
                    write_integer!(out, skip);
                }
            }
            (None, Some(skip)) => {
                out.push_str("\nLIMIT -1 OFFSET ");
                write_integer!(out, skip);
            }
            (None, None) => {}
        }
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
