use super::sql_writer::write_integer;
use crate::{
    DialectKind, Limit, LimitMode, SqlWriter,
    writer::{Context, IdentityFetch},
};

/// Microsoft Access (Jet/ACE SQL).
#[derive(Default, Debug, Clone, Copy)]
pub struct AccessSqlWriter;

impl SqlWriter for AccessSqlWriter {
    fn dialect(&self) -> DialectKind {
        DialectKind::Access
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(context, out, value, ']', "]]");
        out.push(']');
    }

    fn positional_parameters(&self) -> bool {
        true
    }

    fn write_parameter_placeholder(&self, _context: &mut Context, out: &mut String, _name: &str) {
        out.push('?');
    }

    /// The driver reads `SELECT @@IDENTITY` on the same connection.
    fn identity_fetch(&self) -> IdentityFetch {
        IdentityFetch::ForwardLastIdentity
    }

    fn supports_limit(&self, mode: LimitMode) -> bool {
        matches!(mode, LimitMode::Rows | LimitMode::Percentage)
    }

    fn supports_skip(&self) -> bool {
        false
    }

    fn write_limit_prefix(&self, _context: &mut Context, out: &mut String, limit: &Limit) {
        let Some(take) = limit.take else {
            return;
        };
        out.push_str("TOP ");
        write_integer!(out, take);
        out.push_str(if limit.mode == LimitMode::Percentage {
            " PERCENT "
        } else {
            " "
        });
    }

    fn write_limit_suffix(&self, _context: &mut Context, _out: &mut String, _limit: &Limit) {}
}
