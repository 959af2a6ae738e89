use crate::{
    Argument, ArgumentMapper, ArgumentValues, Binding, BuiltStatement, Columns, MapOptions,
    MappingError, Result, Target,
    builder::{Pending, insert::insert_statement, select_by_keys, update::update_statement},
    writer::{IdentityFetch, UpsertPlan, WhereClause},
};

/// Insert or update of one row, depending on the key.
///
/// | Key | Key value | Statement |
/// |---|---|---|
/// | identity | missing or default | `INSERT` without the key |
/// | identity | present | `UPDATE` by key, native upsert with identity insert |
/// | natural | present | native upsert (`ON CONFLICT`, `MERGE`, ...) |
pub struct UpsertBuilder {
    target: Target,
    values: ArgumentValues,
    key_columns: Option<Vec<String>>,
    returning: Columns,
    identity_insert: bool,
    pending: Pending,
}

impl UpsertBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            values: Default::default(),
            key_columns: None,
            returning: Columns::None,
            identity_insert: false,
            pending: Default::default(),
        }
    }

    pub fn values(mut self, values: impl Argument) -> Self {
        self.values = self.pending.capture(&values);
        self
    }

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

    /// Writes a supplied identity value instead of updating the existing row.
    pub fn identity_insert(mut self, identity_insert: bool) -> Self {
        self.identity_insert = identity_insert;
        self
    }

    pub fn build(self) -> Result<BuiltStatement> {
        self.pending.check()?;
        let table = self.target.table.as_ref();
        let writer = self.target.writer.as_ref();
        let options = MapOptions {
            identity_insert: self.identity_insert,
            key_columns: self.key_columns.clone(),
            strict: self.target.strict,
            ..Default::default()
        };
        let binding = ArgumentMapper::map(&self.values, table, &options)?;
        if binding.key_columns.is_empty() {
            return Err(MappingError::configuration(format!(
                "Upsert needs a key, `{}` has none",
                table.table_ref
            ))
            .into());
        }
        let returning = self.returning.resolve(table)?;
        let identity_key = binding.key_columns.iter().any(|c| c.identity);
        // Zero is a valid natural key, only generated keys treat the default as absent.
        let key_present = if identity_key {
            binding.has_key_values()
        } else {
            binding.has_all_keys()
        };
        if identity_key && !key_present {
            return insert_statement(writer, table, &binding, returning, false);
        }
        if identity_key && !(self.identity_insert && writer.supports_upsert()) {
            let set: Vec<Binding> = binding
                .non_key_entries()
                .filter(|v| v.column.is_writable(false))
                .cloned()
                .collect();
            let filter = WhereClause {
                equals: binding.keys.clone(),
                ..Default::default()
            };
            return update_statement(
                writer,
                table,
                set,
                filter,
                Some(binding.keys.clone()),
                returning,
                false,
            );
        }
        if !key_present {
            return Err(MappingError::configuration(format!(
                "Upsert into `{}` needs a value for every key column",
                table.table_ref
            ))
            .into());
        }
        if !writer.supports_upsert() {
            return Err(MappingError::configuration(format!(
                "{} does not support a native upsert",
                writer.dialect()
            ))
            .into());
        }
        let inline = matches!(
            writer.identity_fetch(),
            IdentityFetch::Returning | IdentityFetch::OutputClause
        );
        let mut plan = UpsertPlan {
            table,
            values: binding
                .entries
                .iter()
                .filter(|v| v.column.is_writable(self.identity_insert))
                .cloned()
                .collect(),
            keys: binding.key_columns.clone(),
            returning: Vec::new(),
            identity_insert: self.identity_insert,
        };
        let mut sql = String::new();
        let mut parameters = Vec::new();
        if returning.is_empty() {
            writer.write_upsert(&mut sql, &mut parameters, &plan)?;
            return Ok(BuiltStatement::non_query(sql, parameters));
        }
        if inline {
            plan.returning = returning;
            writer.write_upsert(&mut sql, &mut parameters, &plan)?;
            return Ok(BuiltStatement::query(sql, parameters));
        }
        writer.write_upsert(&mut sql, &mut parameters, &plan)?;
        Ok(BuiltStatement::non_query(sql, parameters).then(select_by_keys(
            writer,
            table,
            binding.keys.clone(),
            returning,
        )))
    }
}
