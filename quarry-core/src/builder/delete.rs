use crate::{
    Argument, ArgumentMapper, ArgumentValues, BuiltStatement, Columns, Criteria, Filter,
    MapOptions, MappingError, Result, Target, Value, WhereSql,
    builder::Pending,
    writer::{DeletePlan, IdentityFetch, WhereClause},
};

/// `DELETE` of the rows matching a filter, or of the row addressed by an object key.
pub struct DeleteBuilder {
    target: Target,
    criteria: Criteria,
    object: Option<ArgumentValues>,
    key_columns: Option<Vec<String>>,
    returning: Columns,
    all_rows: bool,
    pending: Pending,
}

impl DeleteBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            criteria: Default::default(),
            object: None,
            key_columns: None,
            returning: Columns::None,
            all_rows: false,
            pending: Default::default(),
        }
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

    /// Deletes the row addressed by the key members of `object`, the other members are
    /// ignored. Takes precedence over the filter.
    pub fn object(mut self, object: impl Argument) -> Self {
        self.object = Some(self.pending.capture(&object));
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

    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }

    pub fn build(self) -> Result<BuiltStatement> {
        self.pending.check()?;
        let table = self.target.table.as_ref();
        let writer = self.target.writer.as_ref();
        let (filter, by_key) = match &self.object {
            Some(object) => {
                let options = MapOptions {
                    key_columns: self.key_columns.clone(),
                    strict: self.target.strict,
                    ..Default::default()
                };
                let binding = ArgumentMapper::map(object, table, &options)?;
                if binding.key_columns.is_empty()
                    || binding.keys.len() != binding.key_columns.len()
                {
                    return Err(MappingError::configuration(format!(
                        "Deleting from `{}` by object needs a value for every key column",
                        table.table_ref
                    ))
                    .into());
                }
                let filter = WhereClause {
                    equals: binding.keys,
                    ..Default::default()
                };
                (filter, true)
            }
            None => (
                self.criteria.resolve(table, self.target.strict, &[])?,
                self.criteria.is_by_key(),
            ),
        };
        if filter.is_empty() && !self.all_rows {
            return Err(MappingError::configuration(format!(
                "The delete from `{}` has no filter, call `all_rows` to delete every row",
                table.table_ref
            ))
            .into());
        }
        let returning = self.returning.resolve(table)?;
        let inline = matches!(
            writer.identity_fetch(),
            IdentityFetch::Returning | IdentityFetch::OutputClause
        );
        if !returning.is_empty() && !inline {
            return Err(MappingError::configuration(format!(
                "{} cannot return the deleted rows",
                writer.dialect()
            ))
            .into());
        }
        let plan = DeletePlan {
            table,
            filter,
            returning,
        };
        let mut sql = String::new();
        let mut parameters = Vec::new();
        writer.write_delete(&mut sql, &mut parameters, &plan);
        if !plan.returning.is_empty() {
            return Ok(BuiltStatement::query(sql, parameters));
        }
        let statement = BuiltStatement::non_query(sql, parameters);
        Ok(if by_key {
            statement.expect_rows(1)
        } else {
            statement
        })
    }
}
