use crate::{
    Argument, BuiltStatement, Columns, Criteria, Filter, Limit, MappingError, Result, Sort,
    Target, Value, WhereSql,
    builder::{Pending, sort::resolve_sort},
    writer::{OrderBy, Projection, SelectPlan},
};
use log::warn;

/// `SELECT` from a table or view.
///
/// ```rust,ignore
/// let statement = session
///     .select("users")?
///     .filter([("active", Value::from(true))])
///     .sort(["name"])
///     .limit(Limit::page(20, 10))
///     .build()?;
/// ```
pub struct SelectBuilder {
    target: Target,
    columns: Columns,
    criteria: Criteria,
    sort: Vec<Sort>,
    limit: Option<Limit>,
    count: bool,
    pending: Pending,
}

impl SelectBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            columns: Columns::All,
            criteria: Default::default(),
            sort: Vec::new(),
            limit: None,
            count: false,
            pending: Default::default(),
        }
    }

    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Equality filter from the members of `filter`.
    pub fn filter(mut self, filter: impl Argument) -> Self {
        self.criteria.filter = Filter::Object(self.pending.capture(&filter));
        self
    }

    /// Null members of the filter are dropped instead of rendered as `IS NULL`.
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

    /// Raw predicate, `:name` placeholders are bound to the members of `arguments`.
    pub fn where_sql(mut self, sql: impl Into<String>, arguments: impl Argument) -> Self {
        self.criteria.raw = Some(WhereSql {
            sql: sql.into(),
            arguments: self.pending.capture(&arguments),
        });
        self
    }

    pub fn sort<I, S>(mut self, sort: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Sort>,
    {
        self.sort.extend(sort.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `SELECT COUNT(*)` instead of the columns.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn build(self) -> Result<BuiltStatement> {
        self.pending.check()?;
        let table = self.target.table.as_ref();
        let writer = self.target.writer.as_ref();
        let strict = self.target.strict;
        let projection = if self.count {
            if self.limit.is_some() {
                return Err(MappingError::configuration("A count cannot be limited").into());
            }
            Projection::Count
        } else {
            let columns = self.columns.resolve(table)?;
            if columns.is_empty() {
                return Err(MappingError::configuration(format!(
                    "The select from `{}` has no columns",
                    table.table_ref
                ))
                .into());
            }
            Projection::Columns(columns)
        };
        let filter = self.criteria.resolve(table, strict, &[])?;
        let mut order = if self.count {
            Vec::new()
        } else {
            resolve_sort(&self.sort, table)?
        };
        if let Some(limit) = &self.limit {
            limit.validate(writer, !order.is_empty())?;
            if order.is_empty() && limit.needs_order() {
                order = table
                    .primary_key()
                    .map(|column| OrderBy {
                        column,
                        descending: false,
                    })
                    .collect();
                if order.is_empty() {
                    if strict {
                        return Err(MappingError::configuration(format!(
                            "Limiting `{}` needs a sort, it has no primary key to order by",
                            table.table_ref
                        ))
                        .into());
                    }
                    warn!(
                        "Limiting `{}` without a sort or primary key, the rows returned are not deterministic",
                        table.table_ref
                    );
                }
            }
        }
        let mut sql = String::new();
        let mut parameters = Vec::new();
        writer.write_select(
            &mut sql,
            &mut parameters,
            &SelectPlan {
                table,
                projection,
                filter,
                order,
                limit: self.limit,
            },
        );
        Ok(BuiltStatement::query(sql, parameters))
    }
}
