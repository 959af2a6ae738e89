use crate::{
    ArgumentMapper, ArgumentValues, Binding, ColumnDef, MapOptions, MappingError, Parameter,
    Result, TableDef, Value,
    writer::{KeyList, RawPredicate, WhereClause},
};

/// Structured part of a `WHERE` clause.
#[derive(Default, Debug, Clone)]
pub enum Filter {
    #[default]
    None,
    /// Every member matching a column becomes `column = :parameter`.
    Object(ArgumentValues),
    /// Single scalar key.
    Key(Value),
    /// `key IN (...)`.
    Keys(Vec<Value>),
}

/// Caller written predicate with the argument supplying its parameters.
#[derive(Debug, Clone)]
pub struct WhereSql {
    pub sql: String,
    pub arguments: ArgumentValues,
}

/// Everything that contributes to the `WHERE` clause of a statement.
#[derive(Default, Debug, Clone)]
pub struct Criteria {
    pub filter: Filter,
    pub raw: Option<WhereSql>,
    /// Null members of a filter object are dropped instead of rendered as `IS NULL`.
    pub ignore_null: bool,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        matches!(self.filter, Filter::None) && self.raw.is_none()
    }

    /// Filter addresses at most one row through the primary key.
    pub fn is_by_key(&self) -> bool {
        matches!(self.filter, Filter::Key(..))
    }

    /// Builds the clause. `reserved` are bindings already written by the statement, their
    /// parameter names must not be reused.
    pub fn resolve<'t>(
        &self,
        table: &'t TableDef,
        strict: bool,
        reserved: &[Binding<'t>],
    ) -> Result<WhereClause<'t>> {
        let mut result = WhereClause::default();
        match &self.filter {
            Filter::None => {}
            Filter::Object(values) => {
                let options = MapOptions {
                    ignore_null: self.ignore_null,
                    strict,
                    ..Default::default()
                };
                result.equals = ArgumentMapper::map(values, table, &options)?.entries;
            }
            Filter::Key(value) => {
                let column = single_key(table)?;
                if value.is_null() {
                    return Err(MappingError::configuration(format!(
                        "The key of `{}` cannot be null",
                        table.table_ref
                    ))
                    .into());
                }
                result.equals.push(Binding {
                    column,
                    parameter: column.parameter_name.clone(),
                    value: value.clone(),
                });
            }
            Filter::Keys(values) => {
                let column = single_key(table)?;
                if values.is_empty() {
                    return Err(MappingError::configuration(format!(
                        "The key list filter on `{}` is empty",
                        table.table_ref
                    ))
                    .into());
                }
                result.key_list = Some(KeyList {
                    column,
                    values: values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| {
                            Parameter::new(format!("{}_{i}", column.parameter_name), v.clone())
                        })
                        .collect(),
                });
            }
        }
        let mut used: Vec<&str> = reserved
            .iter()
            .chain(&result.equals)
            .map(|v| v.parameter.as_str())
            .collect();
        if let Some(keys) = &result.key_list {
            used.extend(keys.values.iter().map(|v| v.name.as_str()));
        }
        if let Some(binding) = result.equals.iter().find(|binding| {
            reserved
                .iter()
                .any(|v| v.parameter.eq_ignore_ascii_case(&binding.parameter))
        }) {
            return Err(MappingError::ParameterCollision(binding.parameter.clone()).into());
        }
        if let Some(raw) = &self.raw {
            let predicate = RawPredicate::new(
                raw.sql.clone(),
                raw.arguments
                    .members
                    .iter()
                    .map(|m| Parameter::new(m.name.clone(), m.value.clone()))
                    .collect(),
            );
            if let Some(collision) = predicate
                .parameters
                .iter()
                .find(|p| used.iter().any(|u| u.eq_ignore_ascii_case(&p.name)))
            {
                return Err(MappingError::ParameterCollision(collision.name.clone()).into());
            }
            if let Some((_, missing)) = predicate
                .placeholders()
                .into_iter()
                .find(|(_, name)| predicate.parameter(name).is_none())
            {
                return Err(MappingError::configuration(format!(
                    "The where clause parameter `{missing}` has no value"
                ))
                .into());
            }
            result.raw = Some(predicate);
        }
        Ok(result)
    }
}

fn single_key(table: &TableDef) -> Result<&ColumnDef> {
    let mut keys = table.primary_key();
    match (keys.next(), keys.next()) {
        (Some(key), None) => Ok(key),
        (None, _) => Err(MappingError::configuration(format!(
            "`{}` has no primary key to filter by",
            table.table_ref
        ))
        .into()),
        (Some(..), Some(..)) => Err(MappingError::configuration(format!(
            "`{}` has a composite primary key, filter with an object instead",
            table.table_ref
        ))
        .into()),
    }
}
