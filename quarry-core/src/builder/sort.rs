use crate::{MappingError, Result, TableDef, writer::OrderBy};

/// One sort expression, by logical column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    pub column: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// `"name"`, `"name ASC"` or `"name DESC"`.
impl From<&str> for Sort {
    fn from(value: &str) -> Self {
        let value = value.trim();
        match value.rsplit_once(char::is_whitespace) {
            Some((column, direction)) if direction.eq_ignore_ascii_case("desc") => {
                Self::desc(column.trim_end())
            }
            Some((column, direction)) if direction.eq_ignore_ascii_case("asc") => {
                Self::asc(column.trim_end())
            }
            _ => Self::asc(value),
        }
    }
}

pub(crate) fn resolve_sort<'t>(sort: &[Sort], table: &'t TableDef) -> Result<Vec<OrderBy<'t>>> {
    sort.iter()
        .map(|v| {
            let Some(column) = table.find_column(&v.column) else {
                return Err(MappingError::UnknownColumn {
                    table: table.table_ref.full_name(),
                    column: v.column.clone(),
                }
                .into());
            };
            Ok(OrderBy {
                column,
                descending: v.descending,
            })
        })
        .collect()
}
