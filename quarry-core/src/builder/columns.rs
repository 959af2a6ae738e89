use crate::{ColumnDef, MappingError, Result, TableDef};

/// Columns requested from a statement, in the select list or in the returning clause.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// Every column of the table.
    #[default]
    All,
    /// Let the builder choose: the primary key, else the identity column.
    Key,
    /// Nothing, used by pure writes.
    None,
    /// These columns, unknown names are ignored.
    Explicit(Vec<String>),
}

impl Columns {
    pub fn list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit(names.into_iter().map(Into::into).collect())
    }

    pub fn resolve<'t>(&self, table: &'t TableDef) -> Result<Vec<&'t ColumnDef>> {
        match self {
            Columns::All => Ok(table.columns.iter().collect()),
            Columns::None => Ok(Vec::new()),
            Columns::Key => {
                let keys: Vec<_> = table.primary_key().collect();
                if !keys.is_empty() {
                    return Ok(keys);
                }
                match table.identity_column() {
                    Some(identity) => Ok(vec![identity]),
                    None => Err(MappingError::configuration(format!(
                        "`{}` has neither a primary key nor an identity column to choose from",
                        table.table_ref
                    ))
                    .into()),
                }
            }
            Columns::Explicit(names) => {
                let result: Vec<_> = names
                    .iter()
                    .filter_map(|name| table.find_column(name))
                    .collect();
                if result.is_empty() {
                    return Err(MappingError::configuration(format!(
                        "None of the requested columns {:?} exist on `{}`",
                        names, table.table_ref
                    ))
                    .into());
                }
                Ok(result)
            }
        }
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Columns {
    fn from(value: [S; N]) -> Self {
        Self::list(value)
    }
}

impl From<Vec<String>> for Columns {
    fn from(value: Vec<String>) -> Self {
        Self::Explicit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_falls_back_to_identity() {
        let table = TableDef::view("log")
            .column(ColumnDef::new("seq").identity())
            .column(ColumnDef::new("line"));
        let columns = Columns::Key.resolve(&table).expect("identity should be chosen");
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "seq");
        let table = TableDef::view("log").column(ColumnDef::new("line"));
        assert!(Columns::Key.resolve(&table).is_err());
    }

    #[test]
    fn explicit_list_is_intersected() {
        let table = TableDef::table("users")
            .column(ColumnDef::new("id").primary_key())
            .column(ColumnDef::new("name"));
        let columns = Columns::from(["NAME", "missing"])
            .resolve(&table)
            .expect("name exists");
        assert_eq!(columns.len(), 1);
        let error = Columns::from(["missing"]).resolve(&table).unwrap_err();
        assert!(matches!(
            MappingError::kind_of(&error),
            Some(MappingError::Configuration(..))
        ));
    }
}
