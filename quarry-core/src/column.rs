use crate::{AsValue, Value, position_of};
use std::fmt::{self, Display};

/// Indicates how (or if) a column participates in the primary key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyType {
    /// Single-column primary key.
    PrimaryKey,
    /// Member of a composite primary key.
    PartOfPrimaryKey,
    /// Not part of the primary key.
    #[default]
    None,
}

/// Description of one column of a table or view.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Logical name, matched case-insensitively against members.
    pub name: String,
    /// Name as it appears in SQL (quoted by the writer).
    pub sql_name: String,
    /// Name of the parameter bound to this column.
    pub parameter_name: String,
    pub nullable: bool,
    pub primary_key: PrimaryKeyType,
    /// Generated by the database on insert.
    pub identity: bool,
    /// Computed by the database, never written.
    pub computed: bool,
    /// Declared wire type, informational.
    pub column_type: String,
    /// `Value` prototype describing the column type.
    pub value: Value,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            sql_name: name.clone(),
            parameter_name: name.clone(),
            name,
            nullable: true,
            primary_key: PrimaryKeyType::None,
            identity: false,
            computed: false,
            column_type: String::new(),
            value: Value::Null,
        }
    }
    pub fn sql_name(mut self, sql_name: impl Into<String>) -> Self {
        self.sql_name = sql_name.into();
        self
    }
    pub fn parameter_name(mut self, parameter_name: impl Into<String>) -> Self {
        self.parameter_name = parameter_name.into();
        self
    }
    pub fn primary_key(mut self) -> Self {
        self.primary_key = PrimaryKeyType::PrimaryKey;
        self.nullable = false;
        self
    }
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self.nullable = false;
        self
    }
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }
    /// Sets the value prototype from a Rust type.
    pub fn of<T: AsValue>(mut self) -> Self {
        self.value = T::as_empty_value();
        self
    }
    pub fn is_key(&self) -> bool {
        self.primary_key != PrimaryKeyType::None
    }
    /// Columns that an INSERT or UPDATE may assign.
    pub fn is_writable(&self, identity_insert: bool) -> bool {
        !self.computed && (!self.identity || identity_insert)
    }
}

/// Schema qualified table name.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub name: String,
    pub schema: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: String::new(),
        }
    }
    /// Parses `schema.name` or `name`.
    pub fn parse(value: &str) -> Self {
        match value.rsplit_once('.') {
            Some((schema, name)) => Self {
                name: name.into(),
                schema: schema.into(),
            },
            None => Self::new(value),
        }
    }
    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.schema.is_empty() {
            result.push_str(&self.schema);
            result.push('.');
        }
        result.push_str(&self.name);
        result
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Description of a table or view: ordered columns and the primary key subset.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub table_ref: TableRef,
    pub columns: Vec<ColumnDef>,
    /// False for views.
    pub is_table: bool,
}

impl TableDef {
    pub fn table(name: &str) -> Self {
        Self {
            table_ref: TableRef::parse(name),
            columns: Vec::new(),
            is_table: true,
        }
    }
    pub fn view(name: &str) -> Self {
        Self {
            is_table: false,
            ..Self::table(name)
        }
    }
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.table_ref.schema = schema.into();
        self
    }
    /// Appends a column, keeping the primary key type consistent across key columns.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        if self.columns.iter().filter(|c| c.is_key()).count() > 1 {
            for c in self.columns.iter_mut().filter(|c| c.is_key()) {
                c.primary_key = PrimaryKeyType::PartOfPrimaryKey;
            }
        }
        self
    }
    pub fn name(&self) -> &str {
        &self.table_ref.name
    }
    /// Case-insensitive lookup by logical name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        position_of(&names, name).map(|i| &self.columns[i])
    }
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDef> + Clone {
        self.columns.iter().filter(|c| c.is_key())
    }
    pub fn identity_column(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.identity)
    }
    /// Columns that never hold null.
    pub fn non_nullable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.nullable)
    }
}
