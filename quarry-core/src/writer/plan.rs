use crate::{Binding, ColumnDef, Limit, Parameter, TableDef};
use std::ops::Range;

/// Caller supplied predicate.
///
/// The text is copied as is except for the `:name` placeholders, each one is rewritten with
/// the placeholder syntax of the dialect and bound to the parameter with the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPredicate {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl RawPredicate {
    pub fn new(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }

    /// Spans and names of the `:name` placeholders. Quoted text and `::` casts are skipped.
    pub fn placeholders(&self) -> Vec<(Range<usize>, &str)> {
        let sql = self.sql.as_bytes();
        let mut result = Vec::new();
        let mut quote = None;
        let mut i = 0;
        while i < sql.len() {
            let c = sql[i];
            match quote {
                Some(q) if c == q => quote = None,
                Some(..) => {}
                None if matches!(c, b'\'' | b'"' | b'`') => quote = Some(c),
                None if c == b'[' => quote = Some(b']'),
                None if c == b':' && sql.get(i + 1) == Some(&b':') => i += 1,
                None if c == b':' => {
                    let start = i;
                    let mut end = i + 1;
                    while end < sql.len() && (sql[end].is_ascii_alphanumeric() || sql[end] == b'_') {
                        end += 1;
                    }
                    if end > start + 1 {
                        result.push((start..end, &self.sql[start + 1..end]));
                        i = end;
                        continue;
                    }
                }
                None => {}
            }
            i += 1;
        }
        result
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// `column IN (...)` over a list of key values.
#[derive(Debug, Clone)]
pub struct KeyList<'t> {
    pub column: &'t ColumnDef,
    pub values: Vec<Parameter>,
}

/// Conjunction of the filter sources of a statement.
#[derive(Debug, Clone, Default)]
pub struct WhereClause<'t> {
    /// `column = parameter`, or `column IS NULL` for null values.
    pub equals: Vec<Binding<'t>>,
    pub key_list: Option<KeyList<'t>>,
    pub raw: Option<RawPredicate>,
}

impl<'t> WhereClause<'t> {
    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.key_list.is_none() && self.raw.is_none()
    }
    /// Number of predicates joined by `AND`.
    pub fn len(&self) -> usize {
        self.equals.len() + self.key_list.is_some() as usize + self.raw.is_some() as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBy<'t> {
    pub column: &'t ColumnDef,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub enum Projection<'t> {
    Columns(Vec<&'t ColumnDef>),
    Count,
}

#[derive(Debug, Clone)]
pub struct SelectPlan<'t> {
    pub table: &'t TableDef,
    pub projection: Projection<'t>,
    pub filter: WhereClause<'t>,
    pub order: Vec<OrderBy<'t>>,
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone)]
pub struct InsertPlan<'t> {
    pub table: &'t TableDef,
    pub values: Vec<Binding<'t>>,
    /// Columns read back inline (returning or output clause).
    pub returning: Vec<&'t ColumnDef>,
    pub identity_insert: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan<'t> {
    pub table: &'t TableDef,
    pub set: Vec<Binding<'t>>,
    pub filter: WhereClause<'t>,
    pub returning: Vec<&'t ColumnDef>,
    /// Return the values as they were before the update.
    pub old_values: bool,
}

#[derive(Debug, Clone)]
pub struct DeletePlan<'t> {
    pub table: &'t TableDef,
    pub filter: WhereClause<'t>,
    pub returning: Vec<&'t ColumnDef>,
}

#[derive(Debug, Clone)]
pub struct UpsertPlan<'t> {
    pub table: &'t TableDef,
    /// Every written column, keys included.
    pub values: Vec<Binding<'t>>,
    pub keys: Vec<&'t ColumnDef>,
    pub returning: Vec<&'t ColumnDef>,
    pub identity_insert: bool,
}

impl<'t> UpsertPlan<'t> {
    pub fn is_key(&self, column: &ColumnDef) -> bool {
        self.keys.iter().any(|k| std::ptr::eq(*k, column))
    }
    /// Values assigned when the row already exists.
    pub fn updates(&self) -> impl Iterator<Item = &Binding<'t>> {
        self.values.iter().filter(|v| !self.is_key(v.column))
    }
}
