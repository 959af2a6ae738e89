use crate::{Result, RowSource, Value, position_of};
use std::sync::Arc;

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;

/// One cursor row keyed by column name, case-insensitive.
///
/// Database nulls are normalized to [`Value::Null`].
#[derive(Debug, Clone)]
pub struct RowMap {
    labels: RowNames,
    values: Vec<Value>,
}

impl RowMap {
    pub fn new(labels: RowNames, values: Vec<Value>) -> Self {
        Self { labels, values }
    }
    /// Column names of the cursor, read once before the first row.
    pub fn labels_of(source: &impl RowSource) -> Result<RowNames> {
        (0..source.field_count())
            .map(|i| source.column_name(i).map(str::to_owned))
            .collect::<Result<Vec<_>>>()
            .map(Into::into)
    }
    /// Copies the current row of `source`.
    pub fn read(source: &impl RowSource, labels: &RowNames) -> Result<Self> {
        let values = (0..labels.len())
            .map(|i| {
                if source.is_null(i)? {
                    return Ok(Value::Null);
                }
                let value = source.value(i)?;
                Ok(if value.is_null() { Value::Null } else { value })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(labels.clone(), values))
    }
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn index_of(&self, name: &str) -> Option<usize> {
        position_of(&self.labels, name)
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
    /// Moves the value out, leaving `Value::Null`.
    pub fn take(&mut self, index: usize) -> Value {
        self.values
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneRow;

    impl RowSource for OneRow {
        fn field_count(&self) -> usize {
            2
        }
        fn column_name(&self, index: usize) -> Result<&str> {
            Ok(["Id", "Nickname"][index])
        }
        fn value(&self, index: usize) -> Result<Value> {
            Ok([Value::Int64(Some(1)), Value::Varchar(None)][index].clone())
        }
    }

    #[test]
    fn nulls_are_normalized() {
        let labels = RowMap::labels_of(&OneRow).expect("labels should be readable");
        let row = RowMap::read(&OneRow, &labels).expect("row should be readable");
        assert_eq!(row.get("ID"), Some(&Value::Int64(Some(1))));
        assert!(matches!(row.get("nickname"), Some(Value::Null)));
        assert!(!row.contains("email"));
    }
}
