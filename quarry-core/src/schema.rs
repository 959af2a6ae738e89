use crate::{Error, MappingError, Result, TableDef, TableRef};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Supplies table descriptors to the builders.
pub trait SchemaProvider: Send + Sync {
    /// Descriptor of the table or view `name` (`schema.name` accepted).
    fn table(&self, name: &str) -> Result<Arc<TableDef>>;
}

/// Loads descriptors from the database catalog, the external metadata collaborator.
pub trait MetadataSource: Send + Sync {
    fn load_table(&self, table: &TableRef) -> Result<Option<TableDef>>;
}

/// Process lifetime cache of table descriptors.
///
/// Descriptors are either registered upfront or loaded once through a [`MetadataSource`].
/// Once cached they are shared read-only.
#[derive(Default)]
pub struct SchemaCache {
    tables: RwLock<HashMap<String, Arc<TableDef>>>,
    source: Option<Box<dyn MetadataSource>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_source(source: impl MetadataSource + 'static) -> Self {
        Self {
            tables: Default::default(),
            source: Some(Box::new(source)),
        }
    }
    /// Adds a descriptor, replacing any previous one with the same name.
    pub fn register(&self, table: TableDef) -> Result<Arc<TableDef>> {
        let table = Arc::new(table);
        self.tables
            .write()
            .map_err(|_| Error::msg("The schema cache lock is poisoned"))?
            .insert(Self::key(&table.table_ref), table.clone());
        Ok(table)
    }
    pub fn len(&self) -> usize {
        self.tables.read().map(|v| v.len()).unwrap_or_default()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn key(table: &TableRef) -> String {
        table.full_name().to_lowercase()
    }
}

impl SchemaProvider for SchemaCache {
    fn table(&self, name: &str) -> Result<Arc<TableDef>> {
        let table_ref = TableRef::parse(name);
        let key = Self::key(&table_ref);
        if let Some(table) = self
            .tables
            .read()
            .map_err(|_| Error::msg("The schema cache lock is poisoned"))?
            .get(&key)
        {
            return Ok(table.clone());
        }
        let Some(source) = &self.source else {
            return Err(MappingError::configuration(format!("Unknown table or view `{name}`")).into());
        };
        let Some(loaded) = source.load_table(&table_ref)? else {
            return Err(MappingError::configuration(format!("Unknown table or view `{name}`")).into());
        };
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Error::msg("The schema cache lock is poisoned"))?;
        // Another caller may have loaded it in the meantime, keep the first one.
        Ok(tables.entry(key).or_insert_with(|| Arc::new(loaded)).clone())
    }
}
