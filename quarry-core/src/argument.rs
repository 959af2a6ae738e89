use crate::{
    AsValue, ColumnDef, Entity, Error, MappingError, Result, TableDef, Value,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::Deref,
};

/// A named value supplied by an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub value: Value,
}

impl Member {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Anything that can supply named values to a statement: entities, maps, tuples of pairs.
pub trait Argument {
    fn members(&self) -> Result<Vec<Member>>;

    /// Names of the members assigned since the value was loaded, `None` when the argument
    /// does not track changes.
    fn changed_members(&self) -> Option<Vec<String>> {
        None
    }
}

/// Members of an entity, decomposed members flattened with their prefix.
pub fn entity_members<E: Entity>(entity: &E) -> Result<Vec<Member>> {
    E::entity_def()
        .members()
        .iter()
        .map(|m| {
            Ok(Member {
                name: m.name.clone(),
                value: entity.get_value(&m.path)?,
            })
        })
        .collect()
}

impl Argument for () {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(Vec::new())
    }
}

impl<A: Argument> Argument for Option<A> {
    fn members(&self) -> Result<Vec<Member>> {
        match self {
            Some(v) => v.members(),
            None => Ok(Vec::new()),
        }
    }
    fn changed_members(&self) -> Option<Vec<String>> {
        self.as_ref().and_then(Argument::changed_members)
    }
}

impl<A: Argument + ?Sized> Argument for &A {
    fn members(&self) -> Result<Vec<Member>> {
        (**self).members()
    }
    fn changed_members(&self) -> Option<Vec<String>> {
        (**self).changed_members()
    }
}

impl Argument for HashMap<String, Value> {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(self
            .iter()
            .map(|(k, v)| Member::new(k.clone(), v.clone()))
            .collect())
    }
}

impl Argument for BTreeMap<String, Value> {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(self
            .iter()
            .map(|(k, v)| Member::new(k.clone(), v.clone()))
            .collect())
    }
}

impl<const N: usize> Argument for [(&str, Value); N] {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(self
            .iter()
            .map(|(k, v)| Member::new(*k, v.clone()))
            .collect())
    }
}

impl Argument for Vec<Member> {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(self.clone())
    }
}

/// Owned snapshot of an argument, kept by the builders until the statement is built.
#[derive(Debug, Clone, Default)]
pub struct ArgumentValues {
    pub members: Vec<Member>,
    pub changed: Option<Vec<String>>,
}

impl ArgumentValues {
    pub fn capture(argument: &dyn Argument) -> Result<Self> {
        Ok(Self {
            members: argument.members()?,
            changed: argument.changed_members(),
        })
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| &m.value)
    }
}

impl Argument for ArgumentValues {
    fn members(&self) -> Result<Vec<Member>> {
        Ok(self.members.clone())
    }
    fn changed_members(&self) -> Option<Vec<String>> {
        self.changed.clone()
    }
}

/// Entity wrapper recording which members were assigned.
///
/// ```rust,ignore
/// let mut user = Tracked::new(user);
/// user.set("email", "new@example.com")?;
/// // Only `email` (and the key in the WHERE clause) reach the UPDATE.
/// ```
#[derive(Debug, Clone)]
pub struct Tracked<E: Entity> {
    entity: E,
    changed: BTreeSet<String>,
}

impl<E: Entity> Tracked<E> {
    pub fn new(entity: E) -> Self {
        Self {
            entity,
            changed: Default::default(),
        }
    }
    /// Assigns a member by its column facing name and marks it as changed.
    pub fn set(&mut self, member: &str, value: impl AsValue) -> Result<&mut Self> {
        let def = E::entity_def();
        let Some(path) = def.member(member) else {
            return Err(Error::msg(format!(
                "`{member}` is not a member of {}",
                def.type_name
            )));
        };
        self.entity.set_value(&path.path, value.as_value())?;
        self.changed.insert(path.name.clone());
        Ok(self)
    }
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
    /// Forgets the recorded changes, typically after a successful save.
    pub fn accept_changes(&mut self) {
        self.changed.clear();
    }
    pub fn into_inner(self) -> E {
        self.entity
    }
}

impl<E: Entity> Deref for Tracked<E> {
    type Target = E;
    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E: Entity> Argument for Tracked<E> {
    fn members(&self) -> Result<Vec<Member>> {
        entity_members(&self.entity)
    }
    fn changed_members(&self) -> Option<Vec<String>> {
        Some(self.changed.iter().cloned().collect())
    }
}

/// Options of [`ArgumentMapper::map`].
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Drop null members (filters only).
    pub ignore_null: bool,
    /// Identity columns are written.
    pub identity_insert: bool,
    /// Key columns replacing the primary key.
    pub key_columns: Option<Vec<String>>,
    /// Keep only the members reported as changed.
    pub changed_only: bool,
    /// Only members starting with this prefix are considered, the prefix is removed.
    pub prefix: Option<String>,
    /// Members that match no column are errors.
    pub strict: bool,
}

/// One (column, parameter, value) triple.
#[derive(Debug, Clone)]
pub struct Binding<'t> {
    pub column: &'t ColumnDef,
    pub parameter: String,
    pub value: Value,
}

/// Output of [`ArgumentMapper::map`], lives for the construction of one statement.
#[derive(Debug, Clone, Default)]
pub struct ArgumentBinding<'t> {
    /// Members matching a column, in table column order.
    pub entries: Vec<Binding<'t>>,
    /// Key columns with the value supplied by the argument, if any.
    pub keys: Vec<Binding<'t>>,
    /// Key columns, supplied or not.
    pub key_columns: Vec<&'t ColumnDef>,
}

impl<'t> ArgumentBinding<'t> {
    pub fn get(&self, column: &str) -> Option<&Binding<'t>> {
        self.entries
            .iter()
            .find(|v| v.column.name.eq_ignore_ascii_case(column))
    }
    /// Entries whose column is not a key column.
    pub fn non_key_entries(&self) -> impl Iterator<Item = &Binding<'t>> {
        self.entries
            .iter()
            .filter(|v| !self.key_columns.iter().any(|k| std::ptr::eq(*k, v.column)))
    }
    /// True when every key column received a non null value.
    pub fn has_all_keys(&self) -> bool {
        !self.key_columns.is_empty() && self.keys.len() == self.key_columns.len()
    }
    /// True when every key column received a value different from the type default.
    pub fn has_key_values(&self) -> bool {
        !self.key_columns.is_empty()
            && self.keys.len() == self.key_columns.len()
            && self.keys.iter().all(|k| !k.value.is_default())
    }
}

/// Matches argument members to table columns.
pub struct ArgumentMapper;

impl ArgumentMapper {
    pub fn map<'t>(
        argument: &dyn Argument,
        table: &'t TableDef,
        options: &MapOptions,
    ) -> Result<ArgumentBinding<'t>> {
        let mut members = argument.members()?;
        let mut changed = if options.changed_only {
            match argument.changed_members() {
                Some(changed) if changed.is_empty() => {
                    return Err(MappingError::NoChanges(table.table_ref.full_name()).into());
                }
                changed => changed,
            }
        } else {
            None
        };
        if let Some(prefix) = &options.prefix {
            members = members
                .into_iter()
                .filter_map(|m| {
                    strip_prefix(&m.name, prefix).map(|name| Member {
                        name: name.to_owned(),
                        value: m.value,
                    })
                })
                .collect();
            changed = changed.map(|v| {
                v.iter()
                    .filter_map(|name| strip_prefix(name, prefix).map(str::to_owned))
                    .collect()
            });
        }
        if options.strict {
            if let Some(unknown) = members
                .iter()
                .find(|m| table.find_column(&m.name).is_none())
            {
                return Err(MappingError::UnknownColumn {
                    table: table.table_ref.full_name(),
                    column: unknown.name.clone(),
                }
                .into());
            }
        }
        let key_columns = Self::key_columns(table, options)?;
        let mut result = ArgumentBinding {
            key_columns,
            ..Default::default()
        };
        for column in &table.columns {
            let Some(member) = members
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(&column.name))
            else {
                continue;
            };
            let binding = Binding {
                column,
                parameter: column.parameter_name.clone(),
                value: member.value.clone(),
            };
            let is_key = result.key_columns.iter().any(|k| std::ptr::eq(*k, column));
            if is_key && !binding.value.is_null() {
                result.keys.push(binding.clone());
            }
            if options.ignore_null && binding.value.is_null() {
                continue;
            }
            if let Some(changed) = &changed {
                if !is_key && !changed.iter().any(|c| c.eq_ignore_ascii_case(&member.name)) {
                    continue;
                }
            }
            result.entries.push(binding);
        }
        Ok(result)
    }

    fn key_columns<'t>(table: &'t TableDef, options: &MapOptions) -> Result<Vec<&'t ColumnDef>> {
        match &options.key_columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    table.find_column(name).ok_or_else(|| {
                        MappingError::UnknownColumn {
                            table: table.table_ref.full_name(),
                            column: name.clone(),
                        }
                        .into()
                    })
                })
                .collect(),
            None => Ok(table.primary_key().collect()),
        }
    }
}

fn strip_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}
