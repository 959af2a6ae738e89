use crate::{AsValue, Error, MappingError, Result, Value};
use std::sync::OnceLock;

/// Per-type descriptor replacing runtime reflection.
///
/// Usually generated by `#[derive(Entity)]`, it describes the members that can be read and
/// assigned, the constructors that can build the type and whether a default instance exists.
/// The descriptor is built once and lives for the whole process.
pub trait Entity: Send + Sized + 'static {
    fn entity_def() -> &'static EntityDef;

    /// Calls the constructor at `constructor` (index in [`EntityDef::constructors`]) with
    /// `values` ordered like its parameters.
    fn construct(constructor: usize, values: Vec<Value>) -> Result<Self>;

    /// Instance used for default construction followed by member population.
    fn default_instance() -> Option<Self>;

    /// Assigns the member at `path`, indices into [`EntityDef::fields`] walking through
    /// decomposed members.
    fn set_value(&mut self, path: &[usize], value: Value) -> Result<()>;

    /// Reads the member at `path`.
    fn get_value(&self, path: &[usize]) -> Result<Value>;
}

/// How a field maps to columns.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// One column with the same name.
    Scalar,
    /// A nested entity whose members map to columns named `prefix` + member name.
    Decomposed {
        prefix: &'static str,
        entity: fn() -> &'static EntityDef,
    },
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    /// Type prototype.
    pub value: Value,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub name: &'static str,
    pub value: Value,
}

/// One constructor candidate.
#[derive(Debug, Clone, Default)]
pub struct ConstructorDef {
    pub parameters: Vec<ParameterDef>,
}

impl ConstructorDef {
    /// Type names of the parameters, in order.
    pub fn signature(&self) -> Vec<&'static str> {
        self.parameters.iter().map(|v| v.value.type_name()).collect()
    }
}

/// A member reachable from the root type, decomposed members flattened.
#[derive(Debug, Clone)]
pub struct MemberPath {
    /// Column facing name (prefixes applied).
    pub name: String,
    pub path: Vec<usize>,
    pub value: Value,
}

#[derive(Debug)]
pub struct EntityDef {
    pub type_name: &'static str,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<ConstructorDef>,
    pub has_default: bool,
    flattened: OnceLock<Vec<MemberPath>>,
}

impl EntityDef {
    pub fn new(
        type_name: &'static str,
        fields: Vec<FieldDef>,
        constructors: Vec<ConstructorDef>,
        has_default: bool,
    ) -> Self {
        Self {
            type_name,
            fields,
            constructors,
            has_default,
            flattened: OnceLock::new(),
        }
    }

    /// Every scalar member, decomposed members expanded with their prefix.
    pub fn members(&self) -> &[MemberPath] {
        self.flattened.get_or_init(|| {
            let mut result = Vec::new();
            flatten(self, "", &mut Vec::new(), &mut result);
            result
        })
    }

    pub fn member(&self, name: &str) -> Option<&MemberPath> {
        self.members()
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

fn flatten(def: &EntityDef, prefix: &str, path: &mut Vec<usize>, out: &mut Vec<MemberPath>) {
    for (i, field) in def.fields.iter().enumerate() {
        path.push(i);
        match field.kind {
            FieldKind::Scalar => out.push(MemberPath {
                name: format!("{prefix}{}", field.name),
                path: path.clone(),
                value: field.value.clone(),
            }),
            FieldKind::Decomposed {
                prefix: nested,
                entity,
            } => flatten(entity(), &format!("{prefix}{nested}"), path, out),
        }
        path.pop();
    }
}

/// Converts `value` for the member `member`, naming it in the data shape error.
pub fn member_value<T: AsValue>(member: &str, value: Value) -> Result<T> {
    T::try_from_value(value).map_err(|e| match e.downcast::<MappingError>() {
        Ok(MappingError::DataShape {
            source_type,
            target,
            message,
            ..
        }) => MappingError::DataShape {
            member: member.into(),
            source_type,
            target,
            message,
        }
        .into(),
        Ok(other) => other.into(),
        Err(e) => e,
    })
}

/// Error for a path that does not lead to a member.
pub fn invalid_member_path(type_name: &str, path: &[usize]) -> Error {
    Error::msg(format!("{type_name} has no member at {path:?}"))
}
