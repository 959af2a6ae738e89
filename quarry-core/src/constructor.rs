use crate::{Entity, Error, MappingError, Result, RowMap, Value, position_of};
use std::{
    any::TypeId,
    collections::HashMap,
    marker::PhantomData,
    sync::{LazyLock, RwLock},
};

/// Constructor requested by the caller.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstructorChoice {
    /// Default instance, then every member matching a column is assigned.
    #[default]
    Default,
    /// The only constructor taking parameters.
    Infer,
    /// The constructor whose parameter types match these prototypes.
    Signature(Vec<Value>),
}

/// Outcome of the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Default,
    /// Index in [`crate::EntityDef::constructors`].
    Constructor(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Default,
    Infer,
    Signature(Vec<&'static str>),
}

static RESOLVED: LazyLock<RwLock<HashMap<(TypeId, CacheKey), Resolved>>> =
    LazyLock::new(Default::default);

/// Picks the constructor used to materialize a type. Successful resolutions are cached for
/// the process lifetime.
pub struct ConstructorResolver;

impl ConstructorResolver {
    pub fn resolve<E: Entity>(choice: &ConstructorChoice) -> Result<Resolved> {
        let key = (TypeId::of::<E>(), Self::key(choice));
        if let Some(resolved) = RESOLVED
            .read()
            .map_err(|_| Error::msg("The constructor cache lock is poisoned"))?
            .get(&key)
        {
            return Ok(*resolved);
        }
        let resolved = Self::select::<E>(choice)?;
        RESOLVED
            .write()
            .map_err(|_| Error::msg("The constructor cache lock is poisoned"))?
            .insert(key, resolved);
        Ok(resolved)
    }

    pub fn is_cached<E: Entity>(choice: &ConstructorChoice) -> bool {
        RESOLVED
            .read()
            .map(|v| v.contains_key(&(TypeId::of::<E>(), Self::key(choice))))
            .unwrap_or_default()
    }

    fn key(choice: &ConstructorChoice) -> CacheKey {
        match choice {
            ConstructorChoice::Default => CacheKey::Default,
            ConstructorChoice::Infer => CacheKey::Infer,
            ConstructorChoice::Signature(types) => {
                CacheKey::Signature(types.iter().map(Value::type_name).collect())
            }
        }
    }

    fn select<E: Entity>(choice: &ConstructorChoice) -> Result<Resolved> {
        let def = E::entity_def();
        let error = |message: String| -> Result<Resolved> {
            Err(MappingError::constructor(def.type_name, message).into())
        };
        match choice {
            ConstructorChoice::Default if def.has_default => Ok(Resolved::Default),
            ConstructorChoice::Default => error(
                "no default construction is available, infer the constructor or specify its signature"
                    .into(),
            ),
            ConstructorChoice::Infer => {
                let mut candidates = def
                    .constructors
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !c.parameters.is_empty());
                match (candidates.next(), candidates.next()) {
                    (Some((i, _)), None) => Ok(Resolved::Constructor(i)),
                    (None, _) => error("no non-default constructor".into()),
                    (Some(..), Some(..)) => {
                        error("ambiguous constructors, specify the signature explicitly".into())
                    }
                }
            }
            ConstructorChoice::Signature(types) => {
                let mut candidates = def.constructors.iter().enumerate().filter(|(_, c)| {
                    c.parameters.len() == types.len()
                        && c.parameters
                            .iter()
                            .zip(types)
                            .all(|(p, t)| p.value.same_type(t))
                });
                match (candidates.next(), candidates.next()) {
                    (Some((i, _)), None) => Ok(Resolved::Constructor(i)),
                    (None, _) => error(format!(
                        "no matching constructor for ({})",
                        types
                            .iter()
                            .map(Value::type_name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                    (Some(..), Some(..)) => {
                        error("several constructors share the requested signature".into())
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
enum Step {
    /// Column index of each constructor parameter.
    Construct { constructor: usize, columns: Vec<usize> },
    /// Member path and column index of each member present in the result set.
    Populate(Vec<(&'static [usize], usize)>),
}

/// Column layout of a result set resolved against a type, computed once before the first row.
#[derive(Debug)]
pub struct RowPlan<E> {
    step: Step,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RowPlan<E> {
    /// Fails when a constructor parameter has no column in `labels`.
    pub fn new(resolved: Resolved, labels: &[String]) -> Result<Self> {
        let def = E::entity_def();
        let step = match resolved {
            Resolved::Constructor(constructor) => {
                let Some(candidate) = def.constructors.get(constructor) else {
                    return Err(MappingError::constructor(
                        def.type_name,
                        format!("there is no constructor at {constructor}"),
                    )
                    .into());
                };
                let columns = candidate
                    .parameters
                    .iter()
                    .map(|p| {
                        position_of(labels, p.name).ok_or_else(|| {
                            MappingError::MissingColumn {
                                type_name: def.type_name.into(),
                                column: p.name.into(),
                            }
                            .into()
                        })
                    })
                    .collect::<Result<_>>()?;
                Step::Construct {
                    constructor,
                    columns,
                }
            }
            Resolved::Default => Step::Populate(
                def.members()
                    .iter()
                    .filter_map(|m| position_of(labels, &m.name).map(|i| (m.path.as_slice(), i)))
                    .collect(),
            ),
        };
        Ok(Self {
            step,
            _entity: PhantomData,
        })
    }

    /// Builds one instance, the values are moved out of `row`.
    pub fn construct(&self, row: &mut RowMap) -> Result<E> {
        match &self.step {
            Step::Construct {
                constructor,
                columns,
            } => E::construct(*constructor, columns.iter().map(|i| row.take(*i)).collect()),
            Step::Populate(members) => {
                let def = E::entity_def();
                let Some(mut result) = E::default_instance() else {
                    return Err(MappingError::constructor(
                        def.type_name,
                        "no default construction is available",
                    )
                    .into());
                };
                for (path, column) in members {
                    let value = row.take(*column);
                    // Nulls leave the member as constructed.
                    if value.is_null() {
                        continue;
                    }
                    result.set_value(path, value)?;
                }
                Ok(result)
            }
        }
    }
}
