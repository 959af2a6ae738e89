use crate::decode_field::{FieldMetadata, decode_field};
use quote::ToTokens;
use syn::{Ident, ItemStruct, LitStr, parse::ParseBuffer};

pub(crate) struct ConstructorMetadata {
    pub(crate) function: Ident,
    /// Indices into [`EntityMetadata::fields`].
    pub(crate) parameters: Vec<usize>,
}

pub(crate) struct EntityMetadata {
    pub(crate) fields: Vec<FieldMetadata>,
    pub(crate) constructors: Vec<ConstructorMetadata>,
    pub(crate) no_default: bool,
}

pub(crate) fn decode_entity(item: &ItemStruct) -> EntityMetadata {
    let fields: Vec<_> = item
        .fields
        .iter()
        .map(decode_field)
        .filter(|f| !f.skip)
        .collect();
    let mut constructors = Vec::new();
    let mut no_default = false;
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("quarry") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `quarry`, use it like: `#[quarry(attribute = value, ..)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("no_default") {
                no_default = true;
            } else if arg.path.is_ident("constructor") {
                let mut function = None;
                let mut parameters = Vec::new();
                let parsed = arg.parse_nested_meta(|inner| {
                    if inner.path.is_ident("function") {
                        let value = inner.value().and_then(ParseBuffer::parse::<LitStr>)?;
                        function = Some(Ident::new(&value.value(), value.span()));
                    } else if inner.path.is_ident("params") {
                        inner.parse_nested_meta(|param| {
                            let Some(ident) = param.path.get_ident() else {
                                return Err(param.error("expected a field name"));
                            };
                            let Some(i) = fields.iter().position(|f| f.ident == *ident) else {
                                panic!("Field `{ident}` used by a constructor does not exist in the entity");
                            };
                            if fields[i].decompose.is_some() {
                                panic!("Decomposed field `{ident}` cannot be a constructor parameter");
                            }
                            parameters.push(i);
                            Ok(())
                        })?;
                    } else {
                        return Err(inner.error("expected `function` or `params`"));
                    }
                    Ok(())
                });
                let (Ok(()), Some(function)) = (parsed, function) else {
                    panic!("Error while parsing `constructor`, use it like: `#[quarry(constructor(function = \"new\", params(a, b)))]`");
                };
                constructors.push(ConstructorMetadata {
                    function,
                    parameters,
                });
            } else {
                panic!(
                    "Unknown attribute `{}` inside quarry macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    EntityMetadata {
        fields,
        constructors,
        no_default,
    }
}
