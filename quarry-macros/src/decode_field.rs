use quote::ToTokens;
use syn::{Field, Ident, LitStr, Type, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Column facing name.
    pub(crate) name: String,
    /// Column prefix of a decomposed member.
    pub(crate) decompose: Option<String>,
    pub(crate) skip: bool,
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Entity fields are expected to have a name");
    let mut name = ident.to_string();
    if let Some(raw) = name.strip_prefix("r#") {
        name = raw.to_owned();
    }
    let mut metadata = FieldMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        decompose: None,
        skip: false,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("quarry") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `quarry`, use it like: `#[quarry(attribute = value, ..)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `name`, use it like: `#[quarry(name = \"my_column\")]`");
                };
                metadata.name = v.value();
            } else if arg.path.is_ident("skip") {
                metadata.skip = true;
            } else if arg.path.is_ident("decompose") {
                let mut prefix = format!("{}_", metadata.name);
                if arg.input.peek(syn::token::Paren) {
                    let parsed = arg.parse_nested_meta(|inner| {
                        if !inner.path.is_ident("prefix") {
                            return Err(inner.error("expected `prefix`"));
                        }
                        prefix = inner.value()?.parse::<LitStr>()?.value();
                        Ok(())
                    });
                    if parsed.is_err() {
                        panic!("Error while parsing `decompose`, use it like: `#[quarry(decompose(prefix = \"home_\"))]`");
                    }
                }
                metadata.decompose = Some(prefix);
            } else {
                panic!(
                    "Unknown attribute `{}` inside quarry macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    metadata
}
