mod decode_entity;
mod decode_field;

use decode_entity::{EntityMetadata, decode_entity};
use decode_field::FieldMetadata;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

#[proc_macro_derive(Entity, attributes(quarry))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let metadata = decode_entity(&item);
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let type_name = LitStr::new(&name.to_string(), name.span());
    let fields_defs = metadata.fields.iter().map(field_def);
    let constructors_defs = constructor_defs(&metadata);
    let construct_arms = construct_arms(&metadata);
    let has_default = !metadata.no_default;
    let default_instance = if metadata.no_default {
        quote!(None)
    } else {
        quote!(Some(<Self as ::std::default::Default>::default()))
    };
    let set_arms = metadata.fields.iter().enumerate().map(|(i, f)| {
        let ident = &f.ident;
        let ty = &f.ty;
        let member = &f.name;
        if f.decompose.is_some() {
            quote!([#i, rest @ ..] => ::quarry::Entity::set_value(&mut self.#ident, rest, value),)
        } else {
            quote! {
                [#i] => {
                    self.#ident = ::quarry::member_value::<#ty>(#member, value)?;
                    Ok(())
                }
            }
        }
    });
    let get_arms = metadata.fields.iter().enumerate().map(|(i, f)| {
        let ident = &f.ident;
        if f.decompose.is_some() {
            quote!([#i, rest @ ..] => ::quarry::Entity::get_value(&self.#ident, rest),)
        } else {
            quote!([#i] => Ok(::quarry::AsValue::as_value(::std::clone::Clone::clone(&self.#ident))),)
        }
    });
    quote! {
        impl #impl_generics ::quarry::Entity for #name #ty_generics #where_clause {
            fn entity_def() -> &'static ::quarry::EntityDef {
                static RESULT: ::std::sync::LazyLock<::quarry::EntityDef> =
                    ::std::sync::LazyLock::new(|| {
                        ::quarry::EntityDef::new(
                            #type_name,
                            vec![#(#fields_defs),*],
                            vec![#(#constructors_defs),*],
                            #has_default,
                        )
                    });
                &RESULT
            }

            fn construct(
                constructor: usize,
                values: ::std::vec::Vec<::quarry::Value>,
            ) -> ::quarry::Result<Self> {
                #[allow(unused_mut, unused_variables)]
                let mut values = values.into_iter();
                match constructor {
                    #(#construct_arms)*
                    _ => Err(::quarry::Error::msg(format!(
                        "{} has no constructor at {}",
                        #type_name,
                        constructor
                    ))),
                }
            }

            fn default_instance() -> Option<Self> {
                #default_instance
            }

            fn set_value(
                &mut self,
                path: &[usize],
                value: ::quarry::Value,
            ) -> ::quarry::Result<()> {
                match path {
                    #(#set_arms)*
                    _ => Err(::quarry::invalid_member_path(#type_name, path)),
                }
            }

            fn get_value(&self, path: &[usize]) -> ::quarry::Result<::quarry::Value> {
                match path {
                    #(#get_arms)*
                    _ => Err(::quarry::invalid_member_path(#type_name, path)),
                }
            }
        }

        impl #impl_generics ::quarry::Argument for #name #ty_generics #where_clause {
            fn members(&self) -> ::quarry::Result<::std::vec::Vec<::quarry::Member>> {
                ::quarry::entity_members(self)
            }
        }
    }
    .into()
}

fn field_def(field: &FieldMetadata) -> TokenStream2 {
    let name = &field.name;
    let ty = &field.ty;
    match &field.decompose {
        Some(prefix) => quote! {
            ::quarry::FieldDef {
                name: #name,
                value: ::quarry::Value::Null,
                kind: ::quarry::FieldKind::Decomposed {
                    prefix: #prefix,
                    entity: <#ty as ::quarry::Entity>::entity_def,
                },
            }
        },
        None => quote! {
            ::quarry::FieldDef {
                name: #name,
                value: <#ty as ::quarry::AsValue>::as_empty_value(),
                kind: ::quarry::FieldKind::Scalar,
            }
        },
    }
}

fn constructor_defs(metadata: &EntityMetadata) -> Vec<TokenStream2> {
    metadata
        .constructors
        .iter()
        .map(|c| {
            let parameters = c.parameters.iter().map(|i| {
                let field = &metadata.fields[*i];
                let name = &field.name;
                let ty = &field.ty;
                quote! {
                    ::quarry::ParameterDef {
                        name: #name,
                        value: <#ty as ::quarry::AsValue>::as_empty_value(),
                    }
                }
            });
            quote!(::quarry::ConstructorDef { parameters: vec![#(#parameters),*] })
        })
        .collect()
}

fn construct_arms(metadata: &EntityMetadata) -> Vec<TokenStream2> {
    metadata
        .constructors
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let function = &c.function;
            let arguments = c.parameters.iter().map(|p| {
                let field = &metadata.fields[*p];
                let name = &field.name;
                let ty = &field.ty;
                quote! {
                    ::quarry::member_value::<#ty>(
                        #name,
                        values.next().unwrap_or_default(),
                    )?
                }
            });
            quote!(#i => Ok(Self::#function(#(#arguments),*)),)
        })
        .collect()
}
