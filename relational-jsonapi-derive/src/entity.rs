//! Derive macro for entity descriptions.

use crate::helpers::{parse_docs, AttrParser};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DataStruct, DeriveInput, Error, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Result, Type, TypePath,
};

/// The path of the `relational_jsonapi::schema` module in the scope invoking a procedural macro.
fn schema_path() -> TokenStream {
    quote!(relational_jsonapi::schema)
}

/// Generate an `Entity` implementation for a struct.
pub fn derive(
    DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    }: DeriveInput,
) -> TokenStream {
    if !generics.params.is_empty() {
        return Error::new_spanned(generics, "Entity cannot be derived on generic types")
            .to_compile_error();
    }
    let res = match data {
        Data::Struct(data) => generate_struct(ident, data, attrs),
        _ => Err(Error::new(
            ident.span(),
            "Entity can only be derived for structs",
        )),
    };
    res.unwrap_or_else(|err| err.to_compile_error())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelationKind {
    ToOne,
    Many,
}

/// Recognize the relation marker types, optionally wrapped in `Option`.
fn relation(ty: &Type) -> Option<(RelationKind, &Type)> {
    let Type::Path(TypePath { qself: None, path }) = ty else { return None; };
    let segment = path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else { return None; };
    let Some(GenericArgument::Type(target)) = args.args.first() else { return None; };
    match segment.ident.to_string().as_str() {
        "ToOne" => Some((RelationKind::ToOne, target)),
        "Many" => Some((RelationKind::Many, target)),
        "Option" => relation(target),
        _ => None,
    }
}

fn generate_struct(name: Ident, data: DataStruct, attrs: Vec<Attribute>) -> Result<TokenStream> {
    let schema = schema_path();
    let p = AttrParser::new("entity");
    p.check(
        &attrs,
        &["abstract_base", "parent", "proxy", "name", "namespace"],
    )?;

    let entity_name = p
        .get_arg::<Ident, _>(&attrs, "name")?
        .unwrap_or_else(|| name.clone())
        .to_string();
    let is_abstract = p.has_flag(&attrs, "abstract_base")?;
    let parent = p.get_arg::<TypePath, _>(&attrs, "parent")?;
    let proxy = p.get_arg::<TypePath, _>(&attrs, "proxy")?;

    let constructor = match (&proxy, is_abstract) {
        (Some(target), false) => {
            if parent.is_some() {
                return Err(Error::new_spanned(
                    target,
                    "a proxy cannot also declare a parent",
                ));
            }
            if !data.fields.is_empty() {
                return Err(Error::new_spanned(
                    &data.fields,
                    "a proxy cannot declare fields",
                ));
            }
            quote!(#schema::EntityDef::proxy(#entity_name, <#target as #schema::Entity>::NAME))
        }
        (Some(target), true) => {
            return Err(Error::new_spanned(
                target,
                "an entity cannot be both abstract and a proxy",
            ));
        }
        (None, true) => quote!(#schema::EntityDef::abstract_entity(#entity_name)),
        (None, false) => quote!(#schema::EntityDef::concrete(#entity_name)),
    };

    let mut decls = vec![];
    if let Some(parent) = parent {
        decls.push(quote!(.parent(<#parent as #schema::Entity>::NAME)));
    }
    if let Some(namespace) = p.get_arg::<LitStr, _>(&attrs, "namespace")? {
        decls.push(quote!(.namespace(#namespace)));
    }
    let doc = parse_docs(&attrs);
    if !doc.is_empty() {
        decls.push(quote!(.description(#doc)));
    }

    let fields = match data.fields {
        Fields::Named(fields) => fields.named.into_iter().collect(),
        Fields::Unit => vec![],
        Fields::Unnamed(fields) => {
            return Err(Error::new_spanned(
                fields,
                "Entity cannot be derived for tuple structs",
            ))
        }
    };
    let mut id = None;
    for field in fields {
        p.check(&field.attrs, &["id", "skip", "private", "related_name"])?;
        if p.has_flag(&field.attrs, "skip")? {
            continue;
        }
        let Some(ident) = &field.ident else { continue; };
        let field_name = ident.to_string();

        let explicit_id = p.has_flag(&field.attrs, "id")?;
        if explicit_id || (field_name == "id" && id.is_none()) {
            if explicit_id && id.is_some() {
                return Err(Error::new_spanned(ident, "an entity can have only one id"));
            }
            id = Some(field_name);
            continue;
        }

        let private = p.has_flag(&field.attrs, "private")?;
        let related_name = p.get_arg::<LitStr, _>(&field.attrs, "related_name")?;
        match relation(&field.ty) {
            Some((kind, target)) => {
                let related_name = related_name.map(|name| quote!(.related_name(#name)));
                let relation = quote! {
                    #schema::RelationDef::new(#field_name, <#target as #schema::Entity>::NAME)
                        #related_name
                };
                decls.push(match kind {
                    RelationKind::ToOne => quote!(.to_one(#relation)),
                    RelationKind::Many => quote!(.many_to_many(#relation)),
                });
            }
            None => {
                if let Some(related_name) = related_name {
                    return Err(Error::new_spanned(
                        related_name,
                        "related_name only applies to relations",
                    ));
                }
                decls.push(if private {
                    quote!(.private_field(#field_name))
                } else {
                    quote!(.field(#field_name))
                });
            }
        }
    }
    let id = id.map(|id| quote!(.id(#id)));

    Ok(quote! {
        impl #schema::Entity for #name {
            const NAME: &'static str = #entity_name;

            fn describe() -> #schema::EntityDef {
                #constructor #id #(#decls)*
            }
        }
    })
}
