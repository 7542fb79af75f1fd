//! Procedural macros for the `mirrorlist` synchronized-collection library.
//!
//! `#[derive(Entity)]` inspects a struct and generates the static shape table
//! (`EntityShape`) plus key accessors that `mirrorlist_core` uses for schema
//! mapping and identity resolution.
//!
//! Only syntax is checked here. Semantic problems such as two key fields or an
//! auto-increment key that is not an `Option` of an integer type are reported
//! as a `SchemaError` by the schema mapper the first time the type is used.

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Ident, LitInt, LitStr, Type,
};

// --- Helper Functions for Parsing ---

/// Helper to check if a type is an `Option<T>`.
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_none() && type_path.path.leading_colon.is_none() {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Option";
            }
        }
    }
    false
}

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let path = &type_path.path;
        if let Some(segment) = path.segments.last().filter(|s| s.ident == "Option") {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                    return Some(inner_ty);
                }
            }
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Integer,
    String,
    Other,
}

/// Classify the (Option-stripped) field type.
fn kind_of(ty: &Type) -> Kind {
    let inner = get_option_inner(ty).unwrap_or(ty);
    let inner = match inner {
        Type::Reference(r) => &*r.elem,
        other => other,
    };
    let ty_str = inner.to_token_stream().to_string().replace(' ', "");
    let last = ty_str.rsplit("::").next().unwrap_or(&ty_str);
    match last {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => Kind::Integer,
        "String" | "str" => Kind::String,
        _ => Kind::Other,
    }
}

impl ToTokens for Kind {
    fn to_tokens(&self, tokens: &mut proc_macro2::TokenStream) {
        tokens.extend(match self {
            Kind::Integer => quote! { ::mirrorlist_core::FieldKind::Integer },
            Kind::String => quote! { ::mirrorlist_core::FieldKind::String },
            Kind::Other => quote! { ::mirrorlist_core::FieldKind::Other },
        });
    }
}

/// Holds parsed metadata about a single struct field.
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    kind: Kind,
    column: Option<String>,
    is_key: bool,
    auto_increment: bool,
    full_text: bool,
    max_length: Option<u32>,
}

/// Parses all named fields and their `#[field(...)]` attributes.
fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "#[derive(Entity)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Entity)] can only be used on structs",
            ))
        }
    };

    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut meta = FieldMetadata {
            kind: kind_of(&field.ty),
            ident,
            ty: field.ty.clone(),
            column: None,
            is_key: false,
            auto_increment: false,
            full_text: false,
            max_length: None,
        };

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("field")) {
            attr.parse_nested_meta(|nested| {
                if nested.path.is_ident("key") {
                    meta.is_key = true;
                } else if nested.path.is_ident("auto_increment") {
                    meta.auto_increment = true;
                } else if nested.path.is_ident("full_text") {
                    meta.full_text = true;
                } else if nested.path.is_ident("column") {
                    let s: LitStr = nested.value()?.parse()?;
                    meta.column = Some(s.value());
                } else if nested.path.is_ident("length") {
                    let n: LitInt = nested.value()?.parse()?;
                    meta.max_length = Some(n.base10_parse()?);
                } else {
                    return Err(nested.error(
                        "unknown #[field(...)] key; expected key, auto_increment, full_text, column or length",
                    ));
                }
                Ok(())
            })?;
        }
        out.push(meta);
    }
    Ok(out)
}

/// Reads `#[entity(table = "...")]`.
fn parse_table_override(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("table") {
                let s: LitStr = nested.value()?.parse()?;
                table = Some(s.value());
                Ok(())
            } else {
                Err(nested.error("unknown #[entity(...)] key; expected table"))
            }
        })?;
    }
    Ok(table)
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity, field))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    // Shape names drop the `r#` prefix of raw identifiers.
    let type_name = struct_name.unraw().to_string();
    let fields_metadata = parse_field_metadata(input)?;
    let table = match parse_table_override(input)? {
        Some(t) => quote! { ::core::option::Option::Some(#t) },
        None => quote! { ::core::option::Option::None },
    };
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // --- Shape table ---
    let field_shapes: Vec<_> = fields_metadata
        .iter()
        .map(|f| {
            let name = f.ident.unraw().to_string();
            let column = match &f.column {
                Some(c) => quote! { ::core::option::Option::Some(#c) },
                None => quote! { ::core::option::Option::None },
            };
            let max_length = match f.max_length {
                Some(n) => quote! { ::core::option::Option::Some(#n) },
                None => quote! { ::core::option::Option::None },
            };
            let key = f.is_key;
            let auto = f.auto_increment;
            let full_text = f.full_text;
            let kind = f.kind;
            let nullable = is_option(&f.ty);
            quote! {
                ::mirrorlist_core::FieldShape {
                    name: #name,
                    column: #column,
                    key: #key,
                    auto_increment: #auto,
                    full_text: #full_text,
                    kind: #kind,
                    nullable: #nullable,
                    max_length: #max_length,
                }
            }
        })
        .collect();

    // --- Key accessors ---
    // With several key fields the first one drives the accessors; the schema
    // mapper rejects the type before any collection can use them.
    let key_impl = match fields_metadata.iter().find(|f| f.is_key) {
        Some(key_field) => {
            let id_ident = &key_field.ident;
            let id_ty = &key_field.ty;
            let optional = is_option(id_ty);
            let key_ty = get_option_inner(id_ty).unwrap_or(id_ty);

            let getter = if optional {
                quote! { ::core::clone::Clone::clone(&self.#id_ident) }
            } else {
                quote! { ::core::option::Option::Some(::core::clone::Clone::clone(&self.#id_ident)) }
            };
            let setter = if optional {
                quote! { self.#id_ident = ::core::option::Option::Some(key); }
            } else {
                quote! { self.#id_ident = key; }
            };
            let generated = if key_field.auto_increment && key_field.kind == Kind::Integer {
                quote! {
                    fn set_generated_key(&mut self, seq: i64) -> bool {
                        match <#key_ty as ::core::convert::TryFrom<i64>>::try_from(seq) {
                            ::core::result::Result::Ok(key) => {
                                #setter
                                true
                            }
                            ::core::result::Result::Err(_) => false,
                        }
                    }
                }
            } else {
                quote! {}
            };

            quote! {
                type Key = #key_ty;

                fn key(&self) -> ::core::option::Option<Self::Key> {
                    #getter
                }

                fn set_key(&mut self, key: Self::Key) {
                    #setter
                }

                #generated
            }
        }
        None => quote! {
            type Key = ::mirrorlist_core::NoKey;

            fn key(&self) -> ::core::option::Option<Self::Key> {
                ::core::option::Option::None
            }

            fn set_key(&mut self, _key: Self::Key) {}
        },
    };

    Ok(quote! {
        impl #impl_generics ::mirrorlist_core::Entity for #struct_name #ty_generics #where_clause {
            const SHAPE: ::mirrorlist_core::EntityShape = ::mirrorlist_core::EntityShape {
                type_name: #type_name,
                table: #table,
                fields: &[#(#field_shapes),*],
            };

            #key_impl
        }
    })
}
