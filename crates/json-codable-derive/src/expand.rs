use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DataEnum, DeriveInput, Fields, FieldsNamed, Ident, LitStr};

use crate::attrs::{FieldAttributes, TypeAttributes, VariantAttributes};

pub(crate) fn derive_codable(input: DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Codable cannot be derived for generic types; a registered type needs one fixed name",
        ));
    }
    let attrs = TypeAttributes::parse(&input.attrs)?;
    let name = attrs.rename.clone().unwrap_or_else(|| input.ident.to_string());

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                if let Some(key) = &attrs.discriminator {
                    return Err(syn::Error::new(key.span(), "`discriminator` only applies to enums"));
                }
                expand_record(&input.ident, &name, &attrs, fields)
            }
            other => Err(syn::Error::new(
                other.span(),
                "Codable can only be derived for structs with named fields",
            )),
        },
        Data::Enum(data) => {
            if data.variants.is_empty() {
                return Err(syn::Error::new(input.ident.span(), "Codable needs at least one variant"));
            }
            if attrs.strict {
                return Err(syn::Error::new(input.ident.span(), "`strict` only applies to structs"));
            }
            match &attrs.discriminator {
                Some(key) => expand_polymorphic(&input.ident, &name, key, data),
                None => expand_enumeration(&input.ident, &name, data),
            }
        }
        Data::Union(data) => Err(syn::Error::new(
            data.union_token.span(),
            "Codable cannot be derived for unions",
        )),
    }
}

fn expand_record(ident: &Ident, name: &str, attrs: &TypeAttributes, fields: &FieldsNamed) -> syn::Result<TokenStream> {
    let mut descriptors = Vec::new();
    let mut registers = Vec::new();
    let mut to_values = Vec::new();
    let mut reads = Vec::new();

    for field in &fields.named {
        let member = field.ident.as_ref().ok_or_else(|| syn::Error::new(field.span(), "unnamed field"))?;
        let member_str = member.to_string();
        let ty = &field.ty;
        let fa = FieldAttributes::parse(&field.attrs)?;

        if fa.skip {
            if fa.with.is_some() || fa.flatten.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "a skipped field cannot take `with` or `flatten`",
                ));
            }
            descriptors.push(quote! {
                ::json_codable::FieldDescriptor::new(#member_str, ::json_codable::Kind::any()).ignore()
            });
            to_values.push(quote!(::json_codable::Value::Absent));
            reads.push(quote!(#member: reader.skip()));
            continue;
        }

        let mut modifiers = Vec::new();
        if let Some(key) = &fa.rename {
            modifiers.push(quote!(.rename(#key)));
        }
        if fa.default {
            modifiers.push(quote!(.default()));
        }
        if let Some(path) = &fa.with {
            modifiers.push(quote!(.with_coder(#path())));
        }
        match &fa.flatten {
            Some(Some(prefix)) => modifiers.push(quote!(.flatten_with_prefix(#prefix))),
            Some(None) => modifiers.push(quote!(.flatten())),
            None => {}
        }
        if let Some(level) = fa.read_level {
            modifiers.push(quote!(.read_access(::json_codable::AccessRule::min(#level))));
        }
        if let Some(level) = fa.write_level {
            modifiers.push(quote!(.write_access(::json_codable::AccessRule::min(#level))));
        }

        descriptors.push(quote! {
            ::json_codable::FieldDescriptor::new(#member_str, <#ty as ::json_codable::Codable>::kind())
                #(#modifiers)*
        });
        registers.push(quote!(<#ty as ::json_codable::Codable>::register(registry)?;));
        to_values.push(quote!(::json_codable::Codable::to_value(&self.#member)));
        reads.push(if fa.default {
            quote!(#member: reader.read_or_default::<#ty>(#member_str)?)
        } else {
            quote!(#member: reader.read::<#ty>(#member_str)?)
        });
    }

    let strict = attrs.strict.then(|| quote!(.strict()));

    Ok(quote! {
        impl ::json_codable::Codable for #ident {
            fn kind() -> ::json_codable::Kind {
                ::json_codable::Kind::nested(#name)
            }

            fn register(
                registry: &mut ::json_codable::RegistryBuilder,
            ) -> ::core::result::Result<(), ::json_codable::RegistryError> {
                if registry.contains(#name) {
                    return ::core::result::Result::Ok(());
                }
                let descriptor = ::json_codable::TypeDescriptor::record(#name)
                    #(.field(#descriptors))*
                    #strict
                    .build()?;
                registry.register(descriptor)?;
                #(#registers)*
                ::core::result::Result::Ok(())
            }

            fn to_value(&self) -> ::json_codable::Value {
                ::json_codable::Value::record(::std::vec![#(#to_values),*])
            }

            fn from_value(
                value: ::json_codable::Value,
            ) -> ::core::result::Result<Self, ::json_codable::DecodeError> {
                let mut reader = ::json_codable::RecordReader::new(value)?;
                ::core::result::Result::Ok(Self {
                    #(#reads,)*
                })
            }
        }
    })
}

fn expand_enumeration(ident: &Ident, name: &str, data: &DataEnum) -> syn::Result<TokenStream> {
    let mut names = Vec::new();
    let mut idents = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "enums with data need `#[codable(discriminator = \"...\")]` and newtype variants",
            ));
        }
        let va = VariantAttributes::parse(&variant.attrs)?;
        names.push(va.rename.unwrap_or_else(|| variant.ident.to_string()));
        idents.push(&variant.ident);
    }

    Ok(quote! {
        impl ::json_codable::Codable for #ident {
            fn kind() -> ::json_codable::Kind {
                ::json_codable::Kind::nested(#name)
            }

            fn register(
                registry: &mut ::json_codable::RegistryBuilder,
            ) -> ::core::result::Result<(), ::json_codable::RegistryError> {
                let descriptor = ::json_codable::TypeDescriptor::enumeration(#name)
                    #(.variant(#names))*
                    .build()?;
                registry.register(descriptor)?;
                ::core::result::Result::Ok(())
            }

            fn to_value(&self) -> ::json_codable::Value {
                let name = match self {
                    #(Self::#idents => #names,)*
                };
                ::json_codable::Value::Str(::std::string::String::from(name))
            }

            fn from_value(
                value: ::json_codable::Value,
            ) -> ::core::result::Result<Self, ::json_codable::DecodeError> {
                let name = value.into_str()?;
                match name.as_str() {
                    #(#names => ::core::result::Result::Ok(Self::#idents),)*
                    _ => ::core::result::Result::Err(::json_codable::DecodeError::UnknownVariant(name.clone())),
                }
            }
        }
    })
}

fn expand_polymorphic(ident: &Ident, name: &str, key: &LitStr, data: &DataEnum) -> syn::Result<TokenStream> {
    let mut tags = Vec::new();
    let mut idents = Vec::new();
    let mut types = Vec::new();
    for variant in &data.variants {
        let ty = match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
            _ => {
                return Err(syn::Error::new(
                    variant.span(),
                    "polymorphic variants must wrap exactly one record type, as in `Circle(Circle)`",
                ))
            }
        };
        let va = VariantAttributes::parse(&variant.attrs)?;
        tags.push(va.rename.unwrap_or_else(|| variant.ident.to_string()));
        idents.push(&variant.ident);
        types.push(ty);
    }

    Ok(quote! {
        impl ::json_codable::Codable for #ident {
            fn kind() -> ::json_codable::Kind {
                ::json_codable::Kind::polymorphic(#name)
            }

            fn register(
                registry: &mut ::json_codable::RegistryBuilder,
            ) -> ::core::result::Result<(), ::json_codable::RegistryError> {
                if registry.contains(#name) {
                    return ::core::result::Result::Ok(());
                }
                let descriptor = ::json_codable::TypeDescriptor::polymorphic(#name, #key).build()?;
                registry.register(descriptor)?;
                #(
                    <#types as ::json_codable::Codable>::register(registry)?;
                    registry.register_variant_of::<#types>(#name, #tags)?;
                )*
                ::core::result::Result::Ok(())
            }

            fn to_value(&self) -> ::json_codable::Value {
                let (tag, inner) = match self {
                    #(Self::#idents(inner) => (#tags, ::json_codable::Codable::to_value(inner)),)*
                };
                match inner {
                    ::json_codable::Value::Record(record) => ::json_codable::Value::variant(tag, record),
                    other => other,
                }
            }

            fn from_value(
                value: ::json_codable::Value,
            ) -> ::core::result::Result<Self, ::json_codable::DecodeError> {
                let (tag, record) = value.into_variant()?.into_parts();
                match tag.as_str() {
                    #(
                        #tags => <#types as ::json_codable::Codable>::from_value(
                            ::json_codable::Value::Record(record),
                        )
                        .map(Self::#idents),
                    )*
                    _ => ::core::result::Result::Err(::json_codable::DecodeError::UnknownVariant(tag.clone())),
                }
            }
        }
    })
}
