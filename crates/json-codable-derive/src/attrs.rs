//! Parsing of `#[codable(...)]` attributes.

use syn::{Attribute, LitInt, LitStr, Path};

const ATTRIBUTE: &str = "codable";

/// Type-level options.
#[derive(Debug, Default)]
pub(crate) struct TypeAttributes {
    /// Registered type name; defaults to the Rust identifier.
    pub rename: Option<String>,
    pub strict: bool,
    /// Makes a newtype-variant enum a polymorphic base.
    pub discriminator: Option<LitStr>,
}

#[derive(Debug, Default)]
pub(crate) struct FieldAttributes {
    pub rename: Option<String>,
    pub skip: bool,
    pub default: bool,
    /// Function returning a `CoderRef`.
    pub with: Option<Path>,
    /// `Some(None)` flattens with the default prefix.
    pub flatten: Option<Option<String>>,
    pub read_level: Option<u32>,
    pub write_level: Option<u32>,
}

#[derive(Debug, Default)]
pub(crate) struct VariantAttributes {
    pub rename: Option<String>,
}

fn codable_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident(ATTRIBUTE))
}

fn parse_level(lit: &LitInt) -> syn::Result<u32> {
    lit.base10_parse::<u32>()
}

impl TypeAttributes {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in codable_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("strict") {
                    out.strict = true;
                } else if meta.path.is_ident("discriminator") {
                    out.discriminator = Some(meta.value()?.parse::<LitStr>()?);
                } else {
                    return Err(meta.error("unknown type attribute; expected `rename`, `strict` or `discriminator`"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

impl FieldAttributes {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in codable_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("default") {
                    out.default = true;
                } else if meta.path.is_ident("with") {
                    out.with = Some(meta.value()?.parse::<LitStr>()?.parse::<Path>()?);
                } else if meta.path.is_ident("flatten") {
                    out.flatten = Some(if meta.input.peek(syn::Token![=]) {
                        Some(meta.value()?.parse::<LitStr>()?.value())
                    } else {
                        None
                    });
                } else if meta.path.is_ident("read_level") {
                    out.read_level = Some(parse_level(&meta.value()?.parse()?)?);
                } else if meta.path.is_ident("write_level") {
                    out.write_level = Some(parse_level(&meta.value()?.parse()?)?);
                } else if meta.path.is_ident("access_level") {
                    let level = parse_level(&meta.value()?.parse()?)?;
                    out.read_level = Some(level);
                    out.write_level = Some(level);
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

impl VariantAttributes {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in codable_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unknown variant attribute; expected `rename`"))
                }
            })?;
        }
        Ok(out)
    }
}
