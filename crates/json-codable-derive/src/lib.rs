//! `#[derive(Codable)]` for `json-codable`.
//!
//! The derive writes a type descriptor for the type and the `to_value` /
//! `from_value` bridge to the engine's dynamic value model. No JSON handling
//! is generated; encoding stays in the registry's derived codecs.
//!
//! # Structs
//!
//! Structs with named fields become records. Type-level options:
//!
//! - `#[codable(rename = "Name")]`: registered type name (defaults to the identifier).
//! - `#[codable(strict)]`: reject unknown keys for this type.
//!
//! Field options:
//!
//! - `rename = "key"`: JSON key.
//! - `skip`: never encoded, decoded as `Default::default()`.
//! - `default`: may be missing from input; missing decodes to `Default::default()`.
//! - `with = "path::to::coder"`: a `fn() -> CoderRef` replacing the resolved strategy.
//! - `flatten` / `flatten = "prefix_"`: inline a nested record's keys.
//! - `read_level = N`, `write_level = N`, `access_level = N`: minimum access levels.
//!
//! # Enums
//!
//! Unit-only enums become enumerations encoded as the variant name. With
//! `#[codable(discriminator = "kind")]`, an enum whose variants each wrap one
//! record type becomes a polymorphic base; `#[codable(rename = "tag")]` on a
//! variant sets its discriminator value.
//!
//! ```ignore
//! #[derive(Codable)]
//! #[codable(discriminator = "type")]
//! enum Shape {
//!     #[codable(rename = "circle")]
//!     Circle(Circle),
//!     #[codable(rename = "square")]
//!     Square(Square),
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod expand;

#[proc_macro_derive(Codable, attributes(codable))]
pub fn derive_codable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand::derive_codable(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
