//! Derive macros of `ut_meta`:
//!
//! - [`Reflect`]: registers the fields of a struct as snapshot children;
//! - [`Polymorphic`]: names a type of a polymorphic hierarchy.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod path;
mod polymorphic;
mod reflect;

// -----------------------------------------------------------------------------
// Macros

/// Implements `Reflect` for a struct.
///
/// Named fields become children named after the field, tuple fields
/// children named `p0`, `p1`, ... Every field type must implement
/// `Reflect`.
///
/// Field attributes:
///
/// - `#[reflect(name = "...")]` renames the child;
/// - `#[reflect(skip)]` leaves the field out.
///
/// Type attribute:
///
/// - `#[reflect(on_event = "method")]` forwards events to
///   `fn method(&mut self, event: Event) -> Result<()>`.
///
/// ```rust, ignore
/// #[derive(Reflect, Default)]
/// #[reflect(on_event = "rebuild")]
/// struct Mesh {
///     vertices: Vec<f32>,
///     #[reflect(name = "idx")]
///     indices: Vec<u32>,
///     #[reflect(skip)]
///     bounds: [f32; 6],
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    reflect::derive(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Polymorphic` and `PolymorphicName` for a type.
///
/// The name defaults to the type identifier and is set with
/// `#[polymorphic(name = "...")]`.
///
/// ```rust, ignore
/// #[derive(Reflect, Polymorphic, Default)]
/// #[polymorphic(name = "circle")]
/// struct Circle {
///     radius: f32,
/// }
/// ```
#[proc_macro_derive(Polymorphic, attributes(polymorphic))]
pub fn derive_polymorphic(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    polymorphic::derive(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
