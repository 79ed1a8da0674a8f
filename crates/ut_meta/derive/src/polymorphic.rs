use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr};

use crate::attributes::polymorphic_name;
use crate::path;

pub(crate) fn derive(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let meta = path::ut_meta();
    let ident = &ast.ident;
    let name = polymorphic_name(&ast.attrs)?
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #meta::PolymorphicName for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }

        impl #impl_generics #meta::Polymorphic for #ident #ty_generics #where_clause {
            fn identify(&self) -> #meta::__macro_exports::Cow<'static, str> {
                #meta::__macro_exports::Cow::Borrowed(
                    <Self as #meta::PolymorphicName>::NAME,
                )
            }
        }
    })
}
