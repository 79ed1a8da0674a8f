use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Index, Member, parse_quote};

use crate::attributes::{FieldAttributes, TypeAttributes};
use crate::path;

pub(crate) fn derive(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &ast.data else {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "`Reflect` can only be derived for structs",
        ));
    };

    let meta = path::ut_meta();
    let type_attributes = TypeAttributes::parse(&ast.attrs)?;

    let mut registrations = Vec::new();
    for (index, field) in data.fields.iter().enumerate() {
        let attributes = FieldAttributes::parse(field)?;
        if attributes.skip {
            continue;
        }
        let (member, default_name) = match &field.ident {
            Some(ident) => {
                let name = ident.to_string();
                let name = name.strip_prefix("r#").unwrap_or(&name).to_owned();
                (Member::Named(ident.clone()), name)
            }
            None => (Member::Unnamed(Index::from(index)), format!("p{index}")),
        };
        let name = attributes.name.unwrap_or(default_name);
        registrations.push(quote! {
            snapshot.add(&mut self.#member, #name)?;
        });
    }

    let on_event = type_attributes.on_event.map(|method| {
        quote! {
            fn on_event(&mut self, event: #meta::Event) -> #meta::Result<()> {
                self.#method(event)
            }
        }
    });

    let ident = &ast.ident;
    let mut generics = ast.generics.clone();
    let type_params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in type_params {
        where_clause
            .predicates
            .push(parse_quote!(#param: #meta::Reflect));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #meta::Reflect for #ident #ty_generics #where_clause {
            fn reflect<'__ut>(
                &'__ut mut self,
                snapshot: &mut #meta::Snapshot<'__ut>,
            ) -> #meta::Result<()> {
                #(#registrations)*
                let _ = snapshot;
                ::core::result::Result::Ok(())
            }

            #on_event
        }
    })
}
