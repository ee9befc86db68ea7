use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::{attrs, types};

/// `Option` fields print `none` when empty.
pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "KvDisplay needs named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "KvDisplay only applies to structs",
            ));
        }
    };

    let shown: Vec<_> = fields
        .iter()
        .filter_map(|field| {
            let ident = field.ident.as_ref()?;
            Some((ident, types::option_inner(&field.ty).is_some()))
        })
        .collect();

    let width = shown
        .iter()
        .map(|(ident, _)| ident.to_string().len())
        .max()
        .unwrap_or(0);
    let lines = shown.iter().enumerate().map(|(idx, (ident, optional))| {
        let separator = if idx == 0 { "" } else { "\n" };
        let prefix = attrs::lit(&format!("{separator}  {:<width$} = ", ident.to_string()));
        let value = if *optional {
            quote! {
                match &self.#ident {
                    Some(value) => std::fmt::Display::fmt(value, f)?,
                    None => f.write_str("none")?,
                }
            }
        } else {
            quote! { std::fmt::Display::fmt(&self.#ident, f)?; }
        };
        quote! {
            f.write_str(#prefix)?;
            #value
        }
    });

    let ident = &input.ident;
    Ok(quote! {
        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                #(#lines)*
                Ok(())
            }
        }
    })
}
