use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Variant};

use crate::{attrs, types};

/// How one variant is written and read on the command line.
struct Spelling {
    ident: Ident,
    canonical: String,
    aliases: Vec<String>,
}

impl Spelling {
    fn from_variant(variant: &Variant) -> syn::Result<Self> {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "CliValue variants must be unit variants",
            ));
        }

        let mut spelling = Self {
            ident: variant.ident.clone(),
            canonical: types::kebab(&variant.ident.to_string()),
            aliases: Vec::new(),
        };
        attrs::visit(&variant.attrs, "cli", |meta| {
            if meta.path.is_ident("alias") {
                spelling.aliases.push(attrs::string(meta)?);
                Ok(())
            } else {
                Err(meta.error("expected `alias = \"...\"`"))
            }
        })?;
        Ok(spelling)
    }

    /// Lower-cased spellings `parse` matches against.
    fn accepted(&self) -> impl Iterator<Item = syn::LitStr> + '_ {
        std::iter::once(&self.canonical)
            .chain(&self.aliases)
            .map(|raw| attrs::lit(&raw.to_ascii_lowercase()))
    }
}

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "CliValue only applies to enums",
        ));
    };

    let mut option = types::kebab(&input.ident.to_string());
    attrs::visit(&input.attrs, "cli_value", |meta| {
        if meta.path.is_ident("option") {
            option = attrs::string(meta)?;
            Ok(())
        } else {
            Err(meta.error("expected `option = \"...\"`"))
        }
    })?;

    let spellings = data
        .variants
        .iter()
        .map(Spelling::from_variant)
        .collect::<syn::Result<Vec<_>>>()?;

    let ident = &input.ident;
    let option = attrs::lit(&option);
    let values = attrs::lit(
        &spellings
            .iter()
            .map(|s| s.canonical.as_str())
            .collect::<Vec<_>>()
            .join("|"),
    );
    let parse_arms = spellings.iter().map(|s| {
        let variant = &s.ident;
        let accepted = s.accepted();
        quote! { #(#accepted)|* => Ok(Self::#variant), }
    });
    let name_arms = spellings.iter().map(|s| {
        let variant = &s.ident;
        let canonical = attrs::lit(&s.canonical);
        quote! { Self::#variant => #canonical, }
    });

    Ok(quote! {
        impl #ident {
            /// Canonical spellings joined with `|`.
            pub const CLI_VALUES: &'static str = #values;

            pub fn parse(raw: &str) -> crate::Result<Self> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    #(#parse_arms)*
                    _ => Err(crate::Error::invalid_input(format!(
                        "Invalid value for --{}: {} (expected {})",
                        #option,
                        raw,
                        Self::CLI_VALUES
                    ))),
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }

        impl std::str::FromStr for #ident {
            type Err = crate::Error;

            fn from_str(raw: &str) -> crate::Result<Self> {
                Self::parse(raw)
            }
        }

        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    })
}
