use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Variant};

/// `NodeCoordSection` -> `NODE_COORD_SECTION`. A capital starts a new word
/// after a lowercase letter or digit, or when it begins a capitalised word
/// following an acronym (`ATSPTour` -> `ATSP_TOUR`).
fn keyword_of(ident: &Ident) -> String {
    let chars: Vec<char> = ident.to_string().chars().collect();
    let mut out = String::with_capacity(chars.len() * 2);
    for (idx, &ch) in chars.iter().enumerate() {
        let starts_word = idx > 0
            && ch.is_ascii_uppercase()
            && match chars[idx - 1] {
                prev if prev.is_ascii_lowercase() || prev.is_ascii_digit() => true,
                prev if prev.is_ascii_uppercase() => chars
                    .get(idx + 1)
                    .is_some_and(|next| next.is_ascii_lowercase()),
                _ => false,
            };
        if starts_word {
            out.push('_');
        }
        out.push(ch.to_ascii_uppercase());
    }
    out
}

/// Explicit `#[tsplib("KEYWORD")]`, else the derived spelling.
fn variant_keyword(variant: &Variant) -> syn::Result<LitStr> {
    if !matches!(variant.fields, Fields::Unit) {
        return Err(syn::Error::new_spanned(
            variant,
            "TsplibKeyword variants must be unit variants",
        ));
    }
    match variant
        .attrs
        .iter()
        .rfind(|attr| attr.path().is_ident("tsplib"))
    {
        Some(attr) => attr.parse_args::<LitStr>(),
        None => Ok(LitStr::new(&keyword_of(&variant.ident), variant.ident.span())),
    }
}

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "TsplibKeyword only applies to enums",
        ));
    };

    let variants: Vec<&Ident> = data.variants.iter().map(|v| &v.ident).collect();
    let keywords = data
        .variants
        .iter()
        .map(variant_keyword)
        .collect::<syn::Result<Vec<_>>>()?;

    let ident = &input.ident;
    let type_name = LitStr::new(&ident.to_string(), ident.span());
    let expected = LitStr::new(
        &keywords
            .iter()
            .map(LitStr::value)
            .collect::<Vec<_>>()
            .join("|"),
        ident.span(),
    );

    Ok(quote! {
        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    #(Self::#variants => #keywords,)*
                })
            }
        }

        impl std::str::FromStr for #ident {
            type Err = crate::TsplibError;

            fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
                match raw.trim().to_ascii_uppercase().as_str() {
                    #(#keywords => Ok(Self::#variants),)*
                    _ => Err(crate::TsplibError::invalid_data(format!(
                        "Unsupported {} value '{}' (expected {})",
                        #type_name,
                        raw.trim(),
                        #expected
                    ))),
                }
            }
        }
    })
}
