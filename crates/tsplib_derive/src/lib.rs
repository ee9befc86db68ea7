mod keyword;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Display` and case-insensitive `FromStr` for TSPLIB keyword enums.
///
/// Variants map to their upper-cased name with `_` between words, unless
/// overridden with `#[tsplib("KEYWORD")]`. The generated `FromStr` reports
/// failures as `crate::TsplibError`.
#[proc_macro_derive(TsplibKeyword, attributes(tsplib))]
pub fn derive_tsplib_keyword(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    keyword::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
