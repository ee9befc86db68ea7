//! Derives backing `vtsp_core`'s option types.
//!
//! The generated code names `crate::Error` and `crate::Result`, so these
//! derives are meant for use inside `vtsp_core`.

mod attrs;
mod cli_options;
mod cli_value;
mod kv_display;
mod types;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Case-insensitive `parse`/`FromStr`, `as_str`/`Display` and a
/// `CLI_VALUES` constant for a unit-only enum.
///
/// `#[cli_value(option = "...")]` names the option in error messages;
/// variants accept `#[cli(alias = "...")]`.
#[proc_macro_derive(CliValue, attributes(cli_value, cli))]
pub fn derive_cli_value(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    cli_value::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// `--long[=value]` handling for fields tagged
/// `#[cli(long = "...", parse_with = "...", value = "<hint>", flag)]`.
#[proc_macro_derive(CliOptions, attributes(cli))]
pub fn derive_cli_options(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    cli_options::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Aligned `key = value` listing, one field per line.
#[proc_macro_derive(KvDisplay)]
pub fn derive_kv_display(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    kv_display::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
