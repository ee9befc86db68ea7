use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, Path, Type};

use crate::{attrs, types};

/// One `#[cli(...)]` field.
struct CliField<'f> {
    ident: &'f Ident,
    ty: &'f Type,
    long: String,
    parse_with: Option<Path>,
    hint: Option<String>,
    flag: bool,
}

impl<'f> CliField<'f> {
    /// `None` for fields without a `long` name.
    fn from_field(field: &'f Field) -> syn::Result<Option<Self>> {
        let mut long = None;
        let mut parse_with = None;
        let mut hint = None;
        let mut flag = false;

        attrs::visit(&field.attrs, "cli", |meta| {
            if meta.path.is_ident("long") {
                long = Some(attrs::string(meta)?);
            } else if meta.path.is_ident("parse_with") {
                parse_with = Some(syn::parse_str::<Path>(&attrs::string(meta)?)?);
            } else if meta.path.is_ident("value") {
                hint = Some(attrs::string(meta)?);
            } else if meta.path.is_ident("flag") {
                flag = true;
            } else {
                return Err(meta.error("expected `long`, `parse_with`, `value` or `flag`"));
            }
            Ok(())
        })?;

        let (Some(ident), Some(long)) = (field.ident.as_ref(), long) else {
            return Ok(None);
        };
        if flag && !types::is_bool(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "`cli(flag)` fields must be `bool`",
            ));
        }
        Ok(Some(Self {
            ident,
            ty: &field.ty,
            long,
            parse_with,
            hint,
            flag,
        }))
    }

    fn usage(&self) -> String {
        if self.flag {
            return format!("  --{0}[=<bool>]\n  --no-{0}\n", self.long);
        }
        let hint = match &self.hint {
            Some(hint) => hint.clone(),
            None => types::usage_hint(self.ty),
        };
        format!("  --{} {hint}\n", self.long)
    }

    /// Expression turning the `String` named `raw` into the field's value.
    fn parse_expr(&self) -> TokenStream {
        let (target, wrap) = match types::option_inner(self.ty) {
            Some(inner) => (inner, true),
            None => (self.ty, false),
        };
        let parsed = match &self.parse_with {
            Some(parser) => quote! { #parser(&raw)? },
            None => quote! {
                raw.parse::<#target>().map_err(|e| {
                    crate::Error::invalid_input(format!(
                        "Invalid value for --{name}: {raw} ({e})"
                    ))
                })?
            },
        };
        if wrap { quote! { Some(#parsed) } } else { parsed }
    }

    fn match_arms(&self) -> TokenStream {
        let ident = self.ident;
        let long = attrs::lit(&self.long);
        if !self.flag {
            let parsed = self.parse_expr();
            return quote! {
                #long => {
                    let raw = value.ok_or_else(|| {
                        crate::Error::invalid_input(format!("Missing value for --{name}"))
                    })?;
                    self.#ident = #parsed;
                }
            };
        }

        let negated = attrs::lit(&format!("no-{}", self.long));
        quote! {
            #long => {
                self.#ident = match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    None | Some("1" | "true" | "yes" | "on") => true,
                    Some("0" | "false" | "no" | "off") => false,
                    Some(_) => {
                        return Err(crate::Error::invalid_input(format!(
                            "Invalid boolean for --{name}: {} (expected true/false)",
                            value.unwrap_or_default()
                        )));
                    }
                };
            }
            #negated => {
                if value.is_some() {
                    return Err(crate::Error::invalid_input(format!(
                        "Flag --{name} does not take a value"
                    )));
                }
                self.#ident = false;
            }
        }
    }
}

/// Generates `CLI_USAGE`, `split_arg` and `apply_cli_option`. Flags also
/// answer to `--no-<long>`.
pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "CliOptions only applies to structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "CliOptions needs named fields",
        ));
    };

    let mut fields = Vec::new();
    for field in &named.named {
        if let Some(cli) = CliField::from_field(field)? {
            fields.push(cli);
        }
    }

    let usage = attrs::lit(&fields.iter().map(CliField::usage).collect::<String>());
    let arms = fields.iter().map(CliField::match_arms);
    let ident = &input.ident;

    Ok(quote! {
        impl #ident {
            /// One line per option, in declaration order.
            pub const CLI_USAGE: &'static str = #usage;

            /// `name=value`, or `name value` when the next argument is not an option.
            fn split_arg(
                raw_name: &str,
                args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
            ) -> (String, Option<String>) {
                if let Some((name, value)) = raw_name.split_once('=') {
                    return (name.to_string(), Some(value.to_string()));
                }
                let value = args.next_if(|next| !next.starts_with("--"));
                (raw_name.to_string(), value)
            }

            /// `Ok(false)` for names this struct does not know.
            fn apply_cli_option(
                &mut self,
                name: &str,
                value: Option<String>,
            ) -> crate::Result<bool> {
                match name {
                    #(#arms)*
                    _ => return Ok(false),
                }
                Ok(true)
            }
        }
    })
}
