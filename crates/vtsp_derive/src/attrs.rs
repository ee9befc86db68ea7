use syn::{Attribute, LitStr, meta::ParseNestedMeta};

/// Runs `visit` on every nested item of every `#[name(...)]` attribute.
pub(crate) fn visit(
    attrs: &[Attribute],
    name: &str,
    mut on_item: impl FnMut(&ParseNestedMeta<'_>) -> syn::Result<()>,
) -> syn::Result<()> {
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(name)) {
        attr.parse_nested_meta(|meta| on_item(&meta))?;
    }
    Ok(())
}

/// The string literal after `key = `.
pub(crate) fn string(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

pub(crate) fn lit(value: &str) -> LitStr {
    LitStr::new(value, proc_macro2::Span::call_site())
}
