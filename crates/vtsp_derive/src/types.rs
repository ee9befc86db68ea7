use syn::{GenericArgument, PathArguments, Type};

/// Last path segment of a plain path type, with its generic arguments.
fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

/// `T` for `Option<T>` (bare or `std::`/`core::option::` qualified).
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let names: Vec<String> = path
        .path
        .segments
        .iter()
        .map(|seg| seg.ident.to_string())
        .collect();
    let is_option = match names.as_slice() {
        [one] => one == "Option",
        [root, module, name] => {
            (root == "std" || root == "core") && module == "option" && name == "Option"
        }
        _ => false,
    };
    if !is_option {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &last_segment(ty)?.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}

pub(crate) fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.is_ident("bool"))
}

/// `<placeholder>` shown in usage text. Strings are paths in this crate.
pub(crate) fn usage_hint(ty: &Type) -> String {
    let ty = option_inner(ty).unwrap_or(ty);
    match last_segment(ty) {
        Some(seg) if seg.ident == "String" || seg.ident == "PathBuf" => "<path>".to_string(),
        Some(seg) => format!("<{}>", seg.ident),
        None => "<value>".to_string(),
    }
}

/// `IntegralKind` -> `integral-kind`.
pub(crate) fn kebab(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for ch in ident.chars() {
        if ch.is_ascii_uppercase() && !out.is_empty() {
            out.push('-');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}
