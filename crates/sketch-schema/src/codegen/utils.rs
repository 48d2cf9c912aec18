use heck::ToPascalCase;
use proc_macro2::TokenStream;
use quote::quote;

/// Convert a value string to a valid Rust variant name
pub(super) fn value_to_variant_name(value: &str) -> String {
    // Remove leading special chars and convert to pascal case
    let clean = value.trim_start_matches(|c: char| !c.is_alphanumeric());
    let variant = clean.replace(['-', '.'], "_").to_pascal_case();

    // Prefix with underscore if starts with digit
    if variant.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{}", variant)
    } else if variant.is_empty() {
        "Unknown".to_string()
    } else {
        variant
    }
}

/// Sanitize a string to be safe for identifiers
pub(super) fn sanitize_name(s: &str) -> String {
    if s.is_empty() {
        return "unknown".to_string();
    }

    // Replace invalid characters with underscores
    let mut sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Ensure it doesn't start with a digit
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized = format!("_{}", sanitized);
    }

    sanitized
}

/// Create an identifier, using raw identifier if necessary for keywords
pub(super) fn make_ident(s: &str) -> syn::Ident {
    if s.is_empty() {
        tracing::warn!("empty identifier encountered, using 'unknown' as fallback");
        return syn::Ident::new("unknown", proc_macro2::Span::call_site());
    }

    let sanitized = sanitize_name(s);

    // Try to parse as ident, fall back to raw ident for keywords
    syn::parse_str::<syn::Ident>(&sanitized).unwrap_or_else(|_| {
        match sanitized.as_str() {
            // These can't be raw identifiers
            "self" | "Self" | "super" | "crate" | "_" => {
                syn::Ident::new(&format!("{}_", sanitized), proc_macro2::Span::call_site())
            }
            _ => syn::Ident::new_raw(&sanitized, proc_macro2::Span::call_site()),
        }
    })
}

/// Generate doc comment from optional description
pub(super) fn generate_doc_comment(desc: Option<&str>) -> TokenStream {
    if let Some(description) = desc {
        let lines = description.lines().map(|line| format!(" {}", line.trim_end()));
        quote! {
            #(#[doc = #lines])*
        }
    } else {
        quote! {}
    }
}

/// Append a numeric suffix to names that are already taken
pub(super) fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}{}", name, suffix);
                suffix += 1;
            }
            candidate
        })
        .collect()
}
