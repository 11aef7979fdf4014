//! Naming utilities for code generation

use heck::{ToPascalCase, ToSnakeCase};

/// Convert a snake_case or mixed-case name to UpperCamelCase.
///
/// Names containing `_` are split on it and every non-empty segment gets an
/// upper-case first letter (`t_artifact` -> `TArtifact`). Other names are
/// treated as already mixed case and only the first letter is raised.
pub fn to_upper_camel(name: &str) -> String {
    if name.contains('_') {
        name.split('_').filter(|s| !s.is_empty()).map(capitalize).collect()
    } else {
        capitalize(name)
    }
}

/// Same as [`to_upper_camel`] with the first letter lowered
/// (`ArtifactId` -> `artifactId`)
pub fn to_lower_camel(name: &str) -> String {
    let upper = to_upper_camel(name);
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// lowerCamelCase identifier that never collides with a Rust keyword
/// (`type` -> `type_`)
pub fn to_safe_identifier(name: &str) -> String {
    let ident = to_lower_camel(name);
    if is_rust_keyword(&ident) {
        format!("{}_", ident)
    } else {
        ident
    }
}

/// Convert a column name to a field name (snake_case)
pub fn to_field_name(column_name: &str) -> String {
    column_name.to_snake_case()
}

/// Field name usable in generated code, raw identifier for keywords
/// (`type` -> `r#type`)
pub fn escape_field_name(name: &str) -> String {
    let snake = to_field_name(name);
    if is_rust_keyword(&snake) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// Convert a column name to an enum variant name
/// (`order-no` -> `OrderNo`, `2fa_enabled` -> `_2faEnabled`)
pub fn to_variant_name(name: &str) -> String {
    let variant = name.to_pascal_case();
    match variant.chars().next() {
        None => "Column".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{}", variant),
        Some(_) if is_rust_keyword(&variant) => format!("{}_", variant),
        Some(_) => variant,
    }
}

/// Method suffix for a key lookup: `["user_id", "device_type"]` -> `user_id_and_device_type`
pub fn key_method_suffix(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| c.to_snake_case())
        .collect::<Vec<_>>()
        .join("_and_")
}

/// Short module name of an output sub-path: its last path segment
pub fn package_name(sub_path: &str) -> String {
    sub_path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Rust module path for an output sub-path (`generated/dao` -> `generated::dao`)
pub fn module_path(sub_path: &str) -> String {
    sub_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|s| s.to_snake_case())
        .collect::<Vec<_>>()
        .join("::")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Check if a name is a Rust reserved keyword
pub fn is_rust_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "async"
            | "await"
            | "break"
            | "const"
            | "continue"
            | "crate"
            | "dyn"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "try"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
    )
}
