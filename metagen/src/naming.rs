//! Identifier helpers shared by the extractor, the handlers and the renderer.

/// Split off the first character of `s`.
fn first(s: &str) -> Option<(char, &str)> {
    let mut chars = s.chars();
    chars.next().map(|c| (c, chars.as_str()))
}

/// `name` -> `Name`
pub fn upper_first(s: &str) -> String {
    match first(s) {
        Some((c, rest)) => c.to_uppercase().chain(rest.chars()).collect(),
        None => String::new(),
    }
}

/// `Name` -> `name`
pub fn lower_first(s: &str) -> String {
    match first(s) {
        Some((c, rest)) => c.to_lowercase().chain(rest.chars()).collect(),
        None => String::new(),
    }
}

/// Receiver name for a record type: its first letter, lower-cased.
pub fn receiver_name(type_name: &str) -> String {
    first(type_name)
        .map(|(c, _)| c.to_lowercase().collect())
        .unwrap_or_default()
}

/// Last path segment of a type, without generic arguments.
///
/// `chrono::NaiveDate` -> `NaiveDate`, `Vec<u8>` -> `Vec`
pub fn simple_type_name(ty: &str) -> &str {
    let base = ty.split('<').next().unwrap_or(ty);
    base.rsplit("::").next().unwrap_or(base).trim()
}

/// Argument name derived from a type: first letter of its simple name, lower-cased.
///
/// Doubled when it would shadow the receiver name; `v` when the type does not start
/// with a letter (arrays, tuples, references).
pub fn arg_name(receiver: &str, ty: &str) -> String {
    let arg = match first(simple_type_name(ty)) {
        Some((c, _)) if c.is_alphabetic() => c.to_lowercase().collect::<String>(),
        _ => "v".to_string(),
    };
    if arg == receiver { arg.repeat(2) } else { arg }
}

/// Method-name-safe rendering of a type: `Option<i32>` -> `Option`, `chrono::NaiveDate` -> `NaiveDate`.
pub fn type_title(ty: &str) -> String {
    let ident: String = simple_type_name(ty)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    upper_first(&ident)
}

/// Convert a method name to snake_case.
///
/// `GetDesc` -> `get_desc`, `MapTimesToI64` -> `map_times_to_i64`, `HTTPPort` -> `http_port`
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            if i > 0 && !result.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                    result.push('_');
                }
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
