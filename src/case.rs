pub(crate) fn is_valid_ident(s: &str) -> bool {
    !s.is_empty()
        && (s.as_bytes()[0].is_ascii_alphabetic() || s.as_bytes()[0] == b'_')
        && s.as_bytes()[1..]
            .iter()
            .all(|&ch| ch.is_ascii_alphanumeric() || ch == b'_')
}

/// A dotted type reference, optionally fully qualified with a leading dot.
pub(crate) fn is_valid_type_ref(s: &str) -> bool {
    let s = s.strip_prefix('.').unwrap_or(s);
    !s.is_empty() && s.split('.').all(is_valid_ident)
}

/// A namespace for `define`: dotted identifiers, never fully qualified.
pub(crate) fn is_valid_namespace(s: &str) -> bool {
    !s.starts_with('.') && is_valid_type_ref(s)
}

pub(crate) fn to_camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut uppercase_next = false;

    for ch in name.chars() {
        if ch == '_' {
            uppercase_next = true
        } else if uppercase_next {
            result.push(ch.to_ascii_uppercase());
            uppercase_next = false;
        } else {
            result.push(ch);
        }
    }

    result
}
