/// Helper utilities for the console

use crate::utils::FALLBACK_UPLOAD_NAME;

const MAX_FILENAME_LEN: usize = 128;

/// Generate a random lowercase hex string
pub fn generate_hex_string(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| format!("{:x}", rng.gen_range(0..16)))
        .collect()
}

/// Reduce a client-supplied filename to a single safe path component.
///
/// Directory parts (either separator) are dropped, anything outside
/// `[A-Za-z0-9._-]` becomes `_`, and leading dots are removed so the result
/// can never be `..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let cleaned: String = cleaned.chars().take(MAX_FILENAME_LEN).collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        FALLBACK_UPLOAD_NAME.to_string()
    } else {
        cleaned
    }
}

/// Quote a value for interpolation into a POSIX shell script
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ','))
    {
        return value.to_string();
    }

    format!("'{}'", value.replace('\'', r"'\''"))
}
