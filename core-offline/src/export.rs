//! Helpers for writing cached audio out to the filesystem.

use crate::models::ContentId;

const FALLBACK_NAME: &str = "download";

/// Make `name` safe to use as a single path component.
///
/// Separators, characters reserved on Windows and control characters become
/// `_`. Leading/trailing dots and whitespace are trimmed so the result can
/// never be `.`, `..` or a hidden file.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// File name for an export of `id`: the sanitized request, else the
/// sanitized id, else a fixed fallback.
pub fn export_file_name(requested: &str, id: &ContentId) -> String {
    [requested, id.as_str()]
        .into_iter()
        .map(sanitize_filename)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}
