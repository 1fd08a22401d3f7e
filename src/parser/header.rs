//! Header helpers: unfolding, display formatting, content types, MIME parameters.
//!
//! Encoded-word (RFC 2047) and RFC 2231 decoding is done by `mailparse`.

use std::ops::Range;

/// Placeholder content type for parts that do not declare one.
pub const UNKNOWN_CONTENT_TYPE: &str = "text/x-unknown";

/// Decode a raw header value to a single display line.
///
/// Continuation lines are joined with one space; the bytes are read as
/// UTF-8 with an ISO-8859-1 style fallback. Encoded-words are left alone.
pub fn unfold_value(raw: &[u8]) -> String {
    let text = decode_header_bytes(raw);
    let mut result = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(line);
    }
    result
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Format a header for display: `Name: value`.
///
/// The name is capitalized the way humans write it (`content-type` →
/// `Content-Type`). Decoding the value is up to the caller.
pub fn display_line(name: &str, value: &str) -> String {
    format!("{}: {}", capitalize_name(name), value)
}

/// Upper-case the first letter of a header name and every letter after a `-`.
pub fn capitalize_name(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            out
        })
        .collect()
}

/// The MIME type of a content-type value: everything up to the first
/// `;`, space or tab.
pub fn mime_type(content_type: &str) -> &str {
    let end = content_type
        .find([';', ' ', '\t'])
        .unwrap_or(content_type.len());
    &content_type[..end]
}

/// The top-level type of a content-type value (`text` for `text/plain`).
pub fn top_level_type(content_type: &str) -> &str {
    let end = content_type
        .find([';', ' ', '\t', '/'])
        .unwrap_or(content_type.len());
    &content_type[..end]
}

/// `true` if `content_type` starts with `prefix`, ignoring ASCII case.
pub fn has_type_prefix(content_type: &str, prefix: &str) -> bool {
    content_type
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Locate the value of parameter `name` in a structured header value.
///
/// Parameters follow the first `;` and are matched case-insensitively.
/// The returned byte range excludes surrounding quotes; an unterminated
/// quoted value runs to the end of the header.
pub fn mime_parameter(value: &str, name: &str) -> Option<Range<usize>> {
    let bytes = value.as_bytes();
    let mut i = bytes.iter().position(|&b| b == b';')? + 1;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b';') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b';' {
            i += 1;
        }
        let param_name = value[name_start..i].trim();
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b';' {
            continue;
        }
        i += 1; // '='
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }

        let range = if bytes.get(i) == Some(&b'"') {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j] != b'"' {
                if bytes[j] == b'\\' {
                    j += 1;
                }
                j += 1;
            }
            let end = j.min(bytes.len());
            i = end + 1;
            start..end
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b';' && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            start..i
        };

        if param_name.eq_ignore_ascii_case(name) {
            return Some(range);
        }
    }
    None
}

/// Like [`mime_parameter`], returning the value itself.
pub fn mime_parameter_str<'v>(value: &'v str, name: &str) -> Option<&'v str> {
    mime_parameter(value, name).map(|range| &value[range])
}
