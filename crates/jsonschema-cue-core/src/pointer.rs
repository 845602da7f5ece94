//! JSON Pointer helpers (RFC 6901).
//!
//! Pointers are handled in two forms: as fragment text (`/properties/a~1b`)
//! and as decoded token lists (`["properties", "a/b"]`). Locations in
//! diagnostics use the `#`-prefixed fragment form.

use std::borrow::Cow;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape a single path segment per RFC 6901.
///
/// - `~` → `~0`
/// - `/` → `~1`
///
/// Returns `Cow::Borrowed` when no escaping is needed (the common case).
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Unescape a single path segment per RFC 6901.
///
/// `~1` is unescaped before `~0` so that `~01` becomes `~1`, not `/`.
pub fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains("~0") || segment.contains("~1") {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build a `#`-prefixed JSON Pointer by appending segments to a parent path.
///
/// # Example
/// ```
/// use jsonschema_cue_core::pointer::build_path;
/// assert_eq!(build_path("#", &["properties", "a/b"]), "#/properties/a~1b");
/// ```
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_segment(segment));
    }
    path
}

/// Split a pointer fragment into decoded tokens.
///
/// A leading `#` is ignored. The empty fragment refers to the whole
/// document and yields no tokens.
///
/// # Example
/// ```
/// use jsonschema_cue_core::pointer::tokens;
/// assert_eq!(tokens("#/properties/a~1b/items"), vec!["properties", "a/b", "items"]);
/// assert_eq!(tokens(""), Vec::<String>::new());
/// ```
pub fn tokens(fragment: &str) -> Vec<String> {
    let stripped = fragment.strip_prefix('#').unwrap_or(fragment);
    if stripped.is_empty() {
        return Vec::new();
    }
    let mut parts = stripped.split('/');
    if stripped.starts_with('/') {
        parts.next();
    }
    parts.map(|s| unescape_segment(s).into_owned()).collect()
}

/// Join decoded tokens back into fragment text (no leading `#`).
pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push('/');
        out.push_str(&escape_segment(t.as_ref()));
    }
    out
}

/// `#`-prefixed location text for a token list, as used in diagnostics.
pub fn location<S: AsRef<str>>(tokens: &[S]) -> String {
    format!("#{}", from_tokens(tokens))
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolve `tokens` against `root`.
///
/// Array indexes must be plain decimal numbers without leading zeros.
pub fn lookup<'a, S: AsRef<str>>(root: &'a Value, tokens: &[S]) -> Option<&'a Value> {
    let mut node = root;
    for token in tokens {
        let token = token.as_ref();
        node = match node {
            Value::Object(obj) => obj.get(token)?,
            Value::Array(arr) => {
                if token.len() > 1 && token.starts_with('0') {
                    return None;
                }
                if !token.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                arr.get(token.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(node)
}

/// Percent-decode URI fragment text.
///
/// Invalid escapes are kept as-is.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a root selector such as `#/components/schemas/` into tokens.
///
/// Only same-document fragments are accepted. A single trailing `/` is
/// trimmed because `#/` is commonly used to mean the document root.
pub fn parse_root_ref(s: &str) -> Result<Vec<String>, String> {
    let (before, fragment) = match s.split_once('#') {
        Some((before, fragment)) => (before, fragment),
        None => (s, ""),
    };
    if !before.is_empty() {
        return Err(format!("external references ({s}) not supported in Root"));
    }
    let fragment = percent_decode(fragment);
    let fragment = fragment.strip_suffix('/').unwrap_or(&fragment);
    if !fragment.is_empty() && !fragment.starts_with('/') {
        return Err(format!("root fragment {fragment:?} is not a JSON Pointer"));
    }
    Ok(tokens(fragment))
}

// ===========================================================================
// Tests
// ===========================================================================
