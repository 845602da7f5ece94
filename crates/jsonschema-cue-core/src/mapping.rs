//! Mapping schema locations to output locations.
//!
//! Every definition and every external reference goes through a
//! [`MapRefFn`](crate::config::MapRefFn). The defaults here put `$defs`
//! entries at `#name`, other local schemas under `_#defs`, and external
//! URLs at an import path derived from the host and path.

use std::fmt;

use url::Url;

use crate::config::Config;
use crate::path::{is_def_or_hidden, is_valid_ident, Path, Selector};
use crate::pointer;

/// Where a schema lives, both as its canonical URI and, for schemas in the
/// document being extracted, as pointer tokens from the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLoc {
    pub id: Url,
    pub is_local: bool,
    pub path: Vec<String>,
}

impl fmt::Display for SchemaLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local {
            write!(f, "id={} localPath={}", self.id, pointer::location(&self.path))
        } else {
            write!(f, "id={}", self.id)
        }
    }
}

/// The location mapping in effect for `cfg`: its `map_ref` if set, else the
/// default composed with the legacy `map`/`map_url` hooks.
pub(crate) fn map_ref(cfg: &Config, loc: &SchemaLoc) -> Result<(String, Path), String> {
    if let Some(f) = &cfg.map_ref {
        return (f.0)(loc);
    }
    let map = |tokens: &[String]| match &cfg.map {
        Some(f) => (f.0)(tokens),
        None => default_map(tokens),
    };
    let map_url = |u: &Url| match &cfg.map_url {
        Some(f) => (f.0)(u),
        None => default_map_url(u),
    };
    map_ref_with(loc, &map, &map_url)
}

/// Default mapping, see the module documentation.
pub fn default_map_ref(loc: &SchemaLoc) -> Result<(String, Path), String> {
    map_ref_with(loc, &default_map, &default_map_url)
}

fn map_ref_with(
    loc: &SchemaLoc,
    map: &dyn Fn(&[String]) -> Result<Vec<Selector>, String>,
    map_url: &dyn Fn(&Url) -> Result<(String, Path), String>,
) -> Result<(String, Path), String> {
    let (import_path, base, fragment) = if loc.is_local {
        (String::new(), Path::root(), pointer::from_tokens(&loc.path))
    } else {
        let mut u = loc.id.clone();
        let fragment = pointer::percent_decode(u.fragment().unwrap_or(""));
        u.set_fragment(None);
        let (import_path, path) = map_url(&u)?;
        (import_path, path, fragment)
    };
    if !fragment.is_empty() && !fragment.starts_with('/') {
        return Err(format!("anchors ({fragment}) not supported"));
    }
    let rel = map(&pointer::tokens(&fragment))?;
    Ok((import_path, base.concat(&Path::new(rel))))
}

/// Default pointer-to-selectors mapping.
///
/// | pointer             | path              |
/// |---------------------|-------------------|
/// | (empty)             | (empty)           |
/// | `/$defs/foo`        | `#foo`            |
/// | `/definitions/a-b`  | `#."a-b"`         |
/// | anything else       | `_#defs."/x/y"`   |
pub fn default_map(tokens: &[String]) -> Result<Vec<Selector>, String> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    if tokens.len() != 2 || (tokens[0] != "definitions" && tokens[0] != "$defs") {
        return Ok(vec![
            Selector::HiddenDef("defs".to_string()),
            Selector::Field(pointer::from_tokens(tokens)),
        ]);
    }
    let name = &tokens[1];
    if is_valid_ident(name) && !is_def_or_hidden(name) {
        return Ok(vec![Selector::Def(name.clone())]);
    }
    Ok(vec![
        Selector::Def(String::new()),
        Selector::Field(name.clone()),
    ])
}

/// Default URL-to-import-path mapping: host plus path, with a `.json`
/// suffix trimmed for the package name and `schema` used when no valid
/// identifier is left.
pub fn default_map_url(u: &Url) -> Result<(String, Path), String> {
    if u.cannot_be_a_base() {
        return Ok((base64_url_no_pad(u.path().as_bytes()), Path::root()));
    }
    let mut p = u.path().to_string();
    let mut base = path_base(&p).to_string();
    if !is_valid_ident(&base) {
        base = base.strip_suffix(".json").unwrap_or(&base).to_string();
        if !is_valid_ident(&base) {
            base = "schema".to_string();
        }
        p.push(':');
        p.push_str(&base);
    }
    Ok((format!("{}{}", u.host_str().unwrap_or(""), p), Path::root()))
}

/// Last element of a slash-separated path, ignoring trailing slashes.
fn path_base(p: &str) -> &str {
    if p.is_empty() {
        return ".";
    }
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// URL-safe base64 without padding.
fn base64_url_no_pad(data: &[u8]) -> String {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b = [
            chunk[0],
            chunk.get(1).copied().unwrap_or(0),
            chunk.get(2).copied().unwrap_or(0),
        ];
        let n = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        let chars = chunk.len() + 1;
        for i in 0..chars {
            let idx = (n >> (18 - 6 * i)) & 0x3f;
            out.push(char::from(ALPHABET[idx as usize]));
        }
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
