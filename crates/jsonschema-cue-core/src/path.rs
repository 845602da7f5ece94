//! Paths into type-language values.
//!
//! A [`Path`] is a sequence of [`Selector`]s such as `#Foo.bar."a-b"[2]`.
//! Paths name definitions in the struct builder, the targets of resolved
//! references, and `$defs` entries during generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step in a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    /// A regular field: `foo` or `"foo-bar"`.
    Field(String),
    /// A definition: `#foo`. The name excludes the `#`; an empty name is the
    /// bare `#` label used to hold definitions that are not identifiers.
    Def(String),
    /// A hidden field: `_foo`. The name excludes the `_`.
    Hidden(String),
    /// A hidden definition: `_#foo`. The name excludes the `_#`.
    HiddenDef(String),
    /// A list index.
    Index(usize),
}

impl Selector {
    /// Builds a selector from an identifier, classifying it by prefix.
    pub fn from_ident(ident: &str) -> Selector {
        if let Some(rest) = ident.strip_prefix("_#") {
            Selector::HiddenDef(rest.to_string())
        } else if let Some(rest) = ident.strip_prefix('#') {
            Selector::Def(rest.to_string())
        } else if let Some(rest) = ident.strip_prefix('_') {
            Selector::Hidden(rest.to_string())
        } else {
            Selector::Field(ident.to_string())
        }
    }

    /// The identifier form of the selector, if it has one.
    ///
    /// Regular fields whose names are not identifiers have no identifier
    /// form and must be written as quoted labels.
    pub fn ident(&self) -> Option<String> {
        match self {
            Selector::Field(name) if is_valid_ident(name) && !is_def_or_hidden(name) => {
                Some(name.clone())
            }
            Selector::Field(_) | Selector::Index(_) => None,
            Selector::Def(name) => Some(format!("#{name}")),
            Selector::Hidden(name) => Some(format!("_{name}")),
            Selector::HiddenDef(name) => Some(format!("_#{name}")),
        }
    }

    /// The unquoted name of a regular field, if this is one.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Selector::Field(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, Selector::Def(_) | Selector::HiddenDef(_))
    }

    /// Sort rank used when laying out struct-builder entries.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Selector::Field(_) => 0,
            Selector::Index(_) => 1,
            Selector::Def(_) => 2,
            Selector::Hidden(_) => 3,
            Selector::HiddenDef(_) => 4,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "{i}"),
            Selector::Field(name) if self.ident().is_none() => write!(f, "{}", quote(name)),
            _ => f.write_str(&self.ident().unwrap_or_default()),
        }
    }
}

/// A sequence of selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Path(Vec<Selector>);

impl Path {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Path(selectors)
    }

    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, sel: Selector) {
        self.0.push(sel);
    }

    /// A new path with `sel` appended.
    pub fn child(&self, sel: Selector) -> Path {
        let mut p = self.clone();
        p.0.push(sel);
        p
    }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Path) -> Path {
        let mut p = self.clone();
        p.0.extend(other.0.iter().cloned());
        p
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<Selector>> for Path {
    fn from(selectors: Vec<Selector>) -> Self {
        Path(selectors)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sel) in self.0.iter().enumerate() {
            match sel {
                Selector::Index(n) => write!(f, "[{n}]")?,
                _ => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{sel}")?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path {path:?}: {message}")]
pub struct ParsePathError {
    path: String,
    message: String,
}

impl FromStr for Path {
    type Err = ParsePathError;

    /// Parses the textual form produced by [`Path`]'s `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |message: &str| ParsePathError {
            path: s.to_string(),
            message: message.to_string(),
        };
        let chars: Vec<char> = s.chars().collect();
        let mut sels = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '.' if !sels.is_empty() => i += 1,
                '[' => {
                    let end = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .ok_or_else(|| err("unterminated index"))?;
                    let digits: String = chars[i + 1..i + end].iter().collect();
                    let n = digits.parse().map_err(|_| err("invalid index"))?;
                    sels.push(Selector::Index(n));
                    i += end + 1;
                    continue;
                }
                _ => {}
            }
            if i >= chars.len() {
                return Err(err("trailing '.'"));
            }
            if chars[i] == '"' {
                let mut name = String::new();
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None => return Err(err("unterminated string label")),
                        Some('"') => break,
                        Some('\\') => {
                            let (c, len) =
                                unescape(&chars[j + 1..]).ok_or_else(|| err("invalid escape"))?;
                            name.push(c);
                            j += 1 + len;
                        }
                        Some(c) => {
                            name.push(*c);
                            j += 1;
                        }
                    }
                }
                sels.push(Selector::Field(name));
                i = j + 1;
            } else {
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident.is_empty() {
                    return Err(err("empty selector"));
                }
                sels.push(Selector::from_ident(&ident));
            }
        }
        Ok(Path(sels))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Identifier helpers
// ---------------------------------------------------------------------------

/// Keywords that cannot be used as bare identifiers.
const KEYWORDS: &[&str] = &[
    "package", "import", "for", "in", "if", "let", "true", "false", "null",
];

/// Reports whether `s` can be written as an identifier label.
///
/// Identifiers start with a letter, `_`, `$` or `#` and continue with
/// letters, digits, `_` or `$`. A `#` may only appear after an optional
/// leading `_`.
pub fn is_valid_ident(s: &str) -> bool {
    if s.is_empty() || KEYWORDS.contains(&s) {
        return false;
    }
    let body = s
        .strip_prefix("_#")
        .or_else(|| s.strip_prefix('#'))
        .unwrap_or(s);
    if body.is_empty() {
        // `#` and `_#` alone are valid labels.
        return true;
    }
    let mut chars = body.chars();
    let first = chars.next().unwrap_or('0');
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Reports whether an identifier names a definition or hidden field.
pub fn is_def_or_hidden(s: &str) -> bool {
    s.starts_with('#') || s.starts_with('_')
}

/// Decodes the escape following a backslash, as written by [`quote`].
/// Returns the character and the number of chars consumed.
fn unescape(rest: &[char]) -> Option<(char, usize)> {
    match rest.first()? {
        'n' => Some(('\n', 1)),
        't' => Some(('\t', 1)),
        'r' => Some(('\r', 1)),
        'u' => {
            let hex: String = rest.get(1..5)?.iter().collect();
            let code = u32::from_str_radix(&hex, 16).ok()?;
            Some((char::from_u32(code)?, 5))
        }
        c => Some((*c, 1)),
    }
}

/// Quotes `s` as a double-quoted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ident() {
        assert!(is_valid_ident("foo"));
        assert!(is_valid_ident("#foo"));
        assert!(is_valid_ident("_#defs"));
        assert!(is_valid_ident("$x"));
        assert!(is_valid_ident("#"));
        assert!(!is_valid_ident("foo-bar"));
        assert!(!is_valid_ident("1foo"));
        assert!(!is_valid_ident(""));
        assert!(!is_valid_ident("if"));
    }

    #[test]
    fn test_path_display() {
        let p = Path::new(vec![
            Selector::Def("foo".into()),
            Selector::Field("bar".into()),
            Selector::Field("a-b".into()),
            Selector::Index(2),
        ]);
        assert_eq!(p.to_string(), r#"#foo.bar."a-b"[2]"#);

        let defs = Path::new(vec![
            Selector::HiddenDef("defs".into()),
            Selector::Field("/properties/a".into()),
        ]);
        assert_eq!(defs.to_string(), r#"_#defs."/properties/a""#);
    }

    #[test]
    fn test_path_parse_matches_display() {
        for text in [
            r#"#foo.bar."a-b"[2]"#,
            r#"_#defs."/properties/a""#,
            "#",
            r#"#."x y""#,
            "_schema",
        ] {
            let p: Path = text.parse().unwrap();
            assert_eq!(p.to_string(), text);
        }
    }

    #[test]
    fn test_path_parse_rejects_garbage() {
        assert!("a.".parse::<Path>().is_err());
        assert!(r#""open"#.parse::<Path>().is_err());
        assert!("a[x]".parse::<Path>().is_err());
    }

    #[test]
    fn test_control_characters_survive_reparse() {
        for name in ["a\nb", "a\rb", "a\u{1}b", "tab\there", "q\"uo\\te", "\u{1f}"] {
            let p = Path::new(vec![
                Selector::HiddenDef("defs".into()),
                Selector::Field(name.into()),
            ]);
            let text = p.to_string();
            let back: Path = text.parse().unwrap();
            assert_eq!(back, p, "{text}");

            let json = serde_json::to_string(&p).unwrap();
            let from_json: Path = serde_json::from_str(&json).unwrap();
            assert_eq!(from_json, p, "{json}");
        }
        assert_eq!(
            Selector::Field("a\rb\u{1}".into()).to_string(),
            r#""a\rb\u0001""#
        );
    }

    #[test]
    fn test_truncated_unicode_escape_is_rejected() {
        assert!(r#""a\u00""#.parse::<Path>().is_err());
        assert!(r#""a\uzzzz""#.parse::<Path>().is_err());
    }

    #[test]
    fn test_field_named_like_keyword_is_quoted() {
        assert_eq!(Selector::Field("if".into()).to_string(), "\"if\"");
        assert_eq!(Selector::Field("_x".into()).to_string(), "\"_x\"");
    }
}
