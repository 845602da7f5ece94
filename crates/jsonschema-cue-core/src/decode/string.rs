//! String length and `pattern`.

use crate::ast::{Expr, UnaryOp};
use crate::error::ErrorKind;

use super::state::{CoreType, State};
use super::Node;

pub(super) fn min_length<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(len) = s.uint(n) {
        s.add(CoreType::String, n, Expr::call("strings", "MinRunes", vec![Expr::int(len)]));
    }
}

pub(super) fn max_length<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(len) = s.uint(n) {
        s.add(CoreType::String, n, Expr::call("strings", "MaxRunes", vec![Expr::int(len)]));
    }
}

pub(super) fn pattern<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let Some(re) = s.str_value(n) else {
        return;
    };
    if check_regexp(s, n, re) {
        s.add(CoreType::String, n, Expr::unary(UnaryOp::Match, Expr::string(re)));
    }
}

/// Reports whether `re` can be used as a pattern.
///
/// Look-around and backreferences are valid ECMA 262 but have no
/// equivalent here. They are reported under strict features and skipped
/// otherwise, which makes the result more permissive than the schema.
pub(super) fn check_regexp<'a>(s: &mut State<'_, 'a>, n: &Node<'a>, re: &str) -> bool {
    let Err(err) = regex::Regex::new(re) else {
        return true;
    };
    let detail = regex_error_detail(&err);
    if detail.contains("not supported") {
        if s.d.cfg.strict_features {
            s.errf(ErrorKind::Feature, n, format!("unsupported regexp {re:?}: {detail}"));
        } else {
            tracing::warn!(pattern = re, location = %n.location(), error = %detail, "ignoring unsupported regexp");
        }
        return false;
    }
    s.errf(ErrorKind::Structural, n, format!("invalid regexp {re:?}: {detail}"));
    false
}

/// The one-line reason out of a multi-line regex syntax error.
fn regex_error_detail(err: &regex::Error) -> String {
    let text = err.to_string();
    text.lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("error: "))
        .unwrap_or(text.trim())
        .to_string()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::decode::extract;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn extract_with(schema: Value, cfg: &Config) -> Result<String, Vec<String>> {
        extract(&schema, cfg)
            .map(|f| f.to_string())
            .map_err(|e| e.diagnostics().iter().map(|d| d.to_string()).collect())
    }

    #[test]
    fn test_pattern() {
        let out = extract_with(json!({"type": "string", "pattern": "^[a-z]+\\d$"}), &Config::default()).unwrap();
        assert_eq!(out, "=~\"^[a-z]+\\\\d$\"\n");
    }

    #[test]
    fn test_invalid_pattern() {
        let errs = extract_with(json!({"pattern": "a("}), &Config::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("#/pattern: invalid regexp \"a(\": "), "{errs:?}");
    }

    #[test]
    fn test_lookahead_pattern_is_skipped() {
        let schema = json!({"type": "string", "pattern": "^(?!foo)"});
        assert_eq!(extract_with(schema.clone(), &Config::default()).unwrap(), "string\n");

        let strict = Config {
            strict_features: true,
            ..Config::default()
        };
        let errs = extract_with(schema, &strict).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("#/pattern: unsupported regexp"), "{errs:?}");
    }

    #[test]
    fn test_length_must_be_non_negative_integer() {
        let errs = extract_with(json!({"minLength": -1}), &Config::default()).unwrap_err();
        assert_eq!(errs, vec!["#/minLength: invalid uint"]);
    }
}
