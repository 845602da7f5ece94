//! `$ref` resolution and definitions.
//!
//! A node gets a definition when something refers to it or when it carries
//! its own `$id`. Definitions are keyed by canonical URI (the enclosing
//! resource's id plus a pointer fragment), so a node reached through
//! different routes maps to one output location.

use url::Url;

use crate::ast::{import_qualifier, Expr};
use crate::config::DEFAULT_ROOT_ID_HOST;
use crate::error::ErrorKind;
use crate::mapping::{self, SchemaLoc};
use crate::path::{is_def_or_hidden, is_valid_ident, Path};
use crate::pointer;
use crate::resolver::Target;

use super::state::{SchemaInfo, State};
use super::{DefinedSchema, Node};

impl<'d, 'a> State<'d, 'a> {
    /// Parses the URI at `n` and resolves it against the current base.
    pub fn resolve_uri(&mut self, n: &Node<'a>) -> Option<Url> {
        let text = self.str_value(n)?;
        match Url::parse(text) {
            Ok(u) if u.host_str() == Some(DEFAULT_ROOT_ID_HOST) => {
                let msg = format!("invalid use of default root ID host ({DEFAULT_ROOT_ID_HOST}) in URI");
                self.errf(ErrorKind::Reference, n, msg);
                None
            }
            Ok(u) => Some(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => match self.base.join(text) {
                Ok(u) => Some(u),
                Err(e) => {
                    self.errf(ErrorKind::Reference, n, format!("invalid JSON reference: {e}"));
                    None
                }
            },
            Err(e) => {
                self.errf(ErrorKind::Reference, n, format!("invalid JSON reference: {e}"));
                None
            }
        }
    }

    /// Syntax referring to the schema at `u`.
    ///
    /// A local target that has not been decoded yet is marked as needing a
    /// definition and stands in as `_` until the next pass.
    pub fn make_ref(&mut self, n: &Node<'a>, u: &Url) -> Expr {
        match self.d.resolver.resolve(u) {
            Target::Local(tokens) => {
                if pointer::lookup(self.d.doc, &tokens).is_none() {
                    return self.errf(ErrorKind::Reference, n, format!("reference {u} not found"));
                }
                if self.d.schema_root.as_deref() == Some(tokens.as_slice()) {
                    return match self.d.builder.get_ref(&Path::root()) {
                        Ok(expr) => expr,
                        Err(e) => self.errf(ErrorKind::Internal, n, format!("cannot generate reference: {e}")),
                    };
                }
                let key = self.d.def_for_value.get(&tokens).cloned().flatten();
                match key.and_then(|k| self.d.defs.get(&k).cloned()) {
                    Some(def) => self.ref_expr(n, &def.import_path, &def.path),
                    None => {
                        self.d.ensure_definition(&tokens);
                        Expr::top()
                    }
                }
            }
            Target::UnknownAnchor(anchor) => {
                self.errf(ErrorKind::Reference, n, format!("reference {u} not found: no anchor {anchor:?}"))
            }
            Target::External => {
                let loc = SchemaLoc {
                    id: u.clone(),
                    is_local: false,
                    path: Vec::new(),
                };
                match mapping::map_ref(&self.d.cfg, &loc) {
                    Ok((import_path, path)) => self.ref_expr(n, &import_path, &path),
                    Err(e) => {
                        let msg = format!("cannot get reference for {loc}: {e}");
                        self.errf(ErrorKind::Reference, n, msg)
                    }
                }
            }
        }
    }

    /// Reference to `path` inside the package at `import_path`; the output
    /// file itself when `import_path` is empty.
    fn ref_expr(&mut self, n: &Node<'a>, import_path: &str, path: &Path) -> Expr {
        if import_path.is_empty() {
            return match self.d.builder.get_ref(path) {
                Ok(expr) => expr,
                Err(e) => self.errf(ErrorKind::Reference, n, format!("cannot generate reference: {e}")),
            };
        }
        let qualifier = import_qualifier(import_path);
        if !is_valid_ident(&qualifier) || is_def_or_hidden(&qualifier) {
            let msg = format!("cannot determine package name from import path {import_path:?}");
            return self.errf(ErrorKind::Reference, n, msg);
        }
        Expr::path_ref(Expr::package(qualifier, import_path), path.selectors())
    }

    /// Places `expr` at its definition if the current node needs one and
    /// returns a reference to it; returns `expr` itself otherwise.
    pub fn maybe_define(&mut self, expr: Expr, info: &SchemaInfo) -> Expr {
        let n = self.node.clone();
        let Some(key) = self.definition_for_node(&n) else {
            return expr;
        };
        let Some(def) = self.d.defs.get_mut(&key) else {
            return expr;
        };
        if def.path.is_empty() {
            return expr;
        }
        def.schema = Some(expr.clone());
        def.comment = info.comment();
        let (import_path, path) = (def.import_path.clone(), def.path.clone());
        if import_path.is_empty() && !self.d.builder.put(&path, expr.clone(), info.comment()) {
            self.errf(ErrorKind::Internal, &n, format!("redefinition of schema CUE path {path}"));
            return expr;
        }
        self.ref_expr(&n, &import_path, &path)
    }

    /// Key into `defs` for `n`, or `None` if `n` needs no definition.
    fn definition_for_node(&mut self, n: &Node<'a>) -> Option<String> {
        match self.d.def_for_value.get(&n.tokens) {
            None => return None,
            Some(Some(key)) => return Some(key.clone()),
            Some(None) => {}
        }
        // Referred to but not defined: the references made so far are
        // placeholders, so another pass is needed.
        self.d.need_another_pass = true;
        self.d.dangling_refs = self.d.dangling_refs.saturating_sub(1);
        match self.add_definition(n) {
            Some(key) => {
                self.d.def_for_value.insert(n.tokens.clone(), Some(key.clone()));
                Some(key)
            }
            None => {
                self.d.def_for_value.remove(&n.tokens);
                None
            }
        }
    }

    /// Registers a definition for `n` and returns its key.
    fn add_definition(&mut self, n: &Node<'a>) -> Option<String> {
        let scope = self.d.resolver.scope_for(&n.tokens).clone();
        let mut id = scope.id;
        let fragment = pointer::from_tokens(&n.tokens[scope.tokens.len()..]);
        id.set_fragment((!fragment.is_empty()).then_some(fragment.as_str()));
        let key = id.to_string();
        if self.d.defs.contains_key(&key) {
            return Some(key);
        }
        let loc = SchemaLoc {
            id,
            is_local: true,
            path: n.tokens.clone(),
        };
        let (import_path, path) = match mapping::map_ref(&self.d.cfg, &loc) {
            Ok(mapped) => mapped,
            Err(e) => {
                self.errf(ErrorKind::Reference, n, format!("cannot get reference for {loc}: {e}"));
                return None;
            }
        };
        tracing::debug!(location = %n.location(), %path, import_path = %import_path, "adding definition");
        self.d.defs.insert(
            key.clone(),
            DefinedSchema {
                import_path,
                path,
                schema: None,
                comment: None,
            },
        );
        Some(key)
    }
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

    fn text(schema: Value) -> String {
        extract(&schema, &Config::default()).unwrap().to_string()
    }

    fn errors(schema: Value) -> Vec<String> {
        match extract(&schema, &Config::default()) {
            Ok(f) => panic!("expected errors, got:\n{f}"),
            Err(e) => e.diagnostics().iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_forward_reference_between_definitions() {
        let schema = json!({
            "$defs": {
                "a": {"$ref": "#/$defs/b"},
                "b": {"type": "string"}
            },
            "$ref": "#/$defs/a"
        });
        assert_eq!(text(schema), "#a\n#a: #b\n#b: string\n");
    }

    #[test]
    fn test_non_identifier_definition_name() {
        let schema = json!({
            "$defs": {"a-b": {"type": "null"}},
            "$ref": "#/$defs/a-b"
        });
        assert_eq!(text(schema), "#.\"a-b\"\n#: {\n\t\"a-b\": null\n}\n");
    }

    #[test]
    fn test_reference_via_embedded_id() {
        let schema = json!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "item": {"$id": "item.json", "type": "integer"}
            },
            "properties": {"x": {"$ref": "item.json"}}
        });
        let out = text(schema);
        assert!(out.contains("x?: #item"), "{out}");
        assert!(out.contains("@jsonschema(id=\"https://example.com/item.json\")"), "{out}");
    }

    #[test]
    fn test_external_reference_becomes_import() {
        let schema = json!({"$ref": "https://example.com/other.json#/$defs/thing"});
        let out = text(schema);
        assert!(out.starts_with("import "), "{out}");
        assert!(out.contains("example.com/other.json:other"), "{out}");
        assert!(out.ends_with("other.#thing\n"), "{out}");
    }

    #[test]
    fn test_missing_local_target() {
        let errs = errors(json!({"$ref": "#/$defs/nope"}));
        assert_eq!(
            errs,
            vec!["#/$ref: reference https://cue.jsonschema.invalid/#/$defs/nope not found"]
        );
    }

    #[test]
    fn test_unknown_anchor() {
        let errs = errors(json!({"$ref": "#nope"}));
        assert_eq!(
            errs,
            vec!["#/$ref: reference https://cue.jsonschema.invalid/#nope not found: no anchor \"nope\""]
        );
    }

    #[test]
    fn test_default_root_host_may_not_be_used() {
        let errs = errors(json!({"$ref": "https://cue.jsonschema.invalid/x"}));
        assert_eq!(
            errs,
            vec!["#/$ref: invalid use of default root ID host (cue.jsonschema.invalid) in URI"]
        );
    }

    #[test]
    fn test_anchor_reference() {
        let schema = json!({
            "$defs": {"a": {"$anchor": "thing", "type": "boolean"}},
            "properties": {"x": {"$ref": "#thing"}}
        });
        let out = text(schema);
        assert!(out.contains("x?: #a"), "{out}");
        assert!(out.contains("#a: bool"), "{out}");
    }
}
