//! JSON Schema → type-language extraction.
//!
//! [`extract`] walks the document one schema node at a time. Each node gets
//! a [`State`](state::State) that runs the keyword handlers from
//! [`keywords`] phase by phase and finalizes into one expression.
//! Definitions land in a [`StructBuilder`] that becomes the output file.
//!
//! A reference can be seen before the schema it points to, and may point at
//! a node that is not part of the regular traversal at all. The decoder
//! therefore runs whole passes over the document until every referenced
//! node has a definition.

mod array;
mod combinator;
mod format;
mod generic;
mod keywords;
mod number;
mod object;
mod refs;
mod state;
mod string;

use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::ast::{Attribute, Decl, File};
use crate::config::Config;
use crate::error::{ConvertError, Diagnostic, ErrorKind, Errors};
use crate::kind::Kind;
use crate::path::Path;
use crate::pointer;
use crate::resolver::Resolver;
use crate::struct_builder::StructBuilder;
use crate::version::Version;

use state::State;

/// Upper bound on extraction passes. Two are typical; forward references
/// into nodes outside the schema traversal need one or two more.
const MAX_PASSES: usize = 10;

/// Converts a JSON Schema document into type-language syntax.
///
/// ## Errors
///
/// Returns [`ConvertError::InvalidConfig`] when `cfg.id` is not an absolute
/// URI, and [`ConvertError::Schema`] with every diagnostic found otherwise.
pub fn extract(doc: &Value, cfg: &Config) -> Result<File, ConvertError> {
    let (cfg, root_id) = cfg.normalized().map_err(ConvertError::InvalidConfig)?;
    let mut d = Decoder::new(doc, cfg, root_id);
    let file = d.decode();
    d.errs.into_result()?;
    let mut file = file.ok_or_else(|| {
        ConvertError::InvalidValue {
            path: "#".to_string(),
            message: "extraction produced no output".to_string(),
        }
    })?;
    file.sanitize_imports();
    Ok(file)
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A value in the input document together with its location.
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    pub value: &'a Value,
    /// JSON Pointer tokens from the document root.
    pub tokens: Vec<String>,
}

impl<'a> Node<'a> {
    pub fn new(value: &'a Value, tokens: Vec<String>) -> Self {
        Self { value, tokens }
    }

    pub fn child(&self, key: &str, value: &'a Value) -> Node<'a> {
        let mut tokens = self.tokens.clone();
        tokens.push(key.to_string());
        Node { value, tokens }
    }

    pub fn location(&self) -> String {
        pointer::location(&self.tokens)
    }

    pub fn kind_name(&self) -> &'static str {
        Kind::json_type_name(self.value)
    }

    /// Object members in document order; empty for non-objects.
    pub fn entries(&self) -> Vec<(&'a str, Node<'a>)> {
        match self.value {
            Value::Object(obj) => obj
                .iter()
                .map(|(k, v)| (k.as_str(), self.child(k, v)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Array elements; empty for non-arrays.
    pub fn elements(&self) -> Vec<Node<'a>> {
        match self.value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| self.child(&i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Where a schema from this document ended up.
#[derive(Debug, Clone)]
pub(crate) struct DefinedSchema {
    /// Empty for schemas defined in the output file itself.
    pub import_path: String,
    pub path: Path,
    /// The schema's syntax, once decoded in the current pass.
    pub schema: Option<crate::ast::Expr>,
    pub comment: Option<String>,
}

pub(crate) struct Decoder<'a> {
    pub cfg: Config,
    pub doc: &'a Value,
    pub root_id: Url,
    pub resolver: Resolver,
    pub errs: Errors,

    /// Nodes known to need a definition, keyed by location. `None` marks a
    /// node that was referred to but not yet decoded.
    pub def_for_value: BTreeMap<Vec<String>, Option<String>>,
    /// Number of `None` entries in `def_for_value`.
    pub dangling_refs: usize,
    /// Definitions by canonical schema URI.
    pub defs: BTreeMap<String, DefinedSchema>,
    pub builder: StructBuilder,
    pub need_another_pass: bool,
    /// Location of the schema placed at the root of the output, if any.
    pub schema_root: Option<Vec<String>>,
}

impl<'a> Decoder<'a> {
    fn new(doc: &'a Value, cfg: Config, root_id: Url) -> Self {
        let version = doc
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Version::parse_schema_uri)
            .unwrap_or(cfg.default_version);
        Self {
            resolver: Resolver::new(doc, &root_id, version),
            cfg,
            doc,
            root_id,
            errs: Errors::new(),
            def_for_value: BTreeMap::new(),
            dangling_refs: 0,
            defs: BTreeMap::new(),
            builder: StructBuilder::new(),
            need_another_pass: false,
            schema_root: None,
        }
    }

    pub fn report(&mut self, kind: ErrorKind, location: String, message: String) {
        self.errs.push(Diagnostic::new(kind, location, message));
    }

    /// Marks `n` as needing a definition.
    pub fn ensure_definition(&mut self, tokens: &[String]) {
        if !self.def_for_value.contains_key(tokens) {
            self.def_for_value.insert(tokens.to_vec(), None);
            self.dangling_refs += 1;
        }
    }

    fn decode(&mut self) -> Option<File> {
        let doc = self.doc;
        let mut schema_node = Node::new(doc, Vec::new());
        let mut defs_root: Option<Node<'a>> = None;

        if let Some(root) = self.cfg.root.clone() {
            let tokens = match pointer::parse_root_ref(&root) {
                Ok(tokens) => tokens,
                Err(e) => {
                    self.report(
                        ErrorKind::Structural,
                        "#".into(),
                        format!("invalid Config.Root value {root:?}: {e}"),
                    );
                    return None;
                }
            };
            let Some(found) = pointer::lookup(doc, &tokens) else {
                if self.cfg.allow_non_existent_root {
                    return Some(self.with_preamble(File::default(), &Default::default()));
                }
                self.report(
                    ErrorKind::Structural,
                    "#".into(),
                    format!("root value at path {root} does not exist"),
                );
                return None;
            };
            let node = Node::new(found, tokens);
            if self.cfg.single_root {
                schema_node = node;
            } else {
                if !found.is_object() {
                    let msg = format!(
                        "value at path {root} must be struct containing definitions but is actually {}",
                        node.kind_name()
                    );
                    self.report(ErrorKind::Structural, node.location(), msg);
                    return None;
                }
                defs_root = Some(node);
            }
        }
        if defs_root.is_none() {
            self.schema_root = Some(schema_node.tokens.clone());
        }

        let mut root_info = state::SchemaInfo::default();
        let mut extra: Vec<Node<'a>> = Vec::new();
        let mut base_pass = 0;

        for pass in 0.. {
            if pass > MAX_PASSES {
                self.report(
                    ErrorKind::Internal,
                    "#".into(),
                    "internal error: too many passes without resolution".into(),
                );
                return None;
            }
            tracing::debug!(pass, dangling = self.dangling_refs, "extraction pass");

            {
                let root_id = self.root_id.clone();
                let mut root = State::root(self, Node::new(doc, Vec::new()), root_id);
                if let Some(defs) = &defs_root {
                    generic::add_definitions(&mut root, defs);
                } else {
                    let (expr, info) = root.schema_state(&schema_node, Kind::TOP, |s| s.is_root = true);
                    if info.allowed_types.is_empty() {
                        root.errf(
                            ErrorKind::Structural,
                            &schema_node,
                            "constraints are not possible to satisfy",
                        );
                        return None;
                    }
                    if !root.d.builder.put(&Path::root(), expr, info.comment()) {
                        root.errf(ErrorKind::Internal, &schema_node, "duplicate definition at root");
                        return None;
                    }
                    root_info = info;
                }
            }

            if self.dangling_refs > 0 && pass == base_pass + 1 {
                // Still dangling after a full pass: something refers to a
                // node outside the schema traversal. Decode those directly.
                let pending: Vec<Vec<String>> = self
                    .def_for_value
                    .iter()
                    .filter(|(_, def)| def.is_none())
                    .map(|(tokens, _)| tokens.clone())
                    .collect();
                for tokens in pending {
                    let Some(value) = pointer::lookup(doc, &tokens) else {
                        let msg = "internal error: failed to find entry for dangling reference";
                        self.report(ErrorKind::Internal, pointer::location(&tokens), msg.into());
                        return None;
                    };
                    tracing::debug!(location = %pointer::location(&tokens), "decoding referenced non-schema node");
                    extra.push(Node::new(value, tokens));
                    base_pass = pass;
                }
            }
            if !extra.is_empty() {
                let root_id = self.root_id.clone();
                let mut root = State::root(self, Node::new(doc, Vec::new()), root_id);
                for n in &extra {
                    root.schema(n);
                }
            }

            if !self.need_another_pass && self.dangling_refs == 0 {
                break;
            }
            self.builder = StructBuilder::new();
            for def in self.defs.values_mut() {
                def.schema = None;
            }
            self.need_another_pass = false;
        }

        if let Some(define) = self.cfg.define_schema.clone() {
            for def in self.defs.values() {
                if let (Some(schema), false) = (&def.schema, def.import_path.is_empty()) {
                    (define.0)(&def.import_path, &def.path, schema, def.comment.as_deref());
                }
            }
        }

        let file = match self.builder.syntax() {
            Ok(file) => file,
            Err(e) => {
                self.report(
                    ErrorKind::Internal,
                    "#".into(),
                    format!("cannot build final syntax: {e}"),
                );
                return None;
            }
        };
        Some(self.with_preamble(file, &root_info))
    }

    fn with_preamble(&self, mut file: File, info: &state::SchemaInfo) -> File {
        file.package = self.cfg.pkg_name.clone().filter(|p| !p.is_empty());
        let mut preamble = Vec::new();
        if info.version_present {
            preamble.push(Decl::Attribute(Attribute::jsonschema(
                "schema",
                info.version.as_str(),
            )));
        }
        if info.deprecated {
            preamble.push(Decl::Attribute(Attribute::deprecated()));
        }
        if !preamble.is_empty() {
            preamble.append(&mut file.decls);
            file.decls = preamble;
        }
        file
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(schema: Value) -> String {
        extract(&schema, &Config::default()).unwrap().to_string()
    }

    fn errors(schema: Value, cfg: Config) -> Vec<String> {
        match extract(&schema, &cfg) {
            Ok(f) => panic!("expected errors, got:\n{f}"),
            Err(e) => e.diagnostics().iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_string_bounds() {
        let out = text(json!({"type": "string", "minLength": 2, "maxLength": 5}));
        assert_eq!(
            out,
            "import \"strings\"\n\nstrings.MinRunes(2) & strings.MaxRunes(5)\n"
        );
    }

    #[test]
    fn test_defs_reference_is_stable_across_runs() {
        let schema = json!({"$ref": "#/$defs/foo", "$defs": {"foo": {"type": "integer"}}});
        let first = text(schema.clone());
        assert_eq!(first, "#foo\n#foo: int\n");
        assert_eq!(text(schema), first);
    }

    #[test]
    fn test_root_self_reference() {
        let out = text(json!({"type": "object", "properties": {"next": {"$ref": "#"}}}));
        assert_eq!(out, "_schema\n_schema: {\n\tnext?: _schema\n\t...\n}\n");
    }

    #[test]
    fn test_schema_attribute_and_package() {
        let cfg = Config {
            pkg_name: Some("api".into()),
            ..Config::default()
        };
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "boolean"
        });
        let out = extract(&schema, &cfg).unwrap().to_string();
        assert_eq!(
            out,
            "package api\n\n@jsonschema(schema=\"http://json-schema.org/draft-07/schema#\")\nbool\n"
        );
    }

    #[test]
    fn test_reference_to_non_schema_node() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/x/y"}},
            "x": {"y": {"type": "string"}}
        });
        let out = text(schema);
        assert!(out.contains("a?: _#defs.\"/x/y\""), "{out}");
        assert!(out.contains("_#defs: {\n\t\"/x/y\": string\n}"), "{out}");
    }

    #[test]
    fn test_root_selects_definitions() {
        let cfg = Config {
            root: Some("#/components/schemas".into()),
            ..Config::default()
        };
        let schema = json!({"components": {"schemas": {
            "Pet": {"type": "string"},
            "Owner": {"$ref": "#/components/schemas/Pet"}
        }}});
        let out = extract(&schema, &cfg).unwrap().to_string();
        assert!(out.contains("\"/components/schemas/Owner\": _#defs.\"/components/schemas/Pet\""), "{out}");
        assert!(out.contains("\"/components/schemas/Pet\": string"), "{out}");
    }

    #[test]
    fn test_missing_root() {
        let cfg = Config {
            root: Some("#/nope".into()),
            ..Config::default()
        };
        let errs = errors(json!({}), cfg.clone());
        assert_eq!(errs, vec!["#: root value at path #/nope does not exist"]);

        let lenient = Config {
            allow_non_existent_root: true,
            ..cfg
        };
        let file = extract(&json!({}), &lenient).unwrap();
        assert!(file.decls.is_empty());
    }

    #[test]
    fn test_root_must_be_struct_of_definitions() {
        let cfg = Config {
            root: Some("#/defs".into()),
            ..Config::default()
        };
        let errs = errors(json!({"defs": [1]}), cfg);
        assert_eq!(
            errs,
            vec!["#/defs: value at path #/defs must be struct containing definitions but is actually list"]
        );
    }

    #[test]
    fn test_define_schema_callback() {
        use crate::config::{DefineSchemaFn, MapRefFn};
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let sink = seen.clone();
        let cfg = Config {
            map_ref: Some(MapRefFn(Arc::new(|loc: &crate::mapping::SchemaLoc| {
                if loc.is_local && !loc.path.is_empty() {
                    Ok(("example.com/shared".to_string(), "#Thing".parse().unwrap()))
                } else {
                    crate::mapping::default_map_ref(loc)
                }
            }))),
            define_schema: Some(DefineSchemaFn(Arc::new(move |ip, path, expr, _doc| {
                sink.lock()
                    .unwrap()
                    .push((format!("{ip} {path}"), expr.to_string()));
            }))),
            ..Config::default()
        };
        let schema = json!({"$defs": {"thing": {"type": "string"}}, "$ref": "#/$defs/thing"});
        let out = extract(&schema, &cfg).unwrap().to_string();
        assert_eq!(
            out,
            "import \"example.com/shared\"\n\nshared.#Thing\n"
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("example.com/shared #Thing".to_string(), "string".to_string())]
        );
    }

    #[test]
    fn test_invalid_id_config_is_fatal() {
        let cfg = Config {
            id: Some("relative/path".into()),
            ..Config::default()
        };
        let err = extract(&json!({}), &cfg).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }
}
