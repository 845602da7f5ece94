//! Per-schema decoding state.
//!
//! A [`State`] exists for the duration of one schema node. Keyword handlers
//! push constraints into it, grouped by the JSON type they apply to, and
//! [`State::finalize`] turns what was collected into a single expression.

use serde_json::{Number, Value};
use url::Url;

use crate::ast::{Attribute, BinaryOp, Decl, Expr, ListLit};
use crate::error::ErrorKind;
use crate::kind::Kind;
use crate::version::{Version, VersionSet};

use super::keywords::{self, Phase};
use super::{Decoder, Node};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The JSON types a type-specific constraint can be guarded by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoreType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl CoreType {
    pub const ALL: [CoreType; 6] = [
        CoreType::Null,
        CoreType::Bool,
        CoreType::Number,
        CoreType::String,
        CoreType::Array,
        CoreType::Object,
    ];

    pub fn kind(self) -> Kind {
        match self {
            CoreType::Null => Kind::NULL,
            CoreType::Bool => Kind::BOOL,
            CoreType::Number => Kind::NUMBER,
            CoreType::String => Kind::STRING,
            CoreType::Array => Kind::LIST,
            CoreType::Object => Kind::STRUCT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CoreType::Null => "null",
            CoreType::Bool => "bool",
            CoreType::Number => "number",
            CoreType::String => "string",
            CoreType::Array => "array",
            CoreType::Object => "object",
        }
    }

    /// Syntax for "any value of this type".
    fn syntax(self, open_only_when_explicit: bool) -> Expr {
        match self {
            CoreType::Null => Expr::null(),
            CoreType::Bool => Expr::ident("bool"),
            CoreType::Number => Expr::ident("number"),
            CoreType::String => Expr::ident("string"),
            CoreType::Array => Expr::open_list(Vec::new(), Expr::top()),
            CoreType::Object if open_only_when_explicit => Expr::struct_lit(Vec::new()),
            CoreType::Object => Expr::struct_lit(vec![Decl::Ellipsis]),
        }
    }
}

/// How a struct literal in progress is to be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Openness {
    #[default]
    ImplicitlyOpen,
    /// `additionalProperties: true` or preserved unknown fields.
    ExplicitlyOpen,
    /// `additionalProperties: false`.
    ExplicitlyClosed,
    /// A pattern constraint already matches every possible field.
    AllFieldsCovered,
}

/// A constraint together with the location it came from.
#[derive(Debug, Clone)]
pub(crate) struct Conjunct {
    pub expr: Expr,
    pub at: String,
}

/// What a decoded schema tells its parent.
#[derive(Debug, Clone)]
pub(crate) struct SchemaInfo {
    /// Types the schema can still accept.
    pub allowed_types: Kind,
    /// Types already made explicit by the produced syntax.
    pub known_types: Kind,
    pub title: String,
    pub description: String,
    pub deprecated: bool,
    /// The schema's own `$id`, if any.
    pub id: Option<Url>,
    pub version: Version,
    /// Whether `$schema` was given explicitly.
    pub version_present: bool,
    pub has_constraints: bool,
}

impl Default for SchemaInfo {
    fn default() -> Self {
        Self {
            allowed_types: Kind::TOP,
            known_types: Kind::TOP,
            title: String::new(),
            description: String::new(),
            deprecated: false,
            id: None,
            version: Version::Unknown,
            version_present: false,
            has_constraints: false,
        }
    }
}

impl SchemaInfo {
    /// Doc comment built from `title` and `description`.
    pub fn comment(&self) -> Option<String> {
        let mut doc = self.title.trim().to_string();
        if !self.description.is_empty() {
            if !doc.is_empty() {
                doc.push_str("\n\n");
            }
            doc.push_str(&self.description);
            doc = doc.trim().to_string();
        }
        (!doc.is_empty()).then_some(doc)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub(crate) struct State<'d, 'a> {
    pub d: &'d mut Decoder<'a>,
    pub node: Node<'a>,
    pub info: SchemaInfo,
    /// Base URI for resolving relative references: the nearest `$id`.
    pub base: Url,
    pub is_root: bool,

    /// Type-specific constraints, indexed by [`CoreType`].
    pub types: [Vec<Conjunct>; 6],
    /// Constraints that apply whatever the type.
    pub all: Vec<Conjunct>,
    pub nullable: bool,

    pub exclusive_min: bool,
    pub exclusive_max: bool,

    pub min_contains: Option<u64>,
    pub max_contains: Option<u64>,

    pub if_node: Option<Node<'a>>,
    pub then_node: Option<Node<'a>>,
    pub else_node: Option<Node<'a>>,

    /// Object literal in progress and where it started.
    pub obj: Option<Vec<Decl>>,
    pub obj_at: String,
    /// `!~re` for every `patternProperties` key seen so far.
    pub patterns: Vec<Expr>,
    pub openness: Openness,

    /// List literal in progress (`prefixItems` or an `items` array).
    pub list: Option<ListLit>,
    pub list_at: String,
    /// `items` was given as an array, so `additionalItems` applies.
    pub list_items_is_array: bool,

    pub has_properties: bool,
    pub has_additional_properties: bool,
    pub has_items: bool,
    pub is_array: bool,
    pub has_ref_keyword: bool,
    pub preserve_unknown_fields: bool,
}

impl<'d, 'a> State<'d, 'a> {
    fn new(d: &'d mut Decoder<'a>, node: Node<'a>, base: Url, version: Version, types: Kind) -> Self {
        State {
            d,
            node,
            info: SchemaInfo {
                allowed_types: types,
                version,
                ..SchemaInfo::default()
            },
            base,
            is_root: false,
            types: Default::default(),
            all: Vec::new(),
            nullable: false,
            exclusive_min: false,
            exclusive_max: false,
            min_contains: None,
            max_contains: None,
            if_node: None,
            then_node: None,
            else_node: None,
            obj: None,
            obj_at: String::new(),
            patterns: Vec::new(),
            openness: Openness::ImplicitlyOpen,
            list: None,
            list_at: String::new(),
            list_items_is_array: false,
            has_properties: false,
            has_additional_properties: false,
            has_items: false,
            is_array: false,
            has_ref_keyword: false,
            preserve_unknown_fields: false,
        }
    }

    /// The state that owns the top-level schemas of a pass.
    pub fn root(d: &'d mut Decoder<'a>, node: Node<'a>, base: Url) -> Self {
        let version = d.cfg.default_version;
        let mut s = State::new(d, node, base, version, Kind::TOP);
        s.is_root = true;
        s
    }

    // -- diagnostics -------------------------------------------------------

    /// Reports a diagnostic at `n` and returns a placeholder expression.
    pub fn errf(&mut self, kind: ErrorKind, n: &Node<'a>, msg: impl Into<String>) -> Expr {
        let msg = msg.into();
        self.d.report(kind, n.location(), msg.clone());
        Expr::Bad(msg)
    }

    /// Reports `msg` when keywords are checked strictly; logs it otherwise.
    pub fn warn_unrecognized(&mut self, key: &str, n: &Node<'a>, msg: String) {
        if !self.d.cfg.strict_keywords {
            tracing::warn!(keyword = key, location = %n.location(), "{msg}");
            return;
        }
        if self.info.version.is(VersionSet::OPEN_API_LIKE) && key.starts_with("x-") {
            return;
        }
        self.errf(ErrorKind::Version, n, msg);
    }

    // -- constraint collection ----------------------------------------------

    pub fn add(&mut self, t: CoreType, n: &Node<'a>, expr: Expr) {
        if !expr.is_top() {
            self.types[t as usize].push(Conjunct {
                expr,
                at: n.location(),
            });
        }
    }

    pub fn add_all(&mut self, n: &Node<'a>, expr: Expr) {
        if !expr.is_top() {
            self.all.push(Conjunct {
                expr,
                at: n.location(),
            });
        }
    }

    /// The object literal in progress, started at `n` if there is none.
    pub fn object(&mut self, n: &Node<'a>) -> &mut Vec<Decl> {
        if self.obj.is_none() {
            self.obj_at = n.location();
        }
        self.obj.get_or_insert_with(Vec::new)
    }

    // -- value helpers -----------------------------------------------------

    pub fn str_value(&mut self, n: &Node<'a>) -> Option<&'a str> {
        match n.value {
            Value::String(s) => Some(s.as_str()),
            _ => {
                self.errf(ErrorKind::Structural, n, "invalid string");
                None
            }
        }
    }

    pub fn bool_value(&mut self, n: &Node<'a>) -> Option<bool> {
        match n.value {
            Value::Bool(b) => Some(*b),
            _ => {
                self.errf(ErrorKind::Structural, n, "invalid bool");
                None
            }
        }
    }

    pub fn number(&mut self, n: &Node<'a>) -> Option<Number> {
        match n.value {
            Value::Number(num) => Some(num.clone()),
            _ => {
                self.errf(ErrorKind::Structural, n, "invalid number");
                None
            }
        }
    }

    /// A non-negative integer; whole floats such as `2.0` are accepted.
    pub fn uint(&mut self, n: &Node<'a>) -> Option<u64> {
        let v = match n.value {
            Value::Number(num) => num.as_u64().or_else(|| {
                num.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            _ => None,
        };
        if v.is_none() {
            self.errf(ErrorKind::Structural, n, "invalid uint");
        }
        v
    }

    /// Elements of the array at `n`, reporting non-arrays and, unless
    /// allowed, empty arrays.
    pub fn list_items(&mut self, name: &str, n: &Node<'a>, allow_empty: bool) -> Vec<Node<'a>> {
        if !n.value.is_array() {
            let msg = format!("value of {name:?} must be an array, found {}", n.kind_name());
            self.errf(ErrorKind::Structural, n, msg);
        }
        let items = n.elements();
        if !allow_empty && items.is_empty() {
            self.errf(
                ErrorKind::Structural,
                n,
                format!("array for {name:?} must be non-empty"),
            );
        }
        items
    }

    /// Syntax for a literal JSON value. Objects become closed structs of
    /// required fields.
    pub fn const_value(&mut self, n: &Node<'a>) -> Expr {
        match n.value {
            Value::Null => Expr::null(),
            Value::Bool(b) => Expr::bool(*b),
            Value::Number(num) => Expr::number(num.clone()),
            Value::String(s) => Expr::string(s.clone()),
            Value::Array(_) => {
                let elems = n.elements().iter().map(|e| self.const_value(e)).collect();
                Expr::list(elems)
            }
            Value::Object(_) => {
                let fields = n
                    .entries()
                    .into_iter()
                    .map(|(key, v)| {
                        let value = self.const_value(&v);
                        Decl::Field(crate::ast::Field::new(crate::ast::Label::name(key), value).required())
                    })
                    .collect();
                Expr::builtin("close", vec![Expr::struct_lit(fields)])
            }
        }
    }

    // -- recursion -----------------------------------------------------------

    pub fn schema(&mut self, n: &Node<'a>) -> Expr {
        self.schema_state(n, Kind::TOP, |_| {}).0
    }

    /// Decodes `n` in a new state whose allowed types start as `types`.
    /// `init` runs on the new state before any keyword.
    pub fn schema_state<F>(&mut self, n: &Node<'a>, types: Kind, init: F) -> (Expr, SchemaInfo)
    where
        F: FnOnce(&mut State<'_, 'a>),
    {
        let is_root = self.is_root && n.tokens == self.node.tokens;
        let preserve = self.preserve_unknown_fields;
        let base = self.base.clone();
        let version = self.info.version;

        let mut s = State::new(&mut *self.d, n.clone(), base, version, types);
        s.is_root = is_root;
        s.preserve_unknown_fields = preserve;
        init(&mut s);
        let (expr, info) = s.decode();
        let expr = s.maybe_define(expr, &info);
        (expr, info)
    }

    fn decode(&mut self) -> (Expr, SchemaInfo) {
        let n = self.node.clone();
        match n.value {
            Value::Bool(b) => {
                if self.info.version.is(VersionSet::since(Version::Draft6)) {
                    return (bool_schema(*b), self.info.clone());
                }
                let msg = format!("boolean schemas not supported in {}", self.info.version);
                let e = self.errf(ErrorKind::Version, &n, msg);
                return (e, self.info.clone());
            }
            Value::Object(_) => {}
            _ => {
                let msg = format!("schema expects mapping node, found {}", n.kind_name());
                let e = self.errf(ErrorKind::Structural, &n, msg);
                return (e, self.info.clone());
            }
        }

        let entries = n.entries();
        for phase in Phase::ALL {
            for (key, value) in &entries {
                self.dispatch(phase, key, value);
            }
        }

        if self.info.id.is_some() {
            // Anything with an `$id` can be referred to.
            self.d.ensure_definition(&n.tokens);
        }
        super::combinator::if_then_else(self);

        let version = self.info.version;
        if version == Version::KubernetesCrd && self.has_properties && self.has_additional_properties {
            let msg = format!("additionalProperties may not be combined with properties in {version}");
            self.errf(ErrorKind::Version, &n, msg);
        }
        if version.is(VersionSet::OPEN_API_LIKE) && self.is_array && !self.has_items {
            let msg = format!(r#""items" must be present when the "type" is "array" in {version}"#);
            self.errf(ErrorKind::Version, &n, msg);
        }

        let expr = self.finalize();
        self.info.has_constraints = self.has_constraints();
        (expr, self.info.clone())
    }

    fn dispatch(&mut self, phase: Phase, key: &str, value: &Node<'a>) {
        if phase == Phase::FIRST && key == "$ref" {
            self.has_ref_keyword = true;
        }
        let Some(kw) = keywords::lookup(key) else {
            if key.starts_with("x-") {
                return;
            }
            if phase == Phase::FIRST && self.d.cfg.strict_keywords {
                self.warn_unrecognized(key, value, format!("unknown keyword {key:?}"));
            }
            return;
        };
        if kw.phase != phase {
            return;
        }
        let version = self.info.version;
        if !version.is(kw.versions) {
            let msg = format!("keyword {key:?} is not supported in JSON schema version {version}");
            self.warn_unrecognized(key, value, msg);
            return;
        }
        // Keywords next to `$ref` were ignored before 2019-09. The version
        // and metadata phases are exempt since `$schema` decides the version.
        if phase > Phase::Metadata
            && !version.is(VersionSet::since(Version::Draft2019_09))
            && self.has_ref_keyword
            && key != "$ref"
        {
            self.warn_unrecognized(key, value, format!("ignoring keyword {key:?} alongside $ref"));
            return;
        }
        (kw.handler)(self, key, value);
    }

    // -- finalization ----------------------------------------------------------

    fn finalize_object(&mut self) {
        if self.obj.is_none()
            && self.info.version == Version::KubernetesCrd
            && self.info.allowed_types.intersects(Kind::STRUCT)
            && self.preserve_unknown_fields
        {
            let n = self.node.clone();
            self.object(&n);
        }
        let Some(obj) = &self.obj else {
            return;
        };
        let mut elems = obj.clone();
        if self.preserve_unknown_fields {
            self.openness = Openness::ExplicitlyOpen;
        }
        let expr = match self.openness {
            Openness::ImplicitlyOpen if self.d.cfg.open_only_when_explicit => Expr::struct_lit(elems),
            Openness::AllFieldsCovered => Expr::struct_lit(elems),
            Openness::ExplicitlyClosed => Expr::builtin("close", vec![Expr::struct_lit(elems)]),
            Openness::ImplicitlyOpen | Openness::ExplicitlyOpen => {
                elems.push(Decl::Ellipsis);
                Expr::struct_lit(elems)
            }
        };
        self.types[CoreType::Object as usize].push(Conjunct {
            expr,
            at: self.obj_at.clone(),
        });
    }

    /// Builds the schema's syntax from everything collected.
    pub fn finalize(&mut self) -> Expr {
        if self.info.allowed_types.is_empty() {
            return error_disallowed();
        }

        self.finalize_object();
        if let Some(list) = self.list.take() {
            let at = std::mem::take(&mut self.list_at);
            self.types[CoreType::Array as usize].push(Conjunct {
                expr: Expr::List(list),
                at,
            });
        }

        // Literal lists and structs go last; the sort is stable.
        self.types[CoreType::Array as usize].sort_by_key(|c| c.expr.is_list_lit());
        self.types[CoreType::Object as usize].sort_by_key(|c| c.expr.is_struct_lit());

        let allowed = self.info.allowed_types;
        let known = self.info.known_types;
        let open_only_when_explicit = self.d.cfg.open_only_when_explicit;

        let needs_type_disjunction = allowed != known
            || CoreType::ALL
                .iter()
                .any(|t| !self.types[*t as usize].is_empty() && allowed.intersects(t.kind()));

        let mut disjuncts = Vec::new();
        if needs_type_disjunction {
            let mut excluded: Vec<(String, CoreType)> = Vec::new();
            let mut npossible = 0;
            let mut nexcluded = 0;
            for t in CoreType::ALL {
                let constraints = &self.types[t as usize];
                let is_allowed = allowed.intersects(t.kind());
                if !constraints.is_empty() {
                    npossible += 1;
                    if !is_allowed {
                        nexcluded += 1;
                        excluded.extend(constraints.iter().map(|c| (c.at.clone(), t)));
                        continue;
                    }
                    disjuncts.push(Expr::and_all(constraints.iter().map(|c| c.expr.clone()).collect()));
                } else if is_allowed {
                    npossible += 1;
                    if known.intersects(t.kind()) {
                        disjuncts.push(t.syntax(open_only_when_explicit));
                    }
                }
            }
            if nexcluded == npossible {
                for (at, t) in excluded {
                    let msg = format!("constraint not allowed because type {} is excluded", t.name());
                    self.d.report(ErrorKind::Structural, at, msg);
                }
            }
        }

        let mut conjuncts: Vec<Expr> = self.all.iter().map(|c| c.expr.clone()).collect();
        if let Some(or) = Expr::or_all(disjuncts) {
            conjuncts.push(or);
        }
        let mut expr = Expr::and_all(conjuncts);
        if self.nullable {
            expr = Expr::binary(BinaryOp::Or, Expr::null(), expr);
        }

        if let Some(id) = &self.info.id {
            let tag = Decl::Attribute(Attribute::jsonschema("id", id.as_str()));
            expr = match expr {
                Expr::Struct(mut st) => {
                    st.elems.insert(0, tag);
                    Expr::Struct(st)
                }
                other => Expr::struct_lit(vec![tag, Decl::Embed(other)]),
            };
        }

        self.info.known_types = self.info.allowed_types;
        expr
    }

    fn has_constraints(&self) -> bool {
        !self.all.is_empty()
            || self.types.iter().any(|t| !t.is_empty())
            || !self.patterns.is_empty()
            || !self.info.title.is_empty()
            || !self.info.description.is_empty()
            || self.obj.is_some()
            || self.info.id.is_some()
    }
}

/// `error("disallowed")`: the schema that matches nothing.
pub(crate) fn error_disallowed() -> Expr {
    Expr::error("disallowed")
}

pub(crate) fn bool_schema(ok: bool) -> Expr {
    if ok {
        Expr::top()
    } else {
        error_disallowed()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn extract_text(schema: Value, cfg: Config) -> Result<String, Vec<String>> {
        crate::decode::extract(&schema, &cfg)
            .map(|f| f.to_string())
            .map_err(|e| e.diagnostics().iter().map(|d| d.to_string()).collect())
    }

    #[test]
    fn test_comment_joins_title_and_description() {
        let info = SchemaInfo {
            title: " Title ".into(),
            description: "Body.\n".into(),
            ..SchemaInfo::default()
        };
        assert_eq!(info.comment().as_deref(), Some("Title\n\nBody."));
        assert_eq!(SchemaInfo::default().comment(), None);
    }

    #[test]
    fn test_empty_schema_is_top() {
        assert_eq!(extract_text(json!({}), Config::default()).unwrap(), "_\n");
    }

    #[test]
    fn test_nullable_wraps_schema() {
        let cfg = Config {
            default_version: Version::OpenApi,
            ..Config::default()
        };
        let out = extract_text(json!({"type": "string", "nullable": true}), cfg).unwrap();
        assert_eq!(out, "null | string\n");
    }

    #[test]
    fn test_type_list_gives_disjunction() {
        let out = extract_text(json!({"type": ["string", "null"]}), Config::default()).unwrap();
        assert_eq!(out, "null | string\n");
    }

    #[test]
    fn test_constraints_for_excluded_type_are_dropped() {
        let out = extract_text(json!({"type": "string", "minimum": 3}), Config::default()).unwrap();
        assert_eq!(out, "string\n");
    }

    #[test]
    fn test_type_specific_constraints_form_disjuncts() {
        let out = extract_text(
            json!({"type": ["string", "integer"], "minLength": 1}),
            Config::default(),
        )
        .unwrap();
        assert_eq!(out, "import \"strings\"\n\nint | strings.MinRunes(1)\n");
    }

    #[test]
    fn test_id_tag() {
        let out = extract_text(
            json!({"$id": "https://example.com/s.json", "type": "object"}),
            Config::default(),
        )
        .unwrap();
        assert_eq!(out, "@jsonschema(id=\"https://example.com/s.json\")\n...\n");
    }

    #[test]
    fn test_boolean_schema_before_draft6() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "properties": {"a": true}
        });
        let errs = extract_text(schema, Config::default()).unwrap_err();
        assert_eq!(
            errs,
            vec!["#/properties/a: boolean schemas not supported in http://json-schema.org/draft-04/schema#"]
        );
    }

    #[test]
    fn test_non_object_schema() {
        let errs = extract_text(json!({"properties": {"a": 1}}), Config::default()).unwrap_err();
        assert_eq!(errs, vec!["#/properties/a: schema expects mapping node, found number"]);
    }

    #[test]
    fn test_strict_keywords_report_unknown_keyword_once() {
        let cfg = Config {
            strict_keywords: true,
            ..Config::default()
        };
        let errs = extract_text(json!({"foo": 1, "x-bar": 2}), cfg).unwrap_err();
        assert_eq!(errs, vec!["#/foo: unknown keyword \"foo\""]);
    }

    #[test]
    fn test_keywords_alongside_ref_ignored_before_2019() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"a": {"type": "string"}},
            "properties": {"x": {"$ref": "#/definitions/a", "minLength": 3}}
        });
        let out = extract_text(schema.clone(), Config::default()).unwrap();
        assert!(out.contains("x?: #a"), "{out}");
        assert!(!out.contains("MinRunes"), "{out}");

        let strict = Config {
            strict_keywords: true,
            ..Config::default()
        };
        let errs = extract_text(schema, strict).unwrap_err();
        assert_eq!(
            errs,
            vec!["#/properties/x/minLength: ignoring keyword \"minLength\" alongside $ref"]
        );
    }
}
