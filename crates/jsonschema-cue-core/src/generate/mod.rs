//! JSON Schema generation from host values.
//!
//! [`generate`] decomposes a [`Value`] into [`Item`]s bottom-up, runs the
//! rewrite passes in [`crate::passes`] over the result and renders it to
//! JSON. Only draft 2020-12 output is supported.
//!
//! Referenced values that have a name under the configured name function
//! become `$defs` entries. An entry is reserved before its value is
//! translated, so recursive references terminate.

pub mod item;
pub mod render;

use std::collections::BTreeMap;

use serde_json::{Number, Value as Json};

use crate::config::{default_name_func, GenerateConfig};
use crate::error::{ConvertError, Diagnostic, ErrorKind, Errors};
use crate::host::{Constraint, Expr, ListLit, Op, Openness, PatternField, StructLit, Value};
use crate::kind::Kind;
use crate::passes;
use crate::path::{Path, Selector};
use crate::version::Version;

use item::{BoundOp, Handle, Interner, Item, Limit, Literal, Properties};

/// Diagnostic location of the value passed to [`generate`].
const ROOT_LOCATION: &str = "<root>";

// Layouts understood by `time.Format`.
const RFC3339: &str = "2006-01-02T15:04:05Z07:00";
const RFC3339_NANO: &str = "2006-01-02T15:04:05.999999999Z07:00";
const DATE_ONLY: &str = "2006-01-02";
const TIME_ONLY: &str = "15:04:05";

/// Generates a JSON Schema document for `v`.
///
/// ## Errors
///
/// - [`ConvertError::UnsupportedVersion`] for any version but 2020-12.
/// - [`ConvertError::InvalidValue`] when `v` is bottom or holds a dangling
///   reference.
/// - [`ConvertError::Schema`] with every problem found during translation,
///   including a schema that can never be satisfied.
pub fn generate(v: &Value, cfg: &GenerateConfig) -> Result<Json, ConvertError> {
    let version = match cfg.version {
        Version::Unknown => Version::Draft2020_12,
        version => version,
    };
    if version != Version::Draft2020_12 {
        return Err(ConvertError::UnsupportedVersion {
            requested: version,
            supported: Version::Draft2020_12,
        });
    }
    v.validate().map_err(|e| ConvertError::InvalidValue {
        path: ROOT_LOCATION.to_string(),
        message: e.to_string(),
    })?;

    let mut g = Generator::new(cfg);
    let root = g.make_item(v);
    let root = passes::run_all(&root, &mut g.interner);

    let mut defs = Vec::new();
    for (name, item) in std::mem::take(&mut g.defs) {
        match item {
            Some(item) => defs.push((name, passes::run_all(&item, &mut g.interner))),
            None => g.report(
                ErrorKind::Internal,
                format!("definition {name:?} was never completed"),
            ),
        }
    }

    let mut fields: Vec<(String, Json)> = match render::render(&root) {
        // `true` accepts anything, which is the empty schema.
        Json::Bool(true) => Vec::new(),
        Json::Bool(false) => {
            if g.errs.is_empty() {
                g.report(ErrorKind::Feature, "schema cannot be satisfied");
            }
            return Err(ConvertError::Schema(g.errs));
        }
        Json::Object(obj) => obj.into_iter().collect(),
        other => {
            g.report(
                ErrorKind::Internal,
                format!("expected a schema object, found {other}"),
            );
            Vec::new()
        }
    };
    g.errs.into_result()?;

    tracing::debug!(definitions = defs.len(), "generated schema");
    fields.push(("$schema".to_string(), Json::from(version.as_str())));
    if !defs.is_empty() {
        let defs = defs
            .into_iter()
            .map(|(name, item)| (name, render::render(&item)))
            .collect();
        fields.push(("$defs".to_string(), Json::Object(defs)));
    }
    Ok(render::schema_object(fields))
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

struct Generator<'c> {
    cfg: &'c GenerateConfig,
    interner: Interner,
    /// `$defs` entries by name. `None` marks an entry whose value is still
    /// being translated.
    defs: BTreeMap<String, Option<Handle>>,
    errs: Errors,
    /// Path of the value being translated, for diagnostics.
    path: Path,
    /// Unnamed references currently being inlined.
    inlining: Vec<Path>,
}

impl<'c> Generator<'c> {
    fn new(cfg: &'c GenerateConfig) -> Self {
        Self {
            cfg,
            interner: Interner::new(),
            defs: BTreeMap::new(),
            errs: Errors::new(),
            path: Path::root(),
            inlining: Vec::new(),
        }
    }

    fn report(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let location = if self.path.is_empty() {
            ROOT_LOCATION.to_string()
        } else {
            self.path.to_string()
        };
        self.errs.push(Diagnostic::new(kind, location, message));
    }

    /// Reports a problem and yields the schema that accepts nothing.
    fn error(&mut self, kind: ErrorKind, message: impl Into<String>) -> Handle {
        self.report(kind, message);
        self.intern(Item::False)
    }

    fn intern(&mut self, item: Item) -> Handle {
        self.interner.intern(item)
    }

    fn all_of(&mut self, mut elems: Vec<Handle>) -> Handle {
        if elems.len() == 1 {
            return elems.swap_remove(0);
        }
        self.intern(Item::AllOf(elems))
    }

    fn type_item(&mut self, kind: Kind) -> Handle {
        if kind == Kind::TOP {
            self.intern(Item::True)
        } else if kind.is_empty() {
            self.intern(Item::False)
        } else {
            self.intern(Item::Type(kind))
        }
    }

    /// `item` restricted to values of `kind`.
    fn typed(&mut self, kind: Kind, item: Item) -> Handle {
        let t = self.type_item(kind);
        let it = self.intern(item);
        self.all_of(vec![t, it])
    }

    fn string_format(&mut self, name: &str) -> Handle {
        self.typed(Kind::STRING, Item::Format(name.to_string()))
    }

    /// Runs `f` with `sel` appended to the diagnostic path.
    fn at<T>(&mut self, sel: Selector, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.path.clone();
        self.path.push(sel);
        let result = f(self);
        self.path = saved;
        result
    }

    fn def_name(&self, path: &Path) -> String {
        match &self.cfg.name_func {
            Some(name_func) => (name_func.0)(path),
            None => default_name_func(path),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn make_item(&mut self, v: &Value) -> Handle {
        let v = v.normalized();
        match v.expr() {
            Expr::Top => self.intern(Item::True),
            Expr::Bottom => self.intern(Item::False),
            Expr::Kind(kind) => self.type_item(*kind),
            Expr::Lit(j) => self.intern(Item::Const(Literal(j.clone()))),
            Expr::Ref(path) => self.make_ref(&v, path),
            Expr::Unary { op, arg } => self.make_unary(&v, *op, arg),
            Expr::And(xs) => {
                let elems = self.make_items(&v, xs);
                self.intern(Item::AllOf(elems))
            }
            Expr::Or(xs) => {
                let elems = self.make_items(&v, xs);
                self.intern(Item::AnyOf(elems))
            }
            Expr::Call { func, args } => self.make_call(&v, func, args),
            Expr::Struct(s) => self.make_struct(&v, s),
            Expr::List(l) => self.make_list(&v, l),
        }
    }

    fn make_items(&mut self, v: &Value, xs: &[Expr]) -> Vec<Handle> {
        xs.iter().map(|x| self.make_item(&v.with(x.clone()))).collect()
    }

    fn make_ref(&mut self, v: &Value, path: &Path) -> Handle {
        let name = self.def_name(path);
        if name.is_empty() {
            if self.inlining.contains(path) {
                return self.error(
                    ErrorKind::Reference,
                    format!("cannot inline recursive reference to {path}"),
                );
            }
            let target = match v.resolve() {
                Ok(target) => target,
                Err(e) => return self.error(ErrorKind::Reference, e.to_string()),
            };
            self.inlining.push(path.clone());
            let item = self.make_item(&target);
            self.inlining.pop();
            return item;
        }

        let reference = self.intern(Item::Ref(name.clone()));
        if self.defs.contains_key(&name) {
            return reference;
        }
        self.defs.insert(name.clone(), None);
        tracing::debug!(%path, name = %name, "adding definition");

        let item = match v.resolve() {
            Ok(target) => {
                let saved = std::mem::replace(&mut self.path, path.clone());
                let item = self.make_item(&target);
                self.path = saved;
                item
            }
            Err(e) => self.error(ErrorKind::Reference, e.to_string()),
        };
        self.defs.insert(name, Some(item));
        reference
    }

    fn make_unary(&mut self, v: &Value, op: Op, arg: &Expr) -> Handle {
        match op {
            Op::Match | Op::NotMatch => {
                let Expr::Lit(Json::String(re)) = arg else {
                    return self.error(
                        ErrorKind::Feature,
                        "regular expression must be a concrete string",
                    );
                };
                let mut m = self.intern(Item::Pattern(re.clone()));
                if op == Op::NotMatch {
                    m = self.intern(Item::Not(m));
                }
                let t = self.type_item(Kind::STRING);
                self.all_of(vec![t, m])
            }
            Op::Eq | Op::Ne => {
                let Some(value) = v.with(arg.clone()).concrete_json() else {
                    // Only comparisons with a concrete value can be
                    // expressed.
                    return self.intern(Item::True);
                };
                let c = self.intern(Item::Const(Literal(value)));
                if op == Op::Ne {
                    self.intern(Item::Not(c))
                } else {
                    c
                }
            }
            Op::Lt => self.make_bound(v, BoundOp::Lt, arg),
            Op::Le => self.make_bound(v, BoundOp::Le, arg),
            Op::Gt => self.make_bound(v, BoundOp::Gt, arg),
            Op::Ge => self.make_bound(v, BoundOp::Ge, arg),
        }
    }

    fn make_bound(&mut self, v: &Value, op: BoundOp, arg: &Expr) -> Handle {
        if let Expr::Lit(Json::Number(n)) = arg {
            let bound = self.intern(Item::Bounds { op, n: n.clone() });
            let t = self.type_item(Kind::NUMBER);
            return self.all_of(vec![bound, t]);
        }
        let kind = v.with(arg.clone()).kind();
        if kind == Kind::STRING {
            // Lexical bounds on strings have no JSON Schema equivalent.
            return self.type_item(Kind::STRING);
        }
        if !kind.is_empty() && Kind::NUMBER.contains(kind) {
            // A bound that is not yet concrete.
            return self.intern(Item::True);
        }
        self.error(
            ErrorKind::Feature,
            format!("bad argument to unary comparison for {:?}", op.keyword()),
        )
    }

    // -----------------------------------------------------------------------
    // Builtin calls
    // -----------------------------------------------------------------------

    fn make_call(&mut self, v: &Value, func: &str, args: &[Expr]) -> Handle {
        match func {
            "strings.MinRunes" => self.count_call(func, args, Kind::STRING, |n| Item::LengthBounds {
                limit: Limit::Min,
                n,
            }),
            "strings.MaxRunes" => self.count_call(func, args, Kind::STRING, |n| Item::LengthBounds {
                limit: Limit::Max,
                n,
            }),
            "list.MinItems" => self.count_call(func, args, Kind::LIST, |n| Item::ItemsBounds {
                limit: Limit::Min,
                n,
            }),
            "list.MaxItems" => self.count_call(func, args, Kind::LIST, |n| Item::ItemsBounds {
                limit: Limit::Max,
                n,
            }),
            "struct.MinFields" => self.count_call(func, args, Kind::STRUCT, |n| Item::PropertyBounds {
                limit: Limit::Min,
                n,
            }),
            "struct.MaxFields" => self.count_call(func, args, Kind::STRUCT, |n| Item::PropertyBounds {
                limit: Limit::Max,
                n,
            }),
            "math.MultipleOf" => match self.number_arg(func, args) {
                Some(n) => self.typed(Kind::NUMBER, Item::MultipleOf(n)),
                None => self.intern(Item::False),
            },
            "time.Format" => self.time_format(args),
            "time.Time" => self.string_format("date-time"),
            "net.AbsURL" => self.string_format("uri"),
            "net.URL" => self.string_format("uri-reference"),
            "regexp.Valid" => self.string_format("regex"),
            "list.MatchN" => self.list_match_n(v, args),
            "matchN" => self.match_n(v, args),
            "matchIf" => self.match_if(v, args),
            "close" if args.len() == 1 => self.make_item(&v.with(args[0].clone())),
            "error" => self.intern(Item::False),
            _ => {
                tracing::warn!(func, "unsupported builtin, accepting any value");
                self.intern(Item::True)
            }
        }
    }

    fn check_args(&mut self, func: &str, args: &[Expr], want: usize) -> bool {
        if args.len() == want {
            return true;
        }
        let plural = if want == 1 { "" } else { "s" };
        self.report(
            ErrorKind::Structural,
            format!("{func} expects {want} argument{plural}, got {}", args.len()),
        );
        false
    }

    fn uint_arg(&mut self, func: &str, args: &[Expr]) -> Option<u64> {
        if !self.check_args(func, args, 1) {
            return None;
        }
        let n = match &args[0] {
            Expr::Lit(j) => j.as_u64(),
            _ => None,
        };
        if n.is_none() {
            self.report(
                ErrorKind::Structural,
                format!("{func} argument must be a non-negative integer"),
            );
        }
        n
    }

    fn number_arg(&mut self, func: &str, args: &[Expr]) -> Option<Number> {
        if !self.check_args(func, args, 1) {
            return None;
        }
        match &args[0] {
            Expr::Lit(Json::Number(n)) => Some(n.clone()),
            _ => {
                self.report(
                    ErrorKind::Structural,
                    format!("{func} argument must be a number"),
                );
                None
            }
        }
    }

    fn count_call(&mut self, func: &str, args: &[Expr], kind: Kind, make: fn(u64) -> Item) -> Handle {
        match self.uint_arg(func, args) {
            Some(n) => self.typed(kind, make(n)),
            None => self.intern(Item::False),
        }
    }

    fn time_format(&mut self, args: &[Expr]) -> Handle {
        if !self.check_args("time.Format", args, 1) {
            return self.intern(Item::False);
        }
        let Expr::Lit(Json::String(layout)) = &args[0] else {
            return self.error(
                ErrorKind::Structural,
                "time.Format layout must be a concrete string",
            );
        };
        let format = match layout.as_str() {
            RFC3339 | RFC3339_NANO => "date-time",
            DATE_ONLY => "date",
            TIME_ONLY => "time",
            // Other layouts cannot be expressed, but the value is still a
            // string.
            _ => return self.type_item(Kind::STRING),
        };
        self.string_format(format)
    }

    fn list_match_n(&mut self, v: &Value, args: &[Expr]) -> Handle {
        if !self.check_args("list.MatchN", args, 2) {
            return self.intern(Item::False);
        }
        let Some((min, max)) = count_range(&args[0]) else {
            tracing::warn!(count = ?args[0], "unsupported list.MatchN count, checking the type only");
            return self.type_item(Kind::LIST);
        };
        let elem = self.make_item(&v.with(args[1].clone()));
        // One match is what `contains` means without `minContains`.
        let min = min.filter(|&n| n != 1);
        self.typed(Kind::LIST, Item::Contains { elem, min, max })
    }

    fn match_n(&mut self, v: &Value, args: &[Expr]) -> Handle {
        if !self.check_args("matchN", args, 2) {
            return self.intern(Item::False);
        }
        let Expr::List(ListLit { elems, rest: None }) = &args[1] else {
            return self.error(ErrorKind::Feature, "matchN requires a closed list of schemas");
        };
        let mut members = self.make_items(v, elems);
        let count = match &args[0] {
            Expr::Lit(j) => j.as_u64(),
            _ => None,
        };
        match count {
            Some(0) if members.is_empty() => self.intern(Item::True),
            Some(0) => {
                let any = if members.len() == 1 {
                    members.swap_remove(0)
                } else {
                    self.intern(Item::AnyOf(members))
                };
                self.intern(Item::Not(any))
            }
            Some(n) if usize::try_from(n).is_ok_and(|n| n == members.len()) => {
                self.intern(Item::AllOf(members))
            }
            Some(1) => self.intern(Item::OneOf(members)),
            _ if is_at_least_one(&args[0]) => self.intern(Item::AnyOf(members)),
            _ => {
                tracing::warn!(count = ?args[0], "unsupported matchN count, accepting any value");
                self.intern(Item::True)
            }
        }
    }

    fn match_if(&mut self, v: &Value, args: &[Expr]) -> Handle {
        if !self.check_args("matchIf", args, 3) {
            return self.intern(Item::False);
        }
        let cond = self.make_item(&v.with(args[0].clone()));
        let then = self.branch(v, &args[1]);
        let otherwise = self.branch(v, &args[2]);
        self.intern(Item::IfThenElse {
            cond,
            then,
            otherwise,
        })
    }

    /// A `matchIf` branch; `_` means there is none.
    fn branch(&mut self, v: &Value, e: &Expr) -> Option<Handle> {
        match e {
            Expr::Top => None,
            e => Some(self.make_item(&v.with(e.clone()))),
        }
    }

    // -----------------------------------------------------------------------
    // Structs and lists
    // -----------------------------------------------------------------------

    fn make_struct(&mut self, v: &Value, s: &StructLit) -> Handle {
        let mut elems = vec![self.type_item(Kind::STRUCT)];
        let props = self.make_properties(v, s);
        if !props.is_empty() {
            elems.push(self.intern(Item::Properties(props)));
        }
        for e in &s.embeds {
            elems.push(self.make_item(&v.with(e.clone())));
        }
        self.all_of(elems)
    }

    fn make_properties(&mut self, v: &Value, s: &StructLit) -> Properties {
        let mut props = Properties::default();

        for f in s.regular_fields() {
            let Selector::Field(name) = &f.label.0 else {
                continue;
            };
            let fv = v.field(f);
            // A regular field with a concrete value may be omitted: it can
            // only ever have that value.
            let required = match f.constraint {
                Constraint::Optional => false,
                Constraint::Required => true,
                Constraint::Regular => !fv.is_concrete(),
            };
            if required && !props.required.contains(name) {
                props.required.push(name.clone());
            }
            let item = self.at(f.label.0.clone(), |g| g.make_item(&fv));
            let item = match props.properties.remove(name) {
                Some(prev) => self.all_of(vec![prev, item]),
                None => item,
            };
            props.properties.insert(name.clone(), item);
        }

        let declared = declared_fields_pattern(s);
        let mut catch_alls: Vec<(Vec<String>, &PatternField)> = Vec::new();
        for p in &s.patterns {
            match classify_pattern(&p.pattern) {
                PatternLabel::Match { re, excluded }
                    if excluded.iter().all(|x| Some(x) == declared.as_ref()) =>
                {
                    let item = self.make_item(&v.with(p.value.clone()));
                    let item = match props.pattern_properties.remove(&re) {
                        Some(prev) => self.all_of(vec![prev, item]),
                        None => item,
                    };
                    props.pattern_properties.insert(re, item);
                }
                PatternLabel::Exclude(excluded) => catch_alls.push((excluded, p)),
                _ => {
                    tracing::warn!(path = %self.path, "unsupported pattern label, constraint dropped");
                }
            }
        }

        // A pattern excluding exactly the declared fields and the other
        // patterns applies to everything else.
        let mut covered: Vec<String> = props.pattern_properties.keys().cloned().collect();
        covered.extend(declared);
        covered.sort();
        for (mut excluded, p) in catch_alls {
            excluded.sort();
            if !excluded.is_empty() && excluded != covered {
                tracing::warn!(path = %self.path, "pattern constraint does not match additionalProperties, dropped");
                continue;
            }
            let item = self.make_item(&v.with(p.value.clone()));
            props.additional = Some(match props.additional.take() {
                Some(prev) => self.all_of(vec![prev, item]),
                None => item,
            });
        }

        // A field constrained exactly as by a pattern it matches needs no
        // constraint of its own.
        if !props.pattern_properties.is_empty() {
            let patterns: Vec<(regex::Regex, Handle)> = props
                .pattern_properties
                .iter()
                .filter_map(|(re, it)| regex::Regex::new(re).ok().map(|re| (re, it.clone())))
                .collect();
            let any = self.intern(Item::True);
            for (name, item) in props.properties.iter_mut() {
                if patterns.iter().any(|(re, p)| *p == *item && re.is_match(name)) {
                    *item = any.clone();
                }
            }
        }

        if props.additional.is_none() {
            let (closed, implicit) = v.closedness(s);
            if closed && !(self.cfg.explicit_open && implicit) {
                props.additional = Some(self.intern(Item::False));
            } else if s.openness == Openness::ExplicitlyOpen && self.cfg.explicit_open {
                props.additional = Some(self.intern(Item::True));
            }
        }
        props
    }

    fn make_list(&mut self, v: &Value, l: &ListLit) -> Handle {
        let prefix: Vec<Handle> = l
            .elems
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let ev = v.with(e.clone());
                self.at(Selector::Index(i), |g| g.make_item(&ev))
            })
            .collect();
        let n = prefix.len() as u64;
        let rest = match &l.rest {
            None => Some(self.intern(Item::False)),
            Some(r) => {
                let rest = self.make_item(&v.with(r.as_ref().clone()));
                (!matches!(rest.item(), Item::True)).then_some(rest)
            }
        };

        let mut elems = vec![self.type_item(Kind::LIST)];
        let closed = l.rest.is_none();
        if !prefix.is_empty() || rest.is_some() {
            elems.push(self.intern(Item::Items { prefix, rest }));
        }
        if n > 0 {
            elems.push(self.intern(Item::ItemsBounds {
                limit: Limit::Min,
                n,
            }));
        }
        if closed {
            elems.push(self.intern(Item::ItemsBounds {
                limit: Limit::Max,
                n,
            }));
        }
        self.all_of(elems)
    }
}

// ---------------------------------------------------------------------------
// Pattern labels
// ---------------------------------------------------------------------------

enum PatternLabel {
    /// `[=~"re" & !~"x" ...]`.
    Match { re: String, excluded: Vec<String> },
    /// `[string]`, `_`, or `[!~"x" & !~"y" ...]`. Empty means any name.
    Exclude(Vec<String>),
    Unsupported,
}

fn classify_pattern(e: &Expr) -> PatternLabel {
    let parts = match e {
        Expr::And(xs) => xs.as_slice(),
        e => std::slice::from_ref(e),
    };
    let mut matched = None;
    let mut excluded = Vec::new();
    for part in parts {
        match part {
            Expr::Top => {}
            Expr::Kind(k) if *k == Kind::STRING => {}
            Expr::Unary { op, arg } => {
                let Expr::Lit(Json::String(re)) = arg.as_ref() else {
                    return PatternLabel::Unsupported;
                };
                match op {
                    Op::Match if matched.is_none() => matched = Some(re.clone()),
                    Op::NotMatch => excluded.push(re.clone()),
                    _ => return PatternLabel::Unsupported,
                }
            }
            _ => return PatternLabel::Unsupported,
        }
    }
    match matched {
        Some(re) => PatternLabel::Match { re, excluded },
        None => PatternLabel::Exclude(excluded),
    }
}

/// `^(a|b)$` over the regular field names of `s`, as written by extraction
/// to keep pattern constraints off declared fields.
fn declared_fields_pattern(s: &StructLit) -> Option<String> {
    let names: Vec<String> = s
        .regular_fields()
        .filter_map(|f| f.label.0.field_name().map(regex::escape))
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(format!("^({})$", names.join("|")))
}

/// The `(min, max)` range of a count constraint such as `>=2 & <=4`.
fn count_range(e: &Expr) -> Option<(Option<u64>, Option<u64>)> {
    let parts = match e {
        Expr::And(xs) => xs.as_slice(),
        e => std::slice::from_ref(e),
    };
    let (mut min, mut max) = (None, None);
    for part in parts {
        match part {
            Expr::Lit(j) => {
                let n = j.as_u64()?;
                min = Some(n);
                max = Some(n);
            }
            Expr::Unary { op, arg } => {
                let Expr::Lit(j) = arg.as_ref() else {
                    return None;
                };
                let n = j.as_u64()?;
                match op {
                    Op::Ge => min = Some(n),
                    Op::Gt => min = Some(n.checked_add(1)?),
                    Op::Le => max = Some(n),
                    Op::Lt => max = Some(n.checked_sub(1)?),
                    _ => return None,
                }
            }
            _ => return None,
        }
    }
    Some((min, max))
}

fn is_at_least_one(e: &Expr) -> bool {
    matches!(e, Expr::Unary { op: Op::Ge, arg } if matches!(arg.as_ref(), Expr::Lit(j) if j.as_u64() == Some(1)))
}

// ===========================================================================
// Tests
// ===========================================================================
