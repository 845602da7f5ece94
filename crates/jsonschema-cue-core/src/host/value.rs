use std::sync::Arc;

use serde_json::{Map, Value as Json};

use super::{Expr, Field, HostError, Op, Openness, Package, StructLit};
use crate::kind::Kind;
use crate::path::{Path, Selector};

/// Bound on reference chains and kind inference through references.
const MAX_DEPTH: usize = 64;

/// A position in a [`Package`]: an expression plus the context needed to
/// interpret it.
#[derive(Debug, Clone)]
pub struct Value {
    pkg: Arc<Package>,
    expr: Expr,
    /// Inside a definition, where structs without `...` are closed.
    in_def: bool,
}

impl Value {
    /// The root value of `pkg`.
    pub fn new(pkg: Package) -> Value {
        let expr = pkg.root.clone();
        Value {
            pkg: Arc::new(pkg),
            expr,
            in_def: false,
        }
    }

    /// A package holding just `expr`.
    pub fn from_expr(expr: Expr) -> Value {
        Value::new(Package::new(expr))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn package(&self) -> &Package {
        &self.pkg
    }

    /// A value for `expr` in the same context.
    pub fn with(&self, expr: Expr) -> Value {
        Value {
            pkg: Arc::clone(&self.pkg),
            expr,
            in_def: self.in_def,
        }
    }

    /// The value of a field of this struct.
    pub fn field(&self, field: &Field) -> Value {
        let mut v = self.with(field.value.clone());
        v.in_def |= field.label.0.is_definition();
        v
    }

    /// The referenced path, if this value is a reference.
    pub fn reference_path(&self) -> Option<&Path> {
        match &self.expr {
            Expr::Ref(p) => Some(p),
            _ => None,
        }
    }

    /// The value a reference points to, one step only. Non-references are
    /// returned as is.
    pub fn resolve(&self) -> Result<Value, HostError> {
        let Expr::Ref(path) = &self.expr else {
            return Ok(self.clone());
        };
        let target = self
            .pkg
            .lookup(path)
            .ok_or_else(|| HostError::UndefinedReference(path.clone()))?;
        Ok(Value {
            pkg: Arc::clone(&self.pkg),
            expr: target.clone(),
            in_def: self.in_def || path.selectors().iter().any(Selector::is_definition),
        })
    }

    /// Follows references until a non-reference expression is reached.
    pub fn deref(&self) -> Result<Value, HostError> {
        let mut v = self.clone();
        for _ in 0..MAX_DEPTH {
            if v.reference_path().is_none() {
                return Ok(v);
            }
            v = v.resolve()?;
        }
        match &v.expr {
            Expr::Ref(p) => Err(HostError::ReferenceCycle(p.clone())),
            _ => Ok(v),
        }
    }

    /// The value with namespace structs (embeddings plus definitions only)
    /// replaced by their embeddings.
    pub fn normalized(&self) -> Value {
        match &self.expr {
            Expr::Struct(s) if s.is_namespace() => {
                let mut embeds = s.embeds.clone();
                if embeds.len() == 1 {
                    self.with(embeds.remove(0)).normalized()
                } else {
                    self.with(Expr::And(embeds))
                }
            }
            _ => self.clone(),
        }
    }

    /// Whether this struct value is closed, and whether that closedness
    /// comes only from being inside a definition.
    pub fn closedness(&self, s: &StructLit) -> (bool, bool) {
        match s.openness {
            Openness::Closed => (true, false),
            Openness::ExplicitlyOpen => (false, false),
            Openness::Open => (self.in_def, self.in_def),
        }
    }

    // -----------------------------------------------------------------------
    // Kinds
    // -----------------------------------------------------------------------

    /// The set of kinds this value may take.
    pub fn kind(&self) -> Kind {
        self.kind_at(&self.expr, 0)
    }

    fn kind_at(&self, expr: &Expr, depth: usize) -> Kind {
        if depth > MAX_DEPTH {
            return Kind::TOP;
        }
        match expr {
            Expr::Top => Kind::TOP,
            Expr::Bottom => Kind::BOTTOM,
            Expr::Kind(k) => *k,
            Expr::Lit(j) => Kind::of_json(j),
            Expr::Unary { op, arg } => match op {
                Op::Match | Op::NotMatch => Kind::STRING,
                Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                    if matches!(arg.as_ref(), Expr::Lit(Json::String(_))) {
                        Kind::STRING
                    } else {
                        Kind::NUMBER
                    }
                }
                Op::Eq => self.kind_at(arg, depth + 1),
                Op::Ne => Kind::TOP,
            },
            Expr::And(xs) => xs
                .iter()
                .fold(Kind::TOP, |k, x| k & self.kind_at(x, depth + 1)),
            Expr::Or(xs) => xs
                .iter()
                .fold(Kind::BOTTOM, |k, x| k | self.kind_at(x, depth + 1)),
            Expr::Call { func, args } => call_kind(func, args, |e| self.kind_at(e, depth + 1)),
            Expr::Struct(s) if s.is_namespace() => s
                .embeds
                .iter()
                .fold(Kind::TOP, |k, x| k & self.kind_at(x, depth + 1)),
            Expr::Struct(s) => s
                .embeds
                .iter()
                .fold(Kind::STRUCT, |k, x| k & self.kind_at(x, depth + 1)),
            Expr::List(_) => Kind::LIST,
            Expr::Ref(path) => match self.pkg.lookup(path) {
                Some(target) => self.kind_at(target, depth + 1),
                None => Kind::BOTTOM,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Concreteness
    // -----------------------------------------------------------------------

    /// Whether the value is a single fully specified value.
    pub fn is_concrete(&self) -> bool {
        self.concrete_json().is_some()
    }

    /// The JSON form of a concrete value.
    pub fn concrete_json(&self) -> Option<Json> {
        self.concrete_at(&self.expr, 0)
    }

    fn concrete_at(&self, expr: &Expr, depth: usize) -> Option<Json> {
        if depth > MAX_DEPTH {
            return None;
        }
        match expr {
            Expr::Lit(j) => Some(j.clone()),
            Expr::Unary { op: Op::Eq, arg } => self.concrete_at(arg, depth + 1),
            Expr::And(xs) => xs.iter().find_map(|x| self.concrete_at(x, depth + 1)),
            Expr::Ref(path) => self
                .pkg
                .lookup(path)
                .and_then(|t| self.concrete_at(t, depth + 1)),
            Expr::List(l) if l.rest.is_none() => l
                .elems
                .iter()
                .map(|e| self.concrete_at(e, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(Json::Array),
            Expr::Struct(s) if s.is_namespace() => match s.embeds.as_slice() {
                [e] => self.concrete_at(e, depth + 1),
                _ => None,
            },
            Expr::Struct(s) if s.embeds.is_empty() => {
                let mut obj = Map::new();
                for f in s.regular_fields() {
                    if f.constraint != super::Constraint::Regular {
                        // Optional fields may be absent; required ones
                        // are not yet given.
                        if f.constraint == super::Constraint::Required {
                            return None;
                        }
                        continue;
                    }
                    let Selector::Field(name) = &f.label.0 else {
                        continue;
                    };
                    obj.insert(name.clone(), self.concrete_at(&f.value, depth + 1)?);
                }
                Some(Json::Object(obj))
            }
            Expr::Call { func, args } if func == "close" && args.len() == 1 => {
                self.concrete_at(&args[0], depth + 1)
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks that the value is not bottom and that every reference inside
    /// it resolves.
    pub fn validate(&self) -> Result<(), HostError> {
        let root = self.deref()?;
        if matches!(root.normalized().expr, Expr::Bottom) {
            return Err(HostError::Bottom("top-level value is bottom".to_string()));
        }
        let mut result = Ok(());
        walk(&self.expr, &mut |e| {
            if let Expr::Ref(path) = e {
                if result.is_ok() && self.pkg.lookup(path).is_none() {
                    result = Err(HostError::UndefinedReference(path.clone()));
                }
            }
        });
        result
    }
}

/// Result kind of a builtin call.
fn call_kind(func: &str, args: &[Expr], kind_of: impl Fn(&Expr) -> Kind) -> Kind {
    match func {
        "error" => Kind::BOTTOM,
        "close" => args.first().map_or(Kind::STRUCT, kind_of),
        "math.MultipleOf" => Kind::NUMBER,
        "matchN" | "matchIf" => Kind::TOP,
        f if f.starts_with("strings.")
            || f.starts_with("time.")
            || f.starts_with("net.")
            || f.starts_with("regexp.") =>
        {
            Kind::STRING
        }
        f if f.starts_with("list.") => Kind::LIST,
        f if f.starts_with("struct.") => Kind::STRUCT,
        _ => Kind::TOP,
    }
}

fn walk(expr: &Expr, f: &mut dyn FnMut(&Expr)) {
    f(expr);
    match expr {
        Expr::Unary { arg, .. } => walk(arg, f),
        Expr::And(xs) | Expr::Or(xs) | Expr::Call { args: xs, .. } => {
            for x in xs {
                walk(x, f);
            }
        }
        Expr::Struct(s) => {
            for field in &s.fields {
                walk(&field.value, f);
            }
            for p in &s.patterns {
                walk(&p.pattern, f);
                walk(&p.value, f);
            }
            for e in &s.embeds {
                walk(e, f);
            }
        }
        Expr::List(l) => {
            for e in &l.elems {
                walk(e, f);
            }
            if let Some(rest) = &l.rest {
                walk(rest, f);
            }
        }
        Expr::Top | Expr::Bottom | Expr::Kind(_) | Expr::Lit(_) | Expr::Ref(_) => {}
    }
}

// ===========================================================================
// Tests
// ===========================================================================
