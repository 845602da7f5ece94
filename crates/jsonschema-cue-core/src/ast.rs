//! Syntax tree for type-language output.
//!
//! The decoder builds these nodes directly; [`crate::printer`] renders them
//! as text and [`crate::host::compile`] loads them back as host values.
//! Constructors mirror the shapes the decoder emits, so most call sites read
//! like the text they produce (`Expr::call("strings", "MinRunes", ...)`).

use std::collections::BTreeMap;

use serde_json::Number;

use crate::path::{is_def_or_hidden, is_valid_ident, Selector};

// ---------------------------------------------------------------------------
// File and declarations
// ---------------------------------------------------------------------------

/// A complete output file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    /// Comment printed above everything else.
    pub doc: Option<String>,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Import {
    pub path: String,
    /// Set when the default qualifier clashes with another import.
    pub alias: Option<String>,
}

/// An attribute such as `@jsonschema(id="x")`. `body` is the raw text
/// between the parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub body: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn deprecated() -> Self {
        Self::new("deprecated", "")
    }

    /// `@jsonschema(key="value")`.
    pub fn jsonschema(key: &str, value: &str) -> Self {
        Self::new("jsonschema", format!("{key}={}", crate::path::quote(value)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Field(Field),
    /// An embedded expression.
    Embed(Expr),
    /// `...` marking an explicitly open struct.
    Ellipsis,
    Attribute(Attribute),
}

/// Field constraint marker: none, `?` or `!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Constraint {
    #[default]
    Regular,
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Label,
    pub constraint: Constraint,
    pub value: Expr,
    pub attrs: Vec<Attribute>,
    pub doc: Option<String>,
}

impl Field {
    pub fn new(label: Label, value: Expr) -> Self {
        Self {
            label,
            constraint: Constraint::Regular,
            value,
            attrs: Vec::new(),
            doc: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.constraint = Constraint::Optional;
        self
    }

    pub fn required(mut self) -> Self {
        self.constraint = Constraint::Required;
        self
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc.filter(|d| !d.is_empty());
        self
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// A bare identifier: `foo`, `#Foo`, `_hidden`.
    Ident(String),
    /// A quoted name: `"foo-bar"`.
    String(String),
    /// A pattern constraint: `[=~"^x"]`.
    Pattern(Box<Expr>),
}

impl Label {
    /// Label for a regular field called `name`, quoted when needed.
    pub fn name(name: &str) -> Label {
        if is_valid_ident(name) && !is_def_or_hidden(name) {
            Label::Ident(name.to_string())
        } else {
            Label::String(name.to_string())
        }
    }

    /// Label for a regular field, always quoted.
    pub fn quoted(name: &str) -> Label {
        Label::String(name.to_string())
    }

    pub fn from_selector(sel: &Selector) -> Label {
        match (sel, sel.ident()) {
            (Selector::Field(name), _) => Label::name(name),
            (_, Some(ident)) => Label::Ident(ident),
            (sel, None) => Label::String(sel.to_string()),
        }
    }

    pub fn pattern(expr: Expr) -> Label {
        Label::Pattern(Box::new(expr))
    }

    /// The selector this label defines, if it is not a pattern.
    pub fn selector(&self) -> Option<Selector> {
        match self {
            Label::Ident(ident) => Some(Selector::from_ident(ident)),
            Label::String(name) => Some(Selector::Field(name.clone())),
            Label::Pattern(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Match,
    NotMatch,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Lt => "<",
            UnaryOp::Le => "<=",
            UnaryOp::Gt => ">",
            UnaryOp::Ge => ">=",
            UnaryOp::Eq => "==",
            UnaryOp::Ne => "!=",
            UnaryOp::Match => "=~",
            UnaryOp::NotMatch => "!~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    /// Import path for package qualifiers (`strings`, `example.com/foo`).
    pub import: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructLit {
    pub elems: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListLit {
    pub elems: Vec<Expr>,
    /// Element constraint of the open tail: `[a, ...T]`. `_` prints as `...`.
    pub rest: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Lit(Lit),
    Struct(StructLit),
    List(ListLit),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Selector(Box<Expr>, Label),
    Index(Box<Expr>, usize),
    /// Placeholder for an expression that could not be built; always
    /// accompanied by a diagnostic.
    Bad(String),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(Ident {
            name: name.into(),
            import: None,
        })
    }

    /// A package qualifier bound to `import_path`.
    pub fn package(name: impl Into<String>, import_path: impl Into<String>) -> Expr {
        Expr::Ident(Ident {
            name: name.into(),
            import: Some(import_path.into()),
        })
    }

    /// `_`.
    pub fn top() -> Expr {
        Expr::ident("_")
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Expr::Ident(Ident { name, import: None }) if name == "_")
    }

    pub fn null() -> Expr {
        Expr::Lit(Lit::Null)
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Lit(Lit::Bool(b))
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::Lit(Lit::String(s.into()))
    }

    pub fn number(n: Number) -> Expr {
        Expr::Lit(Lit::Number(n))
    }

    pub fn int(n: u64) -> Expr {
        Expr::Lit(Lit::Number(Number::from(n)))
    }

    /// `error("msg")`.
    pub fn error(msg: &str) -> Expr {
        Expr::Call(Box::new(Expr::ident("error")), vec![Expr::string(msg)])
    }

    pub fn unary(op: UnaryOp, x: Expr) -> Expr {
        Expr::Unary(op, Box::new(x))
    }

    pub fn binary(op: BinaryOp, x: Expr, y: Expr) -> Expr {
        Expr::Binary(op, Box::new(x), Box::new(y))
    }

    /// `pkg.Name(args...)` with `pkg` bound to the builtin package `pkg`.
    pub fn call(pkg: &str, name: &str, args: Vec<Expr>) -> Expr {
        let func = Expr::Selector(
            Box::new(Expr::package(pkg, pkg)),
            Label::Ident(name.to_string()),
        );
        Expr::Call(Box::new(func), args)
    }

    /// `name(args...)` for predeclared functions (`close`, `matchN`, ...).
    pub fn builtin(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call(Box::new(Expr::ident(name)), args)
    }

    /// `pkg.Name` with `pkg` bound to the builtin package `pkg`.
    pub fn pkg_ident(pkg: &str, name: &str) -> Expr {
        Expr::Selector(
            Box::new(Expr::package(pkg, pkg)),
            Label::Ident(name.to_string()),
        )
    }

    pub fn list(elems: Vec<Expr>) -> Expr {
        Expr::List(ListLit { elems, rest: None })
    }

    pub fn open_list(elems: Vec<Expr>, rest: Expr) -> Expr {
        Expr::List(ListLit {
            elems,
            rest: Some(Box::new(rest)),
        })
    }

    pub fn struct_lit(elems: Vec<Decl>) -> Expr {
        Expr::Struct(StructLit { elems })
    }

    /// Conjunction of `exprs`; `_` when empty.
    pub fn and_all(exprs: Vec<Expr>) -> Expr {
        Self::fold(BinaryOp::And, exprs).unwrap_or_else(Expr::top)
    }

    /// Disjunction of `exprs`; `None` when empty.
    pub fn or_all(exprs: Vec<Expr>) -> Option<Expr> {
        Self::fold(BinaryOp::Or, exprs)
    }

    fn fold(op: BinaryOp, exprs: Vec<Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(|x, y| Expr::binary(op, x, y))
    }

    /// Reference expression for `path`, starting from identifier `base`.
    pub fn path_ref(base: Expr, path: &[Selector]) -> Expr {
        path.iter().fold(base, |x, sel| match sel {
            Selector::Index(i) => Expr::Index(Box::new(x), *i),
            sel => Expr::Selector(Box::new(x), Label::from_selector(sel)),
        })
    }

    pub fn is_struct_lit(&self) -> bool {
        matches!(self, Expr::Struct(_))
    }

    pub fn is_list_lit(&self) -> bool {
        matches!(self, Expr::List(_))
    }

    /// Visits `self` and every sub-expression, depth first.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Struct(s) => s.walk(f),
            Expr::List(l) => {
                for e in &l.elems {
                    e.walk(f);
                }
                if let Some(rest) = &l.rest {
                    rest.walk(f);
                }
            }
            Expr::Unary(_, x) | Expr::Index(x, _) => x.walk(f),
            Expr::Selector(x, label) => {
                x.walk(f);
                if let Label::Pattern(p) = label {
                    p.walk(f);
                }
            }
            Expr::Binary(_, x, y) => {
                x.walk(f);
                y.walk(f);
            }
            Expr::Call(func, args) => {
                func.walk(f);
                for a in args {
                    a.walk(f);
                }
            }
            Expr::Ident(_) | Expr::Lit(_) | Expr::Bad(_) => {}
        }
    }

    fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        f(self);
        match self {
            Expr::Struct(s) => s.walk_mut(f),
            Expr::List(l) => {
                for e in &mut l.elems {
                    e.walk_mut(f);
                }
                if let Some(rest) = &mut l.rest {
                    rest.walk_mut(f);
                }
            }
            Expr::Unary(_, x) | Expr::Index(x, _) => x.walk_mut(f),
            Expr::Selector(x, label) => {
                x.walk_mut(f);
                if let Label::Pattern(p) = label {
                    p.walk_mut(f);
                }
            }
            Expr::Binary(_, x, y) => {
                x.walk_mut(f);
                y.walk_mut(f);
            }
            Expr::Call(func, args) => {
                func.walk_mut(f);
                for a in args {
                    a.walk_mut(f);
                }
            }
            Expr::Ident(_) | Expr::Lit(_) | Expr::Bad(_) => {}
        }
    }
}

impl StructLit {
    fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        for d in &self.elems {
            d.walk(f);
        }
    }

    fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        for d in &mut self.elems {
            d.walk_mut(f);
        }
    }
}

impl Decl {
    fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        match self {
            Decl::Field(field) => {
                if let Label::Pattern(p) = &field.label {
                    p.walk(f);
                }
                field.value.walk(f);
            }
            Decl::Embed(e) => e.walk(f),
            Decl::Ellipsis | Decl::Attribute(_) => {}
        }
    }

    fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        match self {
            Decl::Field(field) => {
                if let Label::Pattern(p) = &mut field.label {
                    p.walk_mut(f);
                }
                field.value.walk_mut(f);
            }
            Decl::Embed(e) => e.walk_mut(f),
            Decl::Ellipsis | Decl::Attribute(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

/// Default qualifier for an import path: the `:name` suffix if present,
/// otherwise the last path element with any major-version suffix removed.
pub fn import_qualifier(import_path: &str) -> String {
    if let Some((_, name)) = import_path.rsplit_once(':') {
        return name.to_string();
    }
    let last = import_path.rsplit('/').next().unwrap_or(import_path);
    let last = last.split('@').next().unwrap_or(last);
    last.to_string()
}

impl File {
    /// Collects the import paths used by package qualifiers into the import
    /// list, sorted, aliasing qualifiers that would otherwise clash.
    pub fn sanitize_imports(&mut self) {
        let mut paths: Vec<String> = Vec::new();
        for decl in &self.decls {
            decl.walk(&mut |e| {
                if let Expr::Ident(Ident {
                    import: Some(p), ..
                }) = e
                {
                    if !paths.contains(p) {
                        paths.push(p.clone());
                    }
                }
            });
        }
        paths.sort();

        let mut taken: BTreeMap<String, String> = BTreeMap::new();
        let mut renames: BTreeMap<String, String> = BTreeMap::new();
        let mut imports = Vec::with_capacity(paths.len());
        for path in paths {
            let base = import_qualifier(&path);
            let mut name = base.clone();
            let mut n = 1;
            while taken.contains_key(&name) {
                n += 1;
                name = format!("{base}_{n}");
            }
            taken.insert(name.clone(), path.clone());
            let alias = (name != base).then(|| name.clone());
            if alias.is_some() {
                renames.insert(path.clone(), name);
            }
            imports.push(Import { path, alias });
        }

        if !renames.is_empty() {
            for decl in &mut self.decls {
                decl.walk_mut(&mut |e| {
                    if let Expr::Ident(Ident {
                        name,
                        import: Some(p),
                    }) = e
                    {
                        if let Some(new) = renames.get(p.as_str()) {
                            *name = new.clone();
                        }
                    }
                });
            }
        }
        self.imports = imports;
    }

    /// The top-level field with the given selector, if any.
    pub fn field(&self, sel: &Selector) -> Option<&Field> {
        self.decls.iter().find_map(|d| match d {
            Decl::Field(f) if f.label.selector().as_ref() == Some(sel) => Some(f),
            _ => None,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
