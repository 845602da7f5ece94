//! Host data model: type-language values consumed by [`crate::generate`].
//!
//! A [`Package`] holds one root [`Expr`]. Expressions are already
//! decomposed: conjunctions and disjunctions are flat lists, builtin calls
//! carry their qualified name, and references are absolute [`Path`]s into
//! the package. [`Value`] is a cursor over a package that answers the
//! questions the generator asks (kind, concreteness, fields, referenced
//! path).
//!
//! Packages are either deserialized directly (the CLI `generate` input) or
//! compiled from an extracted [`crate::ast::File`] by [`compile`].

mod compile;
mod value;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::kind::Kind;
use crate::path::{Path, Selector};

pub use compile::compile;
pub use value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("reference to undefined path {0}")]
    UndefinedReference(Path),

    #[error("reference cycle through {0}")]
    ReferenceCycle(Path),

    #[error("reference to imported package {0:?} not supported")]
    UnsupportedImport(String),

    #[error("cannot compile {what}: {message}")]
    Unsupported { what: String, message: String },

    #[error("value is bottom: {0}")]
    Bottom(String),
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Comparison and match operators in unary (bound) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "=~")]
    Match,
    #[serde(rename = "!~")]
    NotMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// `_`: any value.
    Top,
    /// `_|_`: no value.
    Bottom,
    /// A predeclared type such as `string` or `int`.
    Kind(Kind),
    /// A concrete scalar.
    Lit(serde_json::Value),
    Unary { op: Op, arg: Box<Expr> },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// A builtin call or validator, by qualified name (`strings.MinRunes`,
    /// `matchN`, `time.Time`).
    Call {
        func: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Struct(StructLit),
    List(ListLit),
    /// A reference to the value at an absolute path in the package.
    Ref(Path),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Openness {
    /// Open by default; closed implicitly inside definitions.
    #[default]
    Open,
    /// Ends with `...`.
    ExplicitlyOpen,
    /// Wrapped in `close()`.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    #[default]
    Regular,
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub label: Label,
    #[serde(default)]
    pub constraint: Constraint,
    pub value: Expr,
}

/// A pattern constraint `[pattern]: value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternField {
    pub pattern: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructLit {
    pub fields: Vec<Field>,
    pub patterns: Vec<PatternField>,
    /// Embedded values unified with the struct.
    pub embeds: Vec<Expr>,
    pub openness: Openness,
}

impl StructLit {
    /// Regular (non-definition, non-hidden) fields.
    pub fn regular_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|f| matches!(f.label.0, Selector::Field(_)))
    }

    /// A struct that only embeds values and declares definitions or hidden
    /// fields evaluates to its embeddings.
    pub fn is_namespace(&self) -> bool {
        !self.embeds.is_empty()
            && self.regular_fields().next().is_none()
            && self.patterns.is_empty()
            && self.openness == Openness::Open
    }

    pub fn field(&self, sel: &Selector) -> Option<&Field> {
        self.fields.iter().find(|f| &f.label.0 == sel)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLit {
    pub elems: Vec<Expr>,
    /// Element constraint of the open tail, if the list is open.
    pub rest: Option<Box<Expr>>,
}

/// A field label. Serialized as text: a plain name is a regular field,
/// `#x`, `_x` and `_#x` are definitions and hidden fields, and a quoted
/// string is a regular field whose name starts with one of those.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub Selector);

impl Label {
    pub fn field(name: &str) -> Label {
        Label(Selector::Field(name.to_string()))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Selector::Field(name)
                if name.starts_with('#') || name.starts_with('_') || name.starts_with('"') =>
            {
                f.write_str(&crate::path::quote(name))
            }
            Selector::Field(name) => f.write_str(name),
            sel => write!(f, "{sel}"),
        }
    }
}

impl FromStr for Label {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('"') {
            let path: Path = s.parse().map_err(|e| HostError::Unsupported {
                what: format!("label {s}"),
                message: format!("{e}"),
            })?;
            return match path.selectors() {
                [sel @ Selector::Field(_)] => Ok(Label(sel.clone())),
                _ => Err(HostError::Unsupported {
                    what: format!("label {s}"),
                    message: "expected a single quoted name".to_string(),
                }),
            };
        }
        if s.starts_with('#') || s.starts_with('_') {
            return Ok(Label(Selector::from_ident(s)));
        }
        Ok(Label::field(s))
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// A compiled set of values. References inside resolve against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub root: Expr,
}

impl Package {
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    /// The expression at `path`, looking through embeddings and
    /// conjunctions.
    pub fn lookup(&self, path: &Path) -> Option<&Expr> {
        let mut expr = &self.root;
        for sel in path.selectors() {
            expr = lookup_selector(expr, sel)?;
        }
        Some(expr)
    }
}

fn lookup_selector<'a>(expr: &'a Expr, sel: &Selector) -> Option<&'a Expr> {
    match (expr, sel) {
        (Expr::Struct(s), sel) => s
            .field(sel)
            .map(|f| &f.value)
            .or_else(|| s.embeds.iter().find_map(|e| lookup_selector(e, sel))),
        (Expr::And(xs), sel) => xs.iter().find_map(|e| lookup_selector(e, sel)),
        (Expr::List(l), Selector::Index(i)) => l.elems.get(*i),
        _ => None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
