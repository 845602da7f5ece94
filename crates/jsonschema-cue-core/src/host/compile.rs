//! Loading extracted syntax as host values.
//!
//! Identifiers naming definitions and hidden fields resolve lexically to
//! the nearest enclosing struct that declares them. Every other identifier
//! is predeclared (`string`, `int32`, `_`, ...). Builtin package members
//! become [`Expr::Call`]s by qualified name. Imports of anything other than
//! the builtin packages are rejected, since their contents are unknown.

use serde_json::Value as Json;

use super::{Constraint, Expr, Field, HostError, Label, ListLit, Op, Openness, Package, PatternField, StructLit};
use crate::ast;
use crate::kind::Kind;
use crate::path::{Path, Selector};

const BUILTIN_PACKAGES: &[&str] = &["list", "math", "net", "regexp", "strings", "struct", "time"];

/// Compiles an extracted file into a package.
pub fn compile(file: &ast::File) -> Result<Package, HostError> {
    let mut c = Compiler { scopes: Vec::new() };
    let root = c.struct_lit(&file.decls, Some(Path::root()))?;
    Ok(Package::new(root))
}

struct Scope {
    /// Absolute path of the struct, when it sits at a field path.
    path: Option<Path>,
    labels: Vec<Selector>,
}

struct Compiler {
    scopes: Vec<Scope>,
}

fn unsupported(what: impl Into<String>, message: impl Into<String>) -> HostError {
    HostError::Unsupported {
        what: what.into(),
        message: message.into(),
    }
}

impl Compiler {
    fn struct_lit(&mut self, decls: &[ast::Decl], path: Option<Path>) -> Result<Expr, HostError> {
        let labels = decls
            .iter()
            .filter_map(|d| match d {
                ast::Decl::Field(f) => f.label.selector(),
                _ => None,
            })
            .filter(|sel| !matches!(sel, Selector::Field(_)))
            .collect();
        self.scopes.push(Scope {
            path: path.clone(),
            labels,
        });
        let result = self.struct_body(decls, path.as_ref());
        self.scopes.pop();
        result
    }

    fn struct_body(&mut self, decls: &[ast::Decl], path: Option<&Path>) -> Result<Expr, HostError> {
        let mut s = StructLit::default();
        for decl in decls {
            match decl {
                ast::Decl::Field(f) => match &f.label {
                    ast::Label::Pattern(p) => {
                        let pattern = self.expr(p, None)?;
                        let value = self.expr(&f.value, None)?;
                        s.patterns.push(PatternField { pattern, value });
                    }
                    label => {
                        let Some(sel) = label.selector() else {
                            continue;
                        };
                        let child = path.map(|p| p.child(sel.clone()));
                        let value = self.expr(&f.value, child)?;
                        s.fields.push(Field {
                            label: Label(sel),
                            constraint: match f.constraint {
                                ast::Constraint::Regular => Constraint::Regular,
                                ast::Constraint::Optional => Constraint::Optional,
                                ast::Constraint::Required => Constraint::Required,
                            },
                            value,
                        });
                    }
                },
                ast::Decl::Embed(e) => match self.expr(e, path.cloned())? {
                    // Embedded struct literals contribute their fields.
                    Expr::Struct(inner) if inner.openness == Openness::Open => {
                        s.fields.extend(inner.fields);
                        s.patterns.extend(inner.patterns);
                        s.embeds.extend(inner.embeds);
                    }
                    other => s.embeds.push(other),
                },
                ast::Decl::Ellipsis => s.openness = Openness::ExplicitlyOpen,
                ast::Decl::Attribute(_) => {}
            }
        }
        Ok(Expr::Struct(s))
    }

    fn expr(&mut self, e: &ast::Expr, path: Option<Path>) -> Result<Expr, HostError> {
        Ok(match e {
            ast::Expr::Ident(id) => self.ident(id)?,
            ast::Expr::Lit(lit) => Expr::Lit(match lit {
                ast::Lit::Null => Json::Null,
                ast::Lit::Bool(b) => Json::Bool(*b),
                ast::Lit::Number(n) => Json::Number(n.clone()),
                ast::Lit::String(s) => Json::String(s.clone()),
            }),
            ast::Expr::Struct(s) => self.struct_lit(&s.elems, path)?,
            ast::Expr::List(l) => Expr::List(ListLit {
                elems: l
                    .elems
                    .iter()
                    .map(|x| self.expr(x, None))
                    .collect::<Result<_, _>>()?,
                rest: match &l.rest {
                    Some(r) => Some(Box::new(self.expr(r, None)?)),
                    None => None,
                },
            }),
            ast::Expr::Unary(op, x) => self.unary(*op, x)?,
            ast::Expr::Binary(op, x, y) => {
                let mut elems = Vec::new();
                self.flatten(*op, x, &mut elems, &path)?;
                self.flatten(*op, y, &mut elems, &path)?;
                match op {
                    ast::BinaryOp::And => Expr::And(elems),
                    ast::BinaryOp::Or => Expr::Or(elems),
                }
            }
            ast::Expr::Call(func, args) => self.call(func, args, path)?,
            ast::Expr::Selector(x, label) => {
                if let Some(pkg) = builtin_package(x)? {
                    let ast::Label::Ident(name) = label else {
                        return Err(unsupported(e.to_string(), "invalid package member"));
                    };
                    return Ok(Expr::Call {
                        func: format!("{pkg}.{name}"),
                        args: Vec::new(),
                    });
                }
                let Some(sel) = label.selector() else {
                    return Err(unsupported(e.to_string(), "pattern selector"));
                };
                match self.expr(x, None)? {
                    Expr::Ref(p) => Expr::Ref(p.child(sel)),
                    _ => return Err(unsupported(e.to_string(), "selector on non-reference")),
                }
            }
            ast::Expr::Index(x, i) => match self.expr(x, None)? {
                Expr::Ref(p) => Expr::Ref(p.child(Selector::Index(*i))),
                _ => return Err(unsupported(e.to_string(), "index on non-reference")),
            },
            ast::Expr::Bad(msg) => return Err(unsupported("bad expression", msg.clone())),
        })
    }

    fn flatten(
        &mut self,
        op: ast::BinaryOp,
        e: &ast::Expr,
        out: &mut Vec<Expr>,
        path: &Option<Path>,
    ) -> Result<(), HostError> {
        match e {
            ast::Expr::Binary(op2, x, y) if *op2 == op => {
                self.flatten(op, x, out, path)?;
                self.flatten(op, y, out, path)
            }
            e => {
                out.push(self.expr(e, path.clone())?);
                Ok(())
            }
        }
    }

    fn unary(&mut self, op: ast::UnaryOp, x: &ast::Expr) -> Result<Expr, HostError> {
        let arg = self.expr(x, None)?;
        let op = match op {
            ast::UnaryOp::Neg => {
                return match arg {
                    Expr::Lit(Json::Number(n)) => negate(&n)
                        .map(Expr::Lit)
                        .ok_or_else(|| unsupported(format!("-{n}"), "number out of range")),
                    _ => Err(unsupported(format!("-{x}"), "negation of non-literal")),
                };
            }
            ast::UnaryOp::Not => return Err(unsupported(format!("!{x}"), "boolean negation")),
            ast::UnaryOp::Lt => Op::Lt,
            ast::UnaryOp::Le => Op::Le,
            ast::UnaryOp::Gt => Op::Gt,
            ast::UnaryOp::Ge => Op::Ge,
            ast::UnaryOp::Eq => Op::Eq,
            ast::UnaryOp::Ne => Op::Ne,
            ast::UnaryOp::Match => Op::Match,
            ast::UnaryOp::NotMatch => Op::NotMatch,
        };
        Ok(Expr::Unary {
            op,
            arg: Box::new(arg),
        })
    }

    fn call(&mut self, func: &ast::Expr, args: &[ast::Expr], path: Option<Path>) -> Result<Expr, HostError> {
        let name = match func {
            ast::Expr::Selector(x, ast::Label::Ident(member)) => match builtin_package(x)? {
                Some(pkg) => format!("{pkg}.{member}"),
                None => return Err(unsupported(func.to_string(), "call of non-builtin")),
            },
            ast::Expr::Ident(id) if id.import.is_none() => id.name.clone(),
            _ => return Err(unsupported(func.to_string(), "call of non-builtin")),
        };
        match name.as_str() {
            "error" => return Ok(Expr::Bottom),
            "close" if args.len() == 1 => {
                return match self.expr(&args[0], path)? {
                    Expr::Struct(mut s) => {
                        s.openness = Openness::Closed;
                        Ok(Expr::Struct(s))
                    }
                    other => Ok(Expr::Call {
                        func: name,
                        args: vec![other],
                    }),
                };
            }
            _ => {}
        }
        let args = args
            .iter()
            .map(|a| self.expr(a, None))
            .collect::<Result<_, _>>()?;
        Ok(Expr::Call { func: name, args })
    }

    fn ident(&self, id: &ast::Ident) -> Result<Expr, HostError> {
        if let Some(import) = &id.import {
            return Err(HostError::UnsupportedImport(import.clone()));
        }
        let name = id.name.as_str();
        if name != "_" && (name.starts_with('#') || name.starts_with('_')) {
            let sel = Selector::from_ident(name);
            for scope in self.scopes.iter().rev() {
                if scope.labels.contains(&sel) {
                    return match &scope.path {
                        Some(p) => Ok(Expr::Ref(p.child(sel))),
                        None => Err(unsupported(name, "reference into anonymous struct")),
                    };
                }
            }
            return Err(unsupported(name, "undefined identifier"));
        }
        predeclared(name).ok_or_else(|| unsupported(name, "unknown identifier"))
    }
}

/// The builtin package a qualifier refers to, if `x` is a qualifier.
fn builtin_package(x: &ast::Expr) -> Result<Option<&str>, HostError> {
    match x {
        ast::Expr::Ident(ast::Ident {
            import: Some(path), ..
        }) => {
            if BUILTIN_PACKAGES.contains(&path.as_str()) {
                Ok(Some(path.as_str()))
            } else {
                Err(HostError::UnsupportedImport(path.clone()))
            }
        }
        _ => Ok(None),
    }
}

fn bounded_int(min: Json, max: Option<Json>) -> Expr {
    let mut elems = vec![
        Expr::Kind(Kind::INT),
        Expr::Unary {
            op: Op::Ge,
            arg: Box::new(Expr::Lit(min)),
        },
    ];
    if let Some(max) = max {
        elems.push(Expr::Unary {
            op: Op::Le,
            arg: Box::new(Expr::Lit(max)),
        });
    }
    Expr::And(elems)
}

fn predeclared(name: &str) -> Option<Expr> {
    Some(match name {
        "_" => Expr::Top,
        "null" => Expr::Lit(Json::Null),
        "bool" => Expr::Kind(Kind::BOOL),
        "string" | "bytes" => Expr::Kind(Kind::STRING),
        "int" => Expr::Kind(Kind::INT),
        "float" => Expr::Kind(Kind::FLOAT),
        "number" => Expr::Kind(Kind::NUMBER),
        "int8" => bounded_int(i8::MIN.into(), Some(i8::MAX.into())),
        "int16" => bounded_int(i16::MIN.into(), Some(i16::MAX.into())),
        "int32" => bounded_int(i32::MIN.into(), Some(i32::MAX.into())),
        "int64" => bounded_int(i64::MIN.into(), Some(i64::MAX.into())),
        "uint" => bounded_int(0.into(), None),
        "uint8" => bounded_int(0.into(), Some(u8::MAX.into())),
        "uint16" => bounded_int(0.into(), Some(u16::MAX.into())),
        "uint32" => bounded_int(0.into(), Some(u32::MAX.into())),
        "uint64" => bounded_int(0.into(), Some(u64::MAX.into())),
        _ => return None,
    })
}

fn negate(n: &serde_json::Number) -> Option<Json> {
    if let Some(i) = n.as_i64() {
        return i.checked_neg().map(Json::from);
    }
    if n.as_u64() == Some(1u64 << 63) {
        return Some(Json::from(i64::MIN));
    }
    serde_json::Number::from_f64(-n.as_f64()?).map(Json::Number)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, Field as AstField, Label as AstLabel, UnaryOp};
    use serde_json::json;

    fn file(decls: Vec<Decl>) -> ast::File {
        ast::File {
            decls,
            ..ast::File::default()
        }
    }

    #[test]
    fn test_compile_definition_reference() {
        let f = file(vec![
            Decl::Embed(ast::Expr::ident("#foo")),
            Decl::Field(AstField::new(AstLabel::Ident("#foo".into()), ast::Expr::ident("int"))),
        ]);
        let pkg = compile(&f).unwrap();
        let Expr::Struct(s) = &pkg.root else {
            panic!("expected struct");
        };
        assert_eq!(s.embeds, vec![Expr::Ref("#foo".parse().unwrap())]);
        assert!(s.is_namespace());
    }

    #[test]
    fn test_compile_builtins_and_bounds() {
        let e = ast::Expr::binary(
            ast::BinaryOp::And,
            ast::Expr::call("strings", "MinRunes", vec![ast::Expr::int(2)]),
            ast::Expr::unary(UnaryOp::Match, ast::Expr::string("^a")),
        );
        let f = file(vec![Decl::Embed(e)]);
        let pkg = compile(&f).unwrap();
        let Expr::Struct(s) = &pkg.root else {
            panic!("expected struct");
        };
        assert_eq!(
            s.embeds[0],
            Expr::And(vec![
                Expr::Call {
                    func: "strings.MinRunes".into(),
                    args: vec![Expr::Lit(json!(2))]
                },
                Expr::Unary {
                    op: Op::Match,
                    arg: Box::new(Expr::Lit(json!("^a")))
                },
            ])
        );
    }

    #[test]
    fn test_compile_close_and_ellipsis() {
        let closed = ast::Expr::builtin(
            "close",
            vec![ast::Expr::struct_lit(vec![Decl::Field(
                AstField::new(AstLabel::name("a"), ast::Expr::ident("string")).required(),
            )])],
        );
        let open = ast::Expr::struct_lit(vec![Decl::Ellipsis]);
        let f = file(vec![
            Decl::Field(AstField::new(AstLabel::name("x"), closed)),
            Decl::Field(AstField::new(AstLabel::name("y"), open)),
        ]);
        let pkg = compile(&f).unwrap();
        let x = pkg.lookup(&"x".parse().unwrap()).unwrap();
        let y = pkg.lookup(&"y".parse().unwrap()).unwrap();
        assert!(matches!(x, Expr::Struct(s) if s.openness == Openness::Closed));
        assert!(matches!(y, Expr::Struct(s) if s.openness == Openness::ExplicitlyOpen));
    }

    #[test]
    fn test_compile_predeclared_int32() {
        let f = file(vec![Decl::Embed(ast::Expr::ident("int32"))]);
        let pkg = compile(&f).unwrap();
        let Expr::Struct(s) = &pkg.root else {
            panic!("expected struct");
        };
        assert!(matches!(&s.embeds[0], Expr::And(xs) if xs.len() == 3));
    }

    #[test]
    fn test_compile_rejects_external_import() {
        let e = ast::Expr::Selector(
            Box::new(ast::Expr::package("foo", "example.com/foo")),
            AstLabel::Ident("#Bar".into()),
        );
        let err = compile(&file(vec![Decl::Embed(e)])).unwrap_err();
        assert_eq!(err, HostError::UnsupportedImport("example.com/foo".into()));
    }

    #[test]
    fn test_compile_nested_definition_scope() {
        // #a: { #b: int, x: #b }
        let inner = ast::Expr::struct_lit(vec![
            Decl::Field(AstField::new(AstLabel::Ident("#b".into()), ast::Expr::ident("int"))),
            Decl::Field(AstField::new(AstLabel::name("x"), ast::Expr::ident("#b"))),
        ]);
        let f = file(vec![Decl::Field(AstField::new(AstLabel::Ident("#a".into()), inner))]);
        let pkg = compile(&f).unwrap();
        assert_eq!(
            pkg.lookup(&"#a.x".parse().unwrap()),
            Some(&Expr::Ref("#a.#b".parse().unwrap()))
        );
    }

    #[test]
    fn test_negative_literal() {
        let f = file(vec![Decl::Embed(ast::Expr::unary(UnaryOp::Neg, ast::Expr::int(3)))]);
        let pkg = compile(&f).unwrap();
        let Expr::Struct(s) = &pkg.root else {
            panic!("expected struct");
        };
        assert_eq!(s.embeds[0], Expr::Lit(json!(-3)));
    }
}
