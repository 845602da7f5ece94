//! Deterministic text rendering of [`crate::ast`] trees.
//!
//! Output uses tab indentation, one declaration per line and `//` doc
//! comments. Positions and free-floating comments are not tracked, so the
//! layout is fixed by the tree alone.

use std::fmt::{self, Write};

use crate::ast::{Attribute, Constraint, Decl, Expr, Field, File, Label, Lit};
use crate::path::quote;

struct Printer<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
    indent: usize,
}

impl Printer<'_, '_> {
    fn newline(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        for _ in 0..self.indent {
            self.out.write_char('\t')?;
        }
        Ok(())
    }

    fn doc(&mut self, doc: &str) -> fmt::Result {
        for line in doc.lines() {
            if line.is_empty() {
                self.out.write_str("//")?;
            } else {
                write!(self.out, "// {line}")?;
            }
            self.newline()?;
        }
        Ok(())
    }

    fn attr(&mut self, attr: &Attribute) -> fmt::Result {
        write!(self.out, "@{}({})", attr.name, attr.body)
    }

    fn label(&mut self, label: &Label) -> fmt::Result {
        match label {
            Label::Ident(name) => self.out.write_str(name),
            Label::String(name) => self.out.write_str(&quote(name)),
            Label::Pattern(expr) => {
                self.out.write_char('[')?;
                self.expr(expr, 0)?;
                self.out.write_char(']')
            }
        }
    }

    fn field(&mut self, field: &Field) -> fmt::Result {
        if let Some(doc) = &field.doc {
            self.doc(doc)?;
        }
        self.label(&field.label)?;
        match field.constraint {
            Constraint::Regular => {}
            Constraint::Optional => self.out.write_char('?')?,
            Constraint::Required => self.out.write_char('!')?,
        }
        self.out.write_str(": ")?;
        self.expr(&field.value, 0)?;
        for attr in &field.attrs {
            self.out.write_char(' ')?;
            self.attr(attr)?;
        }
        Ok(())
    }

    fn decl(&mut self, decl: &Decl) -> fmt::Result {
        match decl {
            Decl::Field(field) => self.field(field),
            Decl::Embed(expr) => self.expr(expr, 0),
            Decl::Ellipsis => self.out.write_str("..."),
            Decl::Attribute(attr) => self.attr(attr),
        }
    }

    fn decls(&mut self, decls: &[Decl]) -> fmt::Result {
        for (i, d) in decls.iter().enumerate() {
            if i > 0 {
                self.newline()?;
            }
            self.decl(d)?;
        }
        Ok(())
    }

    /// Prints `expr`, parenthesizing binary expressions that bind looser
    /// than `prec`.
    fn expr(&mut self, expr: &Expr, prec: u8) -> fmt::Result {
        match expr {
            Expr::Ident(id) => self.out.write_str(&id.name),
            Expr::Lit(lit) => match lit {
                Lit::Null => self.out.write_str("null"),
                Lit::Bool(b) => write!(self.out, "{b}"),
                Lit::Number(n) => write!(self.out, "{n}"),
                Lit::String(s) => self.out.write_str(&quote(s)),
            },
            Expr::Struct(s) => {
                if s.elems.is_empty() {
                    return self.out.write_str("{}");
                }
                self.out.write_char('{')?;
                self.indent += 1;
                self.newline()?;
                self.decls(&s.elems)?;
                self.indent -= 1;
                self.newline()?;
                self.out.write_char('}')
            }
            Expr::List(l) => {
                self.out.write_char('[')?;
                for (i, e) in l.elems.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.expr(e, 0)?;
                }
                if let Some(rest) = &l.rest {
                    if !l.elems.is_empty() {
                        self.out.write_str(", ")?;
                    }
                    self.out.write_str("...")?;
                    if !rest.is_top() {
                        self.expr(rest, u8::MAX)?;
                    }
                }
                self.out.write_char(']')
            }
            Expr::Unary(op, x) => {
                self.out.write_str(op.as_str())?;
                self.expr(x, u8::MAX)
            }
            Expr::Binary(op, x, y) => {
                let p = op.precedence();
                let paren = p < prec;
                if paren {
                    self.out.write_char('(')?;
                }
                self.expr(x, p)?;
                write!(self.out, " {} ", op.as_str())?;
                // Operators are left-associative: a right operand of equal
                // precedence keeps its parentheses.
                self.expr(y, p + 1)?;
                if paren {
                    self.out.write_char(')')?;
                }
                Ok(())
            }
            Expr::Call(func, args) => {
                self.expr(func, u8::MAX)?;
                self.out.write_char('(')?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.write_str(", ")?;
                    }
                    self.expr(a, 0)?;
                }
                self.out.write_char(')')
            }
            Expr::Selector(x, label) => {
                self.expr(x, u8::MAX)?;
                self.out.write_char('.')?;
                self.label(label)
            }
            Expr::Index(x, i) => {
                self.expr(x, u8::MAX)?;
                write!(self.out, "[{i}]")
            }
            Expr::Bad(_) => self.out.write_str("_|_"),
        }
    }

    fn file(&mut self, file: &File) -> fmt::Result {
        let mut sections = 0;
        if let Some(doc) = &file.doc {
            self.doc(doc)?;
        }
        if let Some(pkg) = &file.package {
            write!(self.out, "package {pkg}")?;
            sections += 1;
        }
        if !file.imports.is_empty() {
            if sections > 0 {
                self.out.write_str("\n\n")?;
            }
            let spec = |i: &crate::ast::Import| match &i.alias {
                Some(alias) => format!("{alias} {}", quote(&i.path)),
                None => quote(&i.path),
            };
            if file.imports.len() == 1 {
                write!(self.out, "import {}", spec(&file.imports[0]))?;
            } else {
                self.out.write_str("import (")?;
                for i in &file.imports {
                    write!(self.out, "\n\t{}", spec(i))?;
                }
                self.out.write_str("\n)")?;
            }
            sections += 1;
        }
        if !file.decls.is_empty() {
            if sections > 0 {
                self.out.write_str("\n\n")?;
            }
            self.decls(&file.decls)?;
        }
        self.out.write_char('\n')
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { out: f, indent: 0 }.file(self)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { out: f, indent: 0 }.expr(self, 0)
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { out: f, indent: 0 }.decl(self)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Import, UnaryOp};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_precedence() {
        let e = Expr::binary(
            BinaryOp::And,
            Expr::ident("string"),
            Expr::binary(BinaryOp::Or, Expr::string("a"), Expr::string("b")),
        );
        assert_eq!(e.to_string(), r#"string & ("a" | "b")"#);

        let e = Expr::binary(
            BinaryOp::Or,
            Expr::null(),
            Expr::binary(BinaryOp::And, Expr::ident("int"), Expr::unary(UnaryOp::Ge, Expr::int(0))),
        );
        assert_eq!(e.to_string(), "null | int & >=0");
    }

    #[test]
    fn test_print_lists() {
        assert_eq!(Expr::open_list(vec![], Expr::top()).to_string(), "[...]");
        assert_eq!(
            Expr::open_list(vec![Expr::ident("int")], Expr::ident("string")).to_string(),
            "[int, ...string]"
        );
        assert_eq!(Expr::list(vec![Expr::int(1), Expr::int(2)]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_print_file() {
        let file = File {
            doc: None,
            package: Some("foo".into()),
            imports: vec![Import {
                path: "strings".into(),
                alias: None,
            }],
            decls: vec![
                Decl::Attribute(Attribute::jsonschema(
                    "schema",
                    "https://json-schema.org/draft/2020-12/schema",
                )),
                Decl::Field(
                    Field::new(
                        Label::name("a-b"),
                        Expr::struct_lit(vec![
                            Decl::Field(
                                Field::new(
                                    Label::name("x"),
                                    Expr::call("strings", "MinRunes", vec![Expr::int(2)]),
                                )
                                .optional()
                                .with_doc(Some("Title\n\nMore.".into())),
                            ),
                            Decl::Ellipsis,
                        ]),
                    )
                    .required(),
                ),
            ],
        };
        let want = "package foo\n\nimport \"strings\"\n\n\
@jsonschema(schema=\"https://json-schema.org/draft/2020-12/schema\")\n\
\"a-b\"!: {\n\t// Title\n\t//\n\t// More.\n\tx?: strings.MinRunes(2)\n\t...\n}\n";
        assert_eq!(file.to_string(), want);
    }

    #[test]
    fn test_print_pattern_label_and_attrs() {
        let d = Decl::Field(
            Field::new(
                Label::pattern(Expr::unary(UnaryOp::Match, Expr::string("^x-"))),
                Expr::top(),
            )
            .with_attr(Attribute::deprecated()),
        );
        assert_eq!(d.to_string(), r#"[=~"^x-"]: _ @deprecated()"#);
    }
}
