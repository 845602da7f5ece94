//! Assembles the output file from values placed at paths.
//!
//! The decoder puts each definition at its mapped path and asks for
//! reference expressions to paths that may not have been filled yet.
//! [`StructBuilder::syntax`] lays the tree out as declarations and checks
//! that every requested reference landed on a value.

use std::collections::HashMap;

use crate::ast::{Decl, Expr, Field, File, Label, StructLit};
use crate::path::{Path, Selector};

/// Name of the hidden field that holds the whole document when something
/// refers to the document root.
pub const ROOT_IDENT: &str = "_schema";

#[derive(Debug, Default)]
struct Node {
    /// Value put at this node, not including entries below it.
    value: Option<Expr>,
    doc: Option<String>,
    entries: HashMap<Selector, Node>,
}

impl Node {
    fn sorted_entries(&self) -> Vec<(&Selector, &Node)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.rank()
                .cmp(&b.rank())
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });
        entries
    }
}

#[derive(Debug, Default)]
pub(crate) struct StructBuilder {
    root: Node,
    /// Every non-root path handed out by `get_ref`.
    ref_paths: Vec<Path>,
    root_refs: usize,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `value` with `path`. Returns false, leaving the existing
    /// value in place, when the path already has one.
    pub fn put(&mut self, path: &Path, value: Expr, doc: Option<String>) -> bool {
        let node = self.entry_for_path(path);
        if node.value.is_some() {
            return false;
        }
        node.value = Some(value);
        node.doc = doc.filter(|d| !d.is_empty());
        true
    }

    /// Reference syntax for `path`. The empty path refers to the document
    /// root through [`ROOT_IDENT`].
    pub fn get_ref(&mut self, path: &Path) -> Result<Expr, String> {
        let sels = path.selectors();
        let Some(first) = sels.first() else {
            self.root_refs += 1;
            return Ok(Expr::ident(ROOT_IDENT));
        };
        let base = first.ident().ok_or_else(|| {
            format!("initial element of path {path} must be expressed as an identifier")
        })?;
        self.ref_paths.push(path.clone());
        Ok(Expr::path_ref(Expr::ident(base), &sels[1..]))
    }

    fn entry_for_path(&mut self, path: &Path) -> &mut Node {
        let mut node = &mut self.root;
        for sel in path.selectors() {
            node = node.entries.entry(sel.clone()).or_default();
        }
        node
    }

    fn lookup(&self, path: &Path) -> Option<&Node> {
        let mut node = &self.root;
        for sel in path.selectors() {
            node = node.entries.get(sel)?;
        }
        Some(node)
    }

    /// Lays out the whole tree as a file.
    pub fn syntax(&self) -> Result<File, String> {
        let mut db = DeclBuilder::default();
        append_decls(&self.root, &mut db);

        for path in &self.ref_paths {
            match self.lookup(path) {
                Some(node) if node.value.is_some() || !node.entries.is_empty() => {}
                _ => return Err(format!("reference to undefined path {path}")),
            }
        }

        let decls = if self.root_refs == 0 {
            db.decls
        } else {
            let root_expr = expr_from_decls(db.decls);
            vec![
                Decl::Embed(Expr::ident(ROOT_IDENT)),
                Decl::Field(Field::new(Label::Ident(ROOT_IDENT.to_string()), root_expr)),
            ]
        };
        Ok(File {
            doc: self.root.doc.clone(),
            decls,
            ..File::default()
        })
    }
}

#[derive(Debug, Default)]
struct DeclBuilder {
    decls: Vec<Decl>,
    path: Vec<Selector>,
}

fn append_decls(node: &Node, db: &mut DeclBuilder) {
    let Some(value) = &node.value else {
        for (sel, entry) in node.sorted_entries() {
            db.path.push(sel.clone());
            append_decls(entry, db);
            db.path.pop();
        }
        return;
    };
    if node.entries.is_empty() {
        append_field(&mut db.decls, &db.path, value.clone(), node.doc.clone());
        return;
    }
    // A value with entries below it: `#x: string` and `#x: #y: bool`
    // cannot both be written, so the value is embedded in a struct literal
    // next to the entries.
    let mut inner = DeclBuilder::default();
    append_field(&mut inner.decls, &inner.path, value.clone(), None);
    for (sel, entry) in node.sorted_entries() {
        inner.path.push(sel.clone());
        append_decls(entry, &mut inner);
        inner.path.pop();
    }
    append_field(
        &mut db.decls,
        &db.path,
        expr_from_decls(inner.decls),
        node.doc.clone(),
    );
}

fn expr_from_decls(mut decls: Vec<Decl>) -> Expr {
    if decls.len() == 1 && matches!(decls[0], Decl::Embed(_)) {
        if let Some(Decl::Embed(e)) = decls.pop() {
            return e;
        }
    }
    Expr::Struct(StructLit { elems: decls })
}

fn append_field(decls: &mut Vec<Decl>, path: &[Selector], value: Expr, doc: Option<String>) {
    let Some((first, rest)) = path.split_first() else {
        match value {
            Expr::Struct(s) => decls.extend(s.elems),
            other => decls.push(Decl::Embed(other)),
        }
        return;
    };
    let inner = rest.iter().rev().fold(value, |v, sel| {
        Expr::struct_lit(vec![Decl::Field(Field::new(Label::from_selector(sel), v))])
    });
    decls.push(Decl::Field(
        Field::new(Label::from_selector(first), inner).with_doc(doc),
    ));
}

// ===========================================================================
// Tests
// ===========================================================================
