//! `$id`/`$anchor` pre-scan and `$ref` target resolution.
//!
//! [`Resolver`] is built once per document. It records every embedded
//! schema resource (a subschema carrying `$id`) and every named anchor, so
//! that a resolved `$ref` URI can be turned into a JSON Pointer from the
//! document root, or be recognised as external.

use std::collections::HashMap;

use serde_json::Value;
use url::Url;

use crate::pointer;
use crate::version::Version;

/// Keywords whose values are instance data, not subschemas. Their contents
/// never declare resources or anchors.
const DATA_KEYWORDS: &[&str] = &["const", "default", "enum", "examples"];

/// An embedded schema resource: its absolute id and where it lives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Resource {
    pub id: Url,
    pub tokens: Vec<String>,
}

/// Where a `$ref` URI points.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    /// A node in this document, as pointer tokens from the document root.
    Local(Vec<String>),
    /// The URI names a resource in this document but the fragment is a
    /// plain-name anchor that was never declared.
    UnknownAnchor(String),
    /// The URI names no resource in this document.
    External,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub(crate) struct Resolver {
    /// Resources in document order; the root resource comes first.
    resources: Vec<Resource>,
    /// Resource URI (no fragment) → index into `resources`.
    by_uri: HashMap<String, usize>,
    /// Absolute URI with anchor fragment → pointer tokens.
    anchors: HashMap<String, Vec<String>>,
}

impl Resolver {
    /// Scan `doc` for resources and anchors.
    ///
    /// ## Arguments
    ///
    /// * `doc`: the whole JSON document.
    /// * `root_id`: the base URI of the document.
    /// * `version`: the document's schema version; draft 4 spells `$id`
    ///   as `id`.
    pub fn new(doc: &Value, root_id: &Url, version: Version) -> Self {
        let mut resolver = Resolver {
            resources: Vec::new(),
            by_uri: HashMap::new(),
            anchors: HashMap::new(),
        };
        resolver.add_resource(root_id.clone(), Vec::new());
        let id_keyword = if version == Version::Draft4 { "id" } else { "$id" };
        let mut tokens = Vec::new();
        resolver.scan(doc, root_id, id_keyword, &mut tokens);
        resolver
    }

    fn add_resource(&mut self, id: Url, tokens: Vec<String>) {
        let key = without_fragment(&id);
        if self.by_uri.contains_key(&key) {
            return;
        }
        self.by_uri.insert(key, self.resources.len());
        self.resources.push(Resource { id, tokens });
    }

    /// Recursive DFS that tracks the current base URI (updated by `$id`).
    fn scan(&mut self, node: &Value, base: &Url, id_keyword: &str, tokens: &mut Vec<String>) {
        let obj = match node {
            Value::Object(obj) => obj,
            Value::Array(arr) => {
                for (i, item) in arr.iter().enumerate() {
                    tokens.push(i.to_string());
                    self.scan(item, base, id_keyword, tokens);
                    tokens.pop();
                }
                return;
            }
            _ => return,
        };

        let mut scoped = base.clone();
        if let Some(id) = obj.get(id_keyword).and_then(Value::as_str) {
            if let Ok(joined) = base.join(id) {
                match joined.fragment() {
                    // Pre-2019 drafts declare anchors as `"$id": "#name"`.
                    Some(frag) if !frag.is_empty() && !frag.starts_with('/') => {
                        self.anchors
                            .entry(joined.to_string())
                            .or_insert_with(|| tokens.clone());
                        if !id.starts_with('#') {
                            let mut res = joined.clone();
                            res.set_fragment(None);
                            self.add_resource(res.clone(), tokens.clone());
                            scoped = res;
                        }
                    }
                    _ => {
                        let mut res = joined;
                        res.set_fragment(None);
                        self.add_resource(res.clone(), tokens.clone());
                        scoped = res;
                    }
                }
            }
        }

        for keyword in ["$anchor", "$dynamicAnchor"] {
            if let Some(anchor) = obj.get(keyword).and_then(Value::as_str) {
                if let Ok(uri) = scoped.join(&format!("#{anchor}")) {
                    // First-wins for repeated anchors.
                    self.anchors
                        .entry(uri.to_string())
                        .or_insert_with(|| tokens.clone());
                }
            }
        }

        for (key, val) in obj {
            if DATA_KEYWORDS.contains(&key.as_str()) {
                continue;
            }
            tokens.push(key.clone());
            self.scan(val, &scoped, id_keyword, tokens);
            tokens.pop();
        }
    }

    /// Resolve an absolute URI to its target.
    pub fn resolve(&self, uri: &Url) -> Target {
        let Some(&index) = self.by_uri.get(&without_fragment(uri)) else {
            return Target::External;
        };
        let resource = &self.resources[index];
        let fragment = pointer::percent_decode(uri.fragment().unwrap_or(""));
        if fragment.is_empty() || fragment.starts_with('/') {
            let mut tokens = resource.tokens.clone();
            tokens.extend(pointer::tokens(&fragment));
            return Target::Local(tokens);
        }
        match self.anchors.get(uri.as_str()) {
            Some(tokens) => Target::Local(tokens.clone()),
            None => Target::UnknownAnchor(fragment),
        }
    }

    /// The innermost resource containing the node at `tokens`.
    pub fn scope_for(&self, tokens: &[String]) -> &Resource {
        self.resources
            .iter()
            .filter(|r| tokens.starts_with(&r.tokens))
            .max_by_key(|r| r.tokens.len())
            .unwrap_or(&self.resources[0])
    }
}

fn without_fragment(u: &Url) -> String {
    let mut u = u.clone();
    u.set_fragment(None);
    u.to_string()
}

// ===========================================================================
// Tests
// ===========================================================================
