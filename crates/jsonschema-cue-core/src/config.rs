//! Configuration for extraction and generation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ast::Expr;
use crate::mapping::SchemaLoc;
use crate::path::{Path, Selector};
use crate::version::Version;

/// Base URI assumed for documents that do not declare one.
pub const DEFAULT_ROOT_ID: &str = "https://cue.jsonschema.invalid";

/// Host of [`DEFAULT_ROOT_ID`]; documents may not use it explicitly.
pub const DEFAULT_ROOT_ID_HOST: &str = "cue.jsonschema.invalid";

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

macro_rules! callback {
    ($(#[$meta:meta])* $name:ident, $($sig:tt)*) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(pub Arc<dyn $($sig)* + Send + Sync>);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

callback!(
    /// Maps a schema location to an import path and a path within that
    /// package. An empty import path means the current output file.
    MapRefFn,
    Fn(&SchemaLoc) -> Result<(String, Path), String>
);

callback!(
    /// Maps a URL without fragment to an import path and package path.
    /// Superseded by [`MapRefFn`]; composed into the default mapping.
    MapUrlFn,
    Fn(&Url) -> Result<(String, Path), String>
);

callback!(
    /// Maps JSON Pointer tokens to selectors. Superseded by [`MapRefFn`];
    /// composed into the default mapping.
    MapFn,
    Fn(&[String]) -> Result<Vec<Selector>, String>
);

callback!(
    /// Told about every schema in the document that was mapped to an
    /// external package. Arguments: import path, path, expression and doc
    /// comment.
    DefineSchemaFn,
    Fn(&str, &Path, &Expr, Option<&str>)
);

callback!(
    /// Names the `$defs` entry for a referenced definition path.
    NameFn,
    Fn(&Path) -> String
);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Options for [`crate::extract`].
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `single-root`,
/// `strict-keywords`). Callback fields are not serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Package clause for the output file.
    pub pkg_name: Option<String>,
    /// Base URI of the document. Default: [`DEFAULT_ROOT_ID`].
    pub id: Option<String>,
    /// JSON reference of the location holding the schemas, e.g.
    /// `#/components/schemas`. Unset means the whole document is one schema.
    pub root: Option<String>,
    /// Treat the value at `root` as one schema instead of a map of schemas.
    pub single_root: bool,
    /// Produce an empty result instead of an error when `root` is missing.
    pub allow_non_existent_root: bool,
    /// Version used when the document has no `$schema`.
    pub default_version: Version,
    /// Shorthand for both `strict_features` and `strict_keywords`.
    pub strict: bool,
    /// Report features that are known but not supported.
    pub strict_features: bool,
    /// Report unknown keywords and formats, and keywords used outside their
    /// version.
    pub strict_keywords: bool,
    /// Leave implicitly open structs without a trailing `...`.
    pub open_only_when_explicit: bool,

    #[serde(skip)]
    pub map_ref: Option<MapRefFn>,
    #[serde(skip)]
    pub map_url: Option<MapUrlFn>,
    #[serde(skip)]
    pub map: Option<MapFn>,
    #[serde(skip)]
    pub define_schema: Option<DefineSchemaFn>,
}

impl Config {
    /// A copy with defaults filled in and `strict` expanded.
    ///
    /// ## Errors
    ///
    /// Returns an error message when `id` is not an absolute URI.
    pub(crate) fn normalized(&self) -> Result<(Config, Url), String> {
        let mut cfg = self.clone();
        if cfg.default_version == Version::Unknown {
            cfg.default_version = crate::version::DEFAULT_VERSION;
        }
        if cfg.strict {
            cfg.strict_features = true;
            cfg.strict_keywords = true;
        }
        let id = cfg.id.get_or_insert_with(|| DEFAULT_ROOT_ID.to_string());
        let root_id = Url::parse(id).map_err(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => {
                format!("Config.ID {id:?} is not absolute URI")
            }
            e => format!("invalid Config.ID value {id:?}: {e}"),
        })?;
        Ok((cfg, root_id))
    }
}

/// Options for [`crate::generate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerateConfig {
    /// Output version. Only 2020-12 is supported; unset means 2020-12.
    pub version: Version,
    /// Never emit `additionalProperties: false` for structs that are only
    /// closed implicitly, and emit `additionalProperties: true` for
    /// explicitly open ones.
    pub explicit_open: bool,
    #[serde(skip)]
    pub name_func: Option<NameFn>,
}

/// Default `$defs` naming: selectors joined with `.`, definition selectors
/// without their `#`, hidden ones with a leading `_`.
pub fn default_name_func(path: &Path) -> String {
    path.selectors()
        .iter()
        .map(|sel| match sel {
            Selector::Field(name) => name.clone(),
            Selector::Def(name) => name.clone(),
            Selector::Hidden(name) => format!("_{name}"),
            Selector::HiddenDef(name) => format!("_{name}"),
            Selector::Index(i) => i.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_round_trip() {
        let cfg = Config {
            pkg_name: Some("api".into()),
            root: Some("#/components/schemas".into()),
            single_root: true,
            default_version: Version::OpenApi,
            strict_keywords: true,
            ..Config::default()
        };

        let json = serde_json::to_string(&cfg).unwrap();

        assert!(json.contains("\"pkg-name\""));
        assert!(json.contains("\"single-root\""));
        assert!(json.contains("\"default-version\":\"openapi\""));
        assert!(json.contains("\"strict-keywords\""));
        assert!(!json.contains("map-ref"));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pkg_name.as_deref(), Some("api"));
        assert!(back.single_root);
        assert_eq!(back.default_version, Version::OpenApi);
        assert!(back.strict_keywords);
        assert!(!back.strict_features);
    }

    #[test]
    fn test_config_missing_fields_default() {
        let cfg: Config = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(cfg.strict);
        assert!(cfg.root.is_none());
        let (norm, id) = cfg.normalized().unwrap();
        assert!(norm.strict_features && norm.strict_keywords);
        assert_eq!(norm.default_version, Version::Draft2020_12);
        assert_eq!(id.host_str(), Some(DEFAULT_ROOT_ID_HOST));
    }

    #[test]
    fn test_config_rejects_relative_id() {
        let cfg = Config {
            id: Some("foo/bar".into()),
            ..Config::default()
        };
        let err = cfg.normalized().unwrap_err();
        assert_eq!(err, "Config.ID \"foo/bar\" is not absolute URI");
    }

    #[test]
    fn test_generate_config_serde() {
        let cfg: GenerateConfig =
            serde_json::from_str(r#"{"version":"draft2020-12","explicit-open":true}"#).unwrap();
        assert_eq!(cfg.version, Version::Draft2020_12);
        assert!(cfg.explicit_open);
        assert!(cfg.name_func.is_none());
    }

    #[test]
    fn test_default_name_func() {
        let path: Path = r#"#Foo.bar."a-b""#.parse().unwrap();
        assert_eq!(default_name_func(&path), "Foo.bar.a-b");
        let path: Path = "_#defs".parse().unwrap();
        assert_eq!(default_name_func(&path), "_defs");
    }
}
