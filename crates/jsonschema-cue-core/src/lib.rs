//! # jsonschema-cue-core
//!
//! Bidirectional translation between JSON Schema and CUE-style constraint
//! values.
//!
//! - [`extract`] decodes a JSON Schema document (drafts 4 through 2020-12,
//!   OpenAPI 3.0 and the Kubernetes dialects) into an [`ast::File`], whose
//!   `Display` impl prints it as text.
//! - [`generate`] encodes a [`host::Value`] as a 2020-12 JSON Schema
//!   document. [`host::compile`] loads an extracted file as such a value, so
//!   the two directions compose.
//!
//! Both entry points collect every problem they find and return them
//! together as [`ConvertError::Schema`].
//!
//! ```
//! use jsonschema_cue_core::{extract, Config};
//! use serde_json::json;
//!
//! let schema = json!({"type": "string", "minLength": 2});
//! let file = extract(&schema, &Config::default()).unwrap();
//! assert_eq!(file.to_string(), "import \"strings\"\n\nstrings.MinRunes(2)\n");
//! ```

pub mod ast;
pub mod config;
pub mod decode;
pub mod error;
pub mod generate;
pub mod host;
pub mod kind;
pub mod mapping;
pub mod passes;
pub mod path;
pub mod pointer;
pub mod printer;
pub mod resolver;
pub mod struct_builder;
pub mod version;

pub use config::{Config, GenerateConfig};
pub use decode::extract;
pub use error::{ConvertError, Diagnostic, ErrorKind, Errors};
pub use generate::generate;
pub use kind::Kind;
pub use path::{Path, Selector};
pub use version::{Version, VersionSet};
