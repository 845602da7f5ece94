//! Error types for schema translation.
//!
//! Translation problems come in two flavours:
//!
//! - **Fatal** errors ([`ConvertError::InvalidConfig`],
//!   [`ConvertError::UnsupportedVersion`], [`ConvertError::InvalidValue`])
//!   abort a call before any translation work starts.
//! - **Diagnostics** are collected while walking the input. Translation keeps
//!   going with a safe fallback, and the full list is returned at the end as
//!   [`ConvertError::Schema`].

use std::fmt;

use thiserror::Error;

use crate::version::Version;

/// Broad classification of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A keyword value has the wrong shape (`"properties": 3`).
    Structural,
    /// A `$ref` or `$id` could not be parsed, resolved or mapped.
    Reference,
    /// A keyword or `$schema` value does not belong to the schema version.
    Version,
    /// The input uses a construct the translator cannot express.
    Feature,
    /// An invariant of the translator itself was broken.
    Internal,
}

/// A single translation problem, tagged with where it was found.
///
/// `location` is a JSON Pointer fragment (`#/properties/a/type`) for
/// extraction and a value path (`#Foo.bar`) for generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Every diagnostic reported by one translation call, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors(Vec<Diagnostic>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic. Exact duplicates are dropped: the decoder may
    /// visit the same node once per pass.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.0.contains(&diagnostic) {
            self.0.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    /// `Ok(())` when nothing was reported, the whole list otherwise.
    pub fn into_result(self) -> Result<(), ConvertError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConvertError::Schema(self))
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("only version {supported} is supported for generating JSON Schema for now (requested {requested})")]
    UnsupportedVersion {
        requested: Version,
        supported: Version,
    },

    #[error("Invalid value at {path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("{0}")]
    Schema(#[from] Errors),
}

impl ConvertError {
    /// The accumulated diagnostics, if this is a [`ConvertError::Schema`].
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ConvertError::Schema(errs) => &errs.0,
            _ => &[],
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_display_lists_every_diagnostic() {
        let mut errs = Errors::new();
        errs.push(Diagnostic::new(
            ErrorKind::Structural,
            "#/properties/a/type",
            "unknown type \"foo\"",
        ));
        errs.push(Diagnostic::new(
            ErrorKind::Reference,
            "#/$ref",
            "cannot find reference",
        ));

        let text = ConvertError::Schema(errs).to_string();
        assert_eq!(
            text,
            "#/properties/a/type: unknown type \"foo\"\n#/$ref: cannot find reference"
        );
    }

    #[test]
    fn test_push_drops_exact_duplicates() {
        let mut errs = Errors::new();
        let d = Diagnostic::new(ErrorKind::Version, "#/x", "unknown keyword \"x\"");
        errs.push(d.clone());
        errs.push(d);
        errs.push(Diagnostic::new(ErrorKind::Version, "#/y", "unknown keyword \"y\""));
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn test_empty_errors_into_ok() {
        assert!(Errors::new().into_result().is_ok());
    }

    #[test]
    fn test_diagnostics_accessor() {
        let mut errs = Errors::new();
        errs.push(Diagnostic::new(ErrorKind::Internal, "#", "boom"));
        let err = ConvertError::Schema(errs);
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].kind, ErrorKind::Internal);
        assert!(ConvertError::InvalidConfig("x".into()).diagnostics().is_empty());
    }

    #[test]
    fn test_every_variant_displays() {
        let all = [
            ConvertError::InvalidConfig("bad root".into()),
            ConvertError::UnsupportedVersion {
                requested: Version::Draft7,
                supported: Version::Draft2020_12,
            },
            ConvertError::InvalidValue {
                path: "<root>".into(),
                message: "top-level value is bottom".into(),
            },
            ConvertError::Schema(Errors::new()),
        ];
        for err in &all {
            // Keep in sync with the enum: a new variant fails to compile here.
            let fatal = match err {
                ConvertError::InvalidConfig(_)
                | ConvertError::UnsupportedVersion { .. }
                | ConvertError::InvalidValue { .. } => true,
                ConvertError::Schema(_) => false,
            };
            assert_eq!(fatal, err.diagnostics().is_empty() && !err.to_string().is_empty());
        }
        assert_eq!(all[0].to_string(), "Invalid configuration: bad root");
        assert_eq!(
            all[2].to_string(),
            "Invalid value at <root>: top-level value is bottom"
        );
    }
}
