//! JSON Schema versions and version sets.
//!
//! Keyword and format applicability is expressed as data: each table entry
//! carries a [`VersionSet`] saying which drafts (and vendor dialects) the
//! keyword belongs to.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A JSON Schema draft or vendor dialect.
///
/// The JSON Schema drafts are ordered oldest first. The vendor dialects
/// cannot be selected with `$schema`; they are chosen through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Version {
    #[default]
    Unknown,
    Draft4,
    Draft6,
    Draft7,
    Draft2019_09,
    Draft2020_12,
    /// OpenAPI 3.0 schema objects.
    OpenApi,
    /// Kubernetes API schemas.
    KubernetesApi,
    /// Kubernetes custom resource definition schemas.
    KubernetesCrd,
}

/// Version assumed when there is no `$schema` keyword and no explicit default.
pub const DEFAULT_VERSION: Version = Version::Draft2020_12;

const ALL: [Version; 8] = [
    Version::Draft4,
    Version::Draft6,
    Version::Draft7,
    Version::Draft2019_09,
    Version::Draft2020_12,
    Version::OpenApi,
    Version::KubernetesApi,
    Version::KubernetesCrd,
];

impl Version {
    /// The canonical identifier: the `$schema` URI for JSON Schema drafts,
    /// a descriptive name for the vendor dialects.
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Unknown => "unknown",
            Version::Draft4 => "http://json-schema.org/draft-04/schema#",
            Version::Draft6 => "http://json-schema.org/draft-06/schema#",
            Version::Draft7 => "http://json-schema.org/draft-07/schema#",
            Version::Draft2019_09 => "https://json-schema.org/draft/2019-09/schema",
            Version::Draft2020_12 => "https://json-schema.org/draft/2020-12/schema",
            Version::OpenApi => "OpenAPI 3.0",
            Version::KubernetesApi => "Kubernetes API",
            Version::KubernetesCrd => "Kubernetes CRD",
        }
    }

    /// Short name accepted in configuration files and on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            Version::Unknown => "unknown",
            Version::Draft4 => "draft4",
            Version::Draft6 => "draft6",
            Version::Draft7 => "draft7",
            Version::Draft2019_09 => "draft2019-09",
            Version::Draft2020_12 => "draft2020-12",
            Version::OpenApi => "openapi",
            Version::KubernetesApi => "k8sapi",
            Version::KubernetesCrd => "k8scrd",
        }
    }

    /// Whether this is one of the JSON Schema drafts proper.
    pub fn is_json_schema(self) -> bool {
        matches!(
            self,
            Version::Draft4
                | Version::Draft6
                | Version::Draft7
                | Version::Draft2019_09
                | Version::Draft2020_12
        )
    }

    /// Parses a `$schema` URI.
    ///
    /// The `http`/`https` scheme and a trailing empty fragment are ignored
    /// because both are commonly gotten wrong in real schemas.
    pub fn parse_schema_uri(uri: &str) -> Option<Version> {
        let normalize = |s: &str| -> String {
            let s = s.trim_end_matches('#');
            s.strip_prefix("https://")
                .or_else(|| s.strip_prefix("http://"))
                .unwrap_or(s)
                .to_string()
        };
        let wanted = normalize(uri);
        ALL.into_iter()
            .filter(|v| v.is_json_schema())
            .find(|v| normalize(v.as_str()) == wanted)
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Reports whether this version is a member of `set`.
    pub fn is(self, set: VersionSet) -> bool {
        set.contains(self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a version string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("$schema URI not recognized: {0:?}")]
pub struct ParseVersionError(pub String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(v) = Version::parse_schema_uri(s) {
            return Ok(v);
        }
        ALL.into_iter()
            .find(|v| v.as_str() == s || v.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseVersionError(s.to_string()))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Version sets
// ---------------------------------------------------------------------------

/// A set of [`Version`]s, stored as a bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionSet(u16);

const JSON_SCHEMA_MASK: u16 = Version::Draft4.bit()
    | Version::Draft6.bit()
    | Version::Draft7.bit()
    | Version::Draft2019_09.bit()
    | Version::Draft2020_12.bit();

impl VersionSet {
    /// Every JSON Schema draft (not the vendor dialects).
    pub const ALL_DRAFTS: VersionSet = VersionSet(JSON_SCHEMA_MASK);
    pub const OPEN_API: VersionSet = VersionSet(Version::OpenApi.bit());
    pub const K8S: VersionSet =
        VersionSet(Version::KubernetesApi.bit() | Version::KubernetesCrd.bit());
    pub const K8S_CRD: VersionSet = VersionSet(Version::KubernetesCrd.bit());
    /// OpenAPI and the Kubernetes dialects, which share most OpenAPI rules.
    pub const OPEN_API_LIKE: VersionSet = VersionSet(
        Version::OpenApi.bit() | Version::KubernetesApi.bit() | Version::KubernetesCrd.bit(),
    );
    /// Every known version, including the vendor dialects.
    pub const ALL: VersionSet = VersionSet(JSON_SCHEMA_MASK | Self::OPEN_API_LIKE.0);

    /// All JSON Schema drafts from `v` onwards.
    pub const fn since(v: Version) -> VersionSet {
        VersionSet(JSON_SCHEMA_MASK & !(v.bit() - 1))
    }

    /// All JSON Schema drafts up to and including `v`.
    pub const fn until(v: Version) -> VersionSet {
        VersionSet(JSON_SCHEMA_MASK & ((v.bit() << 1) - 1))
    }

    pub const fn only(v: Version) -> VersionSet {
        VersionSet(v.bit())
    }

    pub const fn union(self, other: VersionSet) -> VersionSet {
        VersionSet(self.0 | other.0)
    }

    pub const fn contains(self, v: Version) -> bool {
        self.0 & v.bit() != 0
    }
}

impl BitOr for VersionSet {
    type Output = VersionSet;

    fn bitor(self, rhs: VersionSet) -> VersionSet {
        self.union(rhs)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
