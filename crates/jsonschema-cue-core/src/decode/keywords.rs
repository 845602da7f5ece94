//! Keyword dispatch table.
//!
//! Every keyword the decoder understands has an entry giving the phase it
//! runs in, the versions it belongs to and its handler. Handlers of a later
//! phase can rely on everything an earlier phase collected: `required` sees
//! the fields from `properties`, `additionalProperties` sees the final
//! field and pattern lists.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::version::{Version, VersionSet};

use super::state::State;
use super::{array, combinator, format, generic, number, object, string, Node};

/// Ordered processing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Phase {
    /// `$schema`, which decides how everything else is read.
    Schema,
    /// `$id` and anchors.
    Metadata,
    Main,
    /// Keywords that depend on `Main` results.
    Dependent,
    /// `additionalProperties` and `additionalItems`.
    Final,
}

impl Phase {
    pub const FIRST: Phase = Phase::Schema;

    pub const ALL: [Phase; 5] = [
        Phase::Schema,
        Phase::Metadata,
        Phase::Main,
        Phase::Dependent,
        Phase::Final,
    ];
}

pub(crate) type Handler = for<'d, 'a> fn(&mut State<'d, 'a>, &str, &Node<'a>);

pub(crate) struct Keyword {
    pub phase: Phase,
    pub versions: VersionSet,
    pub handler: Handler,
}

pub(crate) fn lookup(key: &str) -> Option<&'static Keyword> {
    table().get(key)
}

fn kw(phase: Phase, versions: VersionSet, handler: Handler) -> Keyword {
    Keyword {
        phase,
        versions,
        handler,
    }
}

fn table() -> &'static HashMap<&'static str, Keyword> {
    static TABLE: OnceLock<HashMap<&'static str, Keyword>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Phase::*;

        let all = VersionSet::ALL;
        let drafts = VersionSet::ALL_DRAFTS;
        let since = VersionSet::since;
        let until = VersionSet::until;
        let open_api_like = VersionSet::OPEN_API_LIKE;
        let open_api = VersionSet::OPEN_API;
        let k8s = VersionSet::K8S;

        // Ordered lexically by keyword.
        let entries: Vec<(&'static str, Keyword)> = vec![
            ("$anchor", kw(Metadata, since(Version::Draft2019_09), generic::noop)),
            ("$comment", kw(Main, since(Version::Draft7), generic::noop)),
            ("$defs", kw(Main, drafts, generic::definitions)),
            ("$dynamicAnchor", kw(Metadata, since(Version::Draft2020_12), generic::noop)),
            ("$dynamicRef", kw(Main, since(Version::Draft2020_12), generic::not_implemented)),
            ("$id", kw(Metadata, since(Version::Draft6), generic::id)),
            ("$recursiveAnchor", kw(Metadata, VersionSet::only(Version::Draft2019_09), generic::not_implemented)),
            ("$recursiveRef", kw(Main, VersionSet::only(Version::Draft2019_09), generic::not_implemented)),
            ("$ref", kw(Main, all, generic::reference)),
            ("$schema", kw(Schema, drafts, generic::schema_uri)),
            ("$vocabulary", kw(Metadata, since(Version::Draft2019_09), generic::not_implemented)),
            ("additionalItems", kw(Final, until(Version::Draft2019_09), array::additional_items)),
            ("additionalProperties", kw(Final, all, object::additional_properties)),
            ("allOf", kw(Dependent, all, combinator::all_of)),
            ("anyOf", kw(Dependent, all, combinator::any_of)),
            ("const", kw(Main, since(Version::Draft6), generic::constant)),
            ("contains", kw(Dependent, since(Version::Draft6), array::contains)),
            ("contentEncoding", kw(Main, since(Version::Draft7), generic::noop)),
            ("contentMediaType", kw(Main, since(Version::Draft7), generic::noop)),
            ("contentSchema", kw(Main, since(Version::Draft2019_09), generic::not_implemented)),
            ("default", kw(Main, all, generic::noop)),
            ("definitions", kw(Main, drafts, generic::definitions)),
            ("dependencies", kw(Main, drafts, generic::noop)),
            ("dependentRequired", kw(Main, since(Version::Draft2019_09), generic::not_implemented)),
            ("dependentSchemas", kw(Main, since(Version::Draft2019_09), generic::not_implemented)),
            ("deprecated", kw(Main, since(Version::Draft2019_09) | open_api_like, generic::deprecated)),
            ("description", kw(Main, all, generic::description)),
            ("discriminator", kw(Main, open_api, generic::not_implemented)),
            ("else", kw(Main, since(Version::Draft7), combinator::else_)),
            ("enum", kw(Main, all, generic::enumeration)),
            ("example", kw(Main, open_api_like, generic::noop)),
            ("examples", kw(Main, since(Version::Draft6), generic::examples)),
            ("exclusiveMaximum", kw(Main, all, number::exclusive_maximum)),
            ("exclusiveMinimum", kw(Main, all, number::exclusive_minimum)),
            ("externalDocs", kw(Main, open_api, generic::noop)),
            ("format", kw(Main, all, format::format)),
            ("id", kw(Metadata, until(Version::Draft4), generic::id)),
            ("if", kw(Main, since(Version::Draft7), combinator::if_)),
            ("items", kw(Dependent, all, array::items)),
            ("maxContains", kw(Main, since(Version::Draft2019_09), array::max_contains)),
            ("maxItems", kw(Main, all, array::max_items)),
            ("maxLength", kw(Main, all, string::max_length)),
            ("maxProperties", kw(Main, all, object::max_properties)),
            ("maximum", kw(Dependent, all, number::maximum)),
            ("minContains", kw(Main, since(Version::Draft2019_09), array::min_contains)),
            ("minItems", kw(Main, all, array::min_items)),
            ("minLength", kw(Main, all, string::min_length)),
            ("minProperties", kw(Main, all, object::min_properties)),
            ("minimum", kw(Dependent, all, number::minimum)),
            ("multipleOf", kw(Main, all, number::multiple_of)),
            ("not", kw(Dependent, all, combinator::not)),
            ("nullable", kw(Main, open_api_like, generic::nullable)),
            ("oneOf", kw(Dependent, all, combinator::one_of)),
            ("pattern", kw(Main, all, string::pattern)),
            ("patternProperties", kw(Dependent, drafts, object::pattern_properties)),
            ("prefixItems", kw(Main, since(Version::Draft2020_12), array::prefix_items)),
            ("properties", kw(Main, all, object::properties)),
            ("propertyNames", kw(Main, since(Version::Draft6), object::property_names)),
            ("readOnly", kw(Main, since(Version::Draft7) | open_api_like, generic::noop)),
            ("required", kw(Dependent, all, object::required)),
            ("then", kw(Main, since(Version::Draft7), combinator::then)),
            ("title", kw(Main, all, generic::title)),
            ("type", kw(Main, all, generic::type_)),
            ("unevaluatedItems", kw(Main, since(Version::Draft2019_09), generic::not_implemented)),
            ("unevaluatedProperties", kw(Main, since(Version::Draft2019_09), generic::not_implemented)),
            ("uniqueItems", kw(Main, all, array::unique_items)),
            ("writeOnly", kw(Main, since(Version::Draft7) | open_api_like, generic::noop)),
            ("x-kubernetes-embedded-resource", kw(Main, k8s, generic::noop)),
            ("x-kubernetes-group-version-kind", kw(Main, k8s, generic::noop)),
            ("x-kubernetes-int-or-string", kw(Main, k8s, generic::int_or_string)),
            ("x-kubernetes-list-map-keys", kw(Main, k8s, generic::noop)),
            ("x-kubernetes-list-type", kw(Main, k8s, generic::noop)),
            ("x-kubernetes-map-type", kw(Main, k8s, generic::noop)),
            ("x-kubernetes-preserve-unknown-fields", kw(Main, k8s, object::preserve_unknown_fields)),
            ("x-kubernetes-validations", kw(Main, k8s, generic::not_implemented)),
            ("xml", kw(Main, open_api, generic::noop)),
        ];
        entries.into_iter().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependent_keywords_run_after_their_inputs() {
        let phase = |k: &str| lookup(k).map(|kw| kw.phase);
        assert!(phase("properties") < phase("required"));
        assert!(phase("properties") < phase("patternProperties"));
        assert!(phase("patternProperties") < phase("additionalProperties"));
        assert!(phase("prefixItems") < phase("items"));
        assert!(phase("items") < phase("additionalItems"));
        assert!(phase("minContains") < phase("contains"));
        assert!(phase("exclusiveMinimum") < phase("minimum"));
        assert!(phase("$schema") < phase("$id"));
    }

    #[test]
    fn test_version_ranges() {
        let versions = |k: &str| lookup(k).map(|kw| kw.versions).unwrap();
        assert!(versions("id").contains(Version::Draft4));
        assert!(!versions("id").contains(Version::Draft6));
        assert!(versions("$id").contains(Version::Draft6));
        assert!(!versions("$id").contains(Version::Draft4));
        assert!(versions("additionalItems").contains(Version::Draft2019_09));
        assert!(!versions("additionalItems").contains(Version::Draft2020_12));
        assert!(versions("nullable").contains(Version::OpenApi));
        assert!(!versions("nullable").contains(Version::Draft2020_12));
    }

    #[test]
    fn test_x_keywords_outside_table() {
        assert!(lookup("x-foo").is_none());
        assert!(lookup("x-kubernetes-int-or-string").is_some());
    }
}
