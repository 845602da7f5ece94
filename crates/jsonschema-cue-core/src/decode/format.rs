//! `format`.
//!
//! Only formats with a direct validator in the standard packages produce a
//! constraint; the rest are recognized and accepted as-is.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ast::Expr;
use crate::error::ErrorKind;
use crate::version::{Version, VersionSet};

use super::state::{CoreType, State};
use super::Node;

#[derive(Debug, Clone, Copy)]
enum Effect {
    None,
    /// A validator from a standard package, applied to strings.
    String(&'static str, &'static str),
    /// `time.Format("2006-01-02")`.
    Date,
    /// A sized integer type.
    Number(&'static str),
}

struct FormatInfo {
    versions: VersionSet,
    effect: Effect,
}

fn formats() -> &'static HashMap<&'static str, FormatInfo> {
    static FORMATS: OnceLock<HashMap<&'static str, FormatInfo>> = OnceLock::new();
    FORMATS.get_or_init(|| {
        let all = VersionSet::ALL;
        let open_api = VersionSet::OPEN_API;
        let k8s = VersionSet::K8S;
        let since = VersionSet::since;
        let info = |versions: VersionSet, effect: Effect| FormatInfo { versions, effect };

        let entries = vec![
            ("binary", info(open_api, Effect::None)),
            ("bsonobjectid", info(k8s, Effect::None)),
            ("byte", info(open_api | k8s, Effect::None)),
            ("cidr", info(k8s, Effect::None)),
            ("creditcard", info(k8s, Effect::None)),
            ("data", info(open_api, Effect::None)),
            ("date", info(since(Version::Draft7) | open_api | k8s, Effect::Date)),
            ("date-time", info(all, Effect::String("time", "Time"))),
            ("datetime", info(k8s, Effect::String("time", "Time"))),
            ("double", info(open_api | k8s, Effect::None)),
            ("duration", info(since(Version::Draft2019_09) | k8s, Effect::None)),
            ("email", info(all, Effect::None)),
            ("float", info(open_api | k8s, Effect::None)),
            ("hexcolor", info(k8s, Effect::None)),
            ("hostname", info(all, Effect::None)),
            ("idn-email", info(since(Version::Draft7), Effect::None)),
            ("idn-hostname", info(since(Version::Draft7), Effect::None)),
            ("int32", info(open_api | k8s, Effect::Number("int32"))),
            ("int64", info(open_api | k8s, Effect::Number("int64"))),
            ("ipv4", info(all, Effect::None)),
            ("ipv6", info(all, Effect::None)),
            ("iri", info(since(Version::Draft7), Effect::String("net", "AbsURL"))),
            ("iri-reference", info(since(Version::Draft7), Effect::String("net", "URL"))),
            ("isbn", info(k8s, Effect::None)),
            ("isbn10", info(k8s, Effect::None)),
            ("isbn13", info(k8s, Effect::None)),
            ("json-pointer", info(since(Version::Draft6), Effect::None)),
            ("mac", info(k8s, Effect::None)),
            ("password", info(open_api | k8s, Effect::None)),
            ("regex", info(since(Version::Draft7), Effect::String("regexp", "Valid"))),
            ("relative-json-pointer", info(since(Version::Draft7), Effect::None)),
            ("rgbcolor", info(k8s, Effect::None)),
            ("ssn", info(k8s, Effect::None)),
            ("time", info(since(Version::Draft7), Effect::None)),
            ("uint32", info(k8s, Effect::Number("uint32"))),
            ("uint64", info(k8s, Effect::Number("uint64"))),
            ("uri", info(all, Effect::String("net", "AbsURL"))),
            ("uri-reference", info(since(Version::Draft6), Effect::String("net", "URL"))),
            ("uri-template", info(since(Version::Draft6), Effect::None)),
            ("uuid", info(since(Version::Draft2019_09) | k8s, Effect::None)),
            ("uuid3", info(k8s, Effect::None)),
            ("uuid4", info(k8s, Effect::None)),
            ("uuid5", info(k8s, Effect::None)),
        ];
        entries.into_iter().collect()
    })
}

pub(super) fn format<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let Some(name) = s.str_value(n) else {
        return;
    };
    let version = s.info.version;
    // OpenAPI allows any format value, so unknown ones are never an error
    // there.
    let report = s.d.cfg.strict_keywords && !version.is(VersionSet::OPEN_API_LIKE);
    let Some(info) = formats().get(name) else {
        if report {
            s.errf(ErrorKind::Version, n, format!("unknown format {name:?}"));
        }
        return;
    };
    if !version.is(info.versions) {
        if report {
            let msg = format!("format {name:?} is not recognized in schema version {version}");
            s.errf(ErrorKind::Version, n, msg);
        }
        return;
    }
    match info.effect {
        Effect::None => {}
        Effect::String(pkg, func) => s.add(CoreType::String, n, Expr::pkg_ident(pkg, func)),
        Effect::Date => {
            let layout = Expr::string("2006-01-02");
            s.add(CoreType::String, n, Expr::call("time", "Format", vec![layout]));
        }
        Effect::Number(ident) => s.add(CoreType::Number, n, Expr::ident(ident)),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
