//! Value kinds of the type language, as a small bitset.
//!
//! Used on both sides: the decoder narrows `allowed_types`/`known_types`
//! with it, and the generator maps kinds back to JSON Schema `type` names.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Kind(u8);

impl Kind {
    pub const BOTTOM: Kind = Kind(0);
    pub const NULL: Kind = Kind(1 << 0);
    pub const BOOL: Kind = Kind(1 << 1);
    pub const INT: Kind = Kind(1 << 2);
    pub const FLOAT: Kind = Kind(1 << 3);
    pub const STRING: Kind = Kind(1 << 4);
    pub const LIST: Kind = Kind(1 << 5);
    pub const STRUCT: Kind = Kind(1 << 6);

    pub const NUMBER: Kind = Kind(Self::INT.0 | Self::FLOAT.0);
    pub const TOP: Kind = Kind(0x7f);

    /// The primitive kinds in display order.
    const NAMED: [(Kind, &'static str); 7] = [
        (Kind::NULL, "null"),
        (Kind::BOOL, "bool"),
        (Kind::INT, "int"),
        (Kind::FLOAT, "float"),
        (Kind::STRING, "string"),
        (Kind::LIST, "list"),
        (Kind::STRUCT, "struct"),
    ];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Kind) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Kind) -> bool {
        self.0 & other.0 != 0
    }

    pub fn without(self, other: Kind) -> Kind {
        Kind(self.0 & !other.0)
    }

    /// Iterates over the primitive kinds in the set.
    pub fn iter(self) -> impl Iterator<Item = Kind> {
        Self::NAMED
            .into_iter()
            .map(|(k, _)| k)
            .filter(move |k| self.intersects(*k))
    }

    /// The kind of a JSON value. Numbers without a fractional representation
    /// are `int`.
    pub fn of_json(v: &Value) -> Kind {
        match v {
            Value::Null => Kind::NULL,
            Value::Bool(_) => Kind::BOOL,
            Value::Number(n) if n.is_i64() || n.is_u64() => Kind::INT,
            Value::Number(_) => Kind::FLOAT,
            Value::String(_) => Kind::STRING,
            Value::Array(_) => Kind::LIST,
            Value::Object(_) => Kind::STRUCT,
        }
    }

    /// Name used in diagnostics for the kind of a JSON value, matching the
    /// JSON Schema `type` vocabulary.
    pub fn json_type_name(v: &Value) -> &'static str {
        match v {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "struct",
        }
    }

    /// JSON Schema `type` names covering this kind. Any float makes the
    /// whole numeric range `number`, since JSON Schema has no float type.
    pub fn json_schema_types(self) -> Vec<&'static str> {
        let mut types = Vec::new();
        let mut rest = self;
        if rest.intersects(Kind::FLOAT) {
            rest = rest.without(Kind::NUMBER);
            types.push("number");
        }
        for (k, name) in [
            (Kind::NULL, "null"),
            (Kind::BOOL, "boolean"),
            (Kind::STRING, "string"),
            (Kind::INT, "integer"),
            (Kind::STRUCT, "object"),
            (Kind::LIST, "array"),
        ] {
            if rest.intersects(k) {
                types.push(name);
            }
        }
        types
    }
}

impl BitOr for Kind {
    type Output = Kind;
    fn bitor(self, rhs: Kind) -> Kind {
        Kind(self.0 | rhs.0)
    }
}

impl BitOrAssign for Kind {
    fn bitor_assign(&mut self, rhs: Kind) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Kind {
    type Output = Kind;
    fn bitand(self, rhs: Kind) -> Kind {
        Kind(self.0 & rhs.0)
    }
}

impl BitAndAssign for Kind {
    fn bitand_assign(&mut self, rhs: Kind) {
        self.0 &= rhs.0;
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Kind::TOP {
            return f.write_str("_");
        }
        if self.is_empty() {
            return f.write_str("_|_");
        }
        let mut first = true;
        let mut rest = *self;
        if rest.contains(Kind::NUMBER) {
            rest = rest.without(Kind::NUMBER);
            // Keep "number" in the position "int" would have had.
            let mut parts: Vec<&str> = Vec::new();
            for (k, name) in Self::NAMED {
                if k == Kind::INT {
                    parts.push("number");
                } else if rest.intersects(k) {
                    parts.push(name);
                }
            }
            return f.write_str(&parts.join("|"));
        }
        for (k, name) in Self::NAMED {
            if rest.intersects(k) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind {0:?}")]
pub struct ParseKindError(String);

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut kind = Kind::BOTTOM;
        for part in s.split('|').map(str::trim) {
            kind |= match part {
                "_" => Kind::TOP,
                "_|_" | "" => Kind::BOTTOM,
                "number" => Kind::NUMBER,
                other => Self::NAMED
                    .into_iter()
                    .find(|(_, name)| *name == other)
                    .map(|(k, _)| k)
                    .ok_or_else(|| ParseKindError(other.to_string()))?,
            };
        }
        Ok(kind)
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
