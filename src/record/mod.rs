//! Attribute records for resolved package build metadata.
//!
//! A record maps attribute names to either a single string or an ordered list
//! of strings. Which shape a name takes is fixed by a closed schema, so the
//! parser and the external readers agree without inspecting values.
mod merge;
mod parse;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use merge::InfoRecord;
pub use parse::{parse_info, CollectingSink, ErrorSink, StderrSink};

/// Header key that opens the base section.
pub const PKGBASE_KEY: &str = "pkgbase";

/// Attribute carrying a record's identifying name.
pub const PKGNAME_KEY: &str = "pkgname";

/// Literal the package manager prints for an empty field.
pub const NONE_MARKER: &str = "None";

const MULTIVALUED_ATTRS: &[&str] = &[
    "arch",
    "groups",
    "makedepends",
    "checkdepends",
    "optdepends",
    "depends",
    "provides",
    "conflicts",
    "replaces",
    "options",
    "license",
    "source",
    "noextract",
    "backup",
];

/// Whether `attr` holds an ordered list of values rather than one string.
pub fn is_multi_valued(attr: &str) -> bool {
    MULTIVALUED_ATTRS.contains(&attr)
}

/// An attribute value in one of the two schema shapes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Single(String),
    Multi(Vec<String>),
}

impl AttrValue {
    /// Empty strings and empty lists count as unset.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Single(value) => !value.is_empty(),
            AttrValue::Multi(values) => !values.is_empty(),
        }
    }

    /// True for the package manager's `None` placeholder in either shape.
    pub fn is_none_marker(&self) -> bool {
        match self {
            AttrValue::Single(value) => value == NONE_MARKER,
            AttrValue::Multi(values) => values.len() == 1 && values[0] == NONE_MARKER,
        }
    }

    /// View the value as a token list; a single value is a list of one.
    pub fn tokens(&self) -> &[String] {
        match self {
            AttrValue::Single(value) => std::slice::from_ref(value),
            AttrValue::Multi(values) => values,
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            AttrValue::Single(value) => Some(value),
            AttrValue::Multi(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Single(value) => f.write_str(value),
            AttrValue::Multi(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(values: Vec<&str>) -> Self {
        AttrValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// Attribute name to value. Ordering is irrelevant to comparison; the sorted
/// map keeps printed output stable.
pub type Record = BTreeMap<String, AttrValue>;

/// Outcome of storing one attribute into a record.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Assign {
    Stored,
    /// A single-valued attribute already had a non-empty value, which is kept.
    Conflict { existing: String },
}

/// Store `value` under `key` following the schema: multi-valued attributes
/// append, single-valued ones are set once.
pub(crate) fn assign(record: &mut Record, key: &str, value: &str) -> Assign {
    if is_multi_valued(key) {
        match record.get_mut(key) {
            Some(AttrValue::Multi(values)) => values.push(value.to_string()),
            _ => {
                record.insert(key.to_string(), AttrValue::Multi(vec![value.to_string()]));
            }
        }
        return Assign::Stored;
    }

    match record.get(key) {
        Some(existing) if existing.is_truthy() => Assign::Conflict {
            existing: existing.to_string(),
        },
        _ => {
            record.insert(key.to_string(), AttrValue::Single(value.to_string()));
            Assign::Stored
        }
    }
}
