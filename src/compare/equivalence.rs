//! Attribute-specific equivalence rules between the external source and a
//! merged info record.
//!
//! Only consulted after plain equality has failed. The external value is the
//! one normalized; the parsed value is the reference.
use crate::record::{AttrValue, Record};

/// Suffix the package manager appends to soname-versioned dependencies on
/// 64-bit builds.
const SOARCH_SUFFIX: &str = "-64";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    /// `pkgver` is compared against `[epoch:]pkgver-pkgrel`.
    FullVersion,
    /// Soname architecture markers are stripped from external tokens.
    StripSoarch,
    /// Both sides are joined with spaces before comparing.
    JoinedWords,
    Exact,
}

fn rule_for(attr: &str) -> Rule {
    match attr {
        "pkgver" => Rule::FullVersion,
        "depends" | "provides" => Rule::StripSoarch,
        "license" => Rule::JoinedWords,
        _ => Rule::Exact,
    }
}

/// Rule evaluation bound to the merged record a comparison runs against.
#[derive(Clone, Copy, Debug)]
pub struct Equivalence<'a> {
    merged: &'a Record,
}

impl<'a> Equivalence<'a> {
    pub fn new(merged: &'a Record) -> Self {
        Self { merged }
    }

    /// Decide whether `external` and `parsed` describe the same value of
    /// `attr` once the attribute's rule is applied.
    pub fn are_equivalent(&self, attr: &str, external: &AttrValue, parsed: &AttrValue) -> bool {
        match rule_for(attr) {
            Rule::FullVersion => match full_version(self.merged) {
                Some(fullver) => external.as_single() == Some(fullver.as_str()),
                None => false,
            },
            Rule::StripSoarch => strip_soarch(external.tokens()) == parsed.tokens(),
            Rule::JoinedWords => external.tokens().join(" ") == parsed.tokens().join(" "),
            Rule::Exact => false,
        }
    }

    /// Value of `attr` as it should appear in a mismatch report. For
    /// `pkgver` this is the reconstructed composite version.
    pub fn reported_value(&self, attr: &str, parsed: &AttrValue) -> AttrValue {
        if rule_for(attr) == Rule::FullVersion {
            if let Some(fullver) = full_version(self.merged) {
                return AttrValue::Single(fullver);
            }
        }
        parsed.clone()
    }
}

/// Rebuild the package manager's version string from a merged record.
///
/// Returns `None` when `pkgver` or `pkgrel` is missing or not single-valued.
pub fn full_version(merged: &Record) -> Option<String> {
    let pkgver = merged.get("pkgver")?.as_single()?;
    let pkgrel = merged.get("pkgrel")?.as_single()?;
    match merged.get("epoch") {
        Some(epoch) if epoch.is_truthy() => Some(format!("{epoch}:{pkgver}-{pkgrel}")),
        _ => Some(format!("{pkgver}-{pkgrel}")),
    }
}

/// Reduce `name=version-64` tokens to `name`. Other tokens pass through.
pub fn strip_soarch(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            if token.ends_with(SOARCH_SUFFIX) {
                if let Some((name, _)) = token.split_once('=') {
                    return name.to_string();
                }
            }
            token.clone()
        })
        .collect()
}
