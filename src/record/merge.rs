use super::{AttrValue, Record, PKGNAME_KEY};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

/// Parsed info-record document: one base section plus named variant sections.
///
/// Sections are only written while parsing; afterwards every accessor hands
/// out shared references or fresh copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoRecord {
    pkgbase: Option<String>,
    base: Record,
    packages: BTreeMap<String, Record>,
}

impl InfoRecord {
    /// Name of the package collection, if a base section was seen.
    pub fn pkgbase(&self) -> Option<&str> {
        self.pkgbase.as_deref()
    }

    pub fn base(&self) -> &Record {
        &self.base
    }

    pub fn package(&self, name: &str) -> Option<&Record> {
        self.packages.get(name)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Names of all variant sections. The iterator borrows the record, so
    /// calling this again restarts the enumeration.
    pub fn package_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.packages.keys().map(String::as_str)
    }

    /// Flatten the base section with one variant.
    ///
    /// Variant attributes replace base attributes wholesale and `pkgname`
    /// is always the variant's own name.
    pub fn merged_package(&self, name: &str) -> Result<Record> {
        let package = self
            .package(name)
            .ok_or_else(|| anyhow!("unknown package {name:?} in info record"))?;

        let mut merged = self.base().clone();
        for (key, value) in package {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert(PKGNAME_KEY.to_string(), AttrValue::Single(name.to_string()));
        Ok(merged)
    }

    /// Start a fresh base section named `name`. Anything a previous base
    /// header collected is discarded.
    pub(super) fn open_base(&mut self, name: &str) {
        self.pkgbase = Some(name.to_string());
        self.base = Record::from([(
            PKGNAME_KEY.to_string(),
            AttrValue::Single(name.to_string()),
        )]);
    }

    pub(super) fn base_mut(&mut self) -> &mut Record {
        &mut self.base
    }

    /// Open or reopen a variant section.
    pub(super) fn package_mut(&mut self, name: &str) -> &mut Record {
        self.packages.entry(name.to_string()).or_default()
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
