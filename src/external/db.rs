//! Reader for the package manager's sync database: a tar archive (optionally
//! gzip-compressed) of `name-pkgver-pkgrel/` directories holding `%SECTION%`
//! files.
use super::ExternalSource;
use crate::record::{AttrValue, Record};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Section marker to `(attribute, multi-valued)`.
fn section_attr(section: &str) -> Option<(&'static str, bool)> {
    let mapped = match section {
        "%NAME%" => ("pkgname", false),
        "%VERSION%" => ("pkgver", false),
        "%DESC%" => ("pkgdesc", false),
        "%URL%" => ("url", false),
        "%LICENSE%" => ("license", true),
        "%GROUPS%" => ("groups", true),
        "%MAKEDEPENDS%" => ("makedepends", true),
        "%CHECKDEPENDS%" => ("checkdepends", true),
        "%DEPENDS%" => ("depends", true),
        "%OPTDEPENDS%" => ("optdepends", true),
        "%PROVIDES%" => ("provides", true),
        "%CONFLICTS%" => ("conflicts", true),
        "%REPLACES%" => ("replaces", true),
        _ => return None,
    };
    Some(mapped)
}

fn is_section(line: &str) -> bool {
    line.len() > 2 && line.starts_with('%') && line.ends_with('%')
}

/// Parse one database file into a record. Unknown sections are skipped.
pub fn parse_db_entry(text: &str) -> Record {
    let mut record = Record::new();
    let mut section: Option<(&'static str, bool)> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            section = None;
            continue;
        }
        if is_section(line) {
            section = section_attr(line);
            continue;
        }
        let Some((attr, multi)) = section else {
            continue;
        };
        if multi {
            match record.get_mut(attr) {
                Some(AttrValue::Multi(values)) => values.push(line.to_string()),
                _ => {
                    record.insert(attr.to_string(), AttrValue::Multi(vec![line.to_string()]));
                }
            }
        } else {
            record.insert(attr.to_string(), AttrValue::Single(line.to_string()));
        }
    }

    record
}

/// Recover the package name from a `name-pkgver-pkgrel` directory.
fn package_name_from_dir(dir: &str) -> Option<&str> {
    let mut parts = dir.rsplitn(3, '-');
    let _pkgrel = parts.next()?;
    let _pkgver = parts.next()?;
    parts.next().filter(|name| !name.is_empty())
}

/// Sync database loaded fully into memory.
#[derive(Debug, Default)]
pub struct SyncDb {
    repo: String,
    packages: BTreeMap<String, Record>,
}

impl SyncDb {
    /// Load `<dir>/<repo>.db`.
    pub fn open(dir: &Path, repo: &str) -> Result<Self> {
        let path: PathBuf = dir.join(format!("{repo}.db"));
        let bytes = std::fs::read(&path).with_context(|| format!("read sync db {}", path.display()))?;
        let db = Self::from_bytes(repo, &bytes)
            .with_context(|| format!("load sync db {}", path.display()))?;
        tracing::info!(
            repo,
            path = %path.display(),
            packages = db.len(),
            "sync db loaded"
        );
        Ok(db)
    }

    pub fn from_bytes(repo: &str, bytes: &[u8]) -> Result<Self> {
        let reader: Box<dyn Read + '_> = if bytes.starts_with(&GZIP_MAGIC) {
            Box::new(GzDecoder::new(bytes))
        } else {
            Box::new(bytes)
        };

        let mut archive = tar::Archive::new(reader);
        let mut packages: BTreeMap<String, Record> = BTreeMap::new();
        for entry in archive.entries().context("read tar entries")? {
            let mut entry = entry.context("read tar entry")?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().context("decode tar entry path")?.into_owned();
            let mut components = path.components();
            let (Some(dir), Some(_file)) = (components.next(), components.next()) else {
                continue;
            };
            let dir = dir.as_os_str().to_string_lossy().to_string();
            let Some(name) = package_name_from_dir(&dir) else {
                tracing::debug!(entry = %path.display(), "skipping unrecognized db entry");
                continue;
            };
            let name = name.to_string();

            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .with_context(|| format!("read db entry {}", path.display()))?;
            packages
                .entry(name)
                .or_default()
                .extend(parse_db_entry(&text));
        }

        Ok(Self {
            repo: repo.to_string(),
            packages,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Record> {
        self.packages.get(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }
}

impl ExternalSource for SyncDb {
    fn describe(&self) -> String {
        format!("sync db {}", self.repo)
    }

    fn package_names(&self) -> Result<Vec<String>> {
        Ok(self.packages.keys().cloned().collect())
    }

    fn record(&self, name: &str) -> Result<Option<Record>> {
        Ok(self.get(name).cloned())
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
