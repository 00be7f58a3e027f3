//! The package manager's own view of a repository, used as ground truth.
mod db;
mod query;

use crate::record::Record;
use anyhow::Result;

pub use db::SyncDb;
pub use query::QueryTool;

/// Something that can list a repository and hand out per-package records.
///
/// Implementations are shared across comparison workers.
pub trait ExternalSource: Send + Sync {
    /// Short label for log and error messages.
    fn describe(&self) -> String;

    /// Every package name the source knows for its repository.
    fn package_names(&self) -> Result<Vec<String>>;

    /// The record for `name`, or `None` if the source has no such package.
    fn record(&self, name: &str) -> Result<Option<Record>>;
}
