//! Runs comparisons across many subjects on a bounded worker pool and
//! aggregates the results.
//!
//! Workers share nothing mutable: each invokes the producer, parses, and
//! compares on its own. Discrepancy blocks may interleave across subjects.
use crate::compare::{compare, CollectingDiffs, DiffSink, Discrepancy, PrintingSink, QuietSink};
use crate::external::ExternalSource;
use crate::producer::Producer;
use crate::record::CollectingSink;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};

/// How discrepancies are surfaced while comparing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reporting {
    /// Print each discrepancy block as it is found.
    Print,
    /// Count only.
    Quiet,
    /// Keep discrepancies for structured output.
    Collect,
}

/// Everything a worker needs to compare one subject.
pub struct BatchContext<'a> {
    pub repo: String,
    pub producer: Producer,
    pub source: &'a dyn ExternalSource,
    pub reporting: Reporting,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SubjectResult {
    pub subject: String,
    pub diffs: usize,
    pub attrs: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: String,
}

/// Sum of per-subject results. Addition is commutative and associative, so
/// worker completion order does not matter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Subjects compared successfully. Failed subjects are only in `failed`.
    pub subjects: usize,
    pub failed: usize,
    pub total_attrs: usize,
    pub total_diffs: usize,
    pub diff_subjects: usize,
}

impl RunStats {
    pub fn from_subject(result: &SubjectResult) -> Self {
        Self {
            subjects: 1,
            total_attrs: result.attrs,
            total_diffs: result.diffs,
            diff_subjects: usize::from(result.diffs > 0),
            ..Self::default()
        }
    }

    pub fn from_failure() -> Self {
        Self {
            failed: 1,
            ..Self::default()
        }
    }

    /// Every subject the run tried, compared or failed.
    pub fn attempted(&self) -> usize {
        self.subjects + self.failed
    }

    pub fn average_attrs(&self) -> f64 {
        ratio(self.total_attrs, self.subjects)
    }

    /// Percentage of subjects without any discrepancy.
    pub fn accuracy(&self) -> f64 {
        100.0 - ratio(self.diff_subjects, self.subjects) * 100.0
    }

    pub fn average_diffs_per_attr(&self) -> f64 {
        ratio(self.total_diffs, self.total_attrs)
    }

    /// Human-readable summary block.
    pub fn write_summary(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out)?;
        writeln!(out, "Total PKGBUILDs read: {}", self.attempted())?;
        if self.failed > 0 {
            writeln!(out, "Total PKGBUILDs compared: {}", self.subjects)?;
        }
        writeln!(out, "Total attributes checked: {}", self.total_attrs)?;
        writeln!(out, "Total differences found: {}", self.total_diffs)?;
        writeln!(out, "Average attributes per PKGBUILD: {:.2}", self.average_attrs())?;
        writeln!(out, "Accuracy across PKGBUILDs: {:.3}%", self.accuracy())?;
        if self.total_diffs > 0 {
            writeln!(out, "Total PKGBUILDs with differences: {}", self.diff_subjects)?;
            writeln!(
                out,
                "Average differences per attribute: {:.3}",
                self.average_diffs_per_attr()
            )?;
        }
        if self.failed > 0 {
            writeln!(out, "Subjects failed: {}", self.failed)?;
        }
        Ok(())
    }
}

impl Add for RunStats {
    type Output = RunStats;

    fn add(self, other: RunStats) -> RunStats {
        RunStats {
            subjects: self.subjects + other.subjects,
            failed: self.failed + other.failed,
            total_attrs: self.total_attrs + other.total_attrs,
            total_diffs: self.total_diffs + other.total_diffs,
            diff_subjects: self.diff_subjects + other.diff_subjects,
        }
    }
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: RunStats) {
        *self = *self + other;
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Outcome of a whole batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub statistics: RunStats,
    pub results: Vec<SubjectResult>,
    pub failures: Vec<SubjectFailure>,
}

/// Whether a build recipe for `pkgname` is readable under `recipe_root`.
pub fn recipe_exists(recipe_root: &Path, repo: &str, pkgname: &str) -> bool {
    let path: PathBuf = recipe_root.join(repo).join(pkgname).join("PKGBUILD");
    std::fs::File::open(path).is_ok()
}

/// Pick the subjects to compare: one named package or the whole repository,
/// optionally limited to those with a build recipe on disk.
pub fn select_subjects(
    source: &dyn ExternalSource,
    package: Option<&str>,
    recipe_filter: Option<(&Path, &str)>,
) -> Result<Vec<String>> {
    let candidates = match package {
        Some(name) => vec![name.to_string()],
        None => source
            .package_names()
            .with_context(|| format!("list packages from {}", source.describe()))?,
    };
    let total = candidates.len();

    let subjects: Vec<String> = match recipe_filter {
        Some((root, repo)) => candidates
            .into_iter()
            .filter(|name| recipe_exists(root, repo, name))
            .collect(),
        None => candidates,
    };

    tracing::info!(candidates = total, eligible = subjects.len(), "subjects selected");
    Ok(subjects)
}

/// Compare every variant the producer reports for `pkgname`.
pub fn compare_one(ctx: &BatchContext<'_>, pkgname: &str) -> Result<SubjectResult> {
    let subject = format!("{}/{pkgname}", ctx.repo);
    let mut parse_errors = CollectingSink::default();
    let info = ctx.producer.parse(&subject, &mut parse_errors)?;
    for error in parse_errors.errors() {
        eprintln!("ERROR[{subject}:{}]: {}", error.line, error.message);
    }
    if parse_errors.has_errors() {
        return Err(anyhow!(
            "info record for {subject} has {} parse error(s)",
            parse_errors.errors().len()
        ));
    }
    if info.package_count() == 0 {
        return Err(anyhow!("info record for {subject} has no packages"));
    }

    let mut collected = CollectingDiffs::default();
    let mut printing = PrintingSink;
    let mut quiet = QuietSink;
    let sink: &mut dyn DiffSink = match ctx.reporting {
        Reporting::Print => &mut printing,
        Reporting::Quiet => &mut quiet,
        Reporting::Collect => &mut collected,
    };

    let mut result = SubjectResult {
        subject: pkgname.to_string(),
        ..SubjectResult::default()
    };
    for name in info.package_names() {
        let merged = info.merged_package(name)?;
        let external = ctx
            .source
            .record(name)?
            .ok_or_else(|| anyhow!("package {name} not found in {}", ctx.source.describe()))?;
        result.diffs += compare(&external, &merged, sink)
            .with_context(|| format!("compare {name}"))?;
        result.attrs += merged.len();
    }
    result.discrepancies = collected.diffs;

    tracing::debug!(
        subject = subject.as_str(),
        variants = info.package_count(),
        diffs = result.diffs,
        attrs = result.attrs,
        "subject compared"
    );
    Ok(result)
}

/// Compare all `subjects` on a pool of `jobs` workers.
pub fn run_batch(ctx: &BatchContext<'_>, subjects: &[String], jobs: usize) -> Result<BatchReport> {
    if subjects.is_empty() {
        return Err(anyhow!("no eligible subjects to compare"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("build worker pool")?;

    let outcomes: Vec<(String, Result<SubjectResult>)> = pool.install(|| {
        subjects
            .par_iter()
            .map(|name| (name.clone(), compare_one(ctx, name)))
            .collect()
    });

    let mut report = BatchReport::default();
    for (subject, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                report.statistics += RunStats::from_subject(&result);
                report.results.push(result);
            }
            Err(err) => {
                tracing::warn!(subject = subject.as_str(), error = %format!("{err:#}"), "subject failed");
                eprintln!("ERROR({subject}): {err:#}");
                report.statistics += RunStats::from_failure();
                report.failures.push(SubjectFailure {
                    subject,
                    error: format!("{err:#}"),
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
