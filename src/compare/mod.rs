//! Attribute-by-attribute comparison of one merged info record against the
//! package manager's record for the same package.
mod equivalence;

use crate::record::{AttrValue, Record, PKGNAME_KEY};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;

use equivalence::Equivalence;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// The external record has the attribute; the info record does not.
    OnlyInExternal,
    /// The external record says `None` while the info record has a value.
    OnlyInParsed,
    ValueMismatch,
}

/// One attribute on which the two sources disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub subject: String,
    pub attribute: String,
    pub kind: DiscrepancyKind,
    pub external: AttrValue,
    pub parsed: Option<AttrValue>,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = &self.subject;
        let attribute = &self.attribute;
        match (self.kind, &self.parsed) {
            (DiscrepancyKind::OnlyInParsed, Some(parsed)) => {
                writeln!(
                    f,
                    "DIFF({subject}): attribute {attribute} in info record, not in repo"
                )?;
                writeln!(f, "  info   : {parsed}")
            }
            (DiscrepancyKind::ValueMismatch, Some(parsed)) => {
                writeln!(f, "DIFF({subject}|{attribute}):")?;
                writeln!(f, "  repo   : {}", self.external)?;
                writeln!(f, "  info   : {parsed}")
            }
            _ => {
                writeln!(
                    f,
                    "DIFF({subject}): attribute {attribute} in repo, not in info record"
                )?;
                writeln!(f, "  repo   : {}", self.external)
            }
        }
    }
}

/// Receives discrepancies as soon as the comparator finds them.
pub trait DiffSink {
    fn report(&mut self, diff: &Discrepancy);
}

/// Prints each discrepancy block to stdout in one write so blocks from
/// parallel workers never interleave mid-block.
#[derive(Debug, Default)]
pub struct PrintingSink;

impl DiffSink for PrintingSink {
    fn report(&mut self, diff: &Discrepancy) {
        let block = format!("{diff}\n");
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = stdout.write_all(block.as_bytes()) {
            tracing::warn!(error = %err, "failed to write discrepancy");
        }
    }
}

/// Discards discrepancies; the comparator's count is all that remains.
#[derive(Debug, Default)]
pub struct QuietSink;

impl DiffSink for QuietSink {
    fn report(&mut self, _diff: &Discrepancy) {}
}

#[derive(Debug, Default)]
pub struct CollectingDiffs {
    pub diffs: Vec<Discrepancy>,
}

impl DiffSink for CollectingDiffs {
    fn report(&mut self, diff: &Discrepancy) {
        self.diffs.push(diff.clone());
    }
}

/// Compare every attribute of `external` against `merged`.
///
/// Attributes present only in `merged` are not visited. Returns the number of
/// discrepancies reported to `sink`.
pub fn compare(external: &Record, merged: &Record, sink: &mut dyn DiffSink) -> Result<usize> {
    let subject = merged
        .get(PKGNAME_KEY)
        .and_then(AttrValue::as_single)
        .ok_or_else(|| anyhow!("merged record has no {PKGNAME_KEY} attribute"))?;
    let engine = Equivalence::new(merged);

    let mut count = 0;
    for (attribute, external_value) in external {
        let parsed = merged.get(attribute);
        let Some((kind, parsed)) = classify(&engine, attribute, external_value, parsed) else {
            continue;
        };
        count += 1;
        sink.report(&Discrepancy {
            subject: subject.to_string(),
            attribute: attribute.clone(),
            kind,
            external: external_value.clone(),
            parsed,
        });
    }

    tracing::debug!(subject, attributes = external.len(), diffs = count, "comparison complete");
    Ok(count)
}

fn classify(
    engine: &Equivalence<'_>,
    attribute: &str,
    external: &AttrValue,
    parsed: Option<&AttrValue>,
) -> Option<(DiscrepancyKind, Option<AttrValue>)> {
    let Some(parsed) = parsed else {
        return Some((DiscrepancyKind::OnlyInExternal, None));
    };
    if external.is_none_marker() && parsed.is_truthy() {
        return Some((DiscrepancyKind::OnlyInParsed, Some(parsed.clone())));
    }
    if external == parsed || engine.are_equivalent(attribute, external, parsed) {
        return None;
    }
    Some((
        DiscrepancyKind::ValueMismatch,
        Some(engine.reported_value(attribute, parsed)),
    ))
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
