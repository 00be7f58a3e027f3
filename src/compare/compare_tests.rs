use super::{compare, CollectingDiffs, Discrepancy, DiscrepancyKind, QuietSink};
use crate::record::{AttrValue, Record};

fn record(pairs: Vec<(&str, AttrValue)>) -> Record {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn merged_ponies() -> Record {
    record(vec![
        ("pkgname", AttrValue::from("ponies")),
        ("pkgver", AttrValue::from("1.2")),
        ("pkgrel", AttrValue::from("3")),
        ("pkgdesc", AttrValue::from("Ponies")),
        ("depends", AttrValue::from(vec!["foo", "bar"])),
        ("license", AttrValue::from(vec!["GPL", "LGPL"])),
        ("makedepends", AttrValue::from(vec!["cmake"])),
    ])
}

fn run(external: &Record, merged: &Record) -> Vec<Discrepancy> {
    let mut sink = CollectingDiffs::default();
    let count = compare(external, merged, &mut sink).expect("compare");
    assert_eq!(count, sink.diffs.len());
    sink.diffs
}

#[test]
fn matching_records_have_no_discrepancies() {
    let external = record(vec![
        ("pkgname", AttrValue::from("ponies")),
        ("pkgver", AttrValue::from("1.2-3")),
        ("depends", AttrValue::from(vec!["foo=1-64", "bar"])),
        ("license", AttrValue::from(vec!["GPL LGPL"])),
        ("pkgdesc", AttrValue::from("Ponies")),
    ]);
    assert!(run(&external, &merged_ponies()).is_empty());
}

#[test]
fn attribute_missing_from_info_record_is_reported() {
    let external = record(vec![("url", AttrValue::from("https://example.org"))]);
    let diffs = run(&external, &merged_ponies());
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].kind, DiscrepancyKind::OnlyInExternal);
    assert_eq!(diffs[0].attribute, "url");
    assert_eq!(diffs[0].subject, "ponies");
    assert!(diffs[0].parsed.is_none());
}

#[test]
fn attributes_only_in_info_record_are_not_visited() {
    let external = record(vec![("pkgname", AttrValue::from("ponies"))]);
    assert!(run(&external, &merged_ponies()).is_empty());
}

#[test]
fn none_marker_against_present_value_is_reported() {
    let external = record(vec![("makedepends", AttrValue::from(vec!["None"]))]);
    let diffs = run(&external, &merged_ponies());
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].kind, DiscrepancyKind::OnlyInParsed);
    assert_eq!(diffs[0].parsed, Some(AttrValue::from(vec!["cmake"])));
}

#[test]
fn none_marker_against_empty_value_falls_through_to_rules() {
    let mut merged = merged_ponies();
    merged.insert("groups".to_string(), AttrValue::Multi(Vec::new()));
    let external = record(vec![("groups", AttrValue::from("None"))]);
    let diffs = run(&external, &merged);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].kind, DiscrepancyKind::ValueMismatch);
}

#[test]
fn version_mismatch_reports_reconstructed_value() {
    let mut merged = merged_ponies();
    merged.insert("epoch".to_string(), AttrValue::from("2"));
    let external = record(vec![("pkgver", AttrValue::from("1.2-3"))]);
    let diffs = run(&external, &merged);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].kind, DiscrepancyKind::ValueMismatch);
    assert_eq!(diffs[0].parsed, Some(AttrValue::from("2:1.2-3")));

    let external = record(vec![("pkgver", AttrValue::from("2:1.2-3"))]);
    assert!(run(&external, &merged).is_empty());
}

#[test]
fn soarch_suffix_other_than_64_is_a_mismatch() {
    let external = record(vec![("depends", AttrValue::from(vec!["foo=1.0-32", "bar"]))]);
    let diffs = run(&external, &merged_ponies());
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].external, AttrValue::from(vec!["foo=1.0-32", "bar"]));
    assert_eq!(diffs[0].parsed, Some(AttrValue::from(vec!["foo", "bar"])));
}

#[test]
fn every_discrepancy_is_counted() {
    let external = record(vec![
        ("pkgdesc", AttrValue::from("Unicorns")),
        ("url", AttrValue::from("https://example.org")),
        ("license", AttrValue::from(vec!["MIT"])),
        ("pkgname", AttrValue::from("ponies")),
    ]);
    let mut sink = QuietSink;
    assert_eq!(
        compare(&external, &merged_ponies(), &mut sink).expect("compare"),
        3
    );
}

#[test]
fn merged_record_without_pkgname_is_an_error() {
    let mut merged = merged_ponies();
    merged.remove("pkgname");
    let external = record(vec![("pkgdesc", AttrValue::from("Ponies"))]);
    let mut sink = QuietSink;
    let err = compare(&external, &merged, &mut sink).expect_err("missing pkgname");
    assert!(err.to_string().contains("pkgname"));
}

#[test]
fn discrepancy_blocks_name_subject_and_attribute() {
    let diff = Discrepancy {
        subject: "ponies".to_string(),
        attribute: "pkgdesc".to_string(),
        kind: DiscrepancyKind::ValueMismatch,
        external: AttrValue::from("Unicorns"),
        parsed: Some(AttrValue::from("Ponies")),
    };
    assert_eq!(
        diff.to_string(),
        "DIFF(ponies|pkgdesc):\n  repo   : Unicorns\n  info   : Ponies\n"
    );

    let missing = Discrepancy {
        kind: DiscrepancyKind::OnlyInExternal,
        parsed: None,
        ..diff
    };
    assert_eq!(
        missing.to_string(),
        "DIFF(ponies): attribute pkgdesc in repo, not in info record\n  repo   : Unicorns\n"
    );
}
