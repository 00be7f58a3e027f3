mod common;

use common::{stderr, stdout, Workspace};
use std::io::Write;
use std::process::Stdio;

const SPLIT_INFO: &str = "\
pkgbase = gcc
\tpkgver = 9.2.0
\tpkgrel = 3
\tdepends = glibc
\tlicense = GPL

pkgname = gcc
\tpkgdesc = The GNU Compiler Collection

pkgname = gcc-libs
\tpkgdesc = Runtime libraries
\tdepends = glibc
\tdepends = zlib
";

#[test]
fn parse_prints_each_merged_package() {
    let ws = Workspace::new();
    let path = ws.write_file(".AURINFO", SPLIT_INFO);

    let output = ws
        .command()
        .arg("parse")
        .arg(&path)
        .output()
        .expect("run aurcheck parse");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains(">>> merged package: gcc\n"));
    assert!(text.contains(">>> merged package: gcc-libs\n"));
    assert!(text.contains("    pkgdesc: Runtime libraries\n"));
    assert!(text.contains("    depends: [glibc, zlib]\n"));
    assert!(text.contains("    license: [GPL]\n"));
}

#[test]
fn parse_defaults_to_aurinfo_in_working_directory() {
    let ws = Workspace::new();
    ws.write_file(".AURINFO", SPLIT_INFO);

    let output = ws
        .command()
        .arg("parse")
        .output()
        .expect("run aurcheck parse");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains(">>> merged package: gcc-libs"));
}

#[test]
fn parse_json_emits_variant_map() {
    let ws = Workspace::new();
    let path = ws.write_file("info.txt", SPLIT_INFO);

    let output = ws
        .command()
        .args(["parse", "--json"])
        .arg(&path)
        .output()
        .expect("run aurcheck parse --json");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["gcc"]["pkgname"], "gcc");
    assert_eq!(json["gcc"]["pkgver"], "9.2.0");
    assert_eq!(json["gcc-libs"]["pkgname"], "gcc-libs");
    assert_eq!(json["gcc-libs"]["depends"], serde_json::json!(["glibc", "zlib"]));
    assert!(json.get("gcc").and_then(|pkg| pkg.get("pkgbase")).is_none());
}

#[test]
fn parse_reads_stdin_and_reports_errors_without_failing() {
    let ws = Workspace::new();
    let mut child = ws
        .command()
        .args(["parse", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn aurcheck parse -");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"\tpkgver = 1\npkgname = foo\n\tpkgver = 2\n")
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait aurcheck");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ERROR[1]: package attribute found outside of a package section"));
    assert!(stdout(&output).contains("    pkgver: 2\n"));
}

#[test]
fn validate_accepts_clean_record() {
    let ws = Workspace::new();
    let path = ws.write_file(".AURINFO", SPLIT_INFO);

    let output = ws
        .command()
        .arg("validate")
        .arg(&path)
        .output()
        .expect("run aurcheck validate");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).is_empty());
}

#[test]
fn validate_fails_with_line_numbered_errors() {
    let ws = Workspace::new();
    let path = ws.write_file(
        ".AURINFO",
        "pkgbase = foo\n\tpkgdesc = one\n\tpkgdesc = two\n\tgarbage\n",
    );

    let output = ws
        .command()
        .arg("validate")
        .arg(&path)
        .output()
        .expect("run aurcheck validate");
    assert!(!output.status.success());

    let err = stderr(&output);
    assert!(err.contains("error on line 3: overwriting attribute pkgdesc: one -> two"));
    assert!(err.contains("error on line 4: unexpected attribute format in section=foo"));
}

#[test]
fn missing_input_file_fails() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["validate", "absent.info"])
        .output()
        .expect("run aurcheck validate");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("absent.info"));
}
