//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_aurcheck")
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Scripts used as fake external tools need a POSIX shell.
pub fn shell_available() -> bool {
    find_in_path("sh").is_some()
}

/// Temporary directory laid out like a host: producer script, per-package
/// info files, sync databases, and a build-recipe tree.
pub struct Workspace {
    pub dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("info")).expect("create info dir");
        std::fs::create_dir_all(dir.path().join("sync")).expect("create sync dir");
        std::fs::create_dir_all(dir.path().join("abs")).expect("create recipe dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn sync_dir(&self) -> PathBuf {
        self.path().join("sync")
    }

    pub fn recipe_root(&self) -> PathBuf {
        self.path().join("abs")
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents.as_bytes()).expect("write file");
        path
    }

    pub fn write_script(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.write_file(rel, body);
        let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    /// Info-record text the fake producer prints for `pkgname`.
    pub fn write_info(&self, pkgname: &str, text: &str) {
        self.write_file(&format!("info/{pkgname}.info"), text);
    }

    /// Producer that prints `info/<pkgname>.info` for subject `repo/pkgname`
    /// and fails when the file is missing.
    pub fn producer(&self) -> PathBuf {
        let info_dir = self.path().join("info");
        let body = format!(
            "#!/bin/sh\nexec cat \"{}/${{1#*/}}.info\"\n",
            info_dir.display()
        );
        self.write_script("bin/introspect", &body)
    }

    pub fn write_recipe(&self, repo: &str, pkgname: &str) {
        self.write_file(&format!("abs/{repo}/{pkgname}/PKGBUILD"), "pkgname=x\n");
    }

    /// Write `sync/<repo>.db` from `(path, contents)` entries.
    pub fn write_sync_db(&self, repo: &str, entries: &[(&str, &str)], gzip: bool) {
        let tar_bytes = build_tar(entries);
        let bytes = if gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&tar_bytes).expect("compress db");
            encoder.finish().expect("finish gzip")
        } else {
            tar_bytes
        };
        std::fs::write(self.sync_dir().join(format!("{repo}.db")), bytes).expect("write db");
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(bin());
        command
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("HOME", self.path())
            .current_dir(self.path());
        command
    }

    /// Run `compare` against this workspace's producer and sync database.
    pub fn compare(&self, repo: &str, extra: &[&str]) -> Output {
        self.command()
            .arg("compare")
            .arg("--repo")
            .arg(repo)
            .arg("--producer")
            .arg(self.producer())
            .arg("--sync-db-dir")
            .arg(self.sync_dir())
            .arg("--recipe-root")
            .arg(self.recipe_root())
            .args(extra)
            .output()
            .expect("run aurcheck compare")
    }
}

pub fn build_tar(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("append tar entry");
    }
    builder.into_inner().expect("finish tar")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
