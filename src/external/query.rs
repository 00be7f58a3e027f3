//! Reader for the package manager query tool's `Key : value` listing.
use super::ExternalSource;
use crate::process::{run_checked, split_command};
use crate::record::{AttrValue, Record};
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Key names are only recognized untranslated.
const QUERY_ENV: &[(&str, &str)] = &[("LC_ALL", "C")];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Single,
    /// Values separated by commas or whitespace on one line.
    Words,
    /// One value per line, continued on indented lines.
    Lines,
}

fn key_attr(key: &str) -> Option<(&'static str, Shape)> {
    let mapped = match key {
        "Name" => ("pkgname", Shape::Single),
        "Version" => ("pkgver", Shape::Single),
        "Description" => ("pkgdesc", Shape::Single),
        "URL" => ("url", Shape::Single),
        "Licenses" => ("license", Shape::Words),
        "Groups" => ("groups", Shape::Words),
        "Provides" => ("provides", Shape::Words),
        "Depends On" => ("depends", Shape::Words),
        "Optional Deps" => ("optdepends", Shape::Lines),
        "Conflicts With" => ("conflicts", Shape::Words),
        "Replaces" => ("replaces", Shape::Words),
        _ => return None,
    };
    Some(mapped)
}

fn key_line() -> &'static Regex {
    static KEY_LINE: OnceLock<Regex> = OnceLock::new();
    KEY_LINE.get_or_init(|| {
        Regex::new(r"^(?P<key>[A-Z][A-Za-z ]*?)\s*:(?:\s+(?P<value>.*))?$")
            .expect("regex for query key lines")
    })
}

fn clean_line_value(value: &str) -> String {
    value.trim().trim_end_matches("[installed]").trim_end().to_string()
}

/// Parse one package block of query-tool output. Keys outside the whitelist
/// are dropped.
pub fn parse_query_output(text: &str) -> Record {
    let mut record = Record::new();
    let mut current: Option<(&'static str, Shape)> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            current = None;
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some((attr, Shape::Lines)) = current {
                if let Some(AttrValue::Multi(values)) = record.get_mut(attr) {
                    values.push(clean_line_value(line));
                }
            }
            continue;
        }

        let Some(caps) = key_line().captures(line) else {
            current = None;
            continue;
        };
        let key = caps.name("key").map(|m| m.as_str()).unwrap_or_default();
        let value = caps.name("value").map(|m| m.as_str().trim()).unwrap_or_default();
        current = key_attr(key);
        let Some((attr, shape)) = current else {
            continue;
        };

        let parsed = match shape {
            Shape::Single => AttrValue::Single(value.to_string()),
            Shape::Words => AttrValue::Multi(
                value
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|word| !word.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            Shape::Lines => AttrValue::Multi(if value.is_empty() {
                Vec::new()
            } else {
                vec![clean_line_value(value)]
            }),
        };
        record.insert(attr.to_string(), parsed);
    }

    record
}

/// Package manager query tool, asked about one repository.
#[derive(Debug)]
pub struct QueryTool {
    command: Vec<String>,
    repo: String,
    timeout: Option<Duration>,
}

impl QueryTool {
    pub fn new(command: &str, repo: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            command: split_command(command).context("query command")?,
            repo: repo.to_string(),
            timeout,
        })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut argv = self.command.clone();
        argv.extend(args.iter().map(|arg| arg.to_string()));
        run_checked(&argv, QUERY_ENV, self.timeout)
    }
}

impl ExternalSource for QueryTool {
    fn describe(&self) -> String {
        format!("query tool {} ({})", self.command[0], self.repo)
    }

    fn package_names(&self) -> Result<Vec<String>> {
        let stdout = self
            .run(&["-Slq", &self.repo])
            .with_context(|| format!("list packages in {}", self.repo))?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn record(&self, name: &str) -> Result<Option<Record>> {
        let target = format!("{}/{name}", self.repo);
        let stdout = self
            .run(&["-Si", &target])
            .with_context(|| format!("query {target}"))?;
        let record = parse_query_output(&stdout);
        Ok((!record.is_empty()).then_some(record))
    }
}
