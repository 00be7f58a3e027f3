//! Line-oriented parser for info records.
//!
//! Headers start in column zero; attribute lines are indented by a tab and
//! belong to the most recently opened section until a blank line closes it.
//! Structural problems are reported through an [`ErrorSink`] and never abort
//! the parse.
use super::merge::InfoRecord;
use super::{assign, Assign, PKGBASE_KEY};

const ATTRIBUTE_INDENT: char = '\t';
const DELIMITER: char = '=';

/// Receives line-numbered parse diagnostics.
pub trait ErrorSink {
    fn report(&mut self, line: usize, message: &str);
}

/// Writes diagnostics to stderr as they are found.
#[derive(Debug, Default)]
pub struct StderrSink;

impl ErrorSink for StderrSink {
    fn report(&mut self, line: usize, message: &str) {
        eprintln!("ERROR[{line}]: {message}");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Keeps diagnostics so a caller can turn them into a verdict.
#[derive(Debug, Default)]
pub struct CollectingSink {
    errors: Vec<ParseError>,
}

impl CollectingSink {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}

impl ErrorSink for CollectingSink {
    fn report(&mut self, line: usize, message: &str) {
        self.errors.push(ParseError {
            line,
            message: message.to_string(),
        });
    }
}

/// Section that attribute lines are currently written into.
#[derive(Clone, Debug)]
enum Target {
    Base,
    Package(String),
}

impl Target {
    fn label(&self, info: &InfoRecord) -> String {
        match self {
            Target::Base => info.pkgbase().unwrap_or(PKGBASE_KEY).to_string(),
            Target::Package(name) => name.clone(),
        }
    }
}

/// Parse an info-record line stream into its base and variant sections.
pub fn parse_info<I, S>(lines: I, sink: &mut dyn ErrorSink) -> InfoRecord
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut info = InfoRecord::default();
    let mut target: Option<Target> = None;

    for (index, raw) in lines.into_iter().enumerate() {
        let lineno = index + 1;
        let line = raw.as_ref().trim_end_matches(['\r', '\n']);
        target = parse_line(&mut info, target, lineno, line, sink);
    }

    info
}

fn parse_line(
    info: &mut InfoRecord,
    target: Option<Target>,
    lineno: usize,
    line: &str,
    sink: &mut dyn ErrorSink,
) -> Option<Target> {
    if line.trim().is_empty() {
        return None;
    }

    if !line.starts_with(ATTRIBUTE_INDENT) {
        return parse_header(info, target, lineno, line, sink);
    }

    let Some(current) = target else {
        sink.report(lineno, "package attribute found outside of a package section");
        return None;
    };

    let Some((key, value)) = split_pair(line) else {
        sink.report(
            lineno,
            &format!(
                "unexpected attribute format in section={}",
                current.label(info)
            ),
        );
        return Some(current);
    };

    let section = match &current {
        Target::Base => info.base_mut(),
        Target::Package(name) => info.package_mut(name),
    };
    if let Assign::Conflict { existing } = assign(section, key, value) {
        sink.report(
            lineno,
            &format!("overwriting attribute {key}: {existing} -> {value}"),
        );
    }
    Some(current)
}

fn parse_header(
    info: &mut InfoRecord,
    target: Option<Target>,
    lineno: usize,
    line: &str,
    sink: &mut dyn ErrorSink,
) -> Option<Target> {
    let Some((key, value)) = split_pair(line) else {
        let section = target
            .as_ref()
            .map(|current| current.label(info))
            .unwrap_or_else(|| "<none>".to_string());
        sink.report(
            lineno,
            &format!("unexpected header format in section={section}"),
        );
        return target;
    };

    if key == PKGBASE_KEY {
        info.open_base(value);
        return Some(Target::Base);
    }

    info.package_mut(value);
    Some(Target::Package(value.to_string()))
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(DELIMITER)?;
    Some((key.trim(), value.trim()))
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
