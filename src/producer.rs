//! Invocation of the external tool that renders a build recipe as
//! info-record text.
use crate::process::{run_checked, split_command};
use crate::record::{parse_info, ErrorSink, InfoRecord};
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Producer {
    command: Vec<String>,
    timeout: Option<Duration>,
}

impl Producer {
    pub fn new(command: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            command: split_command(command).context("producer command")?,
            timeout,
        })
    }

    /// Run the producer for `subject` and return its stdout lines.
    pub fn render(&self, subject: &str) -> Result<Vec<String>> {
        let mut argv = self.command.clone();
        argv.push(subject.to_string());
        let stdout = run_checked(&argv, &[], self.timeout)
            .with_context(|| format!("produce info record for {subject}"))?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    /// Render and parse `subject` in one step.
    pub fn parse(&self, subject: &str, sink: &mut dyn ErrorSink) -> Result<InfoRecord> {
        let lines = self.render(subject)?;
        Ok(parse_info(&lines, sink))
    }
}
