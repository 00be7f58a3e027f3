use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod batch;
mod cli;
mod compare;
mod config;
mod external;
mod process;
mod producer;
mod record;

use batch::{run_batch, select_subjects, BatchContext, Reporting};
use cli::{Command, CompareArgs, ParseArgs, RootArgs, SourceKind, ValidateArgs};
use config::{load_config, validate_config, Config};
use external::{ExternalSource, QueryTool, SyncDb};
use producer::Producer;
use record::{parse_info, CollectingSink, Record, StderrSink};

fn main() -> Result<ExitCode> {
    let cli = RootArgs::parse();
    let verbose = matches!(&cli.command, Command::Compare(args) if args.verbose);
    init_tracing(verbose);

    match cli.command {
        Command::Parse(args) => cmd_parse(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Compare(args) => cmd_compare(cli.config.as_deref(), args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read info record from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read info record {}", path.display()))
}

fn cmd_parse(args: ParseArgs) -> Result<ExitCode> {
    let text = read_input(&args.file)?;
    let info = parse_info(text.lines(), &mut StderrSink);

    let mut merged: BTreeMap<&str, Record> = BTreeMap::new();
    for name in info.package_names() {
        merged.insert(name, info.merged_package(name)?);
    }

    let mut out = std::io::stdout().lock();
    if args.json {
        let json = serde_json::to_string_pretty(&merged).context("serialize merged packages")?;
        writeln!(out, "{json}")?;
        return Ok(ExitCode::SUCCESS);
    }
    for (name, package) in &merged {
        writeln!(out, ">>> merged package: {name}")?;
        for (key, value) in package {
            writeln!(out, "    {key}: {value}")?;
        }
        writeln!(out)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(args: ValidateArgs) -> Result<ExitCode> {
    let text = read_input(&args.file)?;
    let mut sink = CollectingSink::default();
    parse_info(text.lines(), &mut sink);

    for error in sink.errors() {
        eprintln!("error on line {}: {}", error.line, error.message);
    }
    if sink.has_errors() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(config: &mut Config, args: &CompareArgs) {
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = args.timeout_seconds {
        config.timeout_seconds = Some(timeout);
    }
    if let Some(producer) = &args.producer {
        config.producer_command = producer.clone();
    }
    if let Some(dir) = &args.sync_db_dir {
        config.sync_db_dir = dir.clone();
    }
    if let Some(root) = &args.recipe_root {
        config.recipe_root = root.clone();
    }
}

fn open_source(config: &Config, args: &CompareArgs) -> Result<Box<dyn ExternalSource>> {
    let source: Box<dyn ExternalSource> = match args.source {
        SourceKind::Db => Box::new(SyncDb::open(&config.sync_db_dir, &args.repo)?),
        SourceKind::Query => Box::new(QueryTool::new(
            &config.query_command,
            &args.repo,
            config.timeout(),
        )?),
    };
    Ok(source)
}

fn cmd_compare(config_path: Option<&Path>, args: CompareArgs) -> Result<ExitCode> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, &args);
    validate_config(&config)?;

    let source = open_source(&config, &args)?;
    let recipe_filter =
        (!args.no_recipe_filter).then_some((config.recipe_root.as_path(), args.repo.as_str()));
    let subjects = select_subjects(source.as_ref(), args.package.as_deref(), recipe_filter)?;
    if subjects.is_empty() {
        eprintln!("no eligible subjects in {}", args.repo);
        return Ok(ExitCode::FAILURE);
    }

    let reporting = if args.json {
        Reporting::Collect
    } else if args.quiet {
        Reporting::Quiet
    } else {
        Reporting::Print
    };
    let ctx = BatchContext {
        repo: args.repo.clone(),
        producer: Producer::new(&config.producer_command, config.timeout())?,
        source: source.as_ref(),
        reporting,
    };
    let report = run_batch(&ctx, &subjects, config.jobs)?;

    let mut out = std::io::stdout().lock();
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serialize batch report")?;
        writeln!(out, "{json}")?;
    } else {
        report.statistics.write_summary(&mut out)?;
    }

    if report.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
