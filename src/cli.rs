//! CLI argument parsing.
//!
//! The CLI is thin: it resolves configuration and hands off to the parser,
//! comparator, and batch driver.
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "aurcheck",
    version,
    about = "Cross-check resolved build metadata against the package manager's database",
    after_help = "Examples:\n  aurcheck parse .AURINFO\n  aurcheck validate .AURINFO\n  aurcheck compare --repo extra\n  aurcheck compare --repo core --package glibc --source query",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (defaults to the user config directory when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Parse(ParseArgs),
    Validate(ValidateArgs),
    Compare(CompareArgs),
}

/// Parse command inputs.
#[derive(Parser, Debug)]
#[command(about = "Parse an info record and print every merged package")]
pub struct ParseArgs {
    /// Info-record file, or `-` for stdin
    #[arg(value_name = "FILE", default_value = ".AURINFO")]
    pub file: PathBuf,

    /// Emit merged packages as JSON keyed by package name
    #[arg(long)]
    pub json: bool,
}

/// Validate command inputs.
#[derive(Parser, Debug)]
#[command(about = "Check an info record for structural errors")]
pub struct ValidateArgs {
    /// Info-record file, or `-` for stdin
    #[arg(value_name = "FILE", default_value = ".AURINFO")]
    pub file: PathBuf,
}

/// Where the package manager's records come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Read the repository's sync database archive
    Db,
    /// Ask the package manager's query tool per package
    Query,
}

/// Compare command inputs.
#[derive(Parser, Debug)]
#[command(about = "Compare produced info records against the package manager")]
pub struct CompareArgs {
    /// Repository to compare
    #[arg(long, value_name = "REPO")]
    pub repo: String,

    /// Compare a single package instead of the whole repository
    #[arg(long, value_name = "PKG")]
    pub package: Option<String>,

    /// External record source
    #[arg(long, value_enum, default_value_t = SourceKind::Db)]
    pub source: SourceKind,

    /// Worker pool size
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Kill the producer after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_seconds: Option<u64>,

    /// Producer command; the subject is appended as the last argument
    #[arg(long, value_name = "CMD")]
    pub producer: Option<String>,

    /// Directory holding `<repo>.db`
    #[arg(long, value_name = "DIR")]
    pub sync_db_dir: Option<PathBuf>,

    /// Root of the build-recipe tree used to filter subjects
    #[arg(long, value_name = "DIR")]
    pub recipe_root: Option<PathBuf>,

    /// Compare every subject, even without a build recipe on disk
    #[arg(long)]
    pub no_recipe_filter: bool,

    /// Only count discrepancies; do not print each one
    #[arg(long, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit statistics, discrepancies, and failures as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}
