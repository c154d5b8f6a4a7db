//! CLI argument parsing for `trillc`.
//!
//! A `clap` derive `Cli` with a `verbosity` enum mapping onto `log::Level`;
//! just `check` and `format` subcommands since code generation and
//! execution live outside this repository.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the compiler front-end.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of `trillc`.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Log pipeline progress (which phase is running, file being checked).
    #[value(alias("2"))]
    Info,

    /// Log internal state of the front-end.
    #[value(alias("3"))]
    Debug,

    /// Log everything, including per-constraint solver traffic.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the front-end pipeline (lex, parse, register, constraint-solve,
    /// type-check) over a single source file and print its diagnostics.
    Check(CheckArgs),

    /// Pretty-print a source file's parsed AST (parse only, no sema).
    Format(CheckArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// The path to the Trill source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    pub dump_parsed: bool,
}
