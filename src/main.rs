//! # trillc
//!
//! This binary drives the Trill front-end pipeline: lexing, parsing,
//! declaration registration and constraint-based semantic analysis. It has
//! no code generator attached — that, the C header importer, the
//! JIT/linker driver and diagnostic rendering are external collaborators —
//! so `trillc check` reports diagnostics and an exit status, nothing more.

mod cli;

use std::fs;
use std::process::ExitCode;

use cli::{Cli, Commands};
use log::{error, info};
use trill_lib::diagnostics::DiagnosticKind;
use trill_lib::source::SourceFileManager;

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::init();
    simple_logger::init_with_level((&args.verbosity).into())?;

    match args.command {
        Commands::Check(check_args) => run_check(check_args),
        Commands::Format(check_args) => run_format(check_args),
    }
}

fn run_check(args: cli::CheckArgs) -> anyhow::Result<ExitCode> {
    let path = fs::canonicalize(&args.file)?;
    let contents = fs::read_to_string(&path)?;

    let mut files = SourceFileManager::new();
    let file = files.add(&path, contents);

    info!("checking {}", path.display());

    if args.dump_parsed {
        let (unit, _) = trill_lib::parse_file(&files, file);
        info!("parsed AST:\n{:#?}", unit);
    }

    let (_, diagnostics) = trill_lib::check_file(&files, file);

    let mut exit_code = 0;
    for d in &diagnostics {
        let rendered = match &d.span {
            Some(range) => format!("{}:{}: {}", range.start.line + 1, range.start.col + 1, d.message),
            None => d.message.clone(),
        };
        match d.kind {
            DiagnosticKind::Error => {
                error!("{rendered}");
                exit_code = 1;
            }
            DiagnosticKind::Warning => log::warn!("{rendered}"),
            DiagnosticKind::Note => info!("{rendered}"),
        }
    }

    if exit_code == 0 {
        info!("no errors");
    }

    Ok(ExitCode::from(exit_code))
}

fn run_format(args: cli::CheckArgs) -> anyhow::Result<ExitCode> {
    let path = fs::canonicalize(&args.file)?;
    let contents = fs::read_to_string(&path)?;

    let mut files = SourceFileManager::new();
    let file = files.add(&path, contents);

    let (unit, diagnostics) = trill_lib::parse_file(&files, file);
    for d in &diagnostics {
        error!("{}", d.message);
    }
    if !diagnostics.is_empty() {
        return Ok(ExitCode::from(1));
    }

    print!("{}", trill_lib::formatter::format_source_unit(&unit));
    Ok(ExitCode::SUCCESS)
}
