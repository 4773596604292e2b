//! mnemex CLI entry point.

use clap::Parser;
use mnemex::cli::commands;
use mnemex::cli::{Cli, Commands};
use mnemex::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.json {
                eprintln!("{}", err.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = err.hint() {
                    eprintln!("Error: {err}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {err}");
                }
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("mnemex=info"),
            2 => EnvFilter::new("mnemex=debug"),
            _ => EnvFilter::new("mnemex=trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let project_id = cli.project_id.as_deref();
    let json = cli.json;

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),

        Commands::Store(args) => commands::memory::store(args, db, project_id, json),
        Commands::Search(args) => commands::memory::search(args, db, project_id, json),
        Commands::Update(args) => commands::memory::update(args, db, json),
        Commands::Delete { id } => commands::memory::delete(id, db, json),
        Commands::List(args) => commands::memory::list(args, db, project_id, json),
        Commands::Stats => commands::memory::stats(db, json),
        Commands::Refresh { id } => commands::memory::refresh(id, db, json),
        Commands::Tag { command } => commands::memory::tag(command, db, json),
        Commands::Link { command } => commands::memory::link(command, db, json),
        Commands::Cleanup { purge_days, vacuum } => commands::memory::cleanup(*purge_days, *vacuum, db, json),
        Commands::Export { out } => commands::memory::export(out.as_deref(), db),
        Commands::Import { input } => commands::memory::import(input.as_deref(), db, json),
        Commands::FileCheck { path, project_id: local_project_id } => {
            let effective = local_project_id.as_deref().or(project_id);
            commands::memory::file_check(path, effective, db, json)
        }
    }
}
