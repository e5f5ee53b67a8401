use std::{io, path::PathBuf, process::ExitCode};

use clap::Parser;
use lab_indicators::{runner, Command};
use tracing::error;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding entity-csvs/ and cache/
    root: PathBuf,

    /// Engine config, defaults to <root>/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    let res = runner(
        &args.root,
        args.config.as_deref(),
        args.locale.as_deref(),
        args.command,
        &mut stdout.lock(),
    );
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(configuration = e.is_configuration(), "{e}");
            ExitCode::FAILURE
        }
    }
}
