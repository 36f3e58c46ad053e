mod assemble;
mod cli;
mod config;
mod join;
mod model;
mod table;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = cli::Cli::parse();
    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Log to stderr so merged rows on stdout stay clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,stormjoin=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
