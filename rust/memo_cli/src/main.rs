mod cli;
mod commands;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use crate::cli::{
    Args,
    Commands,
};
use crate::commands::{
    main_build,
    main_merge,
    main_unaligned,
    main_write_template,
};
use crate::errors::CliError;

// The system allocator on windows makes the parallel build crawl.
#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Logs to stderr at `info` unless `RUST_LOG` says otherwise. Spans are
/// reported when they close, which gives the duration of each build step.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    set_global_default(subscriber).expect("Setting default subscriber failed");
}

fn main() -> Result<(), CliError> {
    init_logging();

    match Args::parse().command {
        Some(Commands::Build(args)) => main_build(args),
        Some(Commands::Unaligned(args)) => main_unaligned(args),
        Some(Commands::Merge(args)) => main_merge(args),
        Some(Commands::WriteTemplate(args)) => main_write_template(args),
        None => {
            println!("No command provided, see `memo --help`");
            Ok(())
        }
    }
}
