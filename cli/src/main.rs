#![deny(missing_docs)]

//! # apispec
//!
//! Command Line Interface for the HotCRP OpenAPI reconciler.
//!
//! Reads the API function registry, an optional existing specification and
//! Markdown description files, then writes the reconciled specification.
//! Conflicts are printed to stderr, one per line.

use apispec_core::AppResult;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod generate;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Rebuilds the HotCRP OpenAPI specification from the API function registry"
)]
struct Cli {
    /// Log verbosity; repeat for more (`-v` info, `-vv` debug, `-vvv` trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(flatten)]
    generate: generate::GenerateArgs,
}

/// Logs go to stderr so stdout stays free for the document.
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    generate::execute(&cli.generate)
}
