mod client;
mod commands;
pub mod logging;

pub use commands::run;
pub use logging::init_global_subscriber;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(flatten)]
    transport: TransportArgs,

    #[command(subcommand)]
    command: commands::Commands,
}

#[derive(Parser, Clone, Copy, Debug)]
#[command(next_help_heading = "Log Options")]
pub struct LogArgs {
    /// Set the level of verbosity
    ///
    /// This flag can be used multiple times to increase verbosity:
    ///   -v    for INFO level
    ///   -vv   for DEBUG level, which also logs every exchange
    ///   -vvv  for TRACE level
    ///
    /// If not specified, defaults to WARN level.
    ///
    /// Alternatively, set the `RUST_LOG` environment variable
    /// (e.g., `RUST_LOG=info`), which takes precedence over this flag.
    ///
    /// Note: This flag is silently ignored when `--quiet` is also set.
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity",
        verbatim_doc_comment
    )]
    verbosity: u8,

    /// Suppress all output except errors
    ///
    /// This flag overrides any verbosity settings and sets the log
    /// level to ERROR. It takes precedence over both the `--verbosity`
    /// flag and the `RUST_LOG` environment variable.
    #[arg(short, long, global = true, verbatim_doc_comment)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(next_help_heading = "Transport Options")]
struct TransportArgs {
    /// Answer requests from a directory of recorded exchanges
    ///
    /// Files are looked up as `<DIR>/<METHOD>/<path>.file`, with a
    /// `.2`, `.3`, ... suffix for repeated requests. Nothing is sent
    /// over the network.
    #[arg(long, value_name = "DIR", global = true, verbatim_doc_comment)]
    playback: Option<PathBuf>,

    /// Record every exchange into a directory, in the playback layout
    ///
    /// Overrides the `record` key of the configuration file.
    #[arg(long, value_name = "DIR", global = true, conflicts_with = "playback")]
    record: Option<PathBuf>,

    /// Send `Authorization: Bearer <TOKEN>` with every request
    #[arg(long, value_name = "TOKEN", global = true)]
    token: Option<String>,
}
