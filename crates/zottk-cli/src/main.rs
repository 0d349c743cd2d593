//! Command line tools for maintaining a Zotero library.
//!
//! This crate provides the `zottk` binary on top of the [`zottk`] library. It supports:
//! - Exporting the PDF attachments of a collection, stamped with title and authors
//! - Stamping a single attachment found by its path
//! - Filling in missing call numbers from the directories of linked files
//! - Writing a configuration template
//!
//! # Usage
//!
//! ```bash
//! # Write a configuration file, then fill in the API key and user id
//! zottk init
//!
//! # Export a collection through the web API into ./thesis
//! zottk export thesis
//!
//! # Export from the local zotero.sqlite instead
//! zottk export thesis --local -o ~/exports/thesis
//!
//! # Stamp one attachment
//! zottk embed 'attachments:d/doe2017/%'
//!
//! # Derive call numbers, but only show what would change
//! zottk call-numbers --dry-run
//! ```
//!
//! Logging goes to stderr, with detail controlled by the `-v` flag or `RUST_LOG`, and can
//! be mirrored into a file with `--log-file`.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zottk::{
  call_number::{self, CallNumberUpdate, UpdateReport, DEFAULT_COLLECTION},
  config::Config,
  error::{ErrorKind, ZottkError},
  library::{LocalLibrary, RemoteLibrary},
  pipeline::{Pipeline, RunSummary},
  prefs::{self, Prefs},
};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Command line tools for maintaining a Zotero library")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration file. If not specified, uses the default platform-specific
  /// configuration directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Also write logs to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, global = true)]
  accept_defaults: bool,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

impl Cli {
  /// The configuration file this invocation uses.
  pub fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }
}

/// Configures the logging system based on the verbosity level
///
/// # Arguments
///
/// * `verbosity` - Number of times the verbose flag was used
/// * `log_file` - File receiving a copy of the logs, without colors
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// The returned guard flushes the log file when dropped and must outlive the command.
fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let console = fmt::layer()
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_target(true);

  let (file, guard) = match log_file {
    Some(path) => {
      let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
      let (writer, guard) = tracing_appender::non_blocking(file);
      (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    },
    None => (None, None),
  };

  tracing_subscriber::registry().with(filter).with(console).with(file).init();
  Ok(guard)
}

/// Entry point for the zottk CLI application
///
/// Handles command line argument parsing, sets up logging, and executes the requested
/// command. Any fatal error is printed and ends the process with exit status 1.
#[tokio::main(flavor = "current_thread")]
async fn main() {
  let cli = Cli::parse();

  let guard = match setup_logging(cli.verbose, cli.log_file.as_deref()) {
    Ok(guard) => guard,
    Err(e) => {
      eprintln!("{} Could not open log file: {e}", style(ERROR_PREFIX).red());
      std::process::exit(1);
    },
  };
  trace!("Running with config {}", cli.config_path().display());

  let result = match &cli.command {
    Commands::Export(args) => export(&cli, args).await,
    Commands::Embed(args) => embed(&cli, args).await,
    Commands::CallNumbers(args) => call_numbers(&cli, args).await,
    Commands::Init(args) => init(&cli, args),
  };

  if let Err(e) = result {
    debug!("Command failed: {e:?}");
    eprintln!("{} {e}", style(ERROR_PREFIX).red());
    if e.is_authentication() {
      eprintln!(
        "{} Check `credentials.key` and `credentials.user_id` in {}",
        style(INFO_PREFIX).blue(),
        cli.config_path().display()
      );
    }
    drop(guard);
    std::process::exit(1);
  }
}
