//! Module for the "call-numbers" command.
//!
//! Entries are read from the local database, where attachment paths are known, and the
//! derived call numbers are written through the web API.

use super::*;

/// Arguments that can be used for the [`Commands::CallNumbers`]
#[derive(Args, Clone)]
pub struct CallNumbersArgs {
  /// Collection name or key
  #[arg(default_value = DEFAULT_COLLECTION)]
  pub collection: String,

  /// Only show the call numbers that would be written
  #[arg(long)]
  pub dry_run: bool,
}

/// Function for the [`Commands::CallNumbers`] in the CLI.
pub async fn call_numbers(cli: &Cli, args: &CallNumbersArgs) -> Result<()> {
  let config = load_config(cli, Needs::Local)?;
  // Fail on missing credentials before reading anything.
  let remote = if args.dry_run { None } else { Some(RemoteLibrary::new(&config)?) };

  let library = LocalLibrary::from_config(&config)?;
  let updates = call_number::plan(&library, &args.collection, &config.local).await?;
  if updates.is_empty() {
    cli.reply(ResponseContent::Info(&format!(
      "No call numbers to create in {}",
      args.collection
    )))?;
    return Ok(());
  }
  cli.reply(ResponseContent::Plan(&updates))?;

  let Some(remote) = remote else {
    cli.reply(ResponseContent::Info("Dry run, nothing written"))?;
    return Ok(());
  };
  if !cli.confirm(&format!("Write {} call numbers to Zotero?", updates.len()))? {
    cli.reply(ResponseContent::Info("Nothing written"))?;
    return Ok(());
  }

  let report = call_number::apply(&remote, updates).await?;
  cli.reply(ResponseContent::Report(&report))?;
  if !report.failed.is_empty() {
    cli.reply(ResponseContent::Warning(
      "Some entries changed since they were read; run the command again to retry them",
    ))?;
  }
  Ok(())
}
