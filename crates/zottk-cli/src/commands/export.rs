//! Module for the "export" command, stamping every PDF of a collection.

use super::*;

/// Arguments that can be used for the [`Commands::Export`]
#[derive(Args, Clone)]
pub struct ExportArgs {
  /// Collection name or key
  pub collection: String,

  /// Directory receiving the files, `./<collection>` by default
  #[arg(long, short)]
  pub output: Option<PathBuf>,

  /// Read from the local zotero.sqlite instead of the web API
  #[arg(long)]
  pub local: bool,
}

/// Function for the [`Commands::Export`] in the CLI.
pub async fn export(cli: &Cli, args: &ExportArgs) -> Result<()> {
  let output = args.output.clone().unwrap_or_else(|| PathBuf::from(&args.collection));

  let summary = if args.local {
    let config = load_config(cli, Needs::Local)?;
    let library = LocalLibrary::from_config(&config)?;
    cli.reply(ResponseContent::Info(&format!(
      "Reading {} from {}",
      args.collection,
      config.database_path()?.display()
    )))?;
    Pipeline::new(library, &output).run(&args.collection).await?
  } else {
    let config = load_config(cli, Needs::Remote)?;
    let library = RemoteLibrary::new(&config)?;
    cli.reply(ResponseContent::Info(&format!(
      "Reading {} from {}",
      args.collection, config.api.base_url
    )))?;
    Pipeline::new(library, &output).run(&args.collection).await?
  };

  cli.reply(ResponseContent::Summary(&summary))?;
  if summary.entries == 0 {
    cli.reply(ResponseContent::Warning(&format!("Collection {} has no entries", args.collection)))?;
  }
  Ok(())
}
