//! Module for the "embed" command, stamping a single attachment.

use zottk::{export::Exporter, library::read_local, metadata::resolve};

use super::*;

/// Suffix added to the input file stem to name the stamped copy.
const OUTPUT_SUFFIX: &str = "-with_metadata";

/// Arguments that can be used for the [`Commands::Embed`]
#[derive(Args, Clone)]
pub struct EmbedArgs {
  /// SQL `LIKE` pattern matched against stored attachment paths
  /// Example: "attachments:d/doe2017/%"
  pub pattern: String,

  /// File to write, `<input stem>-with_metadata.pdf` in the current directory by default
  #[arg(long, short)]
  pub output: Option<PathBuf>,
}

/// Function for the [`Commands::Embed`] in the CLI.
pub async fn embed(cli: &Cli, args: &EmbedArgs) -> Result<()> {
  let config = load_config(cli, Needs::Local)?;
  let library = LocalLibrary::from_config(&config)?;

  let mut candidates = library.find_attachments(&args.pattern)?;
  candidates.retain(|attachment| attachment.local_path().is_some());
  if candidates.is_empty() {
    return Err(ZottkCliError::NoMatch(args.pattern.clone()));
  }

  let labels: Vec<String> = candidates
    .iter()
    .filter_map(|attachment| attachment.local_path())
    .map(|path| path.display().to_string())
    .collect();
  let Some(choice) = cli.select("Which attachment?", &labels)? else {
    cli.reply(ResponseContent::Info("Nothing selected"))?;
    return Ok(());
  };
  let attachment = &candidates[choice];
  let Some(source) = attachment.local_path() else {
    return Err(ZottkCliError::NoMatch(args.pattern.clone()));
  };

  let entry = library.entry_by_key(&attachment.parent_key)?;
  let metadata = resolve(&entry);
  let target = args.output.clone().unwrap_or_else(|| default_output(source));
  trace!("Stamping {} as {metadata:?}", source.display());

  let payload = read_local(attachment).await?;
  Exporter::new(".").write(&payload, &metadata, &target, Some(source))?;

  cli.reply(ResponseContent::Success(&format!(
    "Wrote {} for {entry}",
    target.display()
  )))?;
  Ok(())
}

/// `<stem>-with_metadata.pdf`, relative to the current directory.
fn default_output(source: &Path) -> PathBuf {
  let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
  PathBuf::from(format!("{stem}{OUTPUT_SUFFIX}.pdf"))
}
