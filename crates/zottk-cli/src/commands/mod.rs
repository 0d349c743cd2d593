use super::*;

pub mod call_numbers;
pub mod embed;
pub mod export;
pub mod init;

pub use call_numbers::{call_numbers, CallNumbersArgs};
pub use embed::{embed, EmbedArgs};
pub use export::{export, ExportArgs};
pub use init::{init, InitArgs};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Export the PDF attachments of a collection with their title and authors embedded
  Export(ExportArgs),

  /// Embed title and authors into a single attachment found by its stored path
  Embed(EmbedArgs),

  /// Derive missing call numbers from attachment directories and write them to Zotero
  CallNumbers(CallNumbersArgs),

  /// Write a configuration file template
  Init(InitArgs),
}

/// Which parts of the configuration a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Needs {
  /// Web API access only
  Remote,
  /// The local data directory, filled from Zotero preferences when unset
  Local,
}

/// Loads the configuration file named on the command line (or the default one).
///
/// When the file leaves `local.data_directory` unset, commands reading the local library
/// take it, and the base attachment path if unset too, from a Zotero profile.
pub fn load_config(cli: &Cli, needs: Needs) -> Result<Config> {
  let path = cli.config_path();
  if !path.exists() {
    return Err(ZottkCliError::MissingConfig(path));
  }
  let config = Config::load(&path)?;

  if needs == Needs::Local && config.local.data_directory.is_none() {
    if let Some(prefs) = discover_prefs(cli)? {
      return Ok(config.with_prefs(&prefs));
    }
  }
  Ok(config)
}

/// Reads the preferences of a Zotero profile of the current user, if there is one.
///
/// With several profiles the user picks one (the first when accepting defaults).
pub fn discover_prefs(cli: &Cli) -> Result<Option<Prefs>> {
  let mut profiles = prefs::locate();
  if profiles.len() > 1 {
    let labels: Vec<String> = profiles.iter().map(|p| p.display().to_string()).collect();
    let Some(choice) = cli.select("Which Zotero profile?", &labels)? else {
      return Ok(None);
    };
    profiles.swap(0, choice);
  }
  let Some(path) = profiles.into_iter().next() else {
    return Ok(None);
  };
  match Prefs::load(&path) {
    Ok(prefs) => {
      debug!("Using Zotero preferences {}", path.display());
      Ok(Some(prefs))
    },
    Err(e) => {
      debug!("Ignoring unreadable Zotero preferences {}: {e}", path.display());
      Ok(None)
    },
  }
}
