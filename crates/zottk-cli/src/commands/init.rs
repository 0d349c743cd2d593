//! Module for writing a configuration file.

use zottk::config::{DEFAULT_API_URL, DEFAULT_PAGE_SIZE};

use super::*;

/// Arguments that can be used for the [`Commands::Init`]
#[derive(Args, Clone, Default)]
pub struct InitArgs {
  /// Private web API key
  #[arg(long)]
  pub key:                  Option<String>,
  /// Numeric identifier of the user library
  #[arg(long)]
  pub user_id:              Option<String>,
  /// Zotero data directory, holding zotero.sqlite
  #[arg(long)]
  pub data_directory:       Option<PathBuf>,
  /// Root directory of linked attachments
  #[arg(long)]
  pub base_attachment_path: Option<PathBuf>,
}

/// Function for the [`Commands::Init`] in the CLI.
///
/// Local paths not given on the command line are taken from the Zotero preferences when a
/// profile is found.
pub fn init(cli: &Cli, args: &InitArgs) -> Result<()> {
  let path = cli.config_path();
  if path.exists()
    && !cli.confirm(&format!(
      "A configuration already exists at {}, do you want to overwrite it?",
      path.display()
    ))?
  {
    cli.reply(ResponseContent::Info(
      "Please choose a different location for the configuration using --config",
    ))?;
    return Ok(());
  }

  let prefs = match &args.data_directory {
    Some(_) => Prefs::default(),
    None => discover_prefs(cli)?.unwrap_or_default(),
  };
  let data_directory = args.data_directory.clone().or_else(|| prefs.data_dir());
  let base_attachment_path =
    args.base_attachment_path.clone().or_else(|| prefs.base_attachment_path());
  if data_directory.is_none() {
    cli.reply(ResponseContent::Warning(
      "No Zotero profile found; set local.data_directory by hand to use --local",
    ))?;
  }

  let content = render(
    args.key.as_deref(),
    args.user_id.as_deref(),
    data_directory.as_deref(),
    base_attachment_path.as_deref(),
  );
  // The template must load back before it is written.
  content.parse::<Config>()?;

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(&path, content)?;

  cli.reply(ResponseContent::Success(&format!("Wrote configuration to {}", path.display())))?;
  if args.key.is_none() || args.user_id.is_none() {
    cli.reply(ResponseContent::Info(
      "Fill in credentials.key and credentials.user_id to use the web API",
    ))?;
  }
  Ok(())
}

/// Renders the configuration file, leaving unknown values empty.
fn render(
  key: Option<&str>,
  user_id: Option<&str>,
  data_directory: Option<&Path>,
  base_attachment_path: Option<&Path>,
) -> String {
  let path = |p: Option<&Path>| quoted(&p.map(|p| p.display().to_string()).unwrap_or_default());
  format!(
    r#"[credentials]
key = {}
user_id = {}

[local]
data_directory = {}
base_attachment_path = {}

[proxies]
http = ""
https = ""

[api]
base_url = {}
page_size = {}
"#,
    quoted(key.unwrap_or_default()),
    quoted(user_id.unwrap_or_default()),
    path(data_directory),
    path(base_attachment_path),
    quoted(DEFAULT_API_URL),
    DEFAULT_PAGE_SIZE,
  )
}

/// A TOML string literal holding `value`.
fn quoted(value: &str) -> String { toml::Value::String(value.to_string()).to_string() }
