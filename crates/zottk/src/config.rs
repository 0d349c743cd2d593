//! Configuration file handling.
//!
//! The configuration is a small TOML file with three sections, plus an optional `api`
//! section for pointing the tool at another API host:
//!
//! ```toml
//! [credentials]
//! key = "P9NiFoyLeZu2bZNvvuQPDWsd"
//! user_id = "475425"
//!
//! [local]
//! data_directory = "/home/me/Zotero"
//! base_attachment_path = "/home/me/papers"
//!
//! [proxies]
//! http = ""
//! https = ""
//! ```
//!
//! Empty values are treated exactly like absent ones. The file is read once, by an explicit
//! path, and the resulting [`Config`] is never mutated by the operations that use it. Each
//! operation asks for the keys it needs through the `require_*` accessors, which fail with
//! [`ZottkError::MissingConfigKey`] before any network or file access takes place.

use serde::Deserializer;

use super::*;

/// Default host of the Zotero web API.
pub const DEFAULT_API_URL: &str = "https://api.zotero.org";

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page the web API serves; larger `limit` values are capped by the server.
pub const MAX_PAGE_SIZE: usize = 100;

/// Name of the Zotero database file inside the data directory.
pub const DATABASE_FILE_NAME: &str = "zotero.sqlite";

/// Complete configuration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Web API credentials
  #[serde(default)]
  pub credentials: Credentials,
  /// Paths of the local Zotero installation
  #[serde(default)]
  pub local:       LocalPaths,
  /// Outgoing HTTP proxies
  #[serde(default)]
  pub proxies:     Proxies,
  /// Web API endpoint settings
  #[serde(default)]
  pub api:         ApiSettings,
}

/// The `[credentials]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  /// Private API key
  #[serde(default, deserialize_with = "non_empty")]
  pub key:     Option<String>,
  /// Numeric identifier of the user library
  #[serde(default, deserialize_with = "non_empty")]
  pub user_id: Option<String>,
}

/// The `[local]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPaths {
  /// Zotero data directory, holding `zotero.sqlite` and `storage/`
  #[serde(default, deserialize_with = "non_empty_path")]
  pub data_directory:       Option<PathBuf>,
  /// Root directory of linked (`attachments:`) files
  #[serde(default, deserialize_with = "non_empty_path")]
  pub base_attachment_path: Option<PathBuf>,
}

/// The `[proxies]` section. Absent values mean a direct connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxies {
  /// Proxy for plain HTTP requests
  #[serde(default, deserialize_with = "non_empty")]
  pub http:  Option<String>,
  /// Proxy for HTTPS requests
  #[serde(default, deserialize_with = "non_empty")]
  pub https: Option<String>,
}

/// The optional `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
  /// Scheme and host of the web API
  #[serde(default = "default_api_url")]
  pub base_url:  String,
  /// Number of records per page
  #[serde(default = "default_page_size")]
  pub page_size: usize,
}

impl Default for ApiSettings {
  fn default() -> Self { Self { base_url: default_api_url(), page_size: default_page_size() } }
}

/// Validated credential pair, borrowed from a [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct ApiCredentials<'a> {
  /// Private API key
  pub key:     &'a str,
  /// Numeric identifier of the user library
  pub user_id: &'a str,
}

impl Config {
  /// Loads a configuration file.
  ///
  /// # Errors
  ///
  /// - [`ZottkError::Config`] if the file does not exist or cannot be read
  /// - [`ZottkError::TomlDe`] if it is not valid TOML for this schema
  ///
  /// # Examples
  ///
  /// ```no_run
  /// # use zottk::config::Config;
  /// let config = Config::load("zottk.toml")?;
  /// println!("proxy: {:?}", config.proxies.https);
  /// # Ok::<(), zottk::error::ZottkError>(())
  /// ```
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
      ZottkError::Config(format!("could not read config file {}: {e}", path.display()))
    })?;
    debug!("Loaded configuration from {}", path.display());
    content.parse()
  }

  /// Returns the default location of the configuration file.
  ///
  /// - On Unix: `~/.config/zottk/zottk.toml`
  /// - On macOS: `~/Library/Application Support/zottk/zottk.toml`
  /// - On Windows: `%APPDATA%\zottk\zottk.toml`
  /// - Fallback: `./zottk.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir()
      .map(|dir| dir.join("zottk"))
      .unwrap_or_else(|| PathBuf::from("."))
      .join("zottk.toml")
  }

  /// Sets the credential pair.
  pub fn with_credentials(mut self, key: impl Into<String>, user_id: impl Into<String>) -> Self {
    self.credentials = Credentials { key: Some(key.into()), user_id: Some(user_id.into()) };
    self
  }

  /// Sets the Zotero data directory.
  pub fn with_data_directory(mut self, path: impl AsRef<Path>) -> Self {
    self.local.data_directory = Some(path.as_ref().to_path_buf());
    self
  }

  /// Sets the root directory of linked attachments.
  pub fn with_base_attachment_path(mut self, path: impl AsRef<Path>) -> Self {
    self.local.base_attachment_path = Some(path.as_ref().to_path_buf());
    self
  }

  /// Points the web API client at another host.
  pub fn with_api_url(mut self, base_url: impl Into<String>) -> Self {
    self.api.base_url = base_url.into();
    self
  }

  /// Sets the page size used for paginated requests.
  ///
  /// The web client clamps it to `1..=`[`MAX_PAGE_SIZE`].
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.api.page_size = page_size;
    self
  }

  /// Fills local paths that are still unset from Zotero preferences.
  ///
  /// Values present in the configuration file always win.
  pub fn with_prefs(mut self, prefs: &prefs::Prefs) -> Self {
    if self.local.data_directory.is_none() {
      self.local.data_directory = prefs.data_dir();
    }
    if self.local.base_attachment_path.is_none() {
      self.local.base_attachment_path = prefs.base_attachment_path();
    }
    self
  }

  /// Returns the credential pair, or the first missing key.
  pub fn require_credentials(&self) -> Result<ApiCredentials<'_>> {
    let key = self
      .credentials
      .key
      .as_deref()
      .ok_or(ZottkError::MissingConfigKey { section: "credentials", key: "key" })?;
    let user_id = self
      .credentials
      .user_id
      .as_deref()
      .ok_or(ZottkError::MissingConfigKey { section: "credentials", key: "user_id" })?;
    Ok(ApiCredentials { key, user_id })
  }

  /// Returns the Zotero data directory, or an error naming the missing key.
  pub fn require_data_directory(&self) -> Result<&Path> {
    self
      .local
      .data_directory
      .as_deref()
      .ok_or(ZottkError::MissingConfigKey { section: "local", key: "data_directory" })
  }

  /// Returns the path of `zotero.sqlite` inside the data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    Ok(self.require_data_directory()?.join(DATABASE_FILE_NAME))
  }
}

impl FromStr for Config {
  type Err = ZottkError;

  fn from_str(s: &str) -> Result<Self> {
    let config: Config = toml::from_str(s)?;
    if !(1..=MAX_PAGE_SIZE).contains(&config.api.page_size) {
      return Err(ZottkError::Config(format!(
        "api.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
        config.api.page_size
      )));
    }
    Ok(config)
  }
}

/// Serde default for [`ApiSettings::base_url`].
fn default_api_url() -> String { DEFAULT_API_URL.to_string() }

/// Serde default for [`ApiSettings::page_size`].
fn default_page_size() -> usize { DEFAULT_PAGE_SIZE }

/// Deserializes a string, mapping blank values to `None`.
fn non_empty<'de, D>(deserializer: D) -> core::result::Result<Option<String>, D::Error>
where D: Deserializer<'de> {
  let value: Option<String> = Option::deserialize(deserializer)?;
  Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Like [`non_empty`], producing a path.
fn non_empty_path<'de, D>(deserializer: D) -> core::result::Result<Option<PathBuf>, D::Error>
where D: Deserializer<'de> {
  Ok(non_empty(deserializer)?.map(PathBuf::from))
}
