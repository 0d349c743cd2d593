//! Zotero profile preferences (`prefs.js`).
//!
//! The Zotero desktop client keeps its settings in a `prefs.js` file inside each profile
//! directory, one `user_pref("name", value);` statement per line. Two of them matter here:
//! the data directory holding `zotero.sqlite`, and the base directory that linked
//! `attachments:` paths are relative to.

use super::*;

/// Preference holding the Zotero data directory.
pub const DATA_DIR_KEY: &str = "extensions.zotero.dataDir";

/// Preference holding the root directory of linked attachments.
pub const BASE_ATTACHMENT_PATH_KEY: &str = "extensions.zotero.baseAttachmentPath";

lazy_static! {
  static ref USER_PREF: Regex =
    Regex::new(r#"^user_pref\("([\w.\-]+)"\s*,\s*(.*)\);\s*$"#).expect("valid user_pref regex");
}

/// Parsed preferences of one Zotero profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefs(BTreeMap<String, String>);

impl Prefs {
  /// Parses the content of a `prefs.js` file. Lines that are not `user_pref` calls are ignored.
  pub fn parse(content: &str) -> Self {
    let prefs = content
      .lines()
      .filter_map(|line| USER_PREF.captures(line.trim_end()))
      .map(|cap| {
        let value = cap[2].trim().trim_matches(|c| c == '"' || c == '\'');
        (cap[1].to_string(), unescape(value))
      })
      .collect();
    Self(prefs)
  }

  /// Reads and parses a `prefs.js` file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!("Reading Zotero preferences from {}", path.display());
    Ok(Self::parse(&std::fs::read_to_string(path)?))
  }

  /// Returns the raw value of a preference.
  pub fn get(&self, key: &str) -> Option<&str> { self.0.get(key).map(String::as_str) }

  /// The Zotero data directory, if set.
  pub fn data_dir(&self) -> Option<PathBuf> {
    self.get(DATA_DIR_KEY).filter(|v| !v.is_empty()).map(PathBuf::from)
  }

  /// The base directory of linked attachments, if set.
  pub fn base_attachment_path(&self) -> Option<PathBuf> {
    self.get(BASE_ATTACHMENT_PATH_KEY).filter(|v| !v.is_empty()).map(PathBuf::from)
  }
}

/// Returns the platform directory holding Zotero profiles.
///
/// - On Linux: `~/.zotero/zotero`
/// - On macOS: `~/Library/Application Support/Zotero/Profiles`
/// - On Windows: `%APPDATA%\Zotero\Zotero\Profiles`
pub fn profiles_dir() -> Option<PathBuf> {
  if cfg!(target_os = "macos") {
    dirs::config_dir().map(|dir| dir.join("Zotero").join("Profiles"))
  } else if cfg!(target_os = "windows") {
    dirs::config_dir().map(|dir| dir.join("Zotero").join("Zotero").join("Profiles"))
  } else {
    dirs::home_dir().map(|dir| dir.join(".zotero").join("zotero"))
  }
}

/// Lists the `prefs.js` files of all profiles found under `profiles_dir`.
pub fn locate_in(profiles_dir: &Path) -> Vec<PathBuf> {
  let pattern = profiles_dir.join("*").join("prefs.js");
  let Some(pattern) = pattern.to_str() else {
    warn!("Profile directory {} is not valid UTF-8", profiles_dir.display());
    return Vec::new();
  };
  match glob::glob(pattern) {
    Ok(paths) => {
      let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
      found.sort();
      found
    },
    Err(e) => {
      warn!("Invalid profile search pattern {pattern}: {e}");
      Vec::new()
    },
  }
}

/// Lists the `prefs.js` files of all Zotero profiles of the current user.
pub fn locate() -> Vec<PathBuf> { profiles_dir().map(|dir| locate_in(&dir)).unwrap_or_default() }

/// Resolves JavaScript string escapes (`\\`, `\"`, `\n`, `\uXXXX`...).
fn unescape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut chars = value.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some('u') => {
        let hex: String = chars.by_ref().take(4).collect();
        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
          Some(decoded) => out.push(decoded),
          None => {
            out.push_str("\\u");
            out.push_str(&hex);
          },
        }
      },
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  out
}
