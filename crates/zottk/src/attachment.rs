//! Resolution of attachment paths as stored by Zotero.
//!
//! Zotero records attachment paths in three forms:
//!
//! - `attachments:d/doe2017/doe2017.pdf` for linked files relative to the base attachment
//!   directory,
//! - `storage:doe2017.pdf` for files stored in `<data dir>/storage/<attachment key>/`,
//! - a plain absolute path for linked files outside the base directory.
//!
//! See <https://www.zotero.org/support/preferences/advanced#linked_attachment_base_directory>.

use super::*;

/// Prefix of paths relative to the base attachment directory.
pub const LINKED_PREFIX: &str = "attachments:";

/// Prefix of paths relative to the attachment's storage directory.
pub const STORAGE_PREFIX: &str = "storage:";

/// How an attachment is tied to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
  /// File copied into Zotero storage
  ImportedFile,
  /// Web page snapshot or download, stored in Zotero storage
  ImportedUrl,
  /// File left where it is, referenced by path
  LinkedFile,
  /// A bare URL, no file
  LinkedUrl,
  /// Image embedded in a note
  EmbeddedImage,
}

impl LinkMode {
  /// Maps the `itemAttachments.linkMode` column of the local database.
  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 => Some(LinkMode::ImportedFile),
      1 => Some(LinkMode::ImportedUrl),
      2 => Some(LinkMode::LinkedFile),
      3 => Some(LinkMode::LinkedUrl),
      4 => Some(LinkMode::EmbeddedImage),
      _ => None,
    }
  }

  /// Whether the attachment has a file payload at all.
  pub fn has_file(&self) -> bool { !matches!(self, LinkMode::LinkedUrl) }

  /// Whether the payload lives in Zotero storage (as opposed to a linked location).
  pub fn is_stored(&self) -> bool {
    matches!(self, LinkMode::ImportedFile | LinkMode::ImportedUrl | LinkMode::EmbeddedImage)
  }
}

impl FromStr for LinkMode {
  type Err = ZottkError;

  /// Parses the `linkMode` field of the web API.
  fn from_str(s: &str) -> Result<Self> {
    match s {
      "imported_file" => Ok(LinkMode::ImportedFile),
      "imported_url" => Ok(LinkMode::ImportedUrl),
      "linked_file" => Ok(LinkMode::LinkedFile),
      "linked_url" => Ok(LinkMode::LinkedUrl),
      "embedded_image" => Ok(LinkMode::EmbeddedImage),
      other => Err(ZottkError::ApiError(format!("unknown attachment link mode `{other}`"))),
    }
  }
}

/// Turns a stored attachment path into a file system path.
///
/// # Errors
///
/// Returns [`ZottkError::InvalidAttachmentPath`] when the path is empty, or when it needs a
/// local directory the configuration does not provide. The error only concerns this
/// attachment.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
///
/// use zottk::{attachment::resolve_path, config::LocalPaths};
///
/// let paths = LocalPaths {
///   data_directory:       Some(PathBuf::from("/zotero")),
///   base_attachment_path: Some(PathBuf::from("/papers")),
/// };
/// assert_eq!(
///   resolve_path("attachments:d/doe2017/doe2017.pdf", "K1", &paths).unwrap(),
///   PathBuf::from("/papers/d/doe2017/doe2017.pdf")
/// );
/// assert_eq!(
///   resolve_path("storage:doe2017.pdf", "K1", &paths).unwrap(),
///   PathBuf::from("/zotero/storage/K1/doe2017.pdf")
/// );
/// ```
pub fn resolve_path(raw: &str, attachment_key: &str, paths: &LocalPaths) -> Result<PathBuf> {
  if let Some(relative) = raw.strip_prefix(LINKED_PREFIX) {
    let base = paths.base_attachment_path.as_deref().ok_or_else(|| {
      ZottkError::InvalidAttachmentPath(format!(
        "{raw} is relative to the base attachment directory, but local.base_attachment_path is \
         not configured"
      ))
    })?;
    join_segments(base, relative, raw)
  } else if let Some(file_name) = raw.strip_prefix(STORAGE_PREFIX) {
    let data_dir = paths.data_directory.as_deref().ok_or_else(|| {
      ZottkError::InvalidAttachmentPath(format!(
        "{raw} is a stored file, but local.data_directory is not configured"
      ))
    })?;
    join_segments(&storage_dir(data_dir, attachment_key), file_name, raw)
  } else if raw.trim().is_empty() {
    Err(ZottkError::InvalidAttachmentPath(format!("attachment {attachment_key} has an empty path")))
  } else {
    Ok(PathBuf::from(raw))
  }
}

/// Resolves a stored path into an [`AttachmentLocation`], keeping failures as
/// [`AttachmentLocation::Unresolved`] so they only surface when the payload is read.
pub fn locate(raw: Option<&str>, attachment_key: &str, paths: &LocalPaths) -> AttachmentLocation {
  let Some(raw) = raw else {
    return AttachmentLocation::Unresolved(format!("attachment {attachment_key} has no path"));
  };
  match resolve_path(raw, attachment_key, paths) {
    Ok(path) => AttachmentLocation::Local(path),
    Err(ZottkError::InvalidAttachmentPath(reason)) => AttachmentLocation::Unresolved(reason),
    Err(err) => AttachmentLocation::Unresolved(err.to_string()),
  }
}

/// Directory holding the stored files of an attachment.
pub fn storage_dir(data_dir: &Path, attachment_key: &str) -> PathBuf {
  data_dir.join("storage").join(attachment_key)
}

/// Appends the `/`-separated segments of `relative` to `base`.
fn join_segments(base: &Path, relative: &str, raw: &str) -> Result<PathBuf> {
  let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
  if segments.is_empty() || segments.iter().any(|s| *s == "..") {
    return Err(ZottkError::InvalidAttachmentPath(raw.to_string()));
  }
  Ok(segments.into_iter().fold(base.to_path_buf(), |path, segment| path.join(segment)))
}
