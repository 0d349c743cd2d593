//! Filling in missing call numbers.
//!
//! Linked attachments are usually filed one directory per document, e.g.
//! `attachments:d/doe2017/doe2017.pdf`. The name of that directory, upper-cased, makes a
//! good call number (`DOE2017`). Entries are read from any [`LibraryReader`]; the new call
//! numbers are written through the web API, conditioned on the entry version that was
//! read so that concurrent edits are never overwritten.

use super::*;
use crate::library::{LibraryReader, RemoteLibrary};

/// Collection the call number command processes by default.
pub const DEFAULT_COLLECTION: &str = "no_call_number";

/// A call number to be written to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNumberUpdate {
  /// Entry key
  pub key:         String,
  /// Entry version the call number was derived from
  pub version:     u64,
  /// New call number
  pub call_number: String,
}

/// Outcome of applying a batch of updates.
#[derive(Debug, Default)]
pub struct UpdateReport {
  /// Updates accepted by the server
  pub applied: Vec<CallNumberUpdate>,
  /// Updates refused for this item only, with the reason
  pub failed:  Vec<(CallNumberUpdate, ZottkError)>,
}

/// Returns the call number encoded by the directory holding `path`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use zottk::call_number::call_number_from_path;
///
/// assert_eq!(
///   call_number_from_path(Path::new("/papers/d/doe2017/doe2017.pdf")).as_deref(),
///   Some("DOE2017")
/// );
/// assert_eq!(call_number_from_path(Path::new("doe2017.pdf")), None);
/// ```
pub fn call_number_from_path(path: &Path) -> Option<String> {
  let directory = path.parent()?.file_name()?.to_str()?;
  Some(directory.to_uppercase()).filter(|call_number| !call_number.is_empty())
}

/// Derives the call number of an entry from its first linked attachment below `base`.
///
/// Files placed directly in `base`, and stored files, say nothing about the entry and are
/// ignored.
pub fn derive_call_number(entry: &CatalogEntry, base: &Path) -> Option<String> {
  entry
    .attachments
    .iter()
    .filter_map(Attachment::local_path)
    .filter(|path| path.starts_with(base) && path.parent() != Some(base))
    .find_map(call_number_from_path)
}

/// Lists the updates needed for the entries of `collection`.
///
/// Entries that already have a call number are left alone, as are entries with no linked
/// attachment to derive one from.
///
/// # Errors
///
/// Fails with [`ZottkError::MissingConfigKey`] when `local.base_attachment_path` is not set,
/// and with any fatal error of the library reader.
pub async fn plan(
  library: &impl LibraryReader,
  collection: &str,
  paths: &LocalPaths,
) -> Result<Vec<CallNumberUpdate>> {
  let base = paths
    .base_attachment_path
    .as_deref()
    .ok_or(ZottkError::MissingConfigKey { section: "local", key: "base_attachment_path" })?;

  let mut updates = Vec::new();
  let mut entries = library.entries(collection);
  while let Some(entry) = entries.try_next().await? {
    if let Some(existing) = &entry.call_number {
      debug!("{entry} already has call number {existing}");
      continue;
    }
    match derive_call_number(&entry, base) {
      Some(call_number) => {
        trace!("{entry} -> {call_number}");
        updates.push(CallNumberUpdate { key: entry.key, version: entry.version, call_number });
      },
      None => warn!("No linked attachment to derive a call number for {entry}"),
    }
  }
  info!("{} call numbers to create in {collection}", updates.len());
  Ok(updates)
}

/// Writes `updates` one at a time.
///
/// An update refused for its item alone (typically a version conflict because the entry
/// changed since it was read) is recorded and skipped; the first fatal error stops the batch.
pub async fn apply(
  remote: &RemoteLibrary,
  updates: Vec<CallNumberUpdate>,
) -> Result<UpdateReport> {
  let mut report = UpdateReport::default();
  for update in updates {
    match remote.update_call_number(&update.key, update.version, &update.call_number).await {
      Ok(()) => {
        info!("{}: {}", update.key, update.call_number);
        report.applied.push(update);
      },
      Err(e) if e.is_fatal() => return Err(e),
      Err(e) => {
        warn!("{}: {e}", update.key);
        report.failed.push((update, e));
      },
    }
  }
  Ok(report)
}
