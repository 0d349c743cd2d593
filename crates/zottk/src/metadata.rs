//! Resolution of the title and author strings written into exported PDFs.

use super::*;

/// Separator placed between author names.
pub const AUTHOR_SEPARATOR: &str = ", ";

/// Title and author strings of a catalog entry, ready to be embedded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
  /// Entry title, empty when the entry has none
  pub title:  String,
  /// Author list, empty when the entry has no creators
  pub author: String,
}

impl ResolvedMetadata {
  /// Creates metadata from explicit strings.
  pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
    Self { title: title.into(), author: author.into() }
  }
}

/// Resolves the title and author strings of an entry.
///
/// This never fails: a missing title or an empty creator list yields an empty string, so a
/// single incomplete record never stops a batch.
///
/// # Examples
///
/// ```
/// use zottk::{
///   catalog::{CatalogEntry, Creator},
///   metadata::resolve,
/// };
///
/// let entry = CatalogEntry {
///   key:         "ABCD2345".into(),
///   version:     3,
///   title:       Some("Homogenization of random media".into()),
///   creators:    vec![Creator::person("Doe", "Jane"), Creator::single("ACME Lab")],
///   call_number: None,
///   attachments: vec![],
/// };
/// let metadata = resolve(&entry);
/// assert_eq!(metadata.title, "Homogenization of random media");
/// assert_eq!(metadata.author, "Jane Doe, ACME Lab");
/// ```
pub fn resolve(entry: &CatalogEntry) -> ResolvedMetadata {
  let metadata = ResolvedMetadata {
    title:  entry.title.clone().unwrap_or_default(),
    author: format_authors(&entry.creators),
  };
  trace!("Resolved {} to {metadata:?}", entry.key);
  metadata
}

/// Joins creator display names in catalog order.
pub fn format_authors(creators: &[Creator]) -> String {
  creators.iter().map(Creator::display_name).collect::<Vec<_>>().join(AUTHOR_SEPARATOR)
}
