//! File name formatting for exported documents.

use super::*;

/// Maximum number of characters kept from a title in a file name.
pub const MAX_TITLE_LENGTH: usize = 50;

/// Turns a title into a file-system-safe stem.
///
/// Alphanumeric characters are kept (including non-ASCII letters), runs of whitespace and
/// separators become a single `_`, everything else is dropped. The result is cut to
/// `max_length` characters (default [`MAX_TITLE_LENGTH`]) on a character boundary.
///
/// # Examples
///
/// ```
/// use zottk::format::format_title;
///
/// assert_eq!(
///   format_title("On the Size of Pairing-based Arguments", None),
///   "On_the_Size_of_Pairing_based_Arguments"
/// );
/// assert_eq!(format_title("Élasticité: théorie", Some(10)), "Élasticité");
/// ```
pub fn format_title(title: &str, max_length: Option<usize>) -> String {
  let max_length = max_length.unwrap_or(MAX_TITLE_LENGTH);
  let mut formatted = String::with_capacity(title.len());
  let mut pending_separator = false;
  for c in title.chars() {
    if c.is_alphanumeric() {
      if pending_separator && !formatted.is_empty() {
        formatted.push('_');
      }
      pending_separator = false;
      formatted.push(c);
    } else if c.is_whitespace() || matches!(c, '-' | '_' | '/' | '\\' | '.' | ':') {
      pending_separator = true;
    }
  }
  let truncated: String = formatted.chars().take(max_length).collect();
  truncated.trim_end_matches('_').to_string()
}

/// Returns the export file name of the `index`-th PDF attachment of an entry.
///
/// The stem is the formatted title, or the entry key when the title is empty; attachments
/// after the first get a `-<index>` suffix so an entry's files never collide.
pub fn export_file_name(entry: &CatalogEntry, index: usize) -> String {
  let stem = entry
    .title
    .as_deref()
    .map(|title| format_title(title, None))
    .filter(|stem| !stem.is_empty())
    .unwrap_or_else(|| entry.key.clone());
  match index {
    0 => format!("{stem}.pdf"),
    n => format!("{stem}-{n}.pdf"),
  }
}

/// Reserves a file name in `used`, returning `name` itself when it is still free.
///
/// Names are compared case-insensitively. A taken name gets the entry key appended to its
/// stem, then a running counter, so different entries with the same title never share a
/// file. Given the same sequence of calls, the same names come back.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
///
/// use zottk::format::claim_file_name;
///
/// let mut used = BTreeSet::new();
/// assert_eq!(claim_file_name(&mut used, "Editorial.pdf", "AAAA0001"), "Editorial.pdf");
/// assert_eq!(
///   claim_file_name(&mut used, "Editorial.pdf", "BBBB0002"),
///   "Editorial-BBBB0002.pdf"
/// );
/// ```
pub fn claim_file_name(used: &mut BTreeSet<String>, name: &str, key: &str) -> String {
  let stem = name.strip_suffix(".pdf").unwrap_or(name);
  let claimed = std::iter::once(name.to_string())
    .chain(std::iter::once(format!("{stem}-{key}.pdf")))
    .chain((2..).map(|n| format!("{stem}-{key}-{n}.pdf")))
    .find(|candidate| !used.contains(&candidate.to_lowercase()))
    .unwrap_or_else(|| name.to_string());
  used.insert(claimed.to_lowercase());
  claimed
}
