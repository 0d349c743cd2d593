//! Catalog entries and their attachments.
//!
//! These are the values produced by a [`LibraryReader`](crate::library::LibraryReader).
//! They are plain data, built once per entry and never modified afterwards.

use super::*;

/// Content type of the attachments this crate exports.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Fields holding an entry's title, in order of preference.
///
/// Cases, statutes and emails keep their title in a field of their own, mapped onto
/// `title` by the Zotero schema.
pub const TITLE_FIELDS: [&str; 4] = ["title", "caseName", "nameOfAct", "subject"];

/// A bibliographic record of the library (article, book, report...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
  /// Library-wide item key, e.g. `ABCD2345`
  pub key:         String,
  /// Item version, used for conditional updates
  pub version:     u64,
  /// Title, if the record has one
  pub title:       Option<String>,
  /// Creators in catalog order
  pub creators:    Vec<Creator>,
  /// Call number, if the record has one
  pub call_number: Option<String>,
  /// File attachments of the record
  pub attachments: Vec<Attachment>,
}

/// An author, editor or other contributor of a catalog entry.
///
/// # Examples
///
/// ```
/// use zottk::catalog::Creator;
///
/// let person = Creator::person("Doe", "Jane");
/// assert_eq!(person.display_name(), "Jane Doe");
///
/// let organization = Creator::single("World Health Organization");
/// assert_eq!(organization.display_name(), "World Health Organization");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Creator {
  /// A two-field name
  Person {
    /// Family (last) name
    family: String,
    /// Given (first) name
    given:  String,
  },
  /// A single-field name, typically an organization
  Single {
    /// Name, displayed unchanged
    name: String,
  },
}

impl Creator {
  /// Creates a two-field creator.
  pub fn person(family: impl Into<String>, given: impl Into<String>) -> Self {
    Creator::Person { family: family.into(), given: given.into() }
  }

  /// Creates a single-field creator.
  pub fn single(name: impl Into<String>) -> Self { Creator::Single { name: name.into() } }

  /// Returns the name as it should appear in an author list.
  ///
  /// Two-field names read "given family"; a missing half leaves no stray space.
  pub fn display_name(&self) -> String {
    match self {
      Creator::Person { family, given } => {
        let (family, given) = (family.trim(), given.trim());
        match (given.is_empty(), family.is_empty()) {
          (false, false) => format!("{given} {family}"),
          (true, _) => family.to_string(),
          (false, true) => given.to_string(),
        }
      },
      Creator::Single { name } => name.clone(),
    }
  }
}

/// A file attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  /// Item key of the attachment itself
  pub key:          String,
  /// Key of the entry this attachment belongs to
  pub parent_key:   String,
  /// Attachment title, often the original file name
  pub title:        Option<String>,
  /// MIME type, when known
  pub content_type: Option<String>,
  /// Where the payload can be read from
  pub location:     AttachmentLocation,
}

/// Where an attachment payload lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentLocation {
  /// A file on the local file system
  Local(PathBuf),
  /// A file that must be downloaded
  Remote(String),
  /// A path that could not be resolved; reading it fails with this reason
  Unresolved(String),
}

impl Attachment {
  /// Whether the attachment is a PDF document.
  ///
  /// Attachments without a content type count as PDFs when their file name says so.
  pub fn is_pdf(&self) -> bool {
    match self.content_type.as_deref() {
      Some(content_type) => content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE),
      None => self
        .local_path()
        .and_then(Path::extension)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf")),
    }
  }

  /// The local file path, for attachments stored on disk.
  pub fn local_path(&self) -> Option<&Path> {
    match &self.location {
      AttachmentLocation::Local(path) => Some(path),
      AttachmentLocation::Remote(_) | AttachmentLocation::Unresolved(_) => None,
    }
  }
}

impl CatalogEntry {
  /// Iterates over the PDF attachments of the entry.
  pub fn pdf_attachments(&self) -> impl Iterator<Item = &Attachment> {
    self.attachments.iter().filter(|a| a.is_pdf())
  }
}

impl Display for CatalogEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.title.as_deref() {
      Some(title) if !title.is_empty() => write!(f, "\"{title}\" ({})", self.key),
      _ => write!(f, "untitled ({})", self.key),
    }
  }
}
