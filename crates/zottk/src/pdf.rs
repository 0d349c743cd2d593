//! Reading and writing the PDF Info dictionary.
//!
//! [`embed_metadata`] is the only place a document is rewritten. It parses the source with
//! `lopdf`, overwrites the `Title` and `Author` entries of the Info dictionary and serializes
//! the object graph again. Pages, content streams, fonts and every other object keep their
//! bytes; no dates are stamped, so the same input always yields the same output.

use lopdf::{Dictionary, Document, Object, StringFormat};

use super::*;

/// Metadata entries of a PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PDFMetadata {
  /// `Title` entry
  pub title:    Option<String>,
  /// `Author` entry
  pub author:   Option<String>,
  /// `Subject` entry
  pub subject:  Option<String>,
  /// `Keywords` entry
  pub keywords: Option<String>,
}

/// Summary of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PDFContent {
  /// Info dictionary entries
  pub metadata:   PDFMetadata,
  /// Number of pages in the page tree
  pub page_count: usize,
}

/// Reads metadata out of PDF documents.
#[derive(Default)]
pub struct PDFAnalyzer;

impl PDFAnalyzer {
  /// Creates an analyzer.
  pub fn new() -> Self { Self }

  /// Parses the PDF at `path`.
  pub fn analyze<P: AsRef<Path>>(&self, path: P) -> Result<PDFContent> {
    self.analyze_bytes(&std::fs::read(path)?)
  }

  /// Parses an in-memory PDF.
  pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<PDFContent> {
    let doc = Document::load_mem(bytes)?;
    Ok(PDFContent { metadata: self.extract_metadata(&doc)?, page_count: doc.get_pages().len() })
  }

  /// Reads the Info dictionary, whether it is referenced from the trailer or inlined in it.
  fn extract_metadata(&self, doc: &Document) -> Result<PDFMetadata> {
    let info = match doc.trailer.get(b"Info") {
      Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_dict)?,
      Ok(Object::Dictionary(dict)) => dict,
      _ => return Ok(PDFMetadata::default()),
    };

    Ok(PDFMetadata {
      title:    self.get_text_from_dict(info, "Title"),
      author:   self.get_text_from_dict(info, "Author"),
      subject:  self.get_text_from_dict(info, "Subject"),
      keywords: self.get_text_from_dict(info, "Keywords"),
    })
  }

  /// Decodes a text string entry of a dictionary.
  fn get_text_from_dict(&self, dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key.as_bytes()).ok().and_then(|obj| obj.as_str().ok()).map(decode_text)
  }
}

/// Returns a copy of `source` whose Info dictionary carries the given title and author.
///
/// Empty strings are written as empty entries rather than skipped, so the output always
/// states exactly what the catalog holds.
///
/// # Errors
///
/// - [`ZottkError::Lopdf`] if `source` cannot be parsed
/// - [`ZottkError::EncryptedPdf`] if the document is encrypted
///
/// Both only concern this document.
pub fn embed_metadata(source: &[u8], metadata: &ResolvedMetadata) -> Result<Vec<u8>> {
  let mut doc = Document::load_mem(source)?;
  if doc.is_encrypted() {
    return Err(ZottkError::EncryptedPdf);
  }

  let info_id = info_object_id(&mut doc);
  let info = doc.get_dictionary_mut(info_id)?;
  info.set("Title", encode_text(&metadata.title));
  info.set("Author", encode_text(&metadata.author));

  let mut output = Vec::with_capacity(source.len());
  doc.save_to(&mut output)?;
  trace!("Embedded {metadata:?}, {} -> {} bytes", source.len(), output.len());
  Ok(output)
}

/// Returns the id of the indirect Info dictionary, creating one if the trailer has none.
///
/// An Info dictionary inlined in the trailer is moved into a new indirect object, keeping its
/// entries.
fn info_object_id(doc: &mut Document) -> (u32, u16) {
  if let Ok(id) = doc.trailer.get(b"Info").and_then(Object::as_reference) {
    if doc.get_dictionary(id).is_ok() {
      return id;
    }
  }
  let existing = doc.trailer.get(b"Info").and_then(Object::as_dict).cloned().unwrap_or_default();
  let id = doc.add_object(existing);
  doc.trailer.set("Info", Object::Reference(id));
  id
}

/// Encodes a PDF text string: literal bytes for ASCII, UTF-16BE with a byte order mark
/// otherwise.
fn encode_text(value: &str) -> Object {
  if value.is_ascii() {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
  } else {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(value.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
  }
}

/// Decodes a PDF text string (UTF-16BE, UTF-8 with BOM, or a single-byte encoding).
fn decode_text(bytes: &[u8]) -> String {
  if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
    let (cow, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(utf16);
    cow.into_owned()
  } else if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
    String::from_utf8_lossy(utf8).into_owned()
  } else {
    match std::str::from_utf8(bytes) {
      Ok(text) => text.to_string(),
      Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
  }
}
