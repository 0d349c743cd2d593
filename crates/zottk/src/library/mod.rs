//! Library readers: where catalog entries and attachment payloads come from.
//!
//! Two implementations of [`LibraryReader`] are provided:
//!
//! - [`RemoteLibrary`] talks to the Zotero web API v3 and can also write call numbers back
//! - [`LocalLibrary`] queries a `zotero.sqlite` snapshot through a [`ReadOnlyDatabase`]
//!
//! Both yield the entries of a collection as a lazy stream, one entry at a time.

use super::*;

pub mod local;
pub mod remote;

pub use self::{
  local::{LocalLibrary, ReadOnlyDatabase},
  remote::RemoteLibrary,
};

/// Lazy, finite sequence of the entries of a collection.
///
/// The stream is not restartable; the first error ends it.
pub type EntryStream<'a> = LocalBoxStream<'a, Result<CatalogEntry>>;

/// Source of catalog entries and attachment payloads.
///
/// # Examples
///
/// ```no_run
/// use futures::TryStreamExt;
/// use zottk::{library::LibraryReader, prelude::*};
///
/// async fn count_pdfs(library: &impl LibraryReader) -> Result<usize> {
///   let entries: Vec<_> = library.entries("thesis").try_collect().await?;
///   Ok(entries.iter().map(|entry| entry.pdf_attachments().count()).sum())
/// }
/// ```
#[async_trait(?Send)]
pub trait LibraryReader {
  /// Streams the entries of the collection named (or keyed) `collection`.
  ///
  /// An unknown collection yields a single [`ZottkError::CollectionNotFound`]; an empty one
  /// yields nothing.
  fn entries<'a>(&'a self, collection: &'a str) -> EntryStream<'a>;

  /// Reads the payload of an attachment.
  ///
  /// The default implementation reads local files and rejects everything else.
  async fn read_payload(&self, attachment: &Attachment) -> Result<Vec<u8>> {
    read_local(attachment).await
  }
}

/// Reads the payload of an attachment stored on the local file system.
pub async fn read_local(attachment: &Attachment) -> Result<Vec<u8>> {
  match &attachment.location {
    AttachmentLocation::Local(path) => {
      trace!("Reading {}", path.display());
      Ok(tokio::fs::read(path).await?)
    },
    AttachmentLocation::Remote(_) => Err(ZottkError::NoPayload(attachment.key.clone())),
    AttachmentLocation::Unresolved(reason) =>
      Err(ZottkError::InvalidAttachmentPath(reason.clone())),
  }
}

#[async_trait(?Send)]
impl<L: LibraryReader + ?Sized> LibraryReader for &L {
  fn entries<'a>(&'a self, collection: &'a str) -> EntryStream<'a> {
    (**self).entries(collection)
  }

  async fn read_payload(&self, attachment: &Attachment) -> Result<Vec<u8>> {
    (**self).read_payload(attachment).await
  }
}
