//! Error types for the zottk library.
//!
//! Every failure is a [`ZottkError`]. Callers decide what to do with one through
//! [`ZottkError::kind`], which sorts errors into the categories a run cares about:
//!
//! - configuration problems, detected before any network or file access
//! - rejected credentials
//! - connection failures, surfaced as is and never retried
//! - per-item failures (unreadable or encrypted PDFs, missing files), which only skip the
//!   attachment they belong to
//!
//! # Examples
//!
//! ```
//! use zottk::error::{ErrorKind, ZottkError};
//!
//! let err = ZottkError::MissingConfigKey { section: "credentials", key: "key" };
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert!(err.is_fatal());
//!
//! let err = ZottkError::EncryptedPdf;
//! assert_eq!(err.kind(), ErrorKind::PerItem);
//! assert!(!err.is_fatal());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Error type alias used for the [`zottk`](crate) crate.
pub type Result<T> = core::result::Result<T, ZottkError>;

/// Errors that can occur while reading a library or exporting its attachments.
#[derive(Error, Debug)]
pub enum ZottkError {
  /// A key required by the requested operation is absent (or empty) in the configuration.
  #[error("Missing required configuration key `{section}.{key}`")]
  MissingConfigKey {
    /// Section of the configuration file, e.g. `credentials`
    section: &'static str,
    /// Key within the section, e.g. `user_id`
    key:     &'static str,
  },

  /// The configuration is unusable for another reason (unreadable file, bad proxy URL...).
  #[error("{0}")]
  Config(String),

  /// The configuration file is not valid TOML or does not match the expected schema.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The web API rejected the API key / user identifier pair.
  #[error("Authentication failed: {0}")]
  Authentication(String),

  /// A network request could not be completed.
  ///
  /// This covers DNS failures, refused connections, TLS errors and timeouts. Requests are
  /// never retried.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The web API answered with an unexpected status or payload.
  #[error("API error: {0}")]
  ApiError(String),

  /// No collection with the requested name or key exists in the library.
  #[error("Could not find collection: {0}")]
  CollectionNotFound(String),

  /// The web API refused an update because the item changed since the given version.
  #[error("Item {key} was modified since version {version}")]
  VersionConflict {
    /// Key of the item that was being updated
    key:     String,
    /// Version the update was conditioned on
    version: u64,
  },

  /// A query against the local Zotero database failed.
  ///
  /// Writes through the read-only handle also surface here, as `SQLITE_READONLY`.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A JSON payload could not be decoded.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The attachment payload is not a PDF `lopdf` can parse.
  ///
  /// Common causes are truncated downloads, files that merely carry a `.pdf` extension and
  /// broken cross-reference tables.
  #[error("PDF parse error: {0}")]
  Lopdf(#[from] lopdf::Error),

  /// The attachment is an encrypted PDF, which is never rewritten.
  #[error("PDF parse error: document is encrypted")]
  EncryptedPdf,

  /// An attachment path stored in the library cannot be turned into a file path.
  #[error("Invalid attachment path: {0}")]
  InvalidAttachmentPath(String),

  /// The attachment has no payload that can be read (e.g. a linked URL).
  #[error("Attachment {0} has no readable file")]
  NoPayload(String),

  /// An export would have overwritten the attachment it was made from.
  #[error("Refusing to overwrite source attachment {}", .0.display())]
  SameSourceAndTarget(PathBuf),
}

/// Coarse classification of a [`ZottkError`], deciding whether a run may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Missing or malformed configuration; raised before any I/O happens.
  Configuration,
  /// Invalid credential/identifier pair.
  Authentication,
  /// Network, database or API failure affecting the whole run.
  Connection,
  /// Failure confined to a single attachment; the run skips it and goes on.
  PerItem,
}

impl ZottkError {
  /// Returns the category this error belongs to.
  pub fn kind(&self) -> ErrorKind {
    match self {
      ZottkError::MissingConfigKey { .. } | ZottkError::Config(_) | ZottkError::TomlDe(_) =>
        ErrorKind::Configuration,
      ZottkError::CollectionNotFound(_) => ErrorKind::Configuration,
      ZottkError::Authentication(_) => ErrorKind::Authentication,
      ZottkError::Network(_)
      | ZottkError::ApiError(_)
      | ZottkError::Sqlite(_)
      | ZottkError::Json(_) => ErrorKind::Connection,
      ZottkError::VersionConflict { .. }
      | ZottkError::Path(_)
      | ZottkError::Lopdf(_)
      | ZottkError::EncryptedPdf
      | ZottkError::InvalidAttachmentPath(_)
      | ZottkError::NoPayload(_)
      | ZottkError::SameSourceAndTarget(_) => ErrorKind::PerItem,
    }
  }

  /// Whether this error must terminate the current run.
  pub fn is_fatal(&self) -> bool { self.kind() != ErrorKind::PerItem }
}
