//! Export and metadata-stamping tools for a Zotero reference library.
//!
//! `zottk` reads the entries of a Zotero collection, either through the Zotero web API or
//! from the local `zotero.sqlite` snapshot, and exports their PDF attachments with the
//! bibliographic title and authors written into each file's metadata dictionary.
//!
//! # Features
//!
//! - **Two library readers**: the remote web API (v3) and a strictly read-only local database
//!   handle, both behind the [`library::LibraryReader`] trait
//! - **Metadata resolution**: catalog creators are normalized into a single author string
//! - **PDF embedding**: only the `Title` and `Author` entries of the Info dictionary change,
//!   every page and content stream is carried over untouched
//! - **Safe exports**: files are written through a temporary file and renamed into place,
//!   never over the attachment they came from
//! - **Maintenance**: missing call numbers can be derived from attachment directories and
//!   written back through the web API
//!
//! # Getting Started
//!
//! ```no_run
//! use zottk::{config::Config, library::RemoteLibrary, pipeline::Pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let config = Config::load(Config::default_path())?;
//!   let library = RemoteLibrary::new(&config)?;
//!
//!   let summary = Pipeline::new(library, "exports/thesis").run("thesis").await?;
//!   println!("exported {} files, {} failures", summary.exported(), summary.failed());
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`config`]: configuration file and the typed sections it contains
//! - [`prefs`]: discovery and parsing of Zotero `prefs.js` profile files
//! - [`catalog`]: catalog entries, creators and attachments
//! - [`attachment`]: resolution of stored and linked attachment paths
//! - [`library`]: remote and local library readers
//! - [`metadata`]: title and author resolution
//! - [`pdf`]: reading and embedding PDF Info metadata
//! - [`export`]: writing stamped copies to a target directory
//! - [`pipeline`]: the collection export run and its summary
//! - [`call_number`]: call number derivation and updates
//! - [`prelude`]: common traits and types for ergonomic imports

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::{BTreeMap, BTreeSet, VecDeque},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
};

use async_trait::async_trait;
use futures::stream::{self, LocalBoxStream, StreamExt, TryStreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod attachment;
pub mod call_number;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod library;
pub mod metadata;
pub mod pdf;
pub mod pipeline;
pub mod prefs;

use crate::{catalog::*, config::*, error::*, metadata::ResolvedMetadata};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use zottk::prelude::*;
///
/// fn describe(err: &ZottkError) -> &'static str {
///   if err.is_fatal() {
///     "aborting run"
///   } else {
///     "skipping item"
///   }
/// }
/// ```
pub mod prelude {
  pub use crate::{
    error::{ErrorKind, Result, ZottkError},
    library::LibraryReader,
  };
}
