//! Error types for the zottk CLI.

use thiserror::Error;

use super::*;

/// Error type alias used by the CLI commands.
pub type Result<T> = core::result::Result<T, ZottkCliError>;

/// Errors that can end a CLI command.
#[derive(Error, Debug)]
pub enum ZottkCliError {
  /// Failure reported by the library.
  #[error(transparent)]
  Zottk(#[from] ZottkError),

  /// A prompt could not be shown or answered.
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Reading or writing a file of the CLI itself failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// No configuration file exists at the expected location.
  #[error("No configuration file at {0}. Run `zottk init` to create one.")]
  MissingConfig(PathBuf),

  /// No attachment matched the pattern given to `embed`.
  #[error("No attachment path matches `{0}`")]
  NoMatch(String),
}

impl ZottkCliError {
  /// Whether the failure came from the web API rejecting the credentials.
  pub fn is_authentication(&self) -> bool {
    matches!(self, ZottkCliError::Zottk(e) if e.kind() == ErrorKind::Authentication)
  }
}
