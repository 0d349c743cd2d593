//! Writing stamped copies of attachments to a target directory.
//!
//! An export never touches the attachment it was made from. The stamped bytes go to a
//! temporary file next to the target and are renamed over it once complete, so an
//! interrupted run leaves either the previous file or the new one, never half of either.

use std::io::Write;

use tempfile::NamedTempFile;

use super::*;
use crate::pdf::embed_metadata;

/// Outcome of exporting a single attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
  /// Key of the catalog entry the attachment belongs to
  pub entry_key:      String,
  /// Key of the exported attachment
  pub attachment_key: String,
  /// Target path (written or attempted)
  pub output:         PathBuf,
  /// Whether the file was written
  pub success:        bool,
  /// Failure description, for unsuccessful exports
  pub error:          Option<String>,
}

impl ExportResult {
  /// A successful export to `output`.
  pub fn written(attachment: &Attachment, output: PathBuf) -> Self {
    Self {
      entry_key: attachment.parent_key.clone(),
      attachment_key: attachment.key.clone(),
      output,
      success: true,
      error: None,
    }
  }

  /// A failed export to `output`.
  pub fn failed(attachment: &Attachment, output: PathBuf, error: &ZottkError) -> Self {
    Self {
      entry_key: attachment.parent_key.clone(),
      attachment_key: attachment.key.clone(),
      output,
      success: false,
      error: Some(error.to_string()),
    }
  }
}

/// Writes metadata-stamped PDFs into a directory.
///
/// # Examples
///
/// ```no_run
/// use zottk::{export::Exporter, metadata::ResolvedMetadata};
///
/// # fn main() -> zottk::error::Result<()> {
/// let exporter = Exporter::new("exports");
/// let source = std::fs::read("papers/doe2017.pdf")?;
/// let metadata = ResolvedMetadata::new("On Elasticity", "Jane Doe");
/// let written = exporter.export(&source, &metadata, "On_Elasticity.pdf", None)?;
/// println!("wrote {}", written.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Exporter {
  /// Directory receiving the exported files
  target_dir: PathBuf,
}

impl Exporter {
  /// Creates an exporter writing into `target_dir`, which is created on first export.
  pub fn new(target_dir: impl AsRef<Path>) -> Self {
    Self { target_dir: target_dir.as_ref().to_path_buf() }
  }

  /// Directory receiving the exported files.
  pub fn target_dir(&self) -> &Path { &self.target_dir }

  /// Path an export named `file_name` is written to.
  pub fn target_path(&self, file_name: &str) -> PathBuf { self.target_dir.join(file_name) }

  /// Stamps `payload` with `metadata` and writes it to `<target dir>/<file_name>`.
  ///
  /// An existing file at the target is replaced. `source` is the file the payload was read
  /// from, when there is one; writing over it is refused.
  ///
  /// # Errors
  ///
  /// - [`ZottkError::SameSourceAndTarget`] if the target is the source file
  /// - [`ZottkError::Lopdf`] or [`ZottkError::EncryptedPdf`] if the payload cannot be stamped
  /// - [`ZottkError::Path`] if the file cannot be written
  pub fn export(
    &self,
    payload: &[u8],
    metadata: &ResolvedMetadata,
    file_name: &str,
    source: Option<&Path>,
  ) -> Result<PathBuf> {
    let target = self.target_path(file_name);
    self.write(payload, metadata, &target, source)?;
    Ok(target)
  }

  /// Stamps `payload` and writes it to an explicit `target` path.
  pub fn write(
    &self,
    payload: &[u8],
    metadata: &ResolvedMetadata,
    target: &Path,
    source: Option<&Path>,
  ) -> Result<()> {
    let dir = match target.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    if let Some(source) = source {
      if same_file(source, target) {
        return Err(ZottkError::SameSourceAndTarget(source.to_path_buf()));
      }
    }

    let stamped = embed_metadata(payload, metadata)?;

    let mut file = NamedTempFile::new_in(&dir)?;
    file.write_all(&stamped)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| ZottkError::Path(e.error))?;

    debug!("Wrote {} ({} bytes)", target.display(), stamped.len());
    Ok(())
  }
}

/// Whether both paths name the same existing file.
fn same_file(source: &Path, target: &Path) -> bool {
  match (source.canonicalize(), target.canonicalize()) {
    (Ok(source), Ok(target)) => source == target,
    _ => false,
  }
}
