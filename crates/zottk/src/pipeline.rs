//! The collection export run.
//!
//! A [`Pipeline`] walks the entries of one collection in order. For each PDF attachment it
//! reads the payload, stamps it with the entry's title and authors and writes it to the
//! target directory. Entries are handled one at a time, with no concurrency.
//!
//! Errors are split by [`ZottkError::is_fatal`]: a fatal error (configuration,
//! credentials, connection) ends the run, a per-item error is recorded in the
//! [`RunSummary`] and the run moves on to the next attachment.

use super::*;
use crate::{
  export::{ExportResult, Exporter},
  format::{claim_file_name, export_file_name},
  library::LibraryReader,
  metadata::resolve,
};

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
  /// Number of catalog entries visited
  pub entries: usize,
  /// One result per PDF attachment, in processing order
  pub results: Vec<ExportResult>,
}

impl RunSummary {
  /// Number of files written.
  pub fn exported(&self) -> usize { self.results.iter().filter(|r| r.success).count() }

  /// Number of attachments that could not be exported.
  pub fn failed(&self) -> usize { self.results.len() - self.exported() }

  /// Results of the attachments that could not be exported.
  pub fn failures(&self) -> impl Iterator<Item = &ExportResult> {
    self.results.iter().filter(|r| !r.success)
  }
}

/// Exports the PDF attachments of a collection with embedded metadata.
pub struct Pipeline<L> {
  /// Where entries and payloads come from
  library:  L,
  /// Where stamped files go
  exporter: Exporter,
}

impl<L: LibraryReader> Pipeline<L> {
  /// Creates a pipeline reading from `library` and writing into `target_dir`.
  pub fn new(library: L, target_dir: impl AsRef<Path>) -> Self {
    Self { library, exporter: Exporter::new(target_dir) }
  }

  /// The library this pipeline reads from.
  pub fn library(&self) -> &L { &self.library }

  /// The exporter this pipeline writes with.
  pub fn exporter(&self) -> &Exporter { &self.exporter }

  /// Exports every PDF attachment of `collection`.
  ///
  /// Every attachment gets its own file name within the run, even when entries share a
  /// title.
  ///
  /// # Errors
  ///
  /// Returns the first fatal error. Per-item errors never fail the run; they show up as
  /// unsuccessful [`ExportResult`]s.
  pub async fn run(&self, collection: &str) -> Result<RunSummary> {
    info!("Exporting collection {collection} to {}", self.exporter.target_dir().display());
    let mut summary = RunSummary::default();
    let mut used_names = BTreeSet::new();
    let mut entries = self.library.entries(collection);

    while let Some(entry) = entries.try_next().await? {
      summary.entries += 1;
      let metadata = resolve(&entry);

      let mut pdfs = entry.pdf_attachments().peekable();
      if pdfs.peek().is_none() {
        debug!("{entry} has no PDF attachment");
      }
      for (index, attachment) in pdfs.enumerate() {
        let file_name =
          claim_file_name(&mut used_names, &export_file_name(&entry, index), &entry.key);
        match self.export_attachment(attachment, &metadata, &file_name).await {
          Ok(output) => {
            info!("Exported {entry} to {}", output.display());
            summary.results.push(ExportResult::written(attachment, output));
          },
          Err(e) if e.is_fatal() => return Err(e),
          Err(e) => {
            warn!("Skipping attachment {} of {entry}: {e}", attachment.key);
            let output = self.exporter.target_path(&file_name);
            summary.results.push(ExportResult::failed(attachment, output, &e));
          },
        }
      }
    }

    info!(
      "Visited {} entries: {} exported, {} failed",
      summary.entries,
      summary.exported(),
      summary.failed()
    );
    Ok(summary)
  }

  /// Reads, stamps and writes one attachment.
  async fn export_attachment(
    &self,
    attachment: &Attachment,
    metadata: &ResolvedMetadata,
    file_name: &str,
  ) -> Result<PathBuf> {
    let payload = self.library.read_payload(attachment).await?;
    self.exporter.export(&payload, metadata, file_name, attachment.local_path())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    library::{local::tests::seeded_data_dir, EntryStream, LocalLibrary},
    pdf::{tests::sample_pdf, PDFAnalyzer},
  };

  /// In-memory library whose payloads are keyed by attachment key.
  struct MemoryLibrary {
    entries:  Vec<CatalogEntry>,
    payloads: BTreeMap<String, Vec<u8>>,
    /// Fail with a connection error after yielding this many entries
    fail_at:  Option<usize>,
  }

  #[async_trait(?Send)]
  impl LibraryReader for MemoryLibrary {
    fn entries<'a>(&'a self, _collection: &'a str) -> EntryStream<'a> {
      let limit = self.fail_at.unwrap_or(self.entries.len());
      let entries = self.entries.iter().take(limit).cloned().map(Ok);
      let failure = self
        .fail_at
        .map(|_| Err(ZottkError::ApiError("500 Internal Server Error".into())))
        .into_iter();
      stream::iter(entries.chain(failure)).boxed_local()
    }

    async fn read_payload(&self, attachment: &Attachment) -> Result<Vec<u8>> {
      self
        .payloads
        .get(&attachment.key)
        .cloned()
        .ok_or_else(|| ZottkError::NoPayload(attachment.key.clone()))
    }
  }

  fn entry(key: &str, title: Option<&str>, attachment_keys: &[&str]) -> CatalogEntry {
    CatalogEntry {
      key:         key.into(),
      version:     1,
      title:       title.map(String::from),
      creators:    vec![Creator::person("Doe", "Jane")],
      call_number: None,
      attachments: attachment_keys
        .iter()
        .map(|attachment_key| Attachment {
          key:          attachment_key.to_string(),
          parent_key:   key.into(),
          title:        None,
          content_type: Some(PDF_CONTENT_TYPE.into()),
          location:     AttachmentLocation::Remote(format!("memory://{attachment_key}")),
        })
        .collect(),
    }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_local_collection_end_to_end() {
    let data_dir = seeded_data_dir();
    let doe = data_dir.path().join("papers").join("d").join("doe2017");
    std::fs::create_dir_all(&doe).unwrap();
    std::fs::write(doe.join("doe2017.pdf"), sample_pdf(2, None)).unwrap();
    let roe = data_dir.path().join("storage").join("ATTROE01");
    std::fs::create_dir_all(&roe).unwrap();
    std::fs::write(roe.join("roe2019.pdf"), sample_pdf(1, None)).unwrap();

    let config = Config::default()
      .with_data_directory(data_dir.path())
      .with_base_attachment_path(data_dir.path().join("papers"));
    let out = tempdir().unwrap();
    let pipeline = Pipeline::new(LocalLibrary::from_config(&config).unwrap(), out.path());

    let summary = pipeline.run("no_call_number").await.unwrap();

    assert_eq!(summary.entries, 2);
    assert_eq!(summary.exported(), 2);
    assert_eq!(summary.failed(), 0);

    let analyzer = PDFAnalyzer::new();
    let titled = analyzer.analyze(out.path().join("Homogenization_of_random_media.pdf")).unwrap();
    assert_eq!(titled.metadata.title.as_deref(), Some("Homogenization of random media"));
    assert_eq!(titled.metadata.author.as_deref(), Some("Jane Doe, ACME Lab"));
    assert_eq!(titled.page_count, 2);

    let untitled = analyzer.analyze(out.path().join("ROE2019B.pdf")).unwrap();
    assert_eq!(untitled.metadata.title.as_deref(), Some(""));
    assert_eq!(untitled.metadata.author.as_deref(), Some("Richard Roe"));
    assert!(logs_contain("Exported"));
  }

  #[tokio::test]
  async fn test_per_item_failures_are_isolated() {
    let library = MemoryLibrary {
      entries:  vec![
        entry("GOOD0001", Some("Good paper"), &["A1", "A2"]),
        entry("BAD00001", Some("Broken paper"), &["B1"]),
        entry("GONE0001", None, &["C1"]),
      ],
      payloads: BTreeMap::from([
        ("A1".to_string(), sample_pdf(1, None)),
        ("A2".to_string(), sample_pdf(1, None)),
        ("B1".to_string(), b"%PDF-1.4 truncated".to_vec()),
      ]),
      fail_at:  None,
    };
    let out = tempdir().unwrap();

    let summary = Pipeline::new(library, out.path()).run("any").await.unwrap();

    assert_eq!(summary.entries, 3);
    assert_eq!(summary.exported(), 2);
    assert_eq!(summary.failed(), 2);
    assert!(out.path().join("Good_paper.pdf").exists());
    assert!(out.path().join("Good_paper-1.pdf").exists());
    let failed: Vec<&str> = summary.failures().map(|r| r.attachment_key.as_str()).collect();
    assert_eq!(failed, ["B1", "C1"]);
    assert!(summary.failures().all(|r| r.error.is_some()));
  }

  #[tokio::test]
  async fn test_same_title_entries_get_distinct_files() {
    let library = MemoryLibrary {
      entries:  vec![
        entry("AAAA0001", Some("Editorial"), &["A1"]),
        entry("BBBB0002", Some("Editorial"), &["B1"]),
      ],
      payloads: BTreeMap::from([
        ("A1".to_string(), sample_pdf(1, None)),
        ("B1".to_string(), sample_pdf(2, None)),
      ]),
      fail_at:  None,
    };
    let out = tempdir().unwrap();

    let summary = Pipeline::new(library, out.path()).run("any").await.unwrap();

    assert_eq!(summary.exported(), 2);
    let outputs: Vec<PathBuf> = summary.results.iter().map(|r| r.output.clone()).collect();
    assert_eq!(outputs, [
      out.path().join("Editorial.pdf"),
      out.path().join("Editorial-BBBB0002.pdf")
    ]);
    let analyzer = PDFAnalyzer::new();
    assert_eq!(analyzer.analyze(&outputs[0]).unwrap().page_count, 1);
    assert_eq!(analyzer.analyze(&outputs[1]).unwrap().page_count, 2);
  }

  #[tokio::test]
  async fn test_fatal_error_stops_run() {
    let library = MemoryLibrary {
      entries:  vec![entry("GOOD0001", Some("Good paper"), &["A1"])],
      payloads: BTreeMap::from([("A1".to_string(), sample_pdf(1, None))]),
      fail_at:  Some(1),
    };
    let out = tempdir().unwrap();

    let err = Pipeline::new(&library, out.path()).run("any").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(out.path().join("Good_paper.pdf").exists());
  }
}
