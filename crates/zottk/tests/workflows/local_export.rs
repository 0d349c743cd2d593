use zottk::{export::Exporter, metadata::resolve};

use super::*;

#[traced_test]
#[tokio::test]
async fn test_local_export_end_to_end() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  let database = data_dir.path().join(DATABASE_FILE_NAME);
  let database_before = std::fs::read(&database)?;
  let out = tempdir()?;

  let library = LocalLibrary::from_config(&local_config(data_dir.path()))?;
  let summary = Pipeline::new(library, out.path()).run("no_call_number").await?;

  assert_eq!(summary.entries, 2);
  assert_eq!(summary.exported(), 2);
  assert_eq!(summary.failed(), 0);

  let analyzer = PDFAnalyzer::new();
  let doe = analyzer.analyze(out.path().join("Homogenization_of_random_media.pdf"))?;
  assert_eq!(doe.metadata.title.as_deref(), Some("Homogenization of random media"));
  assert_eq!(doe.metadata.author.as_deref(), Some("Jane Doe, ACME Lab"));
  assert_eq!(doe.page_count, 3);

  let roe = analyzer.analyze(out.path().join("ROE2019B.pdf"))?;
  assert_eq!(roe.metadata.title.as_deref(), Some(""));
  assert_eq!(roe.page_count, 2);

  // Only the two PDFs were written; the HTML snapshot is not exported.
  assert_eq!(std::fs::read_dir(out.path())?.count(), 2);
  // Sources and the database are untouched.
  assert_eq!(std::fs::read(data_dir.path().join("papers/d/doe2017/doe2017.pdf"))?, sample_pdf(3));
  assert_eq!(std::fs::read(&database)?, database_before);
  Ok(())
}

#[tokio::test]
async fn test_repeated_export_is_byte_identical() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  let out = tempdir()?;
  let pipeline =
    Pipeline::new(LocalLibrary::from_config(&local_config(data_dir.path()))?, out.path());

  pipeline.run("thesis").await?;
  let target = out.path().join("Elastic_moduli_of_heterogeneous_materials.pdf");
  let first = std::fs::read(&target)?;
  pipeline.run("thesis").await?;
  assert_eq!(std::fs::read(&target)?, first);
  Ok(())
}

#[tokio::test]
async fn test_missing_linked_file_is_skipped() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  std::fs::remove_file(data_dir.path().join("papers/d/doe2017/doe2017.pdf"))?;
  let out = tempdir()?;

  let library = LocalLibrary::from_config(&local_config(data_dir.path()))?;
  let summary = Pipeline::new(library, out.path()).run("no_call_number").await?;

  assert_eq!(summary.exported(), 1);
  assert_eq!(summary.failed(), 1);
  let failure = summary.failures().next().unwrap();
  assert_eq!(failure.entry_key, "DOE2017A");
  assert_eq!(failure.attachment_key, "ATTDOE01");
  Ok(())
}

#[tokio::test]
async fn test_missing_base_path_only_fails_linked_files() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  let config = Config::default().with_data_directory(data_dir.path());
  let out = tempdir()?;

  let summary =
    Pipeline::new(LocalLibrary::from_config(&config)?, out.path()).run("no_call_number").await?;

  assert_eq!(summary.exported(), 1);
  assert_eq!(summary.failed(), 1);
  let error = summary.failures().next().and_then(|r| r.error.clone()).unwrap();
  assert!(error.contains("base_attachment_path"), "unexpected error: {error}");
  Ok(())
}

#[test]
fn test_embed_single_attachment() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  let library = LocalLibrary::from_config(&local_config(data_dir.path()))?;

  let found = library.find_attachments("attachments:s/%")?;
  assert_eq!(found.len(), 1);
  let attachment = &found[0];
  let entry = library.entry_by_key(&attachment.parent_key)?;
  let source = attachment.local_path().unwrap();

  let out = tempdir()?;
  let target = out.path().join("smith2021-with_metadata.pdf");
  let payload = std::fs::read(source)?;
  Exporter::new(out.path()).write(&payload, &resolve(&entry), &target, Some(source))?;

  let metadata = PDFAnalyzer::new().analyze(&target)?.metadata;
  assert_eq!(metadata.title.as_deref(), Some("Elastic moduli of heterogeneous materials"));
  assert_eq!(metadata.author.as_deref(), Some("John Smith"));
  Ok(())
}

#[tokio::test]
async fn test_local_reader_rejects_unknown_collection() -> TestResult<()> {
  let data_dir = zotero_data_dir();
  let library = LocalLibrary::from_config(&local_config(data_dir.path()))?;

  let result: Result<Vec<CatalogEntry>> = library.entries("missing").try_collect().await;
  assert_eq!(result.unwrap_err().kind(), ErrorKind::Configuration);
  Ok(())
}
