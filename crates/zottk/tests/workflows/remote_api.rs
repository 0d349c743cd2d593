use serde_json::{json, Value};
use zottk::call_number::{self, CallNumberUpdate};

use super::*;

const USER_ID: &str = "475425";
const API_KEY: &str = "secret";

fn collection(key: &str, name: &str) -> Value {
  json!({
    "key": key,
    "version": 1,
    "data": { "key": key, "name": name, "parentCollection": false }
  })
}

fn item(key: &str, version: u64, children: u64, data: Value) -> Value {
  json!({ "key": key, "version": version, "meta": { "numChildren": children }, "data": data })
}

fn paginate(records: Vec<Value>, request: &Request) -> Reply {
  let start: usize = request.query("start").and_then(|s| s.parse().ok()).unwrap_or(0);
  let limit: usize = request.query("limit").and_then(|s| s.parse().ok()).unwrap_or(25);
  let total = records.len().to_string();
  let page: Vec<Value> = records.into_iter().skip(start).take(limit).collect();
  Reply::json(Value::Array(page)).with_header("Total-Results", &total)
}

/// A tiny Zotero library served over the web API.
fn zotero_api(request: &Request) -> Reply {
  if request.header("Zotero-API-Key") != Some(API_KEY) {
    return Reply::status(403);
  }
  let users = format!("/users/{USER_ID}");
  let Some(path) = request.path().strip_prefix(&users) else {
    return Reply::status(404);
  };

  match (request.method.as_str(), path) {
    ("GET", "/collections") => paginate(
      vec![
        collection("COLL0001", "no_call_number"),
        collection("COLL0002", "thesis"),
        collection("COLL0003", "empty"),
      ],
      request,
    ),
    ("GET", "/collections/COLL0001/items/top") => paginate(
      vec![
        item(
          "DOE2017A",
          12,
          2,
          json!({
            "itemType": "journalArticle",
            "title": "Homogenization of random media",
            "creators": [
              { "creatorType": "author", "firstName": "Jane", "lastName": "Doe" },
              { "creatorType": "author", "name": "ACME Lab" }
            ],
            "callNumber": ""
          }),
        ),
        item("NOTE0001", 2, 0, json!({ "itemType": "note", "note": "<p>Reading list</p>" })),
        item(
          "ROE2019B",
          7,
          1,
          json!({
            "itemType": "report",
            "creators": [{ "creatorType": "author", "firstName": "Richard", "lastName": "Roe" }]
          }),
        ),
        item(
          "SMITH21C",
          3,
          0,
          json!({ "itemType": "book", "title": "Elastic moduli", "callNumber": "SMITH2021" }),
        ),
      ],
      request,
    ),
    ("GET", "/collections/COLL0003/items/top") => paginate(vec![], request),
    ("GET", "/items/DOE2017A/children") => paginate(
      vec![
        item(
          "ATTDOE01",
          12,
          0,
          json!({
            "itemType": "attachment",
            "linkMode": "imported_file",
            "contentType": "application/pdf",
            "filename": "doe2017.pdf",
            "title": "Full Text PDF"
          }),
        ),
        item("NOTEDOE1", 12, 0, json!({ "itemType": "note", "note": "" })),
      ],
      request,
    ),
    ("GET", "/items/ROE2019B/children") => paginate(
      vec![item(
        "ATTROE02",
        7,
        0,
        json!({ "itemType": "attachment", "linkMode": "linked_url", "url": "https://example.org" }),
      )],
      request,
    ),
    ("GET", "/items/ATTDOE01/file") => Reply::bytes("application/pdf", sample_pdf(2)),
    ("PATCH", "/items/DOE2017A") => match request.header("If-Unmodified-Since-Version") {
      Some("12") => Reply::status(204).with_header("Last-Modified-Version", "13"),
      _ => Reply::status(412),
    },
    ("PATCH", _) => Reply::status(412),
    _ => Reply::status(404),
  }
}

fn remote_config(url: &str) -> Config {
  Config::default().with_credentials(API_KEY, USER_ID).with_api_url(url).with_page_size(2)
}

#[traced_test]
#[tokio::test]
async fn test_entries_cross_page_boundaries() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let library = RemoteLibrary::new(&remote_config(&server.url))?;

  let entries: Vec<CatalogEntry> = library.entries("no_call_number").try_collect().await?;

  let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
  assert_eq!(keys, ["DOE2017A", "ROE2019B", "SMITH21C"]);
  assert_eq!(entries[0].attachments.len(), 1);
  assert!(entries[1].attachments.is_empty());
  assert_eq!(entries[2].call_number.as_deref(), Some("SMITH2021"));

  let requests = server.requests().await;
  let starts: Vec<&str> = requests
    .iter()
    .filter(|r| r.path().ends_with("/items/top"))
    .filter_map(|r| r.query("start"))
    .collect();
  // The second page completes Total-Results, so no empty page is requested.
  assert_eq!(starts, ["0", "2"]);
  assert!(requests.iter().all(|r| r.query("limit") == Some("2")));
  assert!(requests.iter().all(|r| r.header("Zotero-API-Version") == Some("3")));
  // Items without children are never asked for them.
  assert!(!requests.iter().any(|r| r.path().contains("SMITH21C")));
  Ok(())
}

/// A library of 120 books whose server never serves more than 100 records per page.
fn capped_api(request: &Request) -> Reply {
  let users = format!("/users/{USER_ID}");
  let limit: usize = request.query("limit").and_then(|s| s.parse().ok()).unwrap_or(25);
  let start: usize = request.query("start").and_then(|s| s.parse().ok()).unwrap_or(0);
  let records: Vec<Value> = match request.path().strip_prefix(&users) {
    Some("/collections") => vec![collection("COLLBIG1", "big")],
    Some("/collections/COLLBIG1/items/top") => (0..120)
      .map(|n| item(&format!("BOOK{n:04}"), 1, 0, json!({ "itemType": "book", "title": "" })))
      .collect(),
    _ => return Reply::status(404),
  };
  let total = records.len().to_string();
  let page: Vec<Value> = records.into_iter().skip(start).take(limit.min(100)).collect();
  Reply::json(Value::Array(page)).with_header("Total-Results", &total)
}

#[tokio::test]
async fn test_large_page_size_reads_whole_collection() -> TestResult<()> {
  let server = StubServer::start(capped_api).await;
  let config = Config::default()
    .with_credentials(API_KEY, USER_ID)
    .with_api_url(&server.url)
    .with_page_size(150);
  let library = RemoteLibrary::new(&config)?;

  let entries: Vec<CatalogEntry> = library.entries("big").try_collect().await?;

  assert_eq!(entries.len(), 120);
  assert_eq!(entries[119].key, "BOOK0119");
  let requests = server.requests().await;
  assert!(requests.iter().all(|r| r.query("limit") == Some("100")));
  Ok(())
}

#[tokio::test]
async fn test_remote_export_downloads_stored_files() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let out = tempdir()?;

  let library = RemoteLibrary::new(&remote_config(&server.url))?;
  let summary = Pipeline::new(library, out.path()).run("no_call_number").await?;

  assert_eq!(summary.entries, 3);
  assert_eq!(summary.exported(), 1);
  assert_eq!(summary.failed(), 0);
  let content = PDFAnalyzer::new().analyze(out.path().join("Homogenization_of_random_media.pdf"))?;
  assert_eq!(content.metadata.author.as_deref(), Some("Jane Doe, ACME Lab"));
  assert_eq!(content.page_count, 2);
  Ok(())
}

#[tokio::test]
async fn test_empty_and_unknown_collections() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let library = RemoteLibrary::new(&remote_config(&server.url))?;

  let entries: Vec<CatalogEntry> = library.entries("COLL0003").try_collect().await?;
  assert!(entries.is_empty());

  let err = library.entries("nope").try_collect::<Vec<_>>().await.unwrap_err();
  assert!(matches!(err, ZottkError::CollectionNotFound(_)));
  Ok(())
}

#[tokio::test]
async fn test_forbidden_is_authentication_error() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let config = Config::default()
    .with_credentials("wrong-key", USER_ID)
    .with_api_url(&server.url)
    .with_page_size(2);
  let out = tempdir()?;

  let err = Pipeline::new(RemoteLibrary::new(&config)?, out.path())
    .run("no_call_number")
    .await
    .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Authentication);
  assert!(err.is_fatal());
  assert_eq!(server.requests().await.len(), 1);
  Ok(())
}

#[tokio::test]
async fn test_missing_credentials_fail_before_any_request() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let config = Config::default().with_api_url(&server.url);

  let err = RemoteLibrary::new(&config).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Configuration);
  assert!(server.requests().await.is_empty());
  Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() -> TestResult<()> {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
  let url = format!("http://{}", listener.local_addr()?);
  drop(listener);

  let library = RemoteLibrary::new(&remote_config(&url))?;
  let err = library.entries("no_call_number").try_collect::<Vec<_>>().await.unwrap_err();

  assert!(matches!(err, ZottkError::Network(_)));
  assert_eq!(err.kind(), ErrorKind::Connection);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_call_numbers_written_with_version_precondition() -> TestResult<()> {
  let server = StubServer::start(zotero_api).await;
  let data_dir = zotero_data_dir();
  let config = local_config(data_dir.path())
    .with_credentials(API_KEY, USER_ID)
    .with_api_url(&server.url);

  let local = LocalLibrary::from_config(&config)?;
  let mut updates = call_number::plan(&local, "no_call_number", &config.local).await?;
  assert_eq!(updates, [CallNumberUpdate {
    key:         "DOE2017A".into(),
    version:     12,
    call_number: "DOE2017".into(),
  }]);
  updates.push(CallNumberUpdate {
    key:         "ROE2019B".into(),
    version:     3,
    call_number: "ROE2019".into(),
  });

  let report = call_number::apply(&RemoteLibrary::new(&config)?, updates).await?;

  assert_eq!(report.applied.len(), 1);
  assert_eq!(report.failed.len(), 1);
  assert!(matches!(report.failed[0].1, ZottkError::VersionConflict { version: 3, .. }));

  let requests = server.requests().await;
  let patch = requests.iter().find(|r| r.method == "PATCH").unwrap();
  assert_eq!(patch.path(), "/users/475425/items/DOE2017A");
  assert_eq!(patch.header("If-Unmodified-Since-Version"), Some("12"));
  let body: Value = serde_json::from_slice(&patch.body)?;
  assert_eq!(body, json!({ "callNumber": "DOE2017" }));
  Ok(())
}
