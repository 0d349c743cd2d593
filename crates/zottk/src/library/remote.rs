//! Reading (and updating) a library through the Zotero web API v3.
//!
//! Requests carry the API key in the `Zotero-API-Key` header and address the user library
//! as `/users/<user_id>`. Listings are paginated with `start` and `limit` (at most
//! [`MAX_PAGE_SIZE`]). Reading stops once `Total-Results` records have been received, on an
//! empty page, or, without that header, on a page shorter than the limit. Nothing is
//! retried: the first failed request ends the read with its error.
//!
//! See <https://www.zotero.org/support/dev/web_api/v3/basics>.

use reqwest::{
  header::{HeaderMap, HeaderValue},
  Client, Proxy, Response, StatusCode,
};
use serde::de::DeserializeOwned;

use super::*;
use crate::attachment::{self, LinkMode};

/// Version of the web API this client speaks.
const API_VERSION: &str = "3";

/// A library accessed through the Zotero web API.
#[derive(Debug, Clone)]
pub struct RemoteLibrary {
  /// HTTP client with authentication headers and proxies configured
  client:    Client,
  /// API root, without trailing slash
  base_url:  String,
  /// Numeric identifier of the user library
  user_id:   String,
  /// Records requested per page
  page_size: usize,
  /// Local directories, for linked attachments readable from this machine
  paths:     LocalPaths,
}

/// A collection record.
#[derive(Debug, Deserialize)]
struct ApiCollection {
  /// Collection key
  key:  String,
  /// Editable collection fields
  data: CollectionData,
}

/// The `data` object of a collection record.
#[derive(Debug, Deserialize)]
struct CollectionData {
  /// Display name
  name: String,
}

/// An item record.
#[derive(Debug, Deserialize)]
struct ApiItem {
  /// Item key
  key:     String,
  /// Item version
  version: u64,
  /// Read-only metadata
  #[serde(default)]
  meta:    ItemMeta,
  /// Editable item fields
  data:    ItemData,
}

/// The `meta` object of an item record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemMeta {
  /// Number of child attachments and notes
  #[serde(default)]
  num_children: u64,
}

/// The `data` object of an item record. Only the fields read here are declared.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemData {
  /// `journalArticle`, `book`, `attachment`, `note`...
  item_type:    String,
  /// Title
  title:        Option<String>,
  /// Title of a legal case
  case_name:    Option<String>,
  /// Title of a statute
  name_of_act:  Option<String>,
  /// Title of an email
  subject:      Option<String>,
  /// Creators in catalog order
  #[serde(default)]
  creators:     Vec<ApiCreator>,
  /// Call number
  call_number:  Option<String>,
  /// Attachment link mode
  link_mode:    Option<String>,
  /// Attachment MIME type
  content_type: Option<String>,
  /// Path of a linked file
  path:         Option<String>,
  /// File name of a stored file
  filename:     Option<String>,
}

impl ItemData {
  /// The first non-empty title field, see [`TITLE_FIELDS`].
  fn title(&self) -> Option<String> {
    [&self.title, &self.case_name, &self.name_of_act, &self.subject]
      .into_iter()
      .flatten()
      .find(|title| !title.is_empty())
      .cloned()
  }
}

/// A creator as serialized by the API: either one `name` or a first/last pair.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiCreator {
  /// Single-field name
  Single {
    /// Display name
    name: String,
  },
  /// Two-field name
  Person {
    /// Given name
    #[serde(rename = "firstName", default)]
    first_name: String,
    /// Family name
    #[serde(rename = "lastName", default)]
    last_name:  String,
  },
}

impl From<ApiCreator> for Creator {
  fn from(creator: ApiCreator) -> Self {
    match creator {
      ApiCreator::Single { name } => Creator::single(name),
      ApiCreator::Person { first_name, last_name } => Creator::person(last_name, first_name),
    }
  }
}

/// Position in the paginated top-level item listing of a collection.
struct PageCursor {
  /// Request path of the listing
  path:   String,
  /// Offset of the next page
  start:  usize,
  /// Items fetched but not yet yielded
  buffer: VecDeque<ApiItem>,
  /// Whether the last page has been fetched
  done:   bool,
}

/// One page of a listing.
struct Page<T> {
  /// Records of this page
  records: Vec<T>,
  /// Size of the whole listing, from the `Total-Results` header
  total:   Option<usize>,
}

impl<T> Page<T> {
  /// Whether this page, fetched at offset `start`, ends the listing.
  fn is_last(&self, start: usize, page_size: usize) -> bool {
    match self.total {
      _ if self.records.is_empty() => true,
      Some(total) => start + self.records.len() >= total,
      None => self.records.len() < page_size,
    }
  }
}

impl RemoteLibrary {
  /// Creates a client for the configured user library.
  ///
  /// No request is sent here. Proxies come from the `[proxies]` section only; when none is
  /// configured the connection is direct, whatever the environment says.
  ///
  /// # Errors
  ///
  /// - [`ZottkError::MissingConfigKey`] when the credential pair is incomplete
  /// - [`ZottkError::Config`] for a malformed key or proxy URL
  ///
  /// # Examples
  ///
  /// ```
  /// use zottk::{config::Config, library::RemoteLibrary, prelude::*};
  ///
  /// let err = RemoteLibrary::new(&Config::default()).unwrap_err();
  /// assert_eq!(err.kind(), ErrorKind::Configuration);
  ///
  /// let config = Config::default().with_credentials("P9NiFoyLeZu2bZNvvuQPDWsd", "475425");
  /// assert!(RemoteLibrary::new(&config).is_ok());
  /// ```
  pub fn new(config: &Config) -> Result<Self> {
    let credentials = config.require_credentials()?;

    let mut headers = HeaderMap::new();
    headers.insert("Zotero-API-Version", HeaderValue::from_static(API_VERSION));
    let mut key = HeaderValue::from_str(credentials.key)
      .map_err(|_| ZottkError::Config("credentials.key is not a valid API key".to_string()))?;
    key.set_sensitive(true);
    headers.insert("Zotero-API-Key", key);

    let mut builder = Client::builder()
      .default_headers(headers)
      .user_agent(concat!("zottk/", env!("CARGO_PKG_VERSION")))
      .no_proxy();
    if let Some(url) = &config.proxies.http {
      builder = builder.proxy(Proxy::http(url).map_err(|e| {
        ZottkError::Config(format!("invalid proxies.http `{url}`: {e}"))
      })?);
    }
    if let Some(url) = &config.proxies.https {
      builder = builder.proxy(Proxy::https(url).map_err(|e| {
        ZottkError::Config(format!("invalid proxies.https `{url}`: {e}"))
      })?);
    }
    let client = builder
      .build()
      .map_err(|e| ZottkError::Config(format!("could not set up the HTTP client: {e}")))?;

    Ok(Self {
      client,
      base_url: config.api.base_url.trim_end_matches('/').to_string(),
      user_id: credentials.user_id.to_string(),
      page_size: config.api.page_size.clamp(1, MAX_PAGE_SIZE),
      paths: config.local.clone(),
    })
  }

  /// Returns the key of the collection whose name or key is `collection`.
  ///
  /// A name match wins over a key match.
  pub async fn find_collection(&self, collection: &str) -> Result<String> {
    let path = format!("/users/{}/collections", self.user_id);
    let collections: Vec<ApiCollection> = self.get_all(&path).await?;
    debug!("Library has {} collections", collections.len());

    let by_name = collections.iter().find(|c| c.data.name == collection);
    by_name
      .or_else(|| collections.iter().find(|c| c.key == collection))
      .map(|c| c.key.clone())
      .ok_or_else(|| ZottkError::CollectionNotFound(collection.to_string()))
  }

  /// Sets the call number of an item, provided it is still at `version`.
  ///
  /// # Errors
  ///
  /// - [`ZottkError::VersionConflict`] if the item changed on the server since `version`
  /// - [`ZottkError::Authentication`] if the key has no write access
  pub async fn update_call_number(&self, key: &str, version: u64, call_number: &str) -> Result<()> {
    let url = self.url(&format!("/users/{}/items/{key}", self.user_id));
    debug!("PATCH {url} callNumber={call_number} (version {version})");
    let response = self
      .client
      .patch(&url)
      .header("If-Unmodified-Since-Version", version.to_string())
      .json(&serde_json::json!({ "callNumber": call_number }))
      .send()
      .await?;

    if response.status() == StatusCode::PRECONDITION_FAILED {
      return Err(ZottkError::VersionConflict { key: key.to_string(), version });
    }
    let response = check_status(response).await?;
    if let Some(new_version) = response.headers().get("Last-Modified-Version") {
      trace!("{key} is now at version {new_version:?}");
    }
    Ok(())
  }

  /// Absolute URL of an API path.
  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  /// Fetches one page of a listing.
  async fn get_page<T: DeserializeOwned>(&self, path: &str, start: usize) -> Result<Page<T>> {
    let url = self.url(path);
    debug!("GET {url} start={start} limit={}", self.page_size);
    let response = self
      .client
      .get(&url)
      .query(&[("format", "json")])
      .query(&[("start", start), ("limit", self.page_size)])
      .send()
      .await?;
    let response = check_status(response).await?;
    let total = response
      .headers()
      .get("Total-Results")
      .and_then(|value| value.to_str().ok())
      .and_then(|value| value.parse().ok());
    let records = serde_json::from_slice(&response.bytes().await?)?;
    Ok(Page { records, total })
  }

  /// Fetches every page of a listing.
  async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
    let mut records = Vec::new();
    loop {
      let page: Page<T> = self.get_page(path, records.len()).await?;
      let last = page.is_last(records.len(), self.page_size);
      records.extend(page.records);
      if last {
        return Ok(records);
      }
    }
  }

  /// Advances a listing cursor by one catalog entry.
  async fn next_entry(
    &self,
    mut cursor: PageCursor,
  ) -> Result<Option<(CatalogEntry, PageCursor)>> {
    loop {
      if let Some(item) = cursor.buffer.pop_front() {
        if matches!(item.data.item_type.as_str(), "attachment" | "note") {
          trace!("Skipping standalone {} {}", item.data.item_type, item.key);
          continue;
        }
        let entry = self.entry(item).await?;
        return Ok(Some((entry, cursor)));
      }
      if cursor.done {
        return Ok(None);
      }
      let page: Page<ApiItem> = self.get_page(&cursor.path, cursor.start).await?;
      cursor.done = page.is_last(cursor.start, self.page_size);
      cursor.start += page.records.len();
      cursor.buffer.extend(page.records);
    }
  }

  /// Turns an item record into a catalog entry, fetching its attachments.
  async fn entry(&self, item: ApiItem) -> Result<CatalogEntry> {
    let attachments =
      if item.meta.num_children > 0 { self.attachments(&item.key).await? } else { Vec::new() };
    let entry = CatalogEntry {
      key: item.key,
      version: item.version,
      title: item.data.title(),
      creators: item.data.creators.into_iter().map(Creator::from).collect(),
      call_number: item.data.call_number.filter(|call| !call.is_empty()),
      attachments,
    };
    trace!("Fetched {entry}");
    Ok(entry)
  }

  /// File attachments among the children of an item.
  async fn attachments(&self, parent_key: &str) -> Result<Vec<Attachment>> {
    let path = format!("/users/{}/items/{parent_key}/children", self.user_id);
    let children: Vec<ApiItem> = self.get_all(&path).await?;
    Ok(children.into_iter().filter_map(|child| self.to_attachment(parent_key, child)).collect())
  }

  /// Maps a child record to an attachment; notes and linked URLs are skipped.
  fn to_attachment(&self, parent_key: &str, item: ApiItem) -> Option<Attachment> {
    if item.data.item_type != "attachment" {
      return None;
    }
    let link_mode = match item.data.link_mode.as_deref().map(str::parse::<LinkMode>) {
      Some(Ok(link_mode)) => link_mode,
      Some(Err(e)) => {
        warn!("Skipping attachment {}: {e}", item.key);
        return None;
      },
      None => {
        warn!("Skipping attachment {} without link mode", item.key);
        return None;
      },
    };
    if !link_mode.has_file() {
      debug!("Skipping linked URL {}", item.key);
      return None;
    }

    let location = match (link_mode.is_stored(), &self.paths.data_directory) {
      (true, None) => {
        let file = format!("/users/{}/items/{}/file", self.user_id, item.key);
        AttachmentLocation::Remote(self.url(&file))
      },
      (true, Some(_)) => {
        let stored =
          item.data.filename.as_ref().map(|name| format!("{}{name}", attachment::STORAGE_PREFIX));
        attachment::locate(stored.as_deref(), &item.key, &self.paths)
      },
      (false, _) => attachment::locate(item.data.path.as_deref(), &item.key, &self.paths),
    };

    Some(Attachment {
      key: item.key,
      parent_key: parent_key.to_string(),
      title: item.data.title,
      content_type: item.data.content_type,
      location,
    })
  }

  /// Downloads a stored file through the API.
  async fn download(&self, attachment: &Attachment, url: &str) -> Result<Vec<u8>> {
    debug!("GET {url}");
    let response = self.client.get(url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(ZottkError::NoPayload(attachment.key.clone()));
    }
    Ok(check_status(response).await?.bytes().await?.to_vec())
  }
}

#[async_trait(?Send)]
impl LibraryReader for RemoteLibrary {
  fn entries<'a>(&'a self, collection: &'a str) -> EntryStream<'a> {
    stream::once(async move { self.find_collection(collection).await })
      .map_ok(move |collection_key| {
        let cursor = PageCursor {
          path:   format!("/users/{}/collections/{collection_key}/items/top", self.user_id),
          start:  0,
          buffer: VecDeque::new(),
          done:   false,
        };
        stream::try_unfold(cursor, move |cursor| self.next_entry(cursor))
      })
      .try_flatten()
      .boxed_local()
  }

  async fn read_payload(&self, attachment: &Attachment) -> Result<Vec<u8>> {
    match &attachment.location {
      AttachmentLocation::Remote(url) => self.download(attachment, url).await,
      _ => read_local(attachment).await,
    }
  }
}

/// Maps unsuccessful responses to errors: 401/403 reject the credentials, anything else
/// is an API error.
async fn check_status(response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let url = response.url().clone();
  let body = response.text().await.unwrap_or_default();
  let detail = format!("{status} for {url}: {}", body.trim());
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ZottkError::Authentication(detail)),
    _ => Err(ZottkError::ApiError(detail)),
  }
}
