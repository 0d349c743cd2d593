//! Reading a local `zotero.sqlite` snapshot.
//!
//! The database belongs to the Zotero desktop client. It is only ever opened through a
//! [`ReadOnlyDatabase`], which sets both the `SQLITE_OPEN_READ_ONLY` flag and
//! `PRAGMA query_only`, so no statement issued through it can modify the file. The
//! desktop client holds a lock while running; close it (after syncing) before reading.

use rusqlite::{Connection, DatabaseName, OpenFlags, OptionalExtension, Row};

use super::*;
use crate::attachment::{self, LinkMode};

/// Read-only handle on a Zotero database.
pub struct ReadOnlyDatabase {
  /// Connection opened with `SQLITE_OPEN_READ_ONLY`
  conn: Connection,
}

impl ReadOnlyDatabase {
  /// Opens the database at `path` for reading.
  ///
  /// # Errors
  ///
  /// - [`ZottkError::Config`] if there is no file at `path`
  /// - [`ZottkError::Sqlite`] if the file cannot be opened, e.g. because it is locked
  ///
  /// # Examples
  ///
  /// ```no_run
  /// use zottk::library::ReadOnlyDatabase;
  ///
  /// # fn main() -> zottk::error::Result<()> {
  /// let db = ReadOnlyDatabase::open("/home/me/Zotero/zotero.sqlite")?;
  /// assert!(db.is_read_only()?);
  /// # Ok(())
  /// # }
  /// ```
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(ZottkError::Config(format!("No Zotero database at {}", path.display())));
    }
    let conn = Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.pragma_update(None, "query_only", true)?;
    debug!("Opened {} read-only", path.display());
    Ok(Self { conn })
  }

  /// Whether the handle refuses writes, checking both the open mode and `query_only`.
  pub fn is_read_only(&self) -> Result<bool> {
    let query_only: bool = self.conn.pragma_query_value(None, "query_only", |row| row.get(0))?;
    Ok(self.conn.is_readonly(DatabaseName::Main)? && query_only)
  }

  /// The underlying connection. Write statements issued through it fail with
  /// `SQLITE_READONLY`.
  pub fn connection(&self) -> &Connection { &self.conn }
}

/// A library read from the local database.
pub struct LocalLibrary {
  /// Read-only database handle
  db:    ReadOnlyDatabase,
  /// Directories attachment paths are resolved against
  paths: LocalPaths,
}

/// An `itemAttachments` row joined with the keys it refers to.
struct AttachmentRow {
  /// Attachment item key
  key:          String,
  /// Parent item key
  parent_key:   String,
  /// Attachment title
  title:        Option<String>,
  /// Stored path, absent for linked URLs
  path:         Option<String>,
  /// MIME type
  content_type: Option<String>,
  /// `linkMode` column
  link_mode:    i64,
}

/// Columns of [`AttachmentRow`], in order. Expects `itemAttachments a`, `items i` (the
/// attachment) and `items p` (the parent) in scope.
const ATTACHMENT_COLUMNS: &str = "i.key, p.key, a.path, a.contentType, a.linkMode,
  (SELECT v.value FROM itemData d
     JOIN fields f ON f.fieldID = d.fieldID
     JOIN itemDataValues v ON v.valueID = d.valueID
   WHERE d.itemID = i.itemID AND f.fieldName = 'title')";

impl AttachmentRow {
  /// Reads a row selected with [`ATTACHMENT_COLUMNS`].
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key:          row.get(0)?,
      parent_key:   row.get(1)?,
      path:         row.get(2)?,
      content_type: row.get(3)?,
      link_mode:    row.get(4)?,
      title:        row.get(5)?,
    })
  }
}

impl LocalLibrary {
  /// Creates a library over an already opened database.
  pub fn new(db: ReadOnlyDatabase, paths: LocalPaths) -> Self { Self { db, paths } }

  /// Opens `<data directory>/zotero.sqlite` as configured.
  ///
  /// # Errors
  ///
  /// Fails with [`ZottkError::MissingConfigKey`] before touching the file system when no
  /// data directory is configured.
  pub fn from_config(config: &Config) -> Result<Self> {
    let db = ReadOnlyDatabase::open(config.database_path()?)?;
    Ok(Self::new(db, config.local.clone()))
  }

  /// The database handle this library reads through.
  pub fn database(&self) -> &ReadOnlyDatabase { &self.db }

  /// Returns the id of the collection whose name or key is `collection`.
  ///
  /// A name match wins over a key match.
  pub fn find_collection(&self, collection: &str) -> Result<i64> {
    self
      .db
      .conn
      .query_row(
        "SELECT collectionID FROM collections
         WHERE collectionName = ?1 OR key = ?1
         ORDER BY collectionName = ?1 DESC, collectionID
         LIMIT 1",
        [collection],
        |row| row.get(0),
      )
      .optional()?
      .ok_or_else(|| ZottkError::CollectionNotFound(collection.to_string()))
  }

  /// Ids of the regular items of a collection, in collection order.
  ///
  /// Attachments, notes and trashed items are left out.
  pub fn collection_item_ids(&self, collection_id: i64) -> Result<Vec<i64>> {
    let mut stmt = self.db.conn.prepare(
      "SELECT ci.itemID FROM collectionItems ci
       WHERE ci.collectionID = ?1
         AND ci.itemID NOT IN (SELECT itemID FROM itemAttachments)
         AND ci.itemID NOT IN (SELECT itemID FROM itemNotes)
         AND ci.itemID NOT IN (SELECT itemID FROM deletedItems)
       ORDER BY ci.orderIndex, ci.itemID",
    )?;
    let ids = stmt.query_map([collection_id], |row| row.get(0))?;
    Ok(ids.collect::<rusqlite::Result<Vec<i64>>>()?)
  }

  /// Reads a full catalog entry.
  pub fn entry(&self, item_id: i64) -> Result<CatalogEntry> {
    let (key, version): (String, i64) = self.db.conn.query_row(
      "SELECT key, version FROM items WHERE itemID = ?1",
      [item_id],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let mut fields = self.fields(item_id)?;

    let entry = CatalogEntry {
      key,
      version: u64::try_from(version).unwrap_or_default(),
      title: TITLE_FIELDS
        .iter()
        .filter_map(|field| fields.remove(*field))
        .find(|title| !title.is_empty()),
      creators: self.creators(item_id)?,
      call_number: fields.remove("callNumber").filter(|call| !call.is_empty()),
      attachments: self.attachments(item_id)?,
    };
    trace!("Read {entry} from item {item_id}");
    Ok(entry)
  }

  /// Reads the catalog entry with the given item key.
  pub fn entry_by_key(&self, key: &str) -> Result<CatalogEntry> {
    let item_id: i64 =
      self.db.conn.query_row("SELECT itemID FROM items WHERE key = ?1", [key], |row| row.get(0))?;
    self.entry(item_id)
  }

  /// Finds attachments whose stored path matches a SQL `LIKE` pattern.
  ///
  /// `_` matches a single character and `%` any run of characters, e.g.
  /// `attachments:d/doe2017/%`. Attachments without a parent entry are left out.
  pub fn find_attachments(&self, pattern: &str) -> Result<Vec<Attachment>> {
    let sql = format!(
      "SELECT {ATTACHMENT_COLUMNS} FROM itemAttachments a
       JOIN items i ON i.itemID = a.itemID
       JOIN items p ON p.itemID = a.parentItemID
       WHERE a.path LIKE ?1
       ORDER BY a.path"
    );
    self.query_attachments(&sql, pattern)
  }

  /// Title and call number fields of an item.
  fn fields(&self, item_id: i64) -> Result<BTreeMap<String, String>> {
    let mut stmt = self.db.conn.prepare(
      "SELECT f.fieldName, v.value FROM itemData d
       JOIN fields f ON f.fieldID = d.fieldID
       JOIN itemDataValues v ON v.valueID = d.valueID
       WHERE d.itemID = ?1
         AND f.fieldName IN ('title', 'caseName', 'nameOfAct', 'subject', 'callNumber')",
    )?;
    let fields = stmt.query_map([item_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(fields.collect::<rusqlite::Result<BTreeMap<String, String>>>()?)
  }

  /// Creators of an item, in catalog order.
  fn creators(&self, item_id: i64) -> Result<Vec<Creator>> {
    let mut stmt = self.db.conn.prepare(
      "SELECT c.firstName, c.lastName, c.fieldMode FROM itemCreators ic
       JOIN creators c ON c.creatorID = ic.creatorID
       WHERE ic.itemID = ?1
       ORDER BY ic.orderIndex",
    )?;
    let creators = stmt.query_map([item_id], |row| {
      let given: Option<String> = row.get(0)?;
      let family: Option<String> = row.get(1)?;
      let field_mode: Option<i64> = row.get(2)?;
      Ok(match field_mode {
        Some(1) => Creator::single(family.unwrap_or_default()),
        _ => Creator::person(family.unwrap_or_default(), given.unwrap_or_default()),
      })
    })?;
    Ok(creators.collect::<rusqlite::Result<Vec<_>>>()?)
  }

  /// File attachments of an item.
  fn attachments(&self, item_id: i64) -> Result<Vec<Attachment>> {
    let sql = format!(
      "SELECT {ATTACHMENT_COLUMNS} FROM itemAttachments a
       JOIN items i ON i.itemID = a.itemID
       JOIN items p ON p.itemID = a.parentItemID
       WHERE a.parentItemID = ?1
       ORDER BY i.itemID"
    );
    self.query_attachments(&sql, item_id)
  }

  /// Runs an attachment query with a single parameter.
  fn query_attachments(
    &self,
    sql: &str,
    param: impl rusqlite::ToSql,
  ) -> Result<Vec<Attachment>> {
    let mut stmt = self.db.conn.prepare(sql)?;
    let rows = stmt.query_map([param], AttachmentRow::from_row)?;
    let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows.into_iter().filter_map(|row| self.to_attachment(row)).collect())
  }

  /// Turns a row into an attachment; rows without a file payload are skipped.
  fn to_attachment(&self, row: AttachmentRow) -> Option<Attachment> {
    let Some(link_mode) = LinkMode::from_code(row.link_mode) else {
      warn!("Skipping attachment {} with unknown link mode {}", row.key, row.link_mode);
      return None;
    };
    if !link_mode.has_file() {
      debug!("Skipping linked URL {}", row.key);
      return None;
    }
    let location = attachment::locate(row.path.as_deref(), &row.key, &self.paths);
    Some(Attachment {
      key: row.key,
      parent_key: row.parent_key,
      title: row.title,
      content_type: row.content_type,
      location,
    })
  }

  /// Ids of the items of `collection`, looked up by name or key.
  fn items_of(&self, collection: &str) -> Result<Vec<i64>> {
    let collection_id = self.find_collection(collection)?;
    let ids = self.collection_item_ids(collection_id)?;
    debug!("Collection {collection} holds {} entries", ids.len());
    Ok(ids)
  }
}

#[async_trait(?Send)]
impl LibraryReader for LocalLibrary {
  fn entries<'a>(&'a self, collection: &'a str) -> EntryStream<'a> {
    stream::once(async move { self.items_of(collection) })
      .map_ok(move |ids| stream::iter(ids).map(move |id| self.entry(id)))
      .try_flatten()
      .boxed_local()
  }
}
