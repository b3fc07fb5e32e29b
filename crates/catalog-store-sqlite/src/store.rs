//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use catalog_core::{
  entity::Entity,
  schema::EntitySchema,
  store::{EntityStore, Updated},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{Document, column_names, decode, encode_params, row_to_document},
  schema::SCHEMA,
  tx::LockedTx,
};

/// How long a writer waits for another writer's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog store backed by a single SQLite file.
///
/// Cloning is cheap; the shared connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  path:         PathBuf,
  conn:         tokio_rusqlite::Connection,
  busy_timeout: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path)
      .await
      .map_err(Error::Unavailable)?;
    let store = Self { path, conn, busy_timeout };
    store.init_schema().await?;
    Ok(store)
  }

  pub fn path(&self) -> &Path { &self.path }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.busy_timeout;
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn lock(&self, schema: &'static EntitySchema, id: i64) -> Result<LockedTx> {
    LockedTx::begin(&self.path, self.busy_timeout, schema.table.as_str(), id).await
  }

  async fn query_documents(&self, sql: &'static str) -> Result<Vec<Document>> {
    let docs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let columns = column_names(&stmt);
        let rows = stmt
          .query_map([], |row| row_to_document(row, &columns))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(docs)
  }
}

fn not_found(schema: &EntitySchema, id: i64) -> Error {
  Error::NotFound { table: schema.table.clone(), id }
}

/// Read the locked row, apply `values` over it, and write it back.
async fn locked_update<E: Entity>(
  tx: &LockedTx,
  schema: &'static EntitySchema,
  id: i64,
  mut values: E,
) -> Result<Updated<E>> {
  let prior: E = match tx.read_row(&schema.select_sql).await? {
    Some(doc) => decode(doc)?,
    None => return Err(not_found(schema, id)),
  };

  values.set_id(prior.id());
  values.set_created_date(prior.created_date());
  values.set_updated_date(Some(Utc::now()));

  let params = encode_params(schema.update_params(&values));
  tx.execute(&schema.update_sql, params).await?;
  Ok(Updated { prior, current: values })
}

/// Read the locked row, check the delete guards, and delete it.
async fn locked_delete<E: Entity>(
  tx: &LockedTx,
  schema: &'static EntitySchema,
  id: i64,
) -> Result<E> {
  let prior: E = match tx.read_row(&schema.select_sql).await? {
    Some(doc) => decode(doc)?,
    None => return Err(not_found(schema, id)),
  };

  for guard in E::DELETE_GUARDS {
    let references = tx.count_references(guard).await?;
    if references > 0 {
      return Err(Error::Conflict(format!(
        "{} {id} is still referenced by {references} row(s) in {}; remove them first",
        E::TYPE_NAME,
        guard.table
      )));
    }
  }

  tx.execute(&schema.delete_sql, vec![id.into()]).await?;
  Ok(prior)
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  async fn table_exists(&self, table: &str) -> Result<bool> {
    let table = table.to_owned();
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
              rusqlite::params![table],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert<E: Entity>(&self, mut entity: E) -> Result<E> {
    let schema = E::schema();
    entity.set_created_date(Utc::now());
    entity.set_updated_date(None);

    let params = encode_params(schema.insert_params(&entity));
    let sql = schema.insert_sql.as_str();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    entity.set_id(id);
    Ok(entity)
  }

  /// The lock is SQLite's database-wide reserved lock, not a row lock.
  /// Updates to different ids therefore serialise too, and a writer that
  /// waits longer than the busy timeout fails with [`Error::Unavailable`].
  async fn update_with_lock<E: Entity>(&self, id: i64, values: E) -> Result<Updated<E>> {
    let schema = E::schema();
    let tx = self.lock(schema, id).await?;
    match locked_update(&tx, schema, id, values).await {
      Ok(updated) => {
        tx.commit().await?;
        Ok(updated)
      }
      Err(e) => {
        tx.rollback().await;
        Err(e)
      }
    }
  }

  async fn delete_with_lock<E: Entity>(&self, id: i64) -> Result<E> {
    let schema = E::schema();
    let tx = self.lock(schema, id).await?;
    match locked_delete(&tx, schema, id).await {
      Ok(prior) => {
        tx.commit().await?;
        Ok(prior)
      }
      Err(e) => {
        tx.rollback().await;
        Err(e)
      }
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get<E: Entity>(&self, id: i64) -> Result<Option<E>> {
    let sql = E::schema().select_sql.as_str();
    let doc = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let columns = column_names(&stmt);
        Ok(
          stmt
            .query_row([id], |row| row_to_document(row, &columns))
            .optional()?,
        )
      })
      .await?;
    doc.map(decode).transpose()
  }

  async fn list<E: Entity>(&self) -> Result<Vec<E>> {
    let docs = self.query_documents(&E::schema().list_sql).await?;
    docs.into_iter().map(decode).collect()
  }
}
