//! A write-locked transaction on a dedicated connection.
//!
//! `BEGIN IMMEDIATE` takes the database's reserved lock up front, so the row
//! read inside the transaction cannot be changed by another writer before the
//! commit. Other writers wait in the busy handler for up to the configured
//! timeout.
//!
//! Dropping a [`LockedTx`] without committing closes its connection, and
//! SQLite rolls back any transaction still open on a closing connection.

use std::{path::Path, time::Duration};

use catalog_core::{entity::DeleteGuard, service::Phase};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  encode::{Document, column_names, row_to_document},
};

pub struct LockedTx {
  conn:  tokio_rusqlite::Connection,
  table: &'static str,
  id:    i64,
}

impl LockedTx {
  /// Open a connection to `path` and take the write lock.
  pub async fn begin(
    path: &Path,
    busy_timeout: Duration,
    table: &'static str,
    id: i64,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(Error::Unavailable)?;
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
      })
      .await
      .map_err(Error::Unavailable)?;

    debug!(table, id, phase = Phase::LockAcquired.as_str(), "write lock acquired");
    Ok(Self { conn, table, id })
  }

  /// Read the locked row with `sql`, which binds the identifier as `?1`.
  pub async fn read_row(&self, sql: &'static str) -> Result<Option<Document>> {
    let id = self.id;
    let row = self
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
    Ok(row)
  }

  /// Number of rows in the guarded table that still reference the locked row.
  pub async fn count_references(&self, guard: &'static DeleteGuard) -> Result<i64> {
    let id = self.id;
    let sql = format!(
      "SELECT COUNT(1) FROM {} WHERE {} = ?1",
      guard.table, guard.column
    );
    let count = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [id], |row| row.get::<_, i64>(0))?))
      .await?;
    Ok(count)
  }

  pub async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params_from_iter(params))?)
      })
      .await?;
    debug!(
      table = self.table,
      id = self.id,
      changed,
      phase = Phase::Written.as_str(),
      "locked row written"
    );
    Ok(changed)
  }

  pub async fn commit(self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("COMMIT")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Roll back explicitly. If that fails the connection is dropped anyway,
  /// which rolls back on close.
  pub async fn rollback(self) {
    let outcome = self
      .conn
      .call(|conn| {
        conn.execute_batch("ROLLBACK")?;
        Ok(())
      })
      .await;
    match outcome {
      Ok(()) => debug!(table = self.table, id = self.id, "transaction rolled back"),
      Err(e) => warn!(
        table = self.table,
        id = self.id,
        error = %e,
        "explicit rollback failed; closing connection"
      ),
    }
  }
}
