//! Error type for `catalog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Opening a connection or taking the write lock failed. Nothing was
  /// written.
  #[error("database unavailable: {0}")]
  Unavailable(#[source] tokio_rusqlite::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{table} id {id} not found")]
  NotFound { table: String, id: i64 },

  #[error("{0}")]
  Conflict(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for catalog_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Unavailable(e) => Self::StoreUnavailable(Box::new(e)),
      Error::Database(e) => Self::Database(Box::new(e)),
      Error::Json(e) => Self::Serialization(e),
      Error::NotFound { table, id } => Self::NotFound { table, id },
      Error::Conflict(msg) => Self::Conflict(msg),
    }
  }
}
