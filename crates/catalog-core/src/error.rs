//! Error taxonomy shared by every layer of the catalog service.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// No row matched the identifier.
  #[error("{table} id {id} not found")]
  NotFound { table: String, id: i64 },

  /// A business rule forbids the mutation.
  #[error("conflict: {0}")]
  Conflict(String),

  /// The backing table is missing. Fatal configuration error; not retried.
  #[error("table {0:?} does not exist in the database")]
  TableNotFound(String),

  /// The relational store could not be reached before any lock was held.
  /// Safe for the caller to retry.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] BoxError),

  /// Any other relational failure. The transaction has been rolled back.
  #[error("database error: {0}")]
  Database(#[source] BoxError),

  /// The secondary store rejected container creation or the append. The
  /// relational change this record describes has already been committed.
  #[error("audit write to {container} failed: {reason}")]
  AuditWriteFailed { container: String, reason: String },

  #[error("audit history query failed: {0}")]
  AuditQuery(#[source] BoxError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
