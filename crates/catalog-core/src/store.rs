//! Storage abstractions consumed by the mutation pipeline.
//!
//! [`EntityStore`] is the relational side (locked reads, transactional
//! writes). [`AuditStore`] is the secondary, document-oriented side that holds
//! audit history. The two never share a transaction.
//!
//! All methods return `Send` futures so implementations can be driven from a
//! multi-threaded runtime (e.g. tokio with `axum`).

use std::future::Future;

use crate::{audit::AuditRecord, entity::Entity};

/// Default number of history records returned per query.
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ─── Relational store ────────────────────────────────────────────────────────

/// The prior and applied state of one committed update.
#[derive(Debug, Clone)]
pub struct Updated<E> {
  pub prior:   E,
  pub current: E,
}

/// Abstraction over the relational backend.
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  /// Ask the store's catalog whether a table with exactly this name exists.
  fn table_exists(
    &self,
    table: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

  /// Insert a new row. The store assigns the identifier and the creation
  /// timestamp; `UpdatedDate` is cleared.
  fn insert<E: Entity>(
    &self,
    entity: E,
  ) -> impl Future<Output = Result<E, Self::Error>> + Send;

  /// Replace the mutable columns of row `id` with those of `values` inside one
  /// transaction that holds the write lock from the read through the commit.
  ///
  /// Fails with a not-found error, after rolling back, when no row matches.
  /// The lock must cover at least row `id`; backends without row locks may
  /// serialise mutations of different rows as well.
  fn update_with_lock<E: Entity>(
    &self,
    id: i64,
    values: E,
  ) -> impl Future<Output = Result<Updated<E>, Self::Error>> + Send;

  /// Delete row `id` under the same locking discipline as
  /// [`EntityStore::update_with_lock`], enforcing the type's delete guards.
  /// Returns the deleted state.
  fn delete_with_lock<E: Entity>(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<E, Self::Error>> + Send;

  fn get<E: Entity>(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<E>, Self::Error>> + Send;

  fn list<E: Entity>(
    &self,
  ) -> impl Future<Output = Result<Vec<E>, Self::Error>> + Send;
}

// ─── Secondary store ─────────────────────────────────────────────────────────

/// Settings applied when an audit container is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSettings {
  pub shards:            u32,
  pub replicas:          u32,
  /// Upper bound on `from + size` for a single history page.
  pub max_result_window: usize,
}

impl Default for ContainerSettings {
  fn default() -> Self {
    Self { shards: 1, replicas: 1, max_result_window: 10_000 }
  }
}

/// Parameters for [`AuditStore::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
  /// Restrict to one entity; `None` returns records for every entity.
  pub entity_id: Option<i64>,
  pub size:      usize,
}

impl Default for HistoryQuery {
  fn default() -> Self { Self { entity_id: None, size: DEFAULT_PAGE_SIZE } }
}

/// Abstraction over the document store that holds audit history.
pub trait AuditStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn container_exists(
    &self,
    container: &str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

  /// Create `container`. Creating a container that already exists (e.g. when
  /// two writers race) succeeds.
  fn create_container(
    &self,
    container: &str,
    settings: &ContainerSettings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Append `record` as a new document, returning the store-assigned
  /// document id.
  fn insert(
    &self,
    container: &str,
    record: &AuditRecord,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send;

  /// Records ordered by `updatedDate` descending, at most `query.size` of
  /// them. A container that does not exist yields an empty list.
  fn search(
    &self,
    container: &str,
    query: &HistoryQuery,
  ) -> impl Future<Output = Result<Vec<AuditRecord>, Self::Error>> + Send;
}
