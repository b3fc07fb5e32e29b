//! The mutation orchestrator.
//!
//! Every mutation runs through the same phases:
//!
//! ```text
//! Idle → LockAcquired → Written → Committed → AuditAttempted → Done
//!   └──────────┴───────────┴→ Failed              └→ AuditFailed
//! ```
//!
//! `Failed` is reachable only before the relational commit and always means
//! the transaction was rolled back and no audit record was built.
//! `AuditFailed` is reachable only after the commit: the relational change
//! stands and the caller still gets a success, flagged with
//! [`AuditStatus::Failed`].
//!
//! Each mutation runs on its own task from the lock to the append, so a caller
//! that is dropped mid-request cannot stop a committed change short of its
//! audit attempt.
//!
//! Audit propagation is commit-then-append, not an atomic dual write. A crash
//! between the commit and the append loses that one audit entry; operators
//! reconcile from the `warn` logs emitted on every degraded mutation.

use std::{future::Future, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  audit::{AuditRecord, Operation, RequestInfo, RequestMetadata, SYSTEM_ACTOR},
  cache::TableCache,
  entity::Entity,
  schema::EntitySchema,
  store::{AuditStore, EntityStore, Updated},
  writer::AuditWriter,
};

// ─── Phases and outcomes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  LockAcquired,
  Written,
  Committed,
  AuditAttempted,
  Done,
  Failed,
  AuditFailed,
}

impl Phase {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Idle => "idle",
      Self::LockAcquired => "lock_acquired",
      Self::Written => "written",
      Self::Committed => "committed",
      Self::AuditAttempted => "audit_attempted",
      Self::Done => "done",
      Self::Failed => "failed",
      Self::AuditFailed => "audit_failed",
    }
  }
}

/// What happened to the audit record of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
  Recorded { document_id: String },
  /// The mutation is committed but its audit record was lost.
  Failed { reason: String },
  /// No record is kept for this kind of mutation.
  Skipped,
}

impl AuditStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Recorded { .. } => "recorded",
      Self::Failed { .. } => "failed",
      Self::Skipped => "skipped",
    }
  }

  pub fn is_degraded(&self) -> bool { matches!(self, Self::Failed { .. }) }
}

/// A committed mutation: the resulting entity (the deleted state, for
/// deletes) and the audit outcome.
#[derive(Debug, Clone)]
pub struct Mutation<E> {
  pub entity: E,
  pub audit:  AuditStatus,
}

/// Fixed values stamped onto every audit record.
#[derive(Debug, Clone)]
pub struct AuditPolicy {
  pub actor:            String,
  /// Record creates as well as updates and deletes.
  pub record_creates:   bool,
  pub environment:      String,
  pub application_name: String,
}

impl Default for AuditPolicy {
  fn default() -> Self {
    Self {
      actor:            SYSTEM_ACTOR.to_owned(),
      record_creates:   false,
      environment:      "Production".to_owned(),
      application_name: "CatalogAPI".to_owned(),
    }
  }
}

impl AuditPolicy {
  fn metadata(&self, origin: RequestInfo) -> RequestMetadata {
    RequestMetadata {
      ip_address:       origin.ip_address,
      user_agent:       origin.user_agent,
      environment:      self.environment.clone(),
      application_name: self.application_name.clone(),
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct CatalogService<S, A> {
  store:  Arc<S>,
  writer: AuditWriter<A>,
  tables: TableCache,
  policy: Arc<AuditPolicy>,
}

impl<S, A> CatalogService<S, A>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
{
  pub fn new(store: Arc<S>, audit: Arc<A>, policy: AuditPolicy) -> Self {
    Self::with_writer(store, AuditWriter::new(audit), policy)
  }

  pub fn with_writer(
    store: Arc<S>,
    writer: AuditWriter<A>,
    policy: AuditPolicy,
  ) -> Self {
    Self { store, writer, tables: TableCache::new(), policy: Arc::new(policy) }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn writer(&self) -> &AuditWriter<A> { &self.writer }

  pub fn tables(&self) -> &TableCache { &self.tables }

  // ── Mutations ─────────────────────────────────────────────────────────────

  pub async fn create<E: Entity>(
    &self,
    draft: E::Draft,
    origin: RequestInfo,
  ) -> Result<Mutation<E>> {
    let schema = E::schema();
    started(schema, None, Operation::Create);
    self.ensure_table(schema).await?;

    let store = Arc::clone(&self.store);
    let recorder = self.recorder();
    let entity = E::from_draft(draft);
    detached(schema, None, Operation::Create, async move {
      let entity = store
        .insert(entity)
        .await
        .map_err(|e| rejected(schema, None, Operation::Create, e.into()))?;
      info!(table = %schema.table, id = entity.id(), "entity created");

      let audit = if recorder.policy.record_creates {
        recorder
          .record(schema, Operation::Create, entity.id(), None, Some(&entity), origin)
          .await
      } else {
        AuditStatus::Skipped
      };
      Ok(Mutation { entity, audit })
    })
    .await
  }

  pub async fn update<E: Entity>(
    &self,
    id: i64,
    draft: E::Draft,
    origin: RequestInfo,
  ) -> Result<Mutation<E>> {
    let schema = E::schema();
    started(schema, Some(id), Operation::Update);
    self.ensure_table(schema).await?;

    let store = Arc::clone(&self.store);
    let recorder = self.recorder();
    let values = E::from_draft(draft);
    detached(schema, Some(id), Operation::Update, async move {
      let Updated { prior, current } = store
        .update_with_lock(id, values)
        .await
        .map_err(|e| rejected(schema, Some(id), Operation::Update, e.into()))?;
      info!(
        table = %schema.table,
        id,
        phase = Phase::Committed.as_str(),
        "entity updated"
      );

      let audit = recorder
        .record(schema, Operation::Update, id, Some(&prior), Some(&current), origin)
        .await;
      Ok(Mutation { entity: current, audit })
    })
    .await
  }

  pub async fn delete<E: Entity>(
    &self,
    id: i64,
    origin: RequestInfo,
  ) -> Result<Mutation<E>> {
    let schema = E::schema();
    started(schema, Some(id), Operation::Delete);
    self.ensure_table(schema).await?;

    let store = Arc::clone(&self.store);
    let recorder = self.recorder();
    detached(schema, Some(id), Operation::Delete, async move {
      let prior = store
        .delete_with_lock::<E>(id)
        .await
        .map_err(|e| rejected(schema, Some(id), Operation::Delete, e.into()))?;
      info!(
        table = %schema.table,
        id,
        phase = Phase::Committed.as_str(),
        "entity deleted"
      );

      let audit = recorder
        .record(schema, Operation::Delete, id, Some(&prior), None, origin)
        .await;
      Ok(Mutation { entity: prior, audit })
    })
    .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Newest-first audit history for one entity, or for the whole type.
  pub async fn history<E: Entity>(
    &self,
    id: Option<i64>,
    page_size: usize,
  ) -> Result<Vec<AuditRecord>> {
    self.writer.history(&E::schema().container, id, page_size).await
  }

  pub async fn get<E: Entity>(&self, id: i64) -> Result<Option<E>> {
    self.store.get::<E>(id).await.map_err(Into::into)
  }

  pub async fn list<E: Entity>(&self) -> Result<Vec<E>> {
    self.store.list::<E>().await.map_err(Into::into)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn ensure_table(&self, schema: &EntitySchema) -> Result<()> {
    let store = &self.store;
    self
      .tables
      .ensure(&schema.table, || store.table_exists(&schema.table))
      .await
  }

  fn recorder(&self) -> Recorder<A> {
    Recorder { writer: self.writer.clone(), policy: Arc::clone(&self.policy) }
  }
}

/// Owned handle for building and appending audit records from a detached
/// mutation task.
struct Recorder<A> {
  writer: AuditWriter<A>,
  policy: Arc<AuditPolicy>,
}

impl<A: AuditStore> Recorder<A> {
  /// Build the audit record for a committed mutation and append it.
  async fn record<E: Entity>(
    &self,
    schema: &'static EntitySchema,
    operation: Operation,
    id: i64,
    prior: Option<&E>,
    current: Option<&E>,
    origin: RequestInfo,
  ) -> AuditStatus {
    let record = match AuditRecord::from_states(
      operation,
      id,
      schema.table.as_str(),
      prior,
      current,
      self.policy.actor.as_str(),
      Some(self.policy.metadata(origin)),
    ) {
      Ok(record) => record,
      Err(e) => return audit_failed(schema, id, operation, &e),
    };

    debug!(
      container = %schema.container,
      id,
      phase = Phase::AuditAttempted.as_str(),
      "appending audit record"
    );
    match self.writer.append(record, &schema.container).await {
      Ok(document_id) => {
        debug!(
          container = %schema.container,
          id,
          phase = Phase::Done.as_str(),
          "audit record stored"
        );
        AuditStatus::Recorded { document_id }
      }
      Err(e) => audit_failed(schema, id, operation, &e),
    }
  }
}

/// Run one mutation, from taking the lock to appending its audit record, on
/// its own task.
///
/// A spawned task is not cancelled when its `JoinHandle` is dropped. Once the
/// mutation starts, a caller that stops waiting cannot separate a commit from
/// its append; the record is written or `AuditFailed` is logged.
async fn detached<T, F>(
  schema: &EntitySchema,
  id: Option<i64>,
  operation: Operation,
  mutation: F,
) -> Result<T>
where
  F: Future<Output = Result<T>> + Send + 'static,
  T: Send + 'static,
{
  match tokio::spawn(mutation).await {
    Ok(result) => result,
    Err(e) => {
      error!(
        table = %schema.table,
        id,
        operation = operation.as_str(),
        error = %e,
        "mutation task did not finish"
      );
      Err(Error::Database(Box::new(e)))
    }
  }
}

fn started(schema: &EntitySchema, id: Option<i64>, operation: Operation) {
  debug!(
    table = %schema.table,
    id,
    operation = operation.as_str(),
    phase = Phase::Idle.as_str(),
    "mutation started"
  );
}

fn rejected(
  schema: &EntitySchema,
  id: Option<i64>,
  operation: Operation,
  err: Error,
) -> Error {
  match &err {
    Error::NotFound { .. } | Error::Conflict(_) => info!(
      table = %schema.table,
      id,
      operation = operation.as_str(),
      phase = Phase::Failed.as_str(),
      error = %err,
      "mutation rejected"
    ),
    _ => error!(
      table = %schema.table,
      id,
      operation = operation.as_str(),
      phase = Phase::Failed.as_str(),
      error = %err,
      "mutation failed and was rolled back"
    ),
  }
  err
}

fn audit_failed(
  schema: &EntitySchema,
  id: i64,
  operation: Operation,
  err: &impl std::fmt::Display,
) -> AuditStatus {
  warn!(
    table = %schema.table,
    container = %schema.container,
    id,
    operation = operation.as_str(),
    phase = Phase::AuditFailed.as_str(),
    error = %err,
    "mutation committed but its audit record was not written; reconcile manually"
  );
  AuditStatus::Failed { reason: err.to_string() }
}
