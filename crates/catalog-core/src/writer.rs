//! The secondary-store writer: lazily creates per-type audit containers and
//! appends records to them.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
  Error, Result,
  audit::AuditRecord,
  store::{AuditStore, ContainerSettings, HistoryQuery},
};

pub struct AuditWriter<A> {
  store:    Arc<A>,
  settings: ContainerSettings,
}

impl<A> Clone for AuditWriter<A> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: self.settings }
  }
}

impl<A: AuditStore> AuditWriter<A> {
  pub fn new(store: Arc<A>) -> Self {
    Self::with_settings(store, ContainerSettings::default())
  }

  pub fn with_settings(store: Arc<A>, settings: ContainerSettings) -> Self {
    Self { store, settings }
  }

  pub fn store(&self) -> &Arc<A> { &self.store }

  /// Create `container` with the fixed settings unless it already exists.
  /// Failures are surfaced, not retried.
  pub async fn ensure_container(&self, container: &str) -> Result<()> {
    let exists = self
      .store
      .container_exists(container)
      .await
      .map_err(|e| write_failed(container, &e))?;
    if exists {
      return Ok(());
    }

    self
      .store
      .create_container(container, &self.settings)
      .await
      .map_err(|e| {
        error!(container, error = %e, "audit container creation failed");
        write_failed(container, &e)
      })?;
    info!(container, "audit container created");
    Ok(())
  }

  /// Ensure the container, then append `record`. Returns the document id.
  pub async fn append(
    &self,
    record: AuditRecord,
    container: &str,
  ) -> Result<String> {
    self.ensure_container(container).await?;

    let document_id = self
      .store
      .insert(container, &record)
      .await
      .map_err(|e| write_failed(container, &e))?;
    debug!(
      container,
      entity_id = record.entity_id,
      operation = record.operation.as_str(),
      document_id = %document_id,
      "audit record appended"
    );
    Ok(document_id)
  }

  /// Newest-first history for one entity, or for every entity in the
  /// container when `entity_id` is `None`.
  pub async fn history(
    &self,
    container: &str,
    entity_id: Option<i64>,
    page_size: usize,
  ) -> Result<Vec<AuditRecord>> {
    let query = HistoryQuery {
      entity_id,
      size: page_size.min(self.settings.max_result_window),
    };
    self
      .store
      .search(container, &query)
      .await
      .map_err(|e| Error::AuditQuery(Box::new(e)))
  }
}

fn write_failed(container: &str, e: &impl std::fmt::Display) -> Error {
  Error::AuditWriteFailed {
    container: container.to_owned(),
    reason:    e.to_string(),
  }
}
