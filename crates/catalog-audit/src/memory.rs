//! [`MemoryStore`]: process-local audit containers.

use std::{collections::HashMap, convert::Infallible, sync::Arc};

use catalog_core::{
  audit::AuditRecord,
  store::{AuditStore, ContainerSettings, HistoryQuery},
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct Container {
  settings:  ContainerSettings,
  documents: Vec<(String, AuditRecord)>,
}

/// An in-memory audit store. Clones share the same containers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  containers: Arc<RwLock<HashMap<String, Container>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Every record in `container`, in insertion order.
  pub async fn documents(&self, container: &str) -> Vec<AuditRecord> {
    let containers = self.containers.read().await;
    containers
      .get(container)
      .map(|c| c.documents.iter().map(|(_, r)| r.clone()).collect())
      .unwrap_or_default()
  }

  pub async fn settings(&self, container: &str) -> Option<ContainerSettings> {
    self.containers.read().await.get(container).map(|c| c.settings)
  }
}

impl AuditStore for MemoryStore {
  type Error = Infallible;

  async fn container_exists(&self, container: &str) -> Result<bool, Infallible> {
    Ok(self.containers.read().await.contains_key(container))
  }

  async fn create_container(
    &self,
    container: &str,
    settings: &ContainerSettings,
  ) -> Result<(), Infallible> {
    let mut containers = self.containers.write().await;
    containers
      .entry(container.to_owned())
      .or_insert_with(|| Container { settings: *settings, documents: Vec::new() });
    Ok(())
  }

  async fn insert(
    &self,
    container: &str,
    record: &AuditRecord,
  ) -> Result<String, Infallible> {
    let id = Uuid::new_v4().simple().to_string();
    let mut containers = self.containers.write().await;
    containers
      .entry(container.to_owned())
      .or_insert_with(|| Container {
        settings:  ContainerSettings::default(),
        documents: Vec::new(),
      })
      .documents
      .push((id.clone(), record.clone()));
    Ok(id)
  }

  async fn search(
    &self,
    container: &str,
    query: &HistoryQuery,
  ) -> Result<Vec<AuditRecord>, Infallible> {
    let containers = self.containers.read().await;
    let Some(found) = containers.get(container) else {
      return Ok(Vec::new());
    };

    let mut records: Vec<AuditRecord> = found
      .documents
      .iter()
      .map(|(_, r)| r)
      .filter(|r| query.entity_id.is_none_or(|id| r.entity_id == id))
      .cloned()
      .collect();
    // Newest first; equal timestamps keep the later insert first.
    records.reverse();
    records.sort_by(|a, b| b.updated_date.cmp(&a.updated_date));
    records.truncate(query.size);
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use catalog_core::audit::{Operation, SYSTEM_ACTOR};
  use serde_json::json;

  use super::*;

  fn record(entity_id: i64, name: &str) -> AuditRecord {
    AuditRecord::build(
      Operation::Update,
      entity_id,
      "Products",
      None,
      Some(json!({ "ProductName": name })),
      SYSTEM_ACTOR,
      None,
    )
  }

  #[tokio::test]
  async fn missing_container_searches_empty() {
    let store = MemoryStore::new();
    assert!(!store.container_exists("product_updates").await.unwrap());
    let found = store
      .search("product_updates", &HistoryQuery::default())
      .await
      .unwrap();
    assert!(found.is_empty());
  }

  #[tokio::test]
  async fn creating_twice_keeps_the_first_settings() {
    let store = MemoryStore::new();
    let first = ContainerSettings { max_result_window: 50, ..Default::default() };
    store.create_container("c", &first).await.unwrap();
    store.create_container("c", &ContainerSettings::default()).await.unwrap();
    assert_eq!(store.settings("c").await, Some(first));
  }

  #[tokio::test]
  async fn search_filters_orders_and_bounds() {
    let store = MemoryStore::new();
    for name in ["a", "b", "c"] {
      store.insert("c", &record(1, name)).await.unwrap();
    }
    store.insert("c", &record(2, "other")).await.unwrap();

    let query = HistoryQuery { entity_id: Some(1), size: 2 };
    let found = store.search("c", &query).await.unwrap();
    let names: Vec<_> = found
      .iter()
      .map(|r| r.new_data.as_ref().unwrap()["ProductName"].clone())
      .collect();
    assert_eq!(names, [json!("c"), json!("b")]);

    let everything = store.search("c", &HistoryQuery::default()).await.unwrap();
    assert_eq!(everything.len(), 4);
  }
}
