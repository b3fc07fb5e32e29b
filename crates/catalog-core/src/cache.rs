//! Process-lifetime cache of relational table existence checks.
//!
//! Each table name gets one single-assignment cell. The first caller runs the
//! catalog query; concurrent first callers wait on the same cell instead of
//! issuing duplicate checks. The cached answer is never invalidated, so a
//! table dropped after the first check is not noticed.

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};

use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct TableCache {
  cells: RwLock<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl TableCache {
  pub fn new() -> Self { Self::default() }

  /// Succeed if `table` exists, running `check` only if no answer is cached.
  ///
  /// A negative answer is cached like a positive one. Errors from `check` are
  /// not cached; the next call checks again.
  pub async fn ensure<F, Fut, E>(&self, table: &str, check: F) -> Result<()>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Into<Error>,
  {
    let cell = self.cell(table).await;
    let exists = *cell
      .get_or_try_init(|| async move {
        let found: Result<bool> = check().await.map_err(Into::into);
        match &found {
          Ok(true) => info!(table, "table check passed"),
          Ok(false) => error!(table, "table not found"),
          Err(e) => error!(table, error = %e, "table check failed"),
        }
        found
      })
      .await?;

    if exists { Ok(()) } else { Err(Error::TableNotFound(table.to_owned())) }
  }

  /// The cached answer for `table`, if one has been recorded.
  pub async fn cached(&self, table: &str) -> Option<bool> {
    let cells = self.cells.read().await;
    cells.get(table).and_then(|cell| cell.get().copied())
  }

  async fn cell(&self, table: &str) -> Arc<OnceCell<bool>> {
    if let Some(cell) = self.cells.read().await.get(table) {
      return Arc::clone(cell);
    }
    let mut cells = self.cells.write().await;
    Arc::clone(cells.entry(table.to_owned()).or_default())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[tokio::test]
  async fn checks_each_table_once() {
    let cache = TableCache::new();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
      cache
        .ensure("Products", || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, Error>(true)
        })
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached("Products").await, Some(true));
    assert_eq!(cache.cached("Categories").await, None);
  }

  #[tokio::test]
  async fn missing_table_is_reported_and_remembered() {
    let cache = TableCache::new();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
      let err = cache
        .ensure("Widgets", || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, Error>(false)
        })
        .await
        .unwrap_err();
      assert!(matches!(err, Error::TableNotFound(ref t) if t == "Widgets"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failed_checks_are_retried() {
    let cache = TableCache::new();

    let first = cache
      .ensure("Products", || async {
        Err::<bool, _>(Error::Conflict("catalog offline".into()))
      })
      .await;
    assert!(first.is_err());
    assert_eq!(cache.cached("Products").await, None);

    cache
      .ensure("Products", || async { Ok::<_, Error>(true) })
      .await
      .unwrap();
    assert_eq!(cache.cached("Products").await, Some(true));
  }

  #[tokio::test]
  async fn concurrent_first_callers_share_one_check() {
    let cache = Arc::new(TableCache::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
      .map(|_| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
          cache
            .ensure("Products", || async move {
              calls.fetch_add(1, Ordering::SeqCst);
              tokio::time::sleep(std::time::Duration::from_millis(20)).await;
              Ok::<_, Error>(true)
            })
            .await
        })
      })
      .collect();

    for task in tasks {
      task.await.unwrap().unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
