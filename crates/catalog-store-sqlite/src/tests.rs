//! Integration tests for `SqliteStore` against an on-disk database.
//!
//! Locked mutations open their own connections, so the database has to be a
//! shared file rather than `:memory:`.

use std::time::Duration;

use catalog_core::{
  catalog::{Category, Product},
  entity::Entity,
  store::EntityStore,
};
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::{Error, SqliteStore, tx::LockedTx};

async fn store() -> (TempDir, SqliteStore) {
  let dir = tempfile::tempdir().expect("temp dir");
  let store = SqliteStore::open(dir.path().join("catalog.db"))
    .await
    .expect("open store");
  (dir, store)
}

fn category(name: &str) -> Category {
  Category {
    id:            0,
    category_name: name.into(),
    description:   String::new(),
    created_date:  DateTime::<Utc>::default(),
    updated_date:  None,
  }
}

fn product(name: &str, price: f64, category_id: Option<i64>) -> Product {
  Product {
    id: 0,
    product_name: name.into(),
    price,
    category: String::new(),
    category_id,
    created_date: DateTime::<Utc>::default(),
    updated_date: None,
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn catalog_tables_exist_after_open() {
  let (_dir, s) = store().await;
  assert!(s.table_exists("Products").await.unwrap());
  assert!(s.table_exists("Categories").await.unwrap());
  assert!(!s.table_exists("Widgets").await.unwrap());
  // Exact-name lookup.
  assert!(!s.table_exists("products_category_idx").await.unwrap());
}

// ─── Inserts and reads ───────────────────────────────────────────────────────

#[tokio::test]
async fn insert_assigns_id_and_creation_stamp() {
  let (_dir, s) = store().await;
  let before = Utc::now();

  let first = s.insert(category("Electronics")).await.unwrap();
  let second = s.insert(category("Books")).await.unwrap();

  assert!(first.id > 0);
  assert!(second.id > first.id);
  assert!(first.created_date >= before);
  assert!(first.updated_date.is_none());

  let fetched: Category = s.get(first.id).await.unwrap().unwrap();
  assert_eq!(fetched, first);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let (_dir, s) = store().await;
  let missing: Option<Product> = s.get(404).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn list_orders_by_id() {
  let (_dir, s) = store().await;
  for name in ["b", "a", "c"] {
    s.insert(product(name, 1.0, None)).await.unwrap();
  }
  let all: Vec<Product> = s.list().await.unwrap();
  let names: Vec<_> = all.iter().map(|p| p.product_name.as_str()).collect();
  assert_eq!(names, ["b", "a", "c"]);
}

// ─── Locked updates ──────────────────────────────────────────────────────────

#[tokio::test]
async fn update_returns_prior_and_current() {
  let (_dir, s) = store().await;
  let created = s.insert(category("Electronics")).await.unwrap();

  let mut values = category("Electronics & Gadgets");
  values.description = "Updated".into();
  let updated = s.update_with_lock(created.id, values).await.unwrap();

  assert_eq!(updated.prior, created);
  assert_eq!(updated.current.id, created.id);
  assert_eq!(updated.current.category_name, "Electronics & Gadgets");
  assert_eq!(updated.current.created_date, created.created_date);
  let stamped = updated.current.updated_date.unwrap();
  assert!(stamped > created.created_date);

  let stored: Category = s.get(created.id).await.unwrap().unwrap();
  assert_eq!(stored, updated.current);
}

#[tokio::test]
async fn update_missing_row_is_not_found_and_changes_nothing() {
  let (_dir, s) = store().await;
  let existing = s.insert(product("Lamp", 20.0, None)).await.unwrap();

  let err = s
    .update_with_lock(existing.id + 100, product("Ghost", 1.0, None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { ref table, id } if table == "Products" && id == existing.id + 100));

  let all: Vec<Product> = s.list().await.unwrap();
  assert_eq!(all, vec![existing]);
}

#[tokio::test]
async fn concurrent_updates_to_one_row_serialise() {
  let (_dir, s) = store().await;
  let created = s.insert(product("Desk", 100.0, None)).await.unwrap();

  let (a, b) = tokio::join!(
    s.update_with_lock(created.id, product("Desk A", 110.0, None)),
    s.update_with_lock(created.id, product("Desk B", 120.0, None)),
  );
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_ne!(a.prior.product_name, b.prior.product_name);
  // Whichever ran second saw the first one's committed row.
  assert!(b.prior == a.current || a.prior == b.current);
}

#[tokio::test]
async fn held_lock_blocks_other_writers_until_released() {
  let dir = tempfile::tempdir().unwrap();
  let s = SqliteStore::open_with_timeout(
    dir.path().join("catalog.db"),
    Duration::from_millis(100),
  )
  .await
  .unwrap();
  let created = s.insert(category("Garden")).await.unwrap();

  let held = LockedTx::begin(s.path(), Duration::from_millis(100), "Categories", created.id)
    .await
    .unwrap();
  let err = s
    .update_with_lock(created.id, category("Outdoors"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unavailable(_)));
  assert!(matches!(
    catalog_core::Error::from(err),
    catalog_core::Error::StoreUnavailable(_)
  ));

  held.rollback().await;
  let updated = s
    .update_with_lock(created.id, category("Outdoors"))
    .await
    .unwrap();
  assert_eq!(updated.prior.category_name, "Garden");
}

#[tokio::test]
async fn dropped_transaction_discards_its_write() {
  let (_dir, s) = store().await;
  let created = s.insert(category("Music")).await.unwrap();
  let schema = Category::schema();

  let tx = LockedTx::begin(s.path(), Duration::from_secs(1), "Categories", created.id)
    .await
    .unwrap();
  tx.execute(&schema.delete_sql, vec![created.id.into()])
    .await
    .unwrap();
  drop(tx);

  let still_there: Option<Category> = s.get(created.id).await.unwrap();
  assert_eq!(still_there, Some(created));
}

// ─── Locked deletes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_returns_prior_state() {
  let (_dir, s) = store().await;
  let created = s.insert(product("Chair", 45.0, None)).await.unwrap();

  let prior: Product = s.delete_with_lock(created.id).await.unwrap();
  assert_eq!(prior, created);
  assert!(s.get::<Product>(created.id).await.unwrap().is_none());

  let again = s.delete_with_lock::<Product>(created.id).await.unwrap_err();
  assert!(matches!(again, Error::NotFound { .. }));
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
  let (_dir, s) = store().await;
  let electronics = s.insert(category("Electronics")).await.unwrap();
  let phone = s
    .insert(product("Phone", 699.0, Some(electronics.id)))
    .await
    .unwrap();

  let err = s
    .delete_with_lock::<Category>(electronics.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("Products")));
  assert!(s.get::<Category>(electronics.id).await.unwrap().is_some());

  s.delete_with_lock::<Product>(phone.id).await.unwrap();
  let prior: Category = s.delete_with_lock(electronics.id).await.unwrap();
  assert_eq!(prior.category_name, "Electronics");
}
