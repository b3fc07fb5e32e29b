//! JSON REST API for the catalog.
//!
//! Exposes an axum [`Router`] over a [`CatalogService`] for any pair of
//! relational and audit backends. Every entity collection gets the same set
//! of routes; see [`entities`].

pub mod config;
pub mod entities;
pub mod error;
pub mod request;

use std::sync::Arc;

use axum::{Router, routing::get};
use catalog_core::{
  catalog::{Category, Product},
  entity::Entity,
  service::CatalogService,
  store::{AuditStore, EntityStore},
};

pub use crate::config::{AuditBackend, AuditConfig, ServerConfig};
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, A> {
  pub service: Arc<CatalogService<S, A>>,
}

impl<S, A> Clone for AppState<S, A> {
  fn clone(&self) -> Self { Self { service: Arc::clone(&self.service) } }
}

impl<S, A> AppState<S, A> {
  pub fn new(service: CatalogService<S, A>) -> Self {
    Self { service: Arc::new(service) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router, with every route under `/api`.
pub fn router<S, A>(state: AppState<S, A>) -> Router
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
{
  let routes = Router::new();
  let routes = entity_routes::<S, A, Product>(routes, "/api/products");
  let routes = entity_routes::<S, A, Category>(routes, "/api/categories");
  routes.with_state(state)
}

fn entity_routes<S, A, E>(
  router: Router<AppState<S, A>>,
  base: &str,
) -> Router<AppState<S, A>>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  router
    .route(
      base,
      get(entities::list::<S, A, E>).post(entities::create::<S, A, E>),
    )
    .route(
      &format!("{base}/update-history"),
      get(entities::history_all::<S, A, E>),
    )
    .route(
      &format!("{base}/{{id}}"),
      get(entities::get_one::<S, A, E>)
        .put(entities::update::<S, A, E>)
        .delete(entities::delete::<S, A, E>),
    )
    .route(
      &format!("{base}/{{id}}/update-history"),
      get(entities::history::<S, A, E>),
    )
}
