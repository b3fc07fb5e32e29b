//! Handlers shared by every entity collection, generic over the entity type.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{base}` | All rows, by id |
//! | `POST`   | `/{base}` | Body: the entity's draft, camelCase |
//! | `GET`    | `/{base}/update-history` | Every entity's history, `?size=N` |
//! | `GET`    | `/{base}/{id}` | 404 if not found |
//! | `PUT`    | `/{base}/{id}` | Body: the entity's draft |
//! | `DELETE` | `/{base}/{id}` | Returns the deleted row |
//! | `GET`    | `/{base}/{id}/update-history` | `?size=N` |
//!
//! Mutations carry an `x-audit-status` header: `recorded`, `skipped`, or
//! `failed` when the change was committed but its audit record was lost.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderName, StatusCode},
  response::IntoResponse,
};
use catalog_core::{
  Error,
  audit::AuditRecord,
  entity::Entity,
  service::{AuditStatus, Mutation},
  store::{AuditStore, DEFAULT_PAGE_SIZE, EntityStore},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, request::Caller};

pub const AUDIT_STATUS: HeaderName = HeaderName::from_static("x-audit-status");

fn audit_header(status: &AuditStatus) -> [(HeaderName, &'static str); 1] {
  [(AUDIT_STATUS, status.as_str())]
}

fn respond<E: Entity>(
  code: StatusCode,
  mutation: Mutation<E>,
) -> impl IntoResponse {
  (code, audit_header(&mutation.audit), Json(mutation.entity))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /{base}`
pub async fn list<S, A, E>(
  State(state): State<AppState<S, A>>,
) -> Result<Json<Vec<E>>, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  Ok(Json(state.service.list::<E>().await?))
}

/// `GET /{base}/{id}`
pub async fn get_one<S, A, E>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<i64>,
) -> Result<Json<E>, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  let entity = state.service.get::<E>(id).await?.ok_or_else(|| {
    Error::NotFound { table: E::schema().table.clone(), id }
  })?;
  Ok(Json(entity))
}

// ─── Mutations ───────────────────────────────────────────────────────────────

/// `POST /{base}`
pub async fn create<S, A, E>(
  State(state): State<AppState<S, A>>,
  Caller(origin): Caller,
  Json(draft): Json<E::Draft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  let created = state.service.create::<E>(draft, origin).await?;
  Ok(respond(StatusCode::CREATED, created))
}

/// `PUT /{base}/{id}`
pub async fn update<S, A, E>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<i64>,
  Caller(origin): Caller,
  Json(draft): Json<E::Draft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  let updated = state.service.update::<E>(id, draft, origin).await?;
  Ok(respond(StatusCode::OK, updated))
}

/// `DELETE /{base}/{id}`
pub async fn delete<S, A, E>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<i64>,
  Caller(origin): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  let deleted = state.service.delete::<E>(id, origin).await?;
  Ok(respond(StatusCode::OK, deleted))
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default = "default_size")]
  pub size: usize,
}

fn default_size() -> usize { DEFAULT_PAGE_SIZE }

/// `GET /{base}/{id}/update-history[?size=N]`
pub async fn history<S, A, E>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<i64>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<AuditRecord>>, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  Ok(Json(state.service.history::<E>(Some(id), params.size).await?))
}

/// `GET /{base}/update-history[?size=N]`
pub async fn history_all<S, A, E>(
  State(state): State<AppState<S, A>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<AuditRecord>>, ApiError>
where
  S: EntityStore + 'static,
  A: AuditStore + 'static,
  E: Entity,
{
  Ok(Json(state.service.history::<E>(None, params.size).await?))
}
