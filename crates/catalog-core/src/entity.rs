//! Entity capabilities and the compile-time field-to-column mapping.
//!
//! Every row-backed type declares its columns once, as a constant table of
//! [`Field`] descriptors. Each descriptor carries an explicit [`Role`], so the
//! "identifier and creation timestamp are never updated" rule is data, not a
//! naming convention.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::schema::EntitySchema;

// ─── Capabilities ────────────────────────────────────────────────────────────

/// A type with a unique integer identifier assigned by the relational store.
pub trait HasIdentifier {
  fn id(&self) -> i64;
  fn set_id(&mut self, id: i64);
}

/// A type that records when it was created and, optionally, last updated.
pub trait HasTimestamps {
  fn created_date(&self) -> DateTime<Utc>;
  fn set_created_date(&mut self, at: DateTime<Utc>);
  fn updated_date(&self) -> Option<DateTime<Utc>>;
  fn set_updated_date(&mut self, at: Option<DateTime<Utc>>);
}

// ─── Column values ───────────────────────────────────────────────────────────

/// A backend-neutral value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
}

impl From<i64> for SqlValue {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<f64> for SqlValue {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<String> for SqlValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for SqlValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

/// Timestamps are stored as RFC 3339 text.
impl From<DateTime<Utc>> for SqlValue {
  fn from(v: DateTime<Utc>) -> Self { Self::Text(v.to_rfc3339()) }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// What part a column plays in the mutation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  /// The unique key. Assigned by the store on insert, never written after.
  Identifier,
  /// Set once at insert, never updated.
  CreatedStamp,
  /// Written on insert and on every update.
  Value,
}

/// One declared column of an entity type.
pub struct Field<E> {
  /// Column name in the relational table; also the serde field name.
  pub name:  &'static str,
  pub role:  Role,
  /// Reads the column's value out of an entity for statement binding.
  pub value: fn(&E) -> SqlValue,
}

impl<E> Field<E> {
  pub fn is_updatable(&self) -> bool { self.role == Role::Value }
}

/// A row-level rule that blocks deleting an entity while rows elsewhere still
/// reference it.
#[derive(Debug, Clone, Copy)]
pub struct DeleteGuard {
  /// The referencing table.
  pub table:  &'static str,
  /// The referencing column, compared against the deleted row's identifier.
  pub column: &'static str,
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A row-backed business object that the mutation pipeline can operate on.
///
/// Serde field names must match the column names in [`Entity::FIELDS`]; rows
/// are decoded by name.
pub trait Entity:
  HasIdentifier
  + HasTimestamps
  + Serialize
  + DeserializeOwned
  + Clone
  + Send
  + Sync
  + 'static
{
  /// The caller-supplied mutable fields, used as create and update input.
  type Draft: DeserializeOwned + Send + 'static;

  /// Type name as it appears in table and container names.
  const TYPE_NAME: &'static str;

  /// Explicit table name when appending `s` to the type name reads wrong.
  const TABLE_NAME: Option<&'static str> = None;

  /// Every column, in declaration order.
  const FIELDS: &'static [Field<Self>];

  const DELETE_GUARDS: &'static [DeleteGuard] = &[];

  /// Build an unsaved entity (identifier 0, timestamps unset) from a draft.
  fn from_draft(draft: Self::Draft) -> Self;

  /// The resolved schema, computed once per type.
  fn schema() -> &'static EntitySchema;
}

/// The columns an update writes: all declared fields except the identifier
/// and creation timestamp, in declaration order.
pub fn columns_for_update<E: Entity>() -> impl Iterator<Item = &'static Field<E>> {
  E::FIELDS.iter().filter(|f| f.is_updatable())
}
