//! Audit records: immutable before/after snapshots of one mutation.
//!
//! Records are serialised camelCase; `entityId` and `updatedDate` are the
//! fields the history query filters and sorts on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor recorded when no authenticated identity is available.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
  Create,
  Update,
  Delete,
}

impl Operation {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
    }
  }
}

/// Where a mutation request came from, as seen by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

/// Request context attached to an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
  pub ip_address:       Option<String>,
  pub user_agent:       Option<String>,
  pub environment:      String,
  pub application_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
  pub entity_id:    i64,
  /// The relational table the mutation touched.
  pub class_name:   String,
  pub operation:    Operation,
  /// State before the mutation; absent for creates.
  pub old_data:     Option<serde_json::Value>,
  /// State after the mutation; absent for deletes.
  pub new_data:     Option<serde_json::Value>,
  /// When the record was assembled, not when the row was written.
  pub updated_date: DateTime<Utc>,
  pub updated_by:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata:     Option<RequestMetadata>,
}

impl AuditRecord {
  /// Assemble a record from already-captured snapshots. The timestamp is
  /// taken now.
  pub fn build(
    operation: Operation,
    entity_id: i64,
    class_name: impl Into<String>,
    old_data: Option<serde_json::Value>,
    new_data: Option<serde_json::Value>,
    actor: impl Into<String>,
    metadata: Option<RequestMetadata>,
  ) -> Self {
    Self {
      entity_id,
      class_name: class_name.into(),
      operation,
      old_data,
      new_data,
      updated_date: Utc::now(),
      updated_by: actor.into(),
      metadata,
    }
  }

  /// Snapshot `prior` and `current` and assemble a record.
  pub fn from_states<E: Serialize>(
    operation: Operation,
    entity_id: i64,
    class_name: impl Into<String>,
    prior: Option<&E>,
    current: Option<&E>,
    actor: impl Into<String>,
    metadata: Option<RequestMetadata>,
  ) -> Result<Self, serde_json::Error> {
    let old_data = prior.map(serde_json::to_value).transpose()?;
    let new_data = current.map(serde_json::to_value).transpose()?;
    Ok(Self::build(
      operation, entity_id, class_name, old_data, new_data, actor, metadata,
    ))
  }
}
