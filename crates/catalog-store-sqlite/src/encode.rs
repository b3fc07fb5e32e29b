//! Conversions between SQLite values and the JSON documents entities are
//! decoded from.
//!
//! Rows are read as JSON objects keyed by column name, then deserialised into
//! the entity type. Timestamps are stored as RFC 3339 text and pass through
//! unchanged.

use catalog_core::entity::{Entity, SqlValue};
use rusqlite::types::{Value, ValueRef};
use serde_json::{Map, Value as Json};

use crate::Result;

pub type Document = Map<String, Json>;

// ─── Parameters ──────────────────────────────────────────────────────────────

pub fn encode_value(v: SqlValue) -> Value {
  match v {
    SqlValue::Null => Value::Null,
    SqlValue::Integer(n) => Value::Integer(n),
    SqlValue::Real(f) => Value::Real(f),
    SqlValue::Text(s) => Value::Text(s),
  }
}

pub fn encode_params(values: Vec<SqlValue>) -> Vec<Value> {
  values.into_iter().map(encode_value).collect()
}

// ─── Rows ────────────────────────────────────────────────────────────────────

pub fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
  stmt.column_names().into_iter().map(str::to_owned).collect()
}

pub fn row_to_document(
  row: &rusqlite::Row<'_>,
  columns: &[String],
) -> rusqlite::Result<Document> {
  let mut doc = Map::with_capacity(columns.len());
  for (i, name) in columns.iter().enumerate() {
    let value = match row.get_ref(i)? {
      ValueRef::Null => Json::Null,
      ValueRef::Integer(n) => Json::from(n),
      ValueRef::Real(f) => Json::from(f),
      ValueRef::Text(t) => {
        Json::String(std::str::from_utf8(t).map_err(rusqlite::Error::Utf8Error)?.to_owned())
      }
      ValueRef::Blob(b) => Json::from(b.to_vec()),
    };
    doc.insert(name.clone(), value);
  }
  Ok(doc)
}

pub fn decode<E: Entity>(doc: Document) -> Result<E> {
  Ok(serde_json::from_value(Json::Object(doc))?)
}

#[cfg(test)]
mod tests {
  use catalog_core::catalog::Category;
  use serde_json::json;

  use super::*;

  #[test]
  fn sql_values_map_one_to_one() {
    assert_eq!(encode_value(SqlValue::Null), Value::Null);
    assert_eq!(encode_value(SqlValue::Integer(4)), Value::Integer(4));
    assert_eq!(encode_value(SqlValue::Real(1.5)), Value::Real(1.5));
    assert_eq!(encode_value("x".into()), Value::Text("x".into()));
  }

  #[test]
  fn decodes_a_row_document() {
    let doc = json!({
      "Id": 3,
      "CategoryName": "Books",
      "Description": "",
      "CreatedDate": "2024-05-01T10:00:00+00:00",
      "UpdatedDate": null,
    });
    let Json::Object(doc) = doc else { unreachable!() };

    let category: Category = decode(doc).unwrap();
    assert_eq!(category.id, 3);
    assert_eq!(category.category_name, "Books");
    assert!(category.updated_date.is_none());
  }

  #[test]
  fn invalid_utf8_text_is_an_error() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let mut stmt = conn
      .prepare("SELECT 1 AS Id, CAST(x'ff' AS TEXT) AS CategoryName")
      .unwrap();
    let columns = column_names(&stmt);

    let err = stmt
      .query_row([], |row| row_to_document(row, &columns))
      .unwrap_err();
    assert!(matches!(err, rusqlite::Error::Utf8Error(_)));
  }
}
