//! Schema resolution: table and container names, column lists, and the SQL
//! text derived from them.
//!
//! Resolution is a pure function of the entity type. Implementors memoise the
//! result in a per-type `OnceLock` (see [`Entity::schema`]).

use crate::entity::{Entity, Role, SqlValue, columns_for_update};

/// Suffix appended to the snake_case type name to form the audit container.
pub const CONTAINER_SUFFIX: &str = "_updates";

/// Fallback key column when an entity declares no [`Role::Identifier`] field.
const DEFAULT_KEY: &str = "Id";

/// Everything derived from an entity type's declared fields.
#[derive(Debug, Clone)]
pub struct EntitySchema {
  pub type_name:      &'static str,
  /// Relational table, e.g. `Products`.
  pub table:          String,
  /// Secondary-store container, e.g. `product_updates`.
  pub container:      String,
  pub key:            &'static str,
  /// Columns written by an update, in declaration order.
  pub update_columns: Vec<&'static str>,
  /// Columns written by an insert (everything but the key).
  pub insert_columns: Vec<&'static str>,
  pub select_sql:     String,
  pub list_sql:       String,
  pub insert_sql:     String,
  pub update_sql:     String,
  pub delete_sql:     String,
}

impl EntitySchema {
  pub fn resolve<E: Entity>() -> Self {
    let table = table_name::<E>();
    let container = container_name::<E>();
    let key = E::FIELDS
      .iter()
      .find(|f| f.role == Role::Identifier)
      .map_or(DEFAULT_KEY, |f| f.name);

    let update_columns: Vec<&'static str> =
      columns_for_update::<E>().map(|f| f.name).collect();
    let insert_columns: Vec<&'static str> = E::FIELDS
      .iter()
      .filter(|f| f.role != Role::Identifier)
      .map(|f| f.name)
      .collect();

    let assignments = update_columns
      .iter()
      .enumerate()
      .map(|(i, c)| format!("{c} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let placeholders = (1..=insert_columns.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");

    Self {
      type_name: E::TYPE_NAME,
      select_sql: format!("SELECT * FROM {table} WHERE {key} = ?1"),
      list_sql: format!("SELECT * FROM {table} ORDER BY {key}"),
      insert_sql: format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        insert_columns.join(", ")
      ),
      update_sql: format!(
        "UPDATE {table} SET {assignments} WHERE {key} = ?{}",
        update_columns.len() + 1
      ),
      delete_sql: format!("DELETE FROM {table} WHERE {key} = ?1"),
      table,
      container,
      key,
      update_columns,
      insert_columns,
    }
  }

  /// Parameters for [`EntitySchema::update_sql`]: the update columns in order,
  /// followed by the identifier.
  pub fn update_params<E: Entity>(&self, entity: &E) -> Vec<SqlValue> {
    let mut params: Vec<SqlValue> =
      columns_for_update::<E>().map(|f| (f.value)(entity)).collect();
    params.push(SqlValue::Integer(entity.id()));
    params
  }

  /// Parameters for [`EntitySchema::insert_sql`].
  pub fn insert_params<E: Entity>(&self, entity: &E) -> Vec<SqlValue> {
    E::FIELDS
      .iter()
      .filter(|f| f.role != Role::Identifier)
      .map(|f| (f.value)(entity))
      .collect()
  }
}

/// The relational table for `E`: the explicit override, or the type name
/// with `s` appended.
pub fn table_name<E: Entity>() -> String {
  E::TABLE_NAME.map_or_else(|| format!("{}s", E::TYPE_NAME), str::to_owned)
}

/// The audit container for `E`, e.g. `ProductVariant` → `product_variant_updates`.
pub fn container_name<E: Entity>() -> String {
  format!("{}{CONTAINER_SUFFIX}", to_snake_case(E::TYPE_NAME))
}

/// Lower-case `name`, inserting `_` wherever a lower-case letter or digit is
/// followed by an upper-case letter.
pub fn to_snake_case(name: &str) -> String {
  let mut out = String::with_capacity(name.len() + 4);
  let mut prev: Option<char> = None;
  for c in name.chars() {
    if c.is_ascii_uppercase()
      && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
    {
      out.push('_');
    }
    out.push(c.to_ascii_lowercase());
    prev = Some(c);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::{Category, Product};

  #[test]
  fn snake_case_splits_on_lower_to_upper_boundaries() {
    assert_eq!(to_snake_case("Product"), "product");
    assert_eq!(to_snake_case("ProductVariant"), "product_variant");
    assert_eq!(to_snake_case("Sku2Price"), "sku2_price");
    // Runs of capitals are not split.
    assert_eq!(to_snake_case("APIKey"), "apikey");
    assert_eq!(to_snake_case(""), "");
  }

  #[test]
  fn table_names_pluralise_or_use_override() {
    assert_eq!(table_name::<Product>(), "Products");
    assert_eq!(table_name::<Category>(), "Categories");
  }

  #[test]
  fn container_names() {
    assert_eq!(container_name::<Product>(), "product_updates");
    assert_eq!(container_name::<Category>(), "category_updates");
  }

  #[test]
  fn update_columns_skip_identifier_and_created_stamp() {
    let schema = Product::schema();
    assert_eq!(
      schema.update_columns,
      vec!["ProductName", "Price", "Category", "CategoryId", "UpdatedDate"],
    );
    assert!(!schema.update_columns.contains(&"Id"));
    assert!(!schema.update_columns.contains(&"CreatedDate"));
    assert!(schema.insert_columns.contains(&"CreatedDate"));
    assert!(!schema.insert_columns.contains(&"Id"));
  }

  #[test]
  fn update_sql_binds_columns_then_key() {
    let schema = Category::schema();
    assert_eq!(
      schema.update_sql,
      "UPDATE Categories SET CategoryName = ?1, Description = ?2, \
       UpdatedDate = ?3 WHERE Id = ?4",
    );
    assert_eq!(schema.select_sql, "SELECT * FROM Categories WHERE Id = ?1");
    assert_eq!(schema.delete_sql, "DELETE FROM Categories WHERE Id = ?1");
  }

  #[test]
  fn update_params_follow_column_order() {
    let mut category = Category::from_draft(crate::catalog::CategoryDraft {
      category_name: "Books".into(),
      description:   "Paper".into(),
    });
    category.id = 7;
    let params = Category::schema().update_params(&category);
    assert_eq!(params, vec![
      SqlValue::Text("Books".into()),
      SqlValue::Text("Paper".into()),
      SqlValue::Null,
      SqlValue::Integer(7),
    ]);
  }

  #[test]
  fn schema_is_memoised() {
    assert!(std::ptr::eq(Product::schema(), Product::schema()));
  }
}
