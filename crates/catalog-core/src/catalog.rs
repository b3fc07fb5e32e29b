//! The catalog's entity types: products and the categories they belong to.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{DeleteGuard, Entity, Field, HasIdentifier, HasTimestamps, Role, SqlValue},
  schema::EntitySchema,
};

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
  pub id:           i64,
  pub product_name: String,
  pub price:        f64,
  /// Free-text category label.
  pub category:     String,
  /// The owning category, if any.
  pub category_id:  Option<i64>,
  pub created_date: DateTime<Utc>,
  pub updated_date: Option<DateTime<Utc>>,
}

/// Body accepted when creating or updating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
  pub product_name: String,
  pub price:        f64,
  pub category:     String,
  pub category_id:  Option<i64>,
}

impl HasIdentifier for Product {
  fn id(&self) -> i64 { self.id }

  fn set_id(&mut self, id: i64) { self.id = id; }
}

impl HasTimestamps for Product {
  fn created_date(&self) -> DateTime<Utc> { self.created_date }

  fn set_created_date(&mut self, at: DateTime<Utc>) { self.created_date = at; }

  fn updated_date(&self) -> Option<DateTime<Utc>> { self.updated_date }

  fn set_updated_date(&mut self, at: Option<DateTime<Utc>>) {
    self.updated_date = at;
  }
}

impl Entity for Product {
  type Draft = ProductDraft;

  const TYPE_NAME: &'static str = "Product";

  const FIELDS: &'static [Field<Self>] = &[
    Field { name: "Id", role: Role::Identifier, value: |p| p.id.into() },
    Field {
      name:  "ProductName",
      role:  Role::Value,
      value: |p| p.product_name.as_str().into(),
    },
    Field { name: "Price", role: Role::Value, value: |p| p.price.into() },
    Field {
      name:  "Category",
      role:  Role::Value,
      value: |p| p.category.as_str().into(),
    },
    Field {
      name:  "CategoryId",
      role:  Role::Value,
      value: |p| p.category_id.into(),
    },
    Field {
      name:  "CreatedDate",
      role:  Role::CreatedStamp,
      value: |p| p.created_date.into(),
    },
    Field {
      name:  "UpdatedDate",
      role:  Role::Value,
      value: |p| p.updated_date.into(),
    },
  ];

  fn from_draft(draft: ProductDraft) -> Self {
    Self {
      id:           0,
      product_name: draft.product_name,
      price:        draft.price,
      category:     draft.category,
      category_id:  draft.category_id,
      created_date: DateTime::<Utc>::default(),
      updated_date: None,
    }
  }

  fn schema() -> &'static EntitySchema {
    static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();
    SCHEMA.get_or_init(EntitySchema::resolve::<Self>)
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
  pub id:            i64,
  pub category_name: String,
  pub description:   String,
  pub created_date:  DateTime<Utc>,
  pub updated_date:  Option<DateTime<Utc>>,
}

/// Body accepted when creating or updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryDraft {
  #[serde(alias = "name")]
  pub category_name: String,
  pub description:   String,
}

impl HasIdentifier for Category {
  fn id(&self) -> i64 { self.id }

  fn set_id(&mut self, id: i64) { self.id = id; }
}

impl HasTimestamps for Category {
  fn created_date(&self) -> DateTime<Utc> { self.created_date }

  fn set_created_date(&mut self, at: DateTime<Utc>) { self.created_date = at; }

  fn updated_date(&self) -> Option<DateTime<Utc>> { self.updated_date }

  fn set_updated_date(&mut self, at: Option<DateTime<Utc>>) {
    self.updated_date = at;
  }
}

impl Entity for Category {
  type Draft = CategoryDraft;

  const TYPE_NAME: &'static str = "Category";

  const TABLE_NAME: Option<&'static str> = Some("Categories");

  const FIELDS: &'static [Field<Self>] = &[
    Field { name: "Id", role: Role::Identifier, value: |c| c.id.into() },
    Field {
      name:  "CategoryName",
      role:  Role::Value,
      value: |c| c.category_name.as_str().into(),
    },
    Field {
      name:  "Description",
      role:  Role::Value,
      value: |c| c.description.as_str().into(),
    },
    Field {
      name:  "CreatedDate",
      role:  Role::CreatedStamp,
      value: |c| c.created_date.into(),
    },
    Field {
      name:  "UpdatedDate",
      role:  Role::Value,
      value: |c| c.updated_date.into(),
    },
  ];

  /// A category cannot be deleted while products still point at it.
  const DELETE_GUARDS: &'static [DeleteGuard] =
    &[DeleteGuard { table: "Products", column: "CategoryId" }];

  fn from_draft(draft: CategoryDraft) -> Self {
    Self {
      id:            0,
      category_name: draft.category_name,
      description:   draft.description,
      created_date:  DateTime::<Utc>::default(),
      updated_date:  None,
    }
  }

  fn schema() -> &'static EntitySchema {
    static SCHEMA: OnceLock<EntitySchema> = OnceLock::new();
    SCHEMA.get_or_init(EntitySchema::resolve::<Self>)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn product_serialises_with_column_names() {
    let product = Product::from_draft(ProductDraft {
      product_name: "Laptop".into(),
      price:        999.5,
      category:     "Electronics".into(),
      category_id:  Some(3),
    });
    let json = serde_json::to_value(&product).unwrap();
    for field in Product::FIELDS {
      assert!(json.get(field.name).is_some(), "missing {}", field.name);
    }
    assert_eq!(json["CategoryId"], 3);
  }

  #[test]
  fn category_draft_accepts_short_name_alias() {
    let draft: CategoryDraft =
      serde_json::from_str(r#"{"name":"Electronics","description":"Devices"}"#)
        .unwrap();
    assert_eq!(draft.category_name, "Electronics");
    assert_eq!(draft.description, "Devices");
  }

  #[test]
  fn field_accessors_produce_bound_values() {
    let mut category = Category::from_draft(CategoryDraft {
      category_name: "Books".into(),
      description:   String::new(),
    });
    category.id = 4;
    let values: Vec<SqlValue> =
      Category::FIELDS.iter().map(|f| (f.value)(&category)).collect();
    assert_eq!(values[0], SqlValue::Integer(4));
    assert_eq!(values[1], SqlValue::Text("Books".into()));
    assert_eq!(values[4], SqlValue::Null);
  }
}
