//! SQL schema for the catalog SQLite store.
//!
//! Executed once at startup. Column names match the entities' declared
//! fields, which is what lets rows decode straight into them.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS Categories (
    Id           INTEGER PRIMARY KEY AUTOINCREMENT,
    CategoryName TEXT NOT NULL,
    Description  TEXT NOT NULL DEFAULT '',
    CreatedDate  TEXT NOT NULL,   -- RFC 3339 UTC
    UpdatedDate  TEXT             -- NULL until the first update
);

-- CategoryId is deliberately not a foreign key: deleting a category that
-- still owns products is rejected by the store, inside the delete
-- transaction, with a conflict error.
CREATE TABLE IF NOT EXISTS Products (
    Id          INTEGER PRIMARY KEY AUTOINCREMENT,
    ProductName TEXT NOT NULL,
    Price       REAL NOT NULL,
    Category    TEXT NOT NULL DEFAULT '',
    CategoryId  INTEGER,
    CreatedDate TEXT NOT NULL,
    UpdatedDate TEXT
);

CREATE INDEX IF NOT EXISTS products_category_idx ON Products(CategoryId);

PRAGMA user_version = 1;
";
