//! Core types, traits, and the audited mutation pipeline for the catalog
//! service.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::EntityStore`] and [`store::AuditStore`]; the
//! [`service::CatalogService`] sequences them into audited mutations.

pub mod audit;
pub mod cache;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod schema;
pub mod service;
pub mod store;
pub mod writer;

pub use error::{Error, Result};
