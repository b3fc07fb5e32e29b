//! Secondary-store backends for catalog audit history.
//!
//! [`ElasticStore`] talks to an Elasticsearch cluster over its REST API, one
//! index per container. [`MemoryStore`] keeps containers in process memory
//! for tests and local runs.

mod elastic;
mod memory;

pub mod error;

pub use elastic::ElasticStore;
pub use error::{Error, Result};
pub use memory::MemoryStore;
