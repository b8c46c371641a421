//! Main docwrap crate: typed documents over an embedded document engine.
//!
//! This crate is the entry point for users of docwrap. It re-exports the core
//! types from `docwrap-core` and bundles the in-memory engine.
//!
//! # Features
//!
//! - **Typed envelopes** - Store any serde-serializable payload under a string id
//! - **Lossless round trips** - Primitives, nested records and collections come back as saved
//! - **Composable queries** - Predicates and orderings over payload paths
//! - **Save policies** - Replace by identity, or write blindly
//! - **Named indexes** - Validated index names over payload paths
//!
//! # Quick Start
//!
//! ```ignore
//! use docwrap::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Product {
//!     pub id: String,
//!     pub name: String,
//!     pub quantity: i64,
//! }
//!
//! let store = DocumentStore::open(InMemoryStore::new(), "shop")?;
//! let vehicles = store.create_collection("Vehicle")?.typed::<Product>();
//!
//! vehicles.save(&Envelope::new("1", Product { id: "1".into(), name: "car".into(), quantity: 40 }))?;
//!
//! let stocked = vehicles.fetch_all(
//!     Some(Field::attribute("quantity").gt(20)),
//!     Some(vec![Ordering::attribute_desc("id")]),
//! )?;
//! # Ok::<(), DocumentStoreError>(())
//! ```
//!
//! # Batches
//!
//! `save_all`, `delete_many` and `delete_all` run inside one engine batch. An
//! element that cannot be encoded or written is skipped and reported in the
//! returned [`BatchReport`](error::BatchReport); the rest of the batch still
//! commits.
//!
//! ```ignore
//! let report = vehicles.save_all(&envelopes, SavePolicy::Replace)?;
//!
//! for failure in &report.failed {
//!     eprintln!("{}: {}", failure.id, failure.error);
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Embedded in-memory engine

pub mod prelude;

pub use docwrap_core::{backend, codec, collection, document, error, index, policy, query, store};

// Re-export BSON and JSON types for convenience
pub use bson;
pub use serde_json;

/// In-memory storage engine.
pub mod memory {
    pub use docwrap_memory::{InMemoryStore, InMemoryStoreBuilder};
}
