//! In-memory document engine for docwrap.
//!
//! This crate provides a thread-safe, embedded implementation of the
//! `StoreBackend` trait. It is the engine the tests run against and is fine for
//! development and small single-process deployments.
//!
//! # Features
//!
//! - **Shared state** - Clones of a store see the same sources
//! - **Atomic batches** - Staged writes are committed together or not at all
//! - **Query execution** - Dotted-path predicates and stable multi-key ordering
//! - **Strict sources** - Optionally reject writes to sources never created
//!
//! # Quick Start
//!
//! ```ignore
//! use docwrap::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::open(InMemoryStore::new(), "shop")?;
//! let prices = store.typed_database::<f64>();
//!
//! prices.save(&Envelope::new("1", 20.5))?;
//! assert_eq!(prices.fetch("1")?, Some(20.5));
//! # Ok::<(), DocumentStoreError>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as docwrap_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
