//! A typed document access layer over an embedded, schemaless document engine.
//!
//! This crate is the core of the docwrap project and provides:
//!
//! - **Envelopes** ([`document`]) - Identifier plus typed payload, the unit of persistence
//! - **Envelope codec** ([`codec`]) - Lossless conversion between envelopes and generic records
//! - **Query composition** ([`query`]) - Predicates, orderings and grammar-ordered query plans
//! - **Save policies** ([`policy`]) - Replace versus create-new write semantics
//! - **Index management** ([`index`]) - Index name validation and index specifications
//! - **Engine abstraction** ([`backend`]) - The minimal interface required from a storage engine
//! - **Collections** ([`collection`]) - Typed save/fetch/delete over one named source
//! - **Document store** ([`store`]) - Database façade managing named sources
//! - **Error handling** ([`error`]) - Error taxonomy and batch reports
//!
//! # Example
//!
//! ```ignore
//! use docwrap::prelude::*;
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
//! let vehicles = store.create_collection("vehicles")?;
//!
//! vehicles.save(&Envelope::new("1", Product { id: "1".into(), name: "car".into(), quantity: 40 }))?;
//! let car: Option<Product> = vehicles.fetch("1")?;
//! # Ok::<(), DocumentStoreError>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as docwrap_core;

pub mod backend;
pub mod codec;
pub mod collection;
pub mod document;
pub mod error;
pub mod index;
pub mod policy;
pub mod query;
pub mod store;
