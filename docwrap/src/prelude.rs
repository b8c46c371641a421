//! Convenient re-exports of commonly used types from docwrap.
//!
//! ```ignore
//! use docwrap::prelude::*;
//! ```
//!
//! This provides access to envelopes, the store and collection handles, query
//! construction, save policies and the error types.

pub use docwrap_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, TypedCollection},
    document::{Attributes, Envelope},
    error::{BatchFailure, BatchReport, DocumentStoreError, DocumentStoreResult},
    policy::SavePolicy,
    query::{DataSource, Expr, Field, FieldOp, Filter, Ordering, QueryPlan, QueryVisitor, SortDirection},
    store::DocumentStore,
};
