//! Storage engine abstraction for the document store.
//!
//! This module defines the minimal interface the typed layer needs from an
//! embedded document engine: point reads and writes, atomic batches, execution
//! of composed query plans, index creation and named-source lifecycle.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage engines
//! - [`WriteBatch`]: The write scope handed to a batch closure
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docwrap::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.create_source("vehicles")?;
//! backend.put_record("vehicles", "1", doc! { "id": "1", "attributes": 40 })?;
//! assert!(backend.get_record("vehicles", "1")?.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use bson::Document;
use std::{fmt::Debug, sync::Arc};

use crate::{error::DocumentStoreResult, index::IndexSpec, query::QueryPlan};

/// Summary of a named source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub record_count: usize,
    pub indexes: Vec<String>,
}

/// Write scope of an atomic batch.
///
/// Reads through the scope observe the batch's own staged writes. Nothing staged
/// is visible outside the batch until the engine commits it.
pub trait WriteBatch {
    /// Reads a record, including writes staged earlier in this batch.
    fn get_record(&self, id: &str) -> DocumentStoreResult<Option<Document>>;

    /// Stages a full write of `record` under `id`.
    fn put_record(&mut self, id: &str, record: Document) -> DocumentStoreResult<()>;

    /// Stages the removal of `id`; removing an unknown id is a no-op.
    fn delete_record(&mut self, id: &str) -> DocumentStoreResult<()>;
}

/// The closure type run inside [`StoreBackend::run_batch`].
pub type BatchFn<'f> = dyn FnMut(&mut dyn WriteBatch) -> DocumentStoreResult<()> + 'f;

/// Abstract interface for embedded document engines.
///
/// All calls are synchronous and block until the engine has applied them.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Serialization of concurrent mutations
/// is the engine's concern; the typed layer holds no locks of its own.
///
/// # Error Handling
///
/// Engine failures are reported as
/// [`DocumentStoreError::Store`](crate::error::DocumentStoreError::Store) or
/// [`DocumentStoreError::SourceNotFound`](crate::error::DocumentStoreError::SourceNotFound).
/// Callers never retry automatically.
pub trait StoreBackend: Send + Sync + Debug {
    /// Retrieves a record by id, or `None` if it does not exist.
    fn get_record(&self, source: &str, id: &str) -> DocumentStoreResult<Option<Document>>;

    /// Writes a record under `id`, replacing any record with that id entirely.
    fn put_record(&self, source: &str, id: &str, record: Document) -> DocumentStoreResult<()>;

    /// Deletes a record by id. Deleting an unknown id is a no-op.
    fn delete_record(&self, source: &str, id: &str) -> DocumentStoreResult<()>;

    /// Runs `batch` as one atomic unit against `source`.
    ///
    /// If the closure returns `Ok`, every staged write is applied together. If it
    /// returns an error, nothing staged is applied and the error is returned.
    fn run_batch(&self, source: &str, batch: &mut BatchFn<'_>) -> DocumentStoreResult<()>;

    /// Executes a composed plan and returns the matching rows.
    ///
    /// Records are read from the engine source [`DataSource::key`](crate::query::DataSource::key).
    /// Each row holds the matched record projected under the source name:
    /// `{ "<source>": { "id": .., "attributes": .. } }`. Without an ordering
    /// clause the row order is engine-defined.
    fn execute(&self, plan: &QueryPlan) -> DocumentStoreResult<Vec<Document>>;

    /// Creates (or redefines) a named index on `source`.
    fn create_index(&self, source: &str, spec: IndexSpec) -> DocumentStoreResult<()>;

    /// Drops a named index. Dropping an unknown index is a no-op.
    fn drop_index(&self, source: &str, name: &str) -> DocumentStoreResult<()>;

    /// Lists the index definitions of `source`.
    fn list_indexes(&self, source: &str) -> DocumentStoreResult<Vec<IndexSpec>>;

    /// Creates an empty source. Creating an existing source leaves it untouched.
    fn create_source(&self, name: &str) -> DocumentStoreResult<()>;

    /// Describes a source, or `None` if it does not exist.
    fn get_source(&self, name: &str) -> DocumentStoreResult<Option<SourceInfo>>;

    /// Destroys a source with all its records and indexes.
    fn delete_source(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all sources.
    fn list_sources(&self) -> DocumentStoreResult<Vec<String>>;

    /// Removes every record of `source`, keeping the source and its indexes.
    ///
    /// Backs [`Collection::clear`](crate::collection::Collection::clear); unlike the
    /// two-phase `delete_all` it leaves no window for concurrent writes to survive.
    fn delete_all_records(&self, source: &str) -> DocumentStoreResult<()>;
}

macro_rules! forward_store_backend {
    () => {
        fn get_record(&self, source: &str, id: &str) -> DocumentStoreResult<Option<Document>> {
            (**self).get_record(source, id)
        }

        fn put_record(&self, source: &str, id: &str, record: Document) -> DocumentStoreResult<()> {
            (**self).put_record(source, id, record)
        }

        fn delete_record(&self, source: &str, id: &str) -> DocumentStoreResult<()> {
            (**self).delete_record(source, id)
        }

        fn run_batch(&self, source: &str, batch: &mut BatchFn<'_>) -> DocumentStoreResult<()> {
            (**self).run_batch(source, batch)
        }

        fn execute(&self, plan: &QueryPlan) -> DocumentStoreResult<Vec<Document>> {
            (**self).execute(plan)
        }

        fn create_index(&self, source: &str, spec: IndexSpec) -> DocumentStoreResult<()> {
            (**self).create_index(source, spec)
        }

        fn drop_index(&self, source: &str, name: &str) -> DocumentStoreResult<()> {
            (**self).drop_index(source, name)
        }

        fn list_indexes(&self, source: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
            (**self).list_indexes(source)
        }

        fn create_source(&self, name: &str) -> DocumentStoreResult<()> {
            (**self).create_source(name)
        }

        fn get_source(&self, name: &str) -> DocumentStoreResult<Option<SourceInfo>> {
            (**self).get_source(name)
        }

        fn delete_source(&self, name: &str) -> DocumentStoreResult<()> {
            (**self).delete_source(name)
        }

        fn list_sources(&self) -> DocumentStoreResult<Vec<String>> {
            (**self).list_sources()
        }

        fn delete_all_records(&self, source: &str) -> DocumentStoreResult<()> {
            (**self).delete_all_records(source)
        }
    };
}

impl<B> StoreBackend for &B
where
    B: StoreBackend + ?Sized,
{
    forward_store_backend!();
}

impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    forward_store_backend!();
}

impl<B> StoreBackend for Box<B>
where
    B: StoreBackend + ?Sized,
{
    forward_store_backend!();
}

/// Factory for configured backend instances.
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    fn build(self) -> DocumentStoreResult<Self::Backend>;
}
