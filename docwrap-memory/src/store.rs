//! In-memory storage engine for document stores.
//!
//! Records are kept per source in ordered maps keyed by id, guarded by a single
//! read-write lock shared between clones of the store.

use bson::Document;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::{debug, info};

use docwrap_core::{
    backend::{BatchFn, SourceInfo, StoreBackend, StoreBackendBuilder, WriteBatch},
    codec::EnvelopeCodec,
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexSpec,
    query::QueryPlan,
};

use crate::evaluator::{DocumentEvaluator, compare_on};

/// Records and index definitions of one named source.
#[derive(Debug, Default)]
struct SourceData {
    records: BTreeMap<String, Document>,
    indexes: BTreeMap<String, IndexSpec>,
}

type StoreMap = HashMap<String, SourceData>;

/// Thread-safe in-memory document storage engine.
///
/// `InMemoryStore` is cloneable and keeps its state behind an `Arc`, so clones
/// share the same sources.
///
/// # Sources
///
/// By default, writing to an unknown source creates it. A store built with
/// [`InMemoryStoreBuilder::strict_sources`] instead rejects writes to sources
/// that were never created with
/// [`DocumentStoreError::SourceNotFound`].
///
/// # Queries
///
/// Every query scans the whole source; index definitions are recorded but not
/// used for execution. Unordered results come back in ascending id order.
///
/// # Example
///
/// ```ignore
/// use docwrap_memory::InMemoryStore;
/// use docwrap::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.put_record("users", "1", doc! { "id": "1", "attributes": { "name": "Alice" } })?;
///
/// assert!(store.get_record("users", "1")?.is_some());
/// # Ok::<(), docwrap::error::DocumentStoreError>(())
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// source name -> (record id -> record)
    store: Arc<RwLock<StoreMap>>,
    strict_sources: bool,
}

impl InMemoryStore {
    /// Creates a new empty store that creates sources on first write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docwrap_memory::InMemoryStore;
    /// use docwrap::backend::StoreBackendBuilder;
    ///
    /// let store = InMemoryStore::builder()
    ///     .with_source("vehicles")
    ///     .strict_sources(true)
    ///     .build()?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Whether writes to unknown sources are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict_sources
    }

    fn writable<'s>(&self, store: &'s mut StoreMap, source: &str) -> DocumentStoreResult<&'s mut SourceData> {
        if self.strict_sources && !store.contains_key(source) {
            return Err(DocumentStoreError::SourceNotFound(source.to_string()));
        }

        Ok(store.entry(source.to_string()).or_default())
    }
}

/// Write scope handed to batch closures; writes are staged over the live records.
struct StagedBatch<'s> {
    base: &'s BTreeMap<String, Document>,
    /// `None` marks a staged removal.
    staged: BTreeMap<String, Option<Document>>,
}

impl WriteBatch for StagedBatch<'_> {
    fn get_record(&self, id: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(match self.staged.get(id) {
            Some(staged) => staged.clone(),
            None => self.base.get(id).cloned(),
        })
    }

    fn put_record(&mut self, id: &str, record: Document) -> DocumentStoreResult<()> {
        self.staged.insert(id.to_string(), Some(record));
        Ok(())
    }

    fn delete_record(&mut self, id: &str) -> DocumentStoreResult<()> {
        self.staged.insert(id.to_string(), None);
        Ok(())
    }
}

impl StoreBackend for InMemoryStore {
    fn get_record(&self, source: &str, id: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .store
            .read()
            .get(source)
            .and_then(|data| data.records.get(id))
            .cloned())
    }

    fn put_record(&self, source: &str, id: &str, record: Document) -> DocumentStoreResult<()> {
        let mut store = self.store.write();

        self.writable(&mut store, source)?
            .records
            .insert(id.to_string(), record);

        Ok(())
    }

    fn delete_record(&self, source: &str, id: &str) -> DocumentStoreResult<()> {
        if let Some(data) = self.store.write().get_mut(source) {
            data.records.remove(id);
        }

        Ok(())
    }

    /// Holds the write lock for the whole batch. The closure must not call back
    /// into this store.
    fn run_batch(&self, source: &str, batch: &mut BatchFn<'_>) -> DocumentStoreResult<()> {
        let mut store = self.store.write();
        let data = self.writable(&mut store, source)?;

        let mut scope = StagedBatch {
            base: &data.records,
            staged: BTreeMap::new(),
        };

        if let Err(err) = batch(&mut scope) {
            debug!(target: "docwrap::memory", source, staged = scope.staged.len(), "Discarded batch");
            return Err(err);
        }

        let staged = scope.staged;
        let writes = staged.len();

        for (id, write) in staged {
            match write {
                Some(record) => {
                    data.records.insert(id, record);
                }
                None => {
                    data.records.remove(&id);
                }
            }
        }
        debug!(target: "docwrap::memory", source, writes, "Committed batch");

        Ok(())
    }

    fn execute(&self, plan: &QueryPlan) -> DocumentStoreResult<Vec<Document>> {
        let source = plan.source().name();
        let store = self.store.read();

        let Some(data) = store.get(&plan.source().key()) else {
            return Ok(vec![]);
        };

        let mut matched = match plan.predicate() {
            Some(predicate) => DocumentEvaluator::filter_records(data.records.values(), predicate)?,
            None => data.records.values().collect::<Vec<_>>(),
        };

        if !plan.ordering().is_empty() {
            // Stable, so ties keep ascending id order.
            matched.sort_by(|a, b| {
                plan.ordering()
                    .iter()
                    .map(|key| compare_on(a, b, &key.path, key.direction))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        Ok(matched
            .into_iter()
            .map(|record| EnvelopeCodec::project(source, record.clone()))
            .collect())
    }

    fn create_index(&self, source: &str, spec: IndexSpec) -> DocumentStoreResult<()> {
        let mut store = self.store.write();

        self.writable(&mut store, source)?
            .indexes
            .insert(spec.name.clone(), spec);

        Ok(())
    }

    fn drop_index(&self, source: &str, name: &str) -> DocumentStoreResult<()> {
        if let Some(data) = self.store.write().get_mut(source) {
            data.indexes.remove(name);
        }

        Ok(())
    }

    fn list_indexes(&self, source: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        Ok(self
            .store
            .read()
            .get(source)
            .map(|data| data.indexes.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create_source(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write();

        if !store.contains_key(name) {
            store.insert(name.to_string(), SourceData::default());
            info!(target: "docwrap::memory", source = name, "Created source");
        }

        Ok(())
    }

    fn get_source(&self, name: &str) -> DocumentStoreResult<Option<SourceInfo>> {
        Ok(self
            .store
            .read()
            .get(name)
            .map(|data| SourceInfo {
                name: name.to_string(),
                record_count: data.records.len(),
                indexes: data.indexes.keys().cloned().collect(),
            }))
    }

    fn delete_source(&self, name: &str) -> DocumentStoreResult<()> {
        if self.store.write().remove(name).is_none() {
            return Err(DocumentStoreError::SourceNotFound(name.to_string()));
        }
        info!(target: "docwrap::memory", source = name, "Deleted source");

        Ok(())
    }

    fn list_sources(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }

    fn delete_all_records(&self, source: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write();
        let data = store
            .get_mut(source)
            .ok_or_else(|| DocumentStoreError::SourceNotFound(source.to_string()))?;

        data.records.clear();
        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docwrap_memory::InMemoryStore;
/// use docwrap::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_source("shop")
///     .with_source("vehicles")
///     .build()?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStoreBuilder {
    sources: Vec<String>,
    strict_sources: bool,
}

impl InMemoryStoreBuilder {
    /// Creates `name` when the store is built.
    pub fn with_source(mut self, name: impl Into<String>) -> Self {
        self.sources.push(name.into());
        self
    }

    /// Rejects writes to sources that were never created.
    pub fn strict_sources(mut self, strict: bool) -> Self {
        self.strict_sources = strict;
        self
    }
}

impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore {
            store: Arc::default(),
            strict_sources: self.strict_sources,
        };

        for source in &self.sources {
            store.create_source(source)?;
        }

        Ok(store)
    }
}
