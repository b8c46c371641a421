//! Typed access to one named source.
//!
//! A [`Collection`] is the façade callers use to save, fetch and delete typed
//! values. The payload type is chosen per call, so a single source can be read
//! as different shapes; [`TypedCollection`] fixes it once instead.
//!
//! # Example
//!
//! ```ignore
//! use docwrap::prelude::*;
//!
//! let store = DocumentStore::open(InMemoryStore::new(), "shop")?;
//! let vehicles = store.create_collection("vehicles")?;
//!
//! vehicles.save(&Envelope::new("1", Product { id: "1".into(), name: "car".into(), quantity: 40 }))?;
//!
//! let busy: Vec<Product> = vehicles.fetch_all(
//!     Some(Field::attribute("quantity").gt(20)),
//!     Some(vec![Ordering::attribute_desc("quantity")]),
//! )?;
//! # Ok::<(), DocumentStoreError>(())
//! ```
//!
//! # Batches
//!
//! [`Collection::save_all`], [`Collection::delete_many`] and [`Collection::delete_all`]
//! run inside one engine batch. A failing element is recorded in the returned
//! [`BatchReport`] and logged; the other elements still apply.

use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::{
    backend::{StoreBackend, WriteBatch},
    codec::EnvelopeCodec,
    document::{Attributes, Envelope},
    error::{BatchReport, DocumentStoreResult},
    index::{IndexManager, IndexSpec},
    policy::SavePolicy,
    query::{DataSource, Expr, Ordering, QueryPlan, compose},
};

/// Typed operations over one named source.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    source: DataSource,
    key: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Clone for Collection<'a, B> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            key: self.key.clone(),
            backend: self.backend,
        }
    }
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(source: DataSource, backend: &'a B) -> Self {
        Self { key: source.key(), source, backend }
    }

    /// Returns the name of this source.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Returns the engine source holding this collection's records.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Binds a payload type, returning a [`TypedCollection`] over the same source.
    pub fn typed<T: Attributes>(&self) -> TypedCollection<'a, B, T> {
        TypedCollection { inner: self.clone(), _marker: PhantomData }
    }

    /// Saves an envelope with [`SavePolicy::Replace`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Encode`](crate::error::DocumentStoreError::Encode)
    /// if the payload cannot be serialized, or a store error if the write fails.
    pub fn save<T: Attributes>(&self, envelope: &Envelope<T>) -> DocumentStoreResult<()> {
        self.save_with(envelope, SavePolicy::default())
    }

    /// Saves an envelope under the given policy. Exactly one write is issued.
    pub fn save_with<T: Attributes>(
        &self,
        envelope: &Envelope<T>,
        policy: SavePolicy,
    ) -> DocumentStoreResult<()> {
        let record = EnvelopeCodec::encode(envelope)?;

        if policy.consults_existing() {
            let existing = self.backend.get_record(self.key(), &envelope.id)?;
            debug!(
                target: "docwrap::store",
                source = self.key(),
                id = %envelope.id,
                replaced = existing.is_some(),
                "Saving record"
            );
        } else {
            debug!(target: "docwrap::store", source = self.key(), id = %envelope.id, "Writing record");
        }

        self.backend.put_record(self.key(), &envelope.id, record)
    }

    /// Saves many envelopes inside one batch.
    ///
    /// Each element is encoded and staged independently. An element that fails
    /// is skipped and reported; elements staged before and after it still apply.
    pub fn save_all<T: Attributes>(
        &self,
        envelopes: &[Envelope<T>],
        policy: SavePolicy,
    ) -> DocumentStoreResult<BatchReport> {
        let mut report = BatchReport::default();

        self.backend.run_batch(self.key(), &mut |batch: &mut dyn WriteBatch| {
            for envelope in envelopes {
                match Self::stage_save(batch, envelope, policy) {
                    Ok(()) => report.applied(envelope.id.as_str()),
                    Err(err) => {
                        warn!(
                            target: "docwrap::batch",
                            source = self.key(),
                            id = %envelope.id,
                            error = %err,
                            "Skipping element of save batch"
                        );
                        report.failed(envelope.id.as_str(), err);
                    }
                }
            }
            Ok(())
        })?;

        debug!(
            target: "docwrap::batch",
            source = self.key(),
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Save batch committed"
        );
        Ok(report)
    }

    fn stage_save<T: Attributes>(
        batch: &mut dyn WriteBatch,
        envelope: &Envelope<T>,
        policy: SavePolicy,
    ) -> DocumentStoreResult<()> {
        let record = EnvelopeCodec::encode(envelope)?;

        if policy.consults_existing() && batch.get_record(&envelope.id)?.is_some() {
            debug!(target: "docwrap::batch", id = %envelope.id, "Replacing staged or stored record");
        }

        batch.put_record(&envelope.id, record)
    }

    /// Looks up the payload stored under `id`.
    ///
    /// Returns `Ok(None)` when no record has that id.
    pub fn fetch<T: Attributes>(&self, id: &str) -> DocumentStoreResult<Option<T>> {
        Ok(self.fetch_envelope(id)?.map(Envelope::into_attributes))
    }

    /// Alias of [`Collection::fetch`].
    pub fn find<T: Attributes>(&self, id: &str) -> DocumentStoreResult<Option<T>> {
        self.fetch(id)
    }

    /// Looks up the full envelope stored under `id`.
    pub fn fetch_envelope<T: Attributes>(&self, id: &str) -> DocumentStoreResult<Option<Envelope<T>>> {
        self.backend
            .get_record(self.key(), id)?
            .map(EnvelopeCodec::decode)
            .transpose()
    }

    /// Returns every payload matching `predicate`, ordered by `ordering`.
    ///
    /// Without an ordering the result order is engine-defined and may differ
    /// between calls.
    ///
    /// # Errors
    ///
    /// Returns a decode error naming the path (e.g. `vehicles.attributes.quantity`)
    /// if any matched record does not fit `T`.
    pub fn fetch_all<T: Attributes>(
        &self,
        predicate: Option<Expr>,
        ordering: Option<Vec<Ordering>>,
    ) -> DocumentStoreResult<Vec<T>> {
        Ok(self
            .fetch_all_envelopes(predicate, ordering)?
            .into_iter()
            .map(Envelope::into_attributes)
            .collect())
    }

    /// Like [`Collection::fetch_all`] but keeps the identifiers.
    pub fn fetch_all_envelopes<T: Attributes>(
        &self,
        predicate: Option<Expr>,
        ordering: Option<Vec<Ordering>>,
    ) -> DocumentStoreResult<Vec<Envelope<T>>> {
        let plan = self.plan(predicate, ordering);
        debug!(target: "docwrap::store", %plan, "Executing query");

        self.backend
            .execute(&plan)?
            .into_iter()
            .map(|row| EnvelopeCodec::decode_row(self.name(), row))
            .collect()
    }

    /// Counts the records matching `predicate`.
    pub fn count(&self, predicate: Option<Expr>) -> DocumentStoreResult<usize> {
        Ok(self.backend.execute(&self.plan(predicate, None))?.len())
    }

    /// Composes a plan over this source.
    pub fn plan(&self, predicate: Option<Expr>, ordering: Option<Vec<Ordering>>) -> QueryPlan {
        compose(self.source.clone(), predicate, ordering)
    }

    /// Deletes the record stored under `id`.
    ///
    /// Returns `false` without error when no such record exists.
    pub fn delete(&self, id: &str) -> DocumentStoreResult<bool> {
        if self.backend.get_record(self.key(), id)?.is_none() {
            return Ok(false);
        }

        self.backend.delete_record(self.key(), id)?;
        debug!(target: "docwrap::store", source = self.key(), id, "Deleted record");
        Ok(true)
    }

    /// Deletes many records by id inside one batch.
    ///
    /// Unknown ids are skipped silently and do not appear in the report.
    pub fn delete_many<I, S>(&self, ids: I) -> DocumentStoreResult<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect::<Vec<_>>();

        self.delete_batch(ids, BatchReport::default())
    }

    /// Deletes every record matching `predicate`, or every record when `None`.
    ///
    /// Runs in two phases: the plan is executed to collect matching ids, then
    /// those ids are deleted in one batch. A record written or changed to match
    /// between the two phases is not deleted.
    pub fn delete_all(&self, predicate: Option<Expr>) -> DocumentStoreResult<BatchReport> {
        let plan = self.plan(predicate, None);
        debug!(target: "docwrap::store", %plan, "Collecting records to delete");

        let mut report = BatchReport::default();
        let mut ids = Vec::new();

        for (position, row) in self.backend.execute(&plan)?.into_iter().enumerate() {
            let id = EnvelopeCodec::unproject(self.name(), row)
                .and_then(|record| EnvelopeCodec::record_id(&record).map_err(|err| err.within(self.name())));

            match id {
                Ok(id) => ids.push(id),
                Err(err) => {
                    warn!(
                        target: "docwrap::batch",
                        source = self.key(),
                        position,
                        error = %err,
                        "Skipping unreadable row of delete batch"
                    );
                    report.failed(format!("#{position}"), err);
                }
            }
        }

        self.delete_batch(ids, report)
    }

    /// Removes every record at once, keeping the collection and its indexes.
    ///
    /// Unlike [`Collection::delete_all`] this is a single engine call with no
    /// per-record report. Fails with `SourceNotFound` if the collection was
    /// never created.
    pub fn clear(&self) -> DocumentStoreResult<()> {
        self.backend.delete_all_records(self.key())?;
        debug!(target: "docwrap::store", source = self.key(), "Cleared records");

        Ok(())
    }

    fn delete_batch(&self, ids: Vec<String>, mut report: BatchReport) -> DocumentStoreResult<BatchReport> {
        self.backend.run_batch(self.key(), &mut |batch: &mut dyn WriteBatch| {
            for id in &ids {
                let deleted = batch
                    .get_record(id)
                    .and_then(|existing| match existing {
                        Some(_) => batch.delete_record(id).map(|()| true),
                        None => Ok(false),
                    });

                match deleted {
                    Ok(true) => report.applied(id.as_str()),
                    Ok(false) => {}
                    Err(err) => {
                        warn!(
                            target: "docwrap::batch",
                            source = self.key(),
                            id = %id,
                            error = %err,
                            "Skipping element of delete batch"
                        );
                        report.failed(id.as_str(), err);
                    }
                }
            }
            Ok(())
        })?;

        debug!(
            target: "docwrap::batch",
            source = self.key(),
            deleted = report.applied.len(),
            failed = report.failed.len(),
            "Delete batch committed"
        );
        Ok(report)
    }

    /// Creates a named index over one or more attribute paths.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIndexName`](crate::error::DocumentStoreError::InvalidIndexName)
    /// if `name` is the reserved keyword `index` in any casing.
    pub fn create_index<I, P>(&self, name: &str, paths: I) -> DocumentStoreResult<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let spec = IndexManager::prepare(name, paths)?;
        debug!(target: "docwrap::index", source = self.key(), index = name, "Creating index");

        self.backend.create_index(self.key(), spec)
    }

    /// Drops a named index. Dropping an unknown index is a no-op.
    pub fn drop_index(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_index(self.key(), name)
    }

    pub fn list_indexes(&self) -> DocumentStoreResult<Vec<IndexSpec>> {
        self.backend.list_indexes(self.key())
    }
}

/// A [`Collection`] bound to a single payload type.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, T: Attributes> {
    inner: Collection<'a, B>,
    _marker: PhantomData<T>,
}

impl<'a, B: StoreBackend, T: Attributes> TypedCollection<'a, B, T> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped collection over the same source.
    pub fn untyped(&self) -> &Collection<'a, B> {
        &self.inner
    }

    /// Rebinds the same source to a different payload type.
    pub fn with_type<U: Attributes>(&self) -> TypedCollection<'a, B, U> {
        self.inner.typed()
    }

    pub fn save(&self, envelope: &Envelope<T>) -> DocumentStoreResult<()> {
        self.inner.save(envelope)
    }

    pub fn save_with(&self, envelope: &Envelope<T>, policy: SavePolicy) -> DocumentStoreResult<()> {
        self.inner.save_with(envelope, policy)
    }

    pub fn save_all(&self, envelopes: &[Envelope<T>], policy: SavePolicy) -> DocumentStoreResult<BatchReport> {
        self.inner.save_all(envelopes, policy)
    }

    pub fn fetch(&self, id: &str) -> DocumentStoreResult<Option<T>> {
        self.inner.fetch(id)
    }

    pub fn find(&self, id: &str) -> DocumentStoreResult<Option<T>> {
        self.inner.find(id)
    }

    pub fn fetch_all(
        &self,
        predicate: Option<Expr>,
        ordering: Option<Vec<Ordering>>,
    ) -> DocumentStoreResult<Vec<T>> {
        self.inner.fetch_all(predicate, ordering)
    }

    pub fn fetch_envelope(&self, id: &str) -> DocumentStoreResult<Option<Envelope<T>>> {
        self.inner.fetch_envelope(id)
    }

    pub fn fetch_all_envelopes(
        &self,
        predicate: Option<Expr>,
        ordering: Option<Vec<Ordering>>,
    ) -> DocumentStoreResult<Vec<Envelope<T>>> {
        self.inner.fetch_all_envelopes(predicate, ordering)
    }

    pub fn count(&self, predicate: Option<Expr>) -> DocumentStoreResult<usize> {
        self.inner.count(predicate)
    }

    pub fn delete(&self, id: &str) -> DocumentStoreResult<bool> {
        self.inner.delete(id)
    }

    pub fn delete_many<I, S>(&self, ids: I) -> DocumentStoreResult<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.delete_many(ids)
    }

    pub fn delete_all(&self, predicate: Option<Expr>) -> DocumentStoreResult<BatchReport> {
        self.inner.delete_all(predicate)
    }

    pub fn clear(&self) -> DocumentStoreResult<()> {
        self.inner.clear()
    }

    pub fn create_index<I, P>(&self, name: &str, paths: I) -> DocumentStoreResult<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.inner.create_index(name, paths)
    }

    pub fn drop_index(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.drop_index(name)
    }

    pub fn list_indexes(&self) -> DocumentStoreResult<Vec<IndexSpec>> {
        self.inner.list_indexes()
    }
}
