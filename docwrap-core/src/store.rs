//! Database-level façade over a storage backend.
//!
//! A [`DocumentStore`] represents one database: it owns the backend, keeps a
//! default source named after the database, and manages named collections.
//!
//! # Example
//!
//! ```ignore
//! use docwrap::prelude::*;
//!
//! let store = DocumentStore::open(InMemoryStore::new(), "TEST_DB")?;
//!
//! // The database itself is a source
//! store.database().save(&Envelope::new("1", 20.5_f64))?;
//!
//! // Named collections are separate sources
//! let vehicles = store.create_collection("Vehicle")?;
//! vehicles.create_index("ByName", ["name"])?;
//! # Ok::<(), DocumentStoreError>(())
//! ```

use tracing::info;

use crate::{
    backend::{SourceInfo, StoreBackend},
    collection::{Collection, TypedCollection},
    document::Attributes,
    error::DocumentStoreResult,
    query::{DataSource, SOURCE_SEPARATOR},
};

/// A database bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    name: String,
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Opens the database `name` on `backend`, creating its default source if needed.
    pub fn open(backend: B, name: impl Into<String>) -> DocumentStoreResult<Self> {
        let name = name.into();
        backend.create_source(&name)?;
        info!(target: "docwrap::store", database = %name, "Opened database");

        Ok(Self { name, backend })
    }

    /// Returns the database name, which is also the name of its default source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default source of this database.
    pub fn database(&self) -> Collection<'_, B> {
        Collection::new(DataSource::database(self.name.as_str()), &self.backend)
    }

    /// The default source bound to payload type `T`.
    pub fn typed_database<T: Attributes>(&self) -> TypedCollection<'_, B, T> {
        self.database().typed()
    }

    /// Creates a named collection and returns it. Existing collections are reused.
    pub fn create_collection(&self, name: &str) -> DocumentStoreResult<Collection<'_, B>> {
        let collection = self.collection(name);
        self.backend.create_source(collection.key())?;
        info!(target: "docwrap::store", database = %self.name, collection = name, "Created collection");

        Ok(collection)
    }

    /// Returns a handle to a named collection without checking that it exists.
    ///
    /// The collection's records live in the engine source `<database>/<name>`, so
    /// databases sharing one backend never see each other's collections.
    pub fn collection(&self, name: &str) -> Collection<'_, B> {
        Collection::new(DataSource::collection(self.name.as_str(), name), &self.backend)
    }

    /// Returns a named collection if it exists.
    pub fn get_collection(&self, name: &str) -> DocumentStoreResult<Option<Collection<'_, B>>> {
        let collection = self.collection(name);

        Ok(self
            .backend
            .get_source(collection.key())?
            .map(|_| collection))
    }

    /// Describes a named collection.
    pub fn describe(&self, name: &str) -> DocumentStoreResult<Option<SourceInfo>> {
        self.backend.get_source(&DataSource::collection(self.name.as_str(), name).key())
    }

    /// Describes the default source of this database.
    pub fn describe_database(&self) -> DocumentStoreResult<Option<SourceInfo>> {
        self.backend.get_source(&self.name)
    }

    /// Deletes a named collection with all its records and indexes.
    ///
    /// Deleting a collection that does not exist is a no-op.
    pub fn delete_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let key = DataSource::collection(self.name.as_str(), name).key();

        if self.backend.get_source(&key)?.is_none() {
            return Ok(());
        }

        self.backend.delete_source(&key)?;
        info!(target: "docwrap::store", database = %self.name, collection = name, "Deleted collection");
        Ok(())
    }

    /// Lists the named collections of this database, sorted by name.
    pub fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let prefix = self.collection_prefix();
        let mut names = self
            .backend
            .list_sources()?
            .into_iter()
            .filter_map(|source| source.strip_prefix(&prefix).map(str::to_string))
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }

    /// Deletes the whole database: its collections and its default source.
    ///
    /// Other databases on the same backend are left untouched.
    pub fn delete_database(self) -> DocumentStoreResult<B> {
        for name in self.list_collections()? {
            self.backend
                .delete_source(&DataSource::collection(self.name.as_str(), name).key())?;
        }
        if self.backend.get_source(&self.name)?.is_some() {
            self.backend.delete_source(&self.name)?;
        }
        info!(target: "docwrap::store", database = %self.name, "Deleted database");

        Ok(self.backend)
    }

    fn collection_prefix(&self) -> String {
        format!("{}{SOURCE_SEPARATOR}", self.name)
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the store and returns the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }
}
