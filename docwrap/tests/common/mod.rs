//! Shared fixtures for the docwrap integration tests.

#![allow(dead_code)]

use std::{collections::HashSet, sync::Arc};

use docwrap::{
    backend::{BatchFn, SourceInfo, StoreBackend, WriteBatch},
    bson::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexSpec,
    memory::InMemoryStore,
    prelude::*,
    query::QueryPlan,
};
use serde::{Deserialize, Serialize};

pub const DATABASE: &str = "TEST_DB";
pub const VEHICLES: &str = "Vehicle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub quantity: i64,
}

impl Product {
    pub fn new(id: &str, name: &str, quantity: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            quantity,
        }
    }

    pub fn envelope(self) -> Envelope<Product> {
        Envelope::new(self.id.clone(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingCart {
    pub id: String,
    pub date: String,
    pub product: Product,
    pub extras: Vec<Product>,
}

/// Ids `1..4` with quantities 40, 20, 30, 10.
pub fn products() -> Vec<Envelope<Product>> {
    vec![
        Product::new("1", "car", 40).envelope(),
        Product::new("2", "bike", 20).envelope(),
        Product::new("3", "truck", 30).envelope(),
        Product::new("4", "scooter", 10).envelope(),
    ]
}

pub fn open_store() -> DocumentStore<InMemoryStore> {
    DocumentStore::open(InMemoryStore::new(), DATABASE).unwrap()
}

pub fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|product| product.id.as_str()).collect()
}

/// Engine wrapper that fails writes or deletes of the configured ids.
///
/// Failures are injected both for point operations and inside batches.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend {
    inner: InMemoryStore,
    failing: Arc<Failing>,
}

#[derive(Debug, Default)]
struct Failing {
    puts: HashSet<String>,
    deletes: HashSet<String>,
}

impl Failing {
    fn check(set: &HashSet<String>, id: &str) -> DocumentStoreResult<()> {
        if set.contains(id) {
            return Err(DocumentStoreError::Store(format!("injected failure for {id}")));
        }

        Ok(())
    }
}

fn to_set<I: IntoIterator<Item = &'static str>>(ids: I) -> HashSet<String> {
    ids.into_iter().map(str::to_string).collect()
}

impl FailingBackend {
    pub fn failing_writes<I: IntoIterator<Item = &'static str>>(ids: I) -> Self {
        Self {
            inner: InMemoryStore::new(),
            failing: Arc::new(Failing { puts: to_set(ids), deletes: HashSet::new() }),
        }
    }

    pub fn failing_deletes<I: IntoIterator<Item = &'static str>>(ids: I) -> Self {
        Self {
            inner: InMemoryStore::new(),
            failing: Arc::new(Failing { puts: HashSet::new(), deletes: to_set(ids) }),
        }
    }
}

struct FailingBatch<'b> {
    inner: &'b mut dyn WriteBatch,
    failing: &'b Failing,
}

impl WriteBatch for FailingBatch<'_> {
    fn get_record(&self, id: &str) -> DocumentStoreResult<Option<Document>> {
        self.inner.get_record(id)
    }

    fn put_record(&mut self, id: &str, record: Document) -> DocumentStoreResult<()> {
        Failing::check(&self.failing.puts, id)?;
        self.inner.put_record(id, record)
    }

    fn delete_record(&mut self, id: &str) -> DocumentStoreResult<()> {
        Failing::check(&self.failing.deletes, id)?;
        self.inner.delete_record(id)
    }
}

impl StoreBackend for FailingBackend {
    fn get_record(&self, source: &str, id: &str) -> DocumentStoreResult<Option<Document>> {
        self.inner.get_record(source, id)
    }

    fn put_record(&self, source: &str, id: &str, record: Document) -> DocumentStoreResult<()> {
        Failing::check(&self.failing.puts, id)?;
        self.inner.put_record(source, id, record)
    }

    fn delete_record(&self, source: &str, id: &str) -> DocumentStoreResult<()> {
        Failing::check(&self.failing.deletes, id)?;
        self.inner.delete_record(source, id)
    }

    fn run_batch(&self, source: &str, batch: &mut BatchFn<'_>) -> DocumentStoreResult<()> {
        self.inner.run_batch(source, &mut |inner: &mut dyn WriteBatch| {
            let mut scope = FailingBatch {
                inner,
                failing: &self.failing,
            };
            batch(&mut scope)
        })
    }

    fn execute(&self, plan: &QueryPlan) -> DocumentStoreResult<Vec<Document>> {
        self.inner.execute(plan)
    }

    fn create_index(&self, source: &str, spec: IndexSpec) -> DocumentStoreResult<()> {
        self.inner.create_index(source, spec)
    }

    fn drop_index(&self, source: &str, name: &str) -> DocumentStoreResult<()> {
        self.inner.drop_index(source, name)
    }

    fn list_indexes(&self, source: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        self.inner.list_indexes(source)
    }

    fn create_source(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.create_source(name)
    }

    fn get_source(&self, name: &str) -> DocumentStoreResult<Option<SourceInfo>> {
        self.inner.get_source(name)
    }

    fn delete_source(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.delete_source(name)
    }

    fn list_sources(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_sources()
    }

    fn delete_all_records(&self, source: &str) -> DocumentStoreResult<()> {
        self.inner.delete_all_records(source)
    }
}
