use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use threatscore_core::error::{Error, Result};
use threatscore_core::traits::DocumentStore;
use threatscore_core::types::{validate_index_name, FieldType, IndexHandle, IndexSchema, SCORE_FIELD};

type Documents = BTreeMap<u64, i64>;

/// Process-local document store with the same semantics as the on-disk one.
#[derive(Default)]
pub struct InMemoryStore {
    indices: RwLock<HashMap<String, Documents>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the indices currently present, sorted.
    pub fn index_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn document_count(&self, index: &str) -> Result<Option<usize>> {
        Ok(self.read()?.get(index).map(|docs| docs.len()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Documents>>> {
        self.indices.read().map_err(|_| Error::StoreUnavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Documents>>> {
        self.indices.write().map_err(|_| Error::StoreUnavailable("in-memory store lock poisoned".to_string()))
    }
}

fn missing(index: &str) -> Error {
    Error::StoreUnavailable(format!("index '{}' does not exist", index))
}

impl DocumentStore for InMemoryStore {
    fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        validate_index_name(index)?;
        if !schema.has_field(SCORE_FIELD, FieldType::Integer) {
            return Err(Error::InvalidConfig(format!("index schema must declare an integer '{}' field", SCORE_FIELD)));
        }
        self.write()?.entry(index.to_string()).or_default();
        debug!(index, "ensured in-memory index");
        Ok(())
    }

    fn bulk_index(&self, index: &str, values: &[i64]) -> Result<IndexHandle> {
        validate_index_name(index)?;
        let mut indices = self.write()?;
        let docs = indices.get_mut(index).ok_or_else(|| missing(index))?;
        for (position, value) in values.iter().enumerate() {
            docs.insert(position as u64, *value);
        }
        debug!(index, documents = values.len(), "bulk indexed in memory");
        Ok(IndexHandle { index_name: index.to_string(), documents: values.len() as u64 })
    }

    fn query_all(&self, index: &str, max_results: usize) -> Result<Vec<i64>> {
        validate_index_name(index)?;
        let indices = self.read()?;
        let docs = indices.get(index).ok_or_else(|| missing(index))?;
        Ok(docs.values().take(max_results).copied().collect())
    }

    fn delete_index(&self, index: &str) -> Result<()> {
        validate_index_name(index)?;
        if self.write()?.remove(index).is_none() {
            debug!(index, "delete of missing in-memory index ignored");
        }
        Ok(())
    }
}
