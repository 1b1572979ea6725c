use crate::error::Result;
use crate::types::{IndexHandle, IndexSchema};

/// Capability set of an indexed document store holding `{ "score": <int> }` documents.
///
/// Implementations are stateless per call and shared across callers, so every
/// method takes `&self`. Transport or service failures surface as
/// `Error::StoreUnavailable`; no method retries on its own.
pub trait DocumentStore: Send + Sync {
    /// Create `index` with `schema` unless it already exists. Existing indices are left untouched.
    fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()>;

    /// Index `values` with document ids `0..values.len()`, replacing documents at those ids.
    fn bulk_index(&self, index: &str, values: &[i64]) -> Result<IndexHandle>;

    /// Return up to `max_results` score values in no particular order.
    fn query_all(&self, index: &str, max_results: usize) -> Result<Vec<i64>>;

    /// Remove `index` and its documents; a missing index is not an error.
    fn delete_index(&self, index: &str) -> Result<()>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        (**self).ensure_index(index, schema)
    }
    fn bulk_index(&self, index: &str, values: &[i64]) -> Result<IndexHandle> {
        (**self).bulk_index(index, values)
    }
    fn query_all(&self, index: &str, max_results: usize) -> Result<Vec<i64>> {
        (**self).query_all(index, max_results)
    }
    fn delete_index(&self, index: &str) -> Result<()> {
        (**self).delete_index(index)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        (**self).ensure_index(index, schema)
    }
    fn bulk_index(&self, index: &str, values: &[i64]) -> Result<IndexHandle> {
        (**self).bulk_index(index, values)
    }
    fn query_all(&self, index: &str, max_results: usize) -> Result<Vec<i64>> {
        (**self).query_all(index, max_results)
    }
    fn delete_index(&self, index: &str) -> Result<()> {
        (**self).delete_index(index)
    }
}
