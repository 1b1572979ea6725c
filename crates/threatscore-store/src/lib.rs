//! threatscore-store
//!
//! Document store clients behind `threatscore_core::traits::DocumentStore`:
//! a tantivy-backed on-disk store with one index directory per index name,
//! and an in-memory store for tests and dry runs.
pub mod tantivy_utils;
pub mod index;
pub mod memory;

pub use index::TantivyStore;
pub use memory::InMemoryStore;
