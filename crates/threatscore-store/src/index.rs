use std::fmt::Display;
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::AllQuery;
use tantivy::schema::Value;
use tantivy::{doc, Index, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use threatscore_core::error::{Error, Result};
use threatscore_core::traits::DocumentStore;
use threatscore_core::types::{validate_index_name, IndexHandle, IndexSchema};

use crate::tantivy_utils::{build_schema, score_fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Document store backed by one tantivy index per index name under `root`.
///
/// Nothing is held open between calls: every operation opens the index it
/// needs, so a single store value can be shared freely.
pub struct TantivyStore {
	root: PathBuf,
}

impl TantivyStore {
	pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		std::fs::create_dir_all(&root).map_err(|e| unavailable(&root.display().to_string(), "create root", e))?;
		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn index_dir(&self, index: &str) -> Result<PathBuf> {
		validate_index_name(index)?;
		Ok(self.root.join(index))
	}

	fn exists(&self, index: &str, dir: &Path) -> Result<bool> {
		if !dir.is_dir() { return Ok(false); }
		let directory = MmapDirectory::open(dir).map_err(|e| unavailable(index, "open directory", e))?;
		Index::exists(&directory).map_err(|e| unavailable(index, "probe", e))
	}

	fn open_index(&self, index: &str) -> Result<Index> {
		let dir = self.index_dir(index)?;
		if !self.exists(index, &dir)? {
			return Err(Error::StoreUnavailable(format!("index '{}' does not exist", index)));
		}
		Index::open_in_dir(&dir).map_err(|e| unavailable(index, "open", e))
	}
}

fn unavailable(index: &str, op: &str, e: impl Display) -> Error {
	Error::StoreUnavailable(format!("{} '{}': {}", op, index, e))
}

impl DocumentStore for TantivyStore {
	fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
		let dir = self.index_dir(index)?;
		let tantivy_schema = build_schema(schema)?;
		if self.exists(index, &dir)? {
			debug!(index, "index already exists");
			return Ok(());
		}
		std::fs::create_dir_all(&dir).map_err(|e| unavailable(index, "create", e))?;
		Index::create_in_dir(&dir, tantivy_schema).map_err(|e| unavailable(index, "create", e))?;
		debug!(index, dir = %dir.display(), "created index");
		Ok(())
	}

	fn bulk_index(&self, index: &str, values: &[i64]) -> Result<IndexHandle> {
		let idx = self.open_index(index)?;
		let (id_field, score_field) = score_fields(&idx.schema())?;
		let mut index_writer: IndexWriter = idx.writer_with_num_threads(1, WRITER_HEAP_BYTES).map_err(|e| unavailable(index, "open writer", e))?;
		for (position, value) in values.iter().enumerate() {
			let id = position as u64;
			index_writer.delete_term(Term::from_field_u64(id_field, id));
			index_writer
				.add_document(doc!(id_field => id, score_field => *value))
				.map_err(|e| unavailable(index, "add document", e))?;
		}
		index_writer.commit().map_err(|e| unavailable(index, "commit", e))?;
		index_writer.wait_merging_threads().map_err(|e| unavailable(index, "merge", e))?;
		debug!(index, documents = values.len(), "bulk indexed");
		Ok(IndexHandle { index_name: index.to_string(), documents: values.len() as u64 })
	}

	fn query_all(&self, index: &str, max_results: usize) -> Result<Vec<i64>> {
		let idx = self.open_index(index)?;
		if max_results == 0 { return Ok(Vec::new()); }
		let (_, score_field) = score_fields(&idx.schema())?;
		let reader = idx
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| unavailable(index, "open reader", e))?;
		let searcher = reader.searcher();
		let top_docs = searcher.search(&AllQuery, &TopDocs::with_limit(max_results)).map_err(|e| unavailable(index, "search", e))?;
		let mut scores = Vec::with_capacity(top_docs.len());
		for (_rank, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| unavailable(index, "fetch", e))?;
			let score = doc
				.get_first(score_field)
				.and_then(|v| v.as_i64())
				.ok_or_else(|| Error::StoreUnavailable(format!("document in '{}' has no integer score", index)))?;
			scores.push(score);
		}
		debug!(index, hits = scores.len(), "query_all");
		Ok(scores)
	}

	fn delete_index(&self, index: &str) -> Result<()> {
		let dir = self.index_dir(index)?;
		if !dir.exists() {
			debug!(index, "delete of missing index ignored");
			return Ok(());
		}
		std::fs::remove_dir_all(&dir).map_err(|e| unavailable(index, "delete", e))?;
		debug!(index, "deleted index");
		Ok(())
	}
}
